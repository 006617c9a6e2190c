use bluer::gatt::local::ReqError;

use crate::gatt::GattError;
use crate::{Error, ErrorType};

impl From<bluer::Error> for Error {
    fn from(value: bluer::Error) -> Self {
        Error::new(
            format!("bluer::Error: {:?}", value.kind),
            value.message,
            ErrorType::Bluez,
        )
    }
}

impl From<GattError> for ReqError {
    fn from(value: GattError) -> Self {
        match value {
            GattError::NotPermitted => ReqError::NotPermitted,
            GattError::InvalidValueLength { .. } => ReqError::InvalidValueLength,
            GattError::InvalidArguments(_) | GattError::Failed(_) => ReqError::Failed,
        }
    }
}

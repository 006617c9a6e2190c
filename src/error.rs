use std::fmt;

use crate::gatt::GattError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Bluez,
    PermissionDenied,
    InvalidAttribute,
    HidDescriptor,
    Config,
    Sensor,
    Gatt,
    Io,
    Unknown,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorType::Bluez => "bluez",
            ErrorType::PermissionDenied => "permission denied",
            ErrorType::InvalidAttribute => "invalid attribute",
            ErrorType::HidDescriptor => "hid descriptor",
            ErrorType::Config => "config",
            ErrorType::Sensor => "sensor",
            ErrorType::Gatt => "gatt",
            ErrorType::Io => "io",
            ErrorType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Crate-level error for assembly, configuration and platform failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub name: String,
    pub description: String,
    pub error_type: ErrorType,
}

impl Error {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        error_type: ErrorType,
    ) -> Self {
        Error {
            name: name.into(),
            description: description.into(),
            error_type,
        }
    }

    pub fn from_type(error_type: ErrorType) -> Self {
        Error::new(error_type.to_string(), "", error_type)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{} ({})", self.name, self.error_type)
        } else {
            write!(f, "{}: {} ({})", self.name, self.description, self.error_type)
        }
    }
}

impl std::error::Error for Error {}

impl From<GattError> for Error {
    fn from(value: GattError) -> Self {
        let error_type = match value {
            GattError::NotPermitted => ErrorType::PermissionDenied,
            _ => ErrorType::Gatt,
        };
        Error::new(value.dbus_name(), value.to_string(), error_type)
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::new(
            format!("std::io::Error: {:?}", value.kind()),
            value.to_string(),
            ErrorType::Io,
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::new("serde_json::Error", value.to_string(), ErrorType::Config)
    }
}

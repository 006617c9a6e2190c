//! GATT attribute model, object tree and server core.

pub mod characteristic;
pub mod descriptor;
pub mod flags;
pub mod notification;
pub mod object_path;
pub mod peripheral_event;
pub mod property_map;
pub mod server;
pub mod service;
pub mod tree;

pub use characteristic::{Characteristic, ValueLength};
pub use descriptor::Descriptor;
pub use flags::{AttributeFlag, Flags};
pub use notification::{ChannelSink, LogSink, Notification, NotificationSink};
pub use object_path::{AttributeKind, ObjectPath};
pub use property_map::{ManagedObjects, PropertyMap, PropertyValue};
pub use server::{AttributeHandler, GattServer, Producer, RequestOptions};
pub use service::Service;
pub use tree::{AttributeId, AttributeTree, CharacteristicId, DescriptorId, ServiceId};

pub const SERVICE_INTERFACE: &str = "org.bluez.GattService1";
pub const CHARACTERISTIC_INTERFACE: &str = "org.bluez.GattCharacteristic1";
pub const DESCRIPTOR_INTERFACE: &str = "org.bluez.GattDescriptor1";

/// Errors returned to the remote peer by attribute operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GattError {
    #[error("operation not permitted")]
    NotPermitted,
    #[error("invalid value length: expected {expected}, got {actual}")]
    InvalidValueLength { expected: ValueLength, actual: usize },
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("failed: {0}")]
    Failed(String),
}

impl GattError {
    /// D-Bus error name BlueZ expects for this error.
    pub fn dbus_name(&self) -> &'static str {
        match self {
            GattError::NotPermitted => "org.bluez.Error.NotPermitted",
            GattError::InvalidValueLength { .. } => "org.bluez.Error.InvalidValueLength",
            GattError::InvalidArguments(_) => "org.bluez.Error.InvalidArguments",
            GattError::Failed(_) => "org.bluez.Error.Failed",
        }
    }
}

pub type GattResult<T> = Result<T, GattError>;

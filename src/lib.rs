//! BLE HID peripheral core.
//!
//! A GATT attribute tree with BlueZ-style object paths, a property model for
//! bulk enumeration, read/write/notify dispatch, a cooperative notification
//! scheduler and a HID report codec. The platform stack sits behind
//! [`peripheral::PeripheralServer`]; the BlueZ backend is enabled with the
//! `bluez` feature.

pub mod advertisement;
pub mod config;
pub mod error;
pub mod gatt;
pub mod hid;
pub mod peripheral;
pub mod runtime;
pub mod scheduler;
pub mod sensor;
pub mod services;

pub use config::Config;
pub use error::{Error, ErrorType};
pub use runtime::Application;

#[cfg(feature = "bluez")]
pub use peripheral::bluez::Peripheral;

use uuid::Uuid;

const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;

/// Expansion of 16/32-bit SIG-assigned UUIDs over the Bluetooth base UUID.
pub trait SdpShortUuid<T: Into<u32>> {
    fn from_sdp_short_uuid(uuid: T) -> Uuid;
}

impl<T: Into<u32>> SdpShortUuid<T> for Uuid {
    fn from_sdp_short_uuid(uuid: T) -> Uuid {
        let uuid: u32 = uuid.into();
        Uuid::from_u128(BLUETOOTH_BASE_UUID | ((uuid as u128) << 96))
    }
}

/// Parses a UUID written in short (`180f`), 32-bit (`0000180f`) or full form.
pub fn parse_uuid(value: &str) -> Result<Uuid, Error> {
    let long = match value.len() {
        4 => format!("0000{}-0000-1000-8000-00805f9b34fb", value),
        8 => format!("{}-0000-1000-8000-00805f9b34fb", value),
        _ => value.to_string(),
    };
    long.to_lowercase().parse().map_err(|err: uuid::Error| {
        Error::new(
            "uuid::Error",
            format!("{value:?}: {err}"),
            ErrorType::InvalidAttribute,
        )
    })
}

/// Short 16-bit form of a SIG UUID, if `uuid` sits on the base UUID.
pub fn short_uuid(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    let mask = !(0xffff_u128 << 96);
    if value & mask == BLUETOOTH_BASE_UUID {
        Some((value >> 96) as u16)
    } else {
        None
    }
}

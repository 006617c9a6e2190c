//! Device Information Service (0x180A).

use uuid::Uuid;

use crate::config::DeviceInfoConfig;
use crate::gatt::{AttributeFlag, Characteristic, Flags, Service};
use crate::SdpShortUuid;

pub const DEVICE_INFORMATION_SERVICE: u16 = 0x180A;
pub const MODEL_NUMBER: u16 = 0x2A24;
pub const SERIAL_NUMBER: u16 = 0x2A25;
pub const FIRMWARE_REVISION: u16 = 0x2A26;
pub const HARDWARE_REVISION: u16 = 0x2A27;
pub const SOFTWARE_REVISION: u16 = 0x2A28;
pub const MANUFACTURER_NAME: u16 = 0x2A29;
pub const PNP_ID: u16 = 0x2A50;

/// PnP ID: vendor id source, vendor id, product id, product version; all
/// little endian.
pub fn pnp_id(config: &DeviceInfoConfig) -> [u8; 7] {
    let [vid_lo, vid_hi] = config.vendor_id.to_le_bytes();
    let [pid_lo, pid_hi] = config.product_id.to_le_bytes();
    let [ver_lo, ver_hi] = config.product_version.to_le_bytes();
    [
        config.vendor_id_source,
        vid_lo,
        vid_hi,
        pid_lo,
        pid_hi,
        ver_lo,
        ver_hi,
    ]
}

fn read_only(short: u16, value: Vec<u8>) -> Characteristic {
    Characteristic::new(
        Uuid::from_sdp_short_uuid(short),
        Flags::new(&[AttributeFlag::Read]),
        value,
        vec![],
    )
}

pub fn service(config: &DeviceInfoConfig) -> Service {
    let strings = [
        (MODEL_NUMBER, &config.model_number),
        (SERIAL_NUMBER, &config.serial_number),
        (FIRMWARE_REVISION, &config.firmware_revision),
        (HARDWARE_REVISION, &config.hardware_revision),
        (SOFTWARE_REVISION, &config.software_revision),
        (MANUFACTURER_NAME, &config.manufacturer_name),
    ];
    let mut service = Service::primary(Uuid::from_sdp_short_uuid(DEVICE_INFORMATION_SERVICE));
    for (short, value) in strings {
        service = service.with_characteristic(read_only(short, value.as_bytes().to_vec()));
    }
    service.with_characteristic(read_only(PNP_ID, pnp_id(config).to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pnp_id_layout() {
        let config = DeviceInfoConfig::default();
        assert_eq!(pnp_id(&config), [0x01, 0x61, 0xFE, 0x01, 0x00, 0x23, 0x01]);
    }

    #[test]
    fn strings_in_order() {
        let service = service(&DeviceInfoConfig::default());
        assert_eq!(service.characteristics.len(), 7);
        assert_eq!(service.characteristics[0].value, b"smartRemotes".to_vec());
        assert_eq!(service.characteristics[5].value, b"HodgeCode".to_vec());
    }
}

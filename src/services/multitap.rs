//! Single-contact touch digitizer that taps the same spot on a pulse.

use std::time::Duration;

use crate::config::Config;
use crate::gatt::Service;
use crate::hid::{report_map::MULTITAP, HidInformation, TouchReport};

use super::hid::{pulse, HidServiceBuilder};

pub const REPORT_ID: u8 = 1;
pub const TAP_CONTACT: u8 = 1;
pub const TAP_X: u16 = 1500;
pub const TAP_Y: u16 = 1000;

pub fn service(config: &Config) -> Service {
    let tap = TouchReport::touch(TAP_CONTACT, TAP_X, TAP_Y);
    HidServiceBuilder::new(HidInformation::new(0x0201), MULTITAP, config.length_policy)
        .producing_report(
            REPORT_ID,
            TouchReport::default().to_bytes(),
            Duration::from_millis(config.pulses.multitap_ms),
            pulse(tap.to_bytes(), tap.lifted().to_bytes()),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_payload() {
        let tap = TouchReport::touch(TAP_CONTACT, TAP_X, TAP_Y);
        assert_eq!(tap.to_bytes(), vec![0x01, 0x01, 0x03, 0xdc, 0x05, 0xe8, 0x03]);
        assert_eq!(tap.lifted().to_bytes()[2], 0x00);
    }

    #[test]
    fn report_is_seven_bytes() {
        let service = service(&Config::default());
        assert_eq!(service.characteristics[3].value.len(), 7);
        assert_eq!(service.characteristics[0].value, vec![0x01, 0x02, 0x00, 0x02]);
    }
}

//! Relative mouse that nudges the cursor down on a fixed pulse.

use std::time::Duration;

use crate::config::Config;
use crate::gatt::{CharacteristicId, GattResult, GattServer, Service};
use crate::hid::{report_map::RELATIVE_MOUSE, HidInformation, MouseReport};

use super::hid::HidServiceBuilder;

pub const REPORT_ID: u8 = 1;
/// Downward step sent on every pulse.
pub const PULSE_Y: i8 = 0x10;

fn pulse(server: &mut GattServer, report: CharacteristicId) -> GattResult<()> {
    server.update_value(report, MouseReport::moved(0, PULSE_Y).to_bytes())?;
    Ok(())
}

pub fn service(config: &Config) -> Service {
    HidServiceBuilder::new(HidInformation::new(0x0101), RELATIVE_MOUSE, config.length_policy)
        .producing_report(
            REPORT_ID,
            MouseReport::default().to_bytes(),
            Duration::from_millis(config.pulses.relative_mouse_ms),
            pulse,
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_report_characteristic() {
        let service = service(&Config::default());
        assert_eq!(service.characteristics.len(), 5);
        let report = &service.characteristics[3];
        assert_eq!(report.value, vec![0; 4]);
        assert!(report.producer.is_some());
    }

    #[test]
    fn pulse_moves_down() {
        assert_eq!(MouseReport::moved(0, PULSE_Y).to_bytes(), vec![0, 0, 0x10, 0]);
    }
}

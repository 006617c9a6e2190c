//! Keyboard with a consumer control collection. Report 1 types Shift+M on
//! one pulse, report 2 presses Volume Up on another.

use std::time::Duration;

use crate::config::Config;
use crate::gatt::Service;
use crate::hid::keyboard::{KEY_M, MOD_LEFT_SHIFT};
use crate::hid::{
    report_map::KEYBOARD, ConsumerReport, ConsumerUsage, HidInformation, KeyboardReport,
};

use super::hid::{pulse, HidServiceBuilder};

pub const KEYBOARD_REPORT_ID: u8 = 1;
pub const CONSUMER_REPORT_ID: u8 = 2;

pub fn service(config: &Config) -> Service {
    let key = pulse(
        KeyboardReport::key(MOD_LEFT_SHIFT, KEY_M).to_bytes(),
        KeyboardReport::release().to_bytes(),
    );
    let volume = pulse(
        ConsumerReport::pressed(ConsumerUsage::VolumeUp).to_bytes(),
        ConsumerReport::release().to_bytes(),
    );
    HidServiceBuilder::new(HidInformation::new(0x1101), KEYBOARD, config.length_policy)
        .producing_report(
            KEYBOARD_REPORT_ID,
            KeyboardReport::release().to_bytes(),
            Duration::from_millis(config.pulses.keyboard_key_ms),
            key,
        )
        .producing_report(
            CONSUMER_REPORT_ID,
            ConsumerReport::release().to_bytes(),
            Duration::from_millis(config.pulses.keyboard_consumer_ms),
            volume,
        )
        .build()
}

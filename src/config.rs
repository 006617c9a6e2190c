//! Runtime configuration, loaded from JSON. Every field has a default so an
//! empty object (or no file at all) yields the stock gesture-mouse setup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gatt::ObjectPath;
use crate::{Error, ErrorType};

/// Longest local name that fits a legacy advertising payload.
pub const MAX_LOCAL_NAME_LEN: usize = 29;

/// Advertising data BlueZ can add on its own (`SupportedIncludes`).
pub const ADVERTISEMENT_INCLUDES: [&str; 3] = ["tx-power", "appearance", "local-name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    GestureMouse,
    RelativeMouse,
    Keyboard,
    Multitap,
    Test,
}

/// How strictly fixed-size HID characteristics check write lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthPolicy {
    /// Protocol Mode and HID Control Point accept exactly one byte.
    #[default]
    Strict,
    /// Any length is stored as written.
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub local_name: String,
    /// Adapter name such as `hci0`; the default adapter when unset.
    pub adapter: Option<String>,
    pub base_path: String,
    pub profile: Profile,
    pub length_policy: LengthPolicy,
    /// `env_logger` style filter used by the binaries when `RUST_LOG` is unset.
    pub log_level: Option<String>,
    /// Entries of [`ADVERTISEMENT_INCLUDES`] to request from BlueZ.
    pub advertisement_includes: Vec<String>,
    pub battery: BatteryConfig,
    pub device_info: DeviceInfoConfig,
    pub gesture: GestureConfig,
    pub pulses: PulseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            local_name: "AIBot".to_string(),
            adapter: None,
            base_path: "/org/bluez/example".to_string(),
            profile: Profile::default(),
            length_policy: LengthPolicy::default(),
            log_level: None,
            advertisement_includes: Vec::new(),
            battery: BatteryConfig::default(),
            device_info: DeviceInfoConfig::default(),
            gesture: GestureConfig::default(),
            pulses: PulseConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    pub initial_level: u8,
    pub drain_step: u8,
    pub draining: bool,
    pub period_ms: u64,
    /// Read the level from a power supply `capacity` file instead of simulating it.
    pub power_supply: Option<PathBuf>,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        BatteryConfig {
            initial_level: 100,
            drain_step: 2,
            draining: true,
            period_ms: 5000,
            power_supply: None,
        }
    }
}

impl BatteryConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfoConfig {
    pub model_number: String,
    pub serial_number: String,
    pub firmware_revision: String,
    pub hardware_revision: String,
    pub software_revision: String,
    pub manufacturer_name: String,
    pub vendor_id_source: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub product_version: u16,
}

impl Default for DeviceInfoConfig {
    fn default() -> Self {
        DeviceInfoConfig {
            model_number: "smartRemotes".to_string(),
            serial_number: "0000-0000-0000-0000".to_string(),
            firmware_revision: "0000-0000-0000-0000".to_string(),
            hardware_revision: "0000-0000-0000-0000".to_string(),
            software_revision: "version 1.0.0".to_string(),
            manufacturer_name: "HodgeCode".to_string(),
            vendor_id_source: 0x01,
            vendor_id: 0xFE61,
            product_id: 0x0001,
            product_version: 0x0123,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub report_period_ms: u64,
    pub sensor_period_ms: u64,
    /// Pinch states kept for click detection.
    pub history_len: usize,
    /// Longest pinch, in frames, that still counts as a click.
    pub click_window: usize,
    pub pinch_threshold: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        GestureConfig {
            report_period_ms: 50,
            sensor_period_ms: 33,
            history_len: 60,
            click_window: 10,
            pinch_threshold: 0.1,
        }
    }
}

/// Periods of the synthetic reports sent by the demo profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub relative_mouse_ms: u64,
    pub keyboard_key_ms: u64,
    pub keyboard_consumer_ms: u64,
    pub multitap_ms: u64,
    pub test_counter_ms: u64,
}

impl Default for PulseConfig {
    fn default() -> Self {
        PulseConfig {
            relative_mouse_ms: 5000,
            keyboard_key_ms: 10_000,
            keyboard_consumer_ms: 15_000,
            multitap_ms: 5000,
            test_counter_ms: 1000,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            Error::new(
                "Config",
                format!("failed to read {}: {err}", path.display()),
                ErrorType::Config,
            )
        })?;
        Config::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn base_path(&self) -> Result<ObjectPath, Error> {
        ObjectPath::new(self.base_path.clone())
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.base_path()
            .map_err(|err| invalid(format!("base_path: {}", err.description)))?;
        if self.local_name.is_empty() || self.local_name.len() > MAX_LOCAL_NAME_LEN {
            return Err(invalid(format!(
                "local_name must be 1..={MAX_LOCAL_NAME_LEN} bytes, got {}",
                self.local_name.len()
            )));
        }
        if let Some(include) = self
            .advertisement_includes
            .iter()
            .find(|include| !ADVERTISEMENT_INCLUDES.contains(&include.as_str()))
        {
            return Err(invalid(format!(
                "advertisement_includes: unsupported entry {include:?}"
            )));
        }
        if self.battery.initial_level > 100 {
            return Err(invalid(format!(
                "battery.initial_level {} is above 100",
                self.battery.initial_level
            )));
        }
        let periods = [
            ("battery.period_ms", self.battery.period_ms),
            ("gesture.report_period_ms", self.gesture.report_period_ms),
            ("gesture.sensor_period_ms", self.gesture.sensor_period_ms),
            ("pulses.relative_mouse_ms", self.pulses.relative_mouse_ms),
            ("pulses.keyboard_key_ms", self.pulses.keyboard_key_ms),
            ("pulses.keyboard_consumer_ms", self.pulses.keyboard_consumer_ms),
            ("pulses.multitap_ms", self.pulses.multitap_ms),
            ("pulses.test_counter_ms", self.pulses.test_counter_ms),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, period)| *period == 0) {
            return Err(invalid(format!("{name} must be greater than zero")));
        }
        if self.gesture.history_len < 2 {
            return Err(invalid("gesture.history_len must be at least 2".to_string()));
        }
        Ok(())
    }
}

fn invalid(description: String) -> Error {
    Error::new("Config", description, ErrorType::Config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.local_name, "AIBot");
        assert_eq!(config.profile, Profile::GestureMouse);
        assert_eq!(config.length_policy, LengthPolicy::Strict);
    }

    #[test]
    fn partial_override() {
        let json = r#"{
            "profile": "keyboard",
            "length_policy": "lenient",
            "battery": { "draining": false }
        }"#;
        let config = Config::from_json(json).unwrap();
        assert_eq!(config.profile, Profile::Keyboard);
        assert_eq!(config.length_policy, LengthPolicy::Lenient);
        assert!(!config.battery.draining);
        assert_eq!(config.battery.period_ms, 5000);
    }

    #[test]
    fn rejects_invalid_values() {
        for json in [
            r#"{ "base_path": "org/bluez" }"#,
            r#"{ "local_name": "" }"#,
            r#"{ "battery": { "initial_level": 101 } }"#,
            r#"{ "gesture": { "report_period_ms": 0 } }"#,
            r#"{ "profile": "joystick" }"#,
            r#"{ "advertisement_includes": ["rssi"] }"#,
        ] {
            let err = Config::from_json(json).unwrap_err();
            assert_eq!(err.error_type, ErrorType::Config, "{json}");
        }
    }

    #[test]
    fn accepts_known_advertisement_includes() {
        let config =
            Config::from_json(r#"{ "advertisement_includes": ["tx-power", "local-name"] }"#)
                .unwrap();
        assert_eq!(config.advertisement_includes, vec!["tx-power", "local-name"]);
    }

    #[test]
    fn invalid_base_path_is_config_error() {
        let config = Config {
            base_path: "/a//b".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn survives_json_round_trip() {
        let config = Config::default();
        let json = config.to_json().unwrap();
        assert_eq!(Config::from_json(&json).unwrap(), config);
    }
}

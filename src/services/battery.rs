//! Battery Service (0x180F) with a notifying Battery Level (0x2A19).

use std::fs;
use std::path::PathBuf;

use log::debug;
use uuid::Uuid;

use crate::config::BatteryConfig;
use crate::gatt::{
    AttributeFlag, Characteristic, CharacteristicId, Flags, GattError, GattResult, GattServer,
    Producer, Service, ValueLength,
};
use crate::{Error, ErrorType, SdpShortUuid};

pub const BATTERY_SERVICE: u16 = 0x180F;
pub const BATTERY_LEVEL: u16 = 0x2A19;

/// Source of battery percentages.
pub trait BatteryGauge {
    /// Level for the next report, 0..=100.
    fn sample(&mut self) -> Result<u8, Error>;
}

/// Simulated battery that loses `step` percent per sample.
#[derive(Debug, Clone)]
pub struct DrainingBattery {
    level: u8,
    step: u8,
    draining: bool,
}

impl DrainingBattery {
    pub fn new(level: u8, step: u8, draining: bool) -> Self {
        DrainingBattery {
            level: level.min(100),
            step,
            draining,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}

impl BatteryGauge for DrainingBattery {
    fn sample(&mut self) -> Result<u8, Error> {
        if self.draining {
            self.level = self.level.saturating_sub(self.step);
        }
        Ok(self.level)
    }
}

/// Reads `capacity` from a Linux power supply, e.g.
/// `/sys/class/power_supply/BAT0/capacity`.
#[derive(Debug, Clone)]
pub struct PowerSupplyBattery {
    path: PathBuf,
}

impl PowerSupplyBattery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PowerSupplyBattery { path: path.into() }
    }
}

impl BatteryGauge for PowerSupplyBattery {
    fn sample(&mut self) -> Result<u8, Error> {
        let content = fs::read_to_string(&self.path)?;
        let level: u32 = content.trim().parse().map_err(|err| {
            Error::new(
                "PowerSupplyBattery",
                format!("{}: {err}", self.path.display()),
                ErrorType::Sensor,
            )
        })?;
        Ok(level.min(100) as u8)
    }
}

struct BatteryProducer {
    gauge: Box<dyn BatteryGauge>,
}

impl Producer for BatteryProducer {
    fn produce(
        &mut self,
        server: &mut GattServer,
        characteristic: CharacteristicId,
    ) -> GattResult<()> {
        let level = self
            .gauge
            .sample()
            .map_err(|err| GattError::Failed(err.to_string()))?;
        debug!("battery level {}%", level);
        server.update_value(characteristic, vec![level])?;
        Ok(())
    }
}

pub fn gauge(config: &BatteryConfig) -> Box<dyn BatteryGauge> {
    match &config.power_supply {
        Some(path) => Box::new(PowerSupplyBattery::new(path.clone())),
        None => Box::new(DrainingBattery::new(
            config.initial_level,
            config.drain_step,
            config.draining,
        )),
    }
}

pub fn service(config: &BatteryConfig) -> Service {
    service_with_gauge(config, gauge(config))
}

pub fn service_with_gauge(config: &BatteryConfig, gauge: Box<dyn BatteryGauge>) -> Service {
    let level = Characteristic::new(
        Uuid::from_sdp_short_uuid(BATTERY_LEVEL),
        Flags::new(&[AttributeFlag::Read, AttributeFlag::Notify]),
        vec![config.initial_level.min(100)],
        vec![],
    )
    .with_length(ValueLength::Exact(1))
    .notify_on_subscribe()
    .with_producer(config.period(), BatteryProducer { gauge });

    Service::primary(Uuid::from_sdp_short_uuid(BATTERY_SERVICE)).with_characteristic(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_saturates_at_zero() {
        let mut battery = DrainingBattery::new(3, 2, true);
        assert_eq!(battery.sample().unwrap(), 1);
        assert_eq!(battery.sample().unwrap(), 0);
        assert_eq!(battery.sample().unwrap(), 0);

        let mut idle = DrainingBattery::new(100, 2, false);
        assert_eq!(idle.sample().unwrap(), 100);
    }

    #[test]
    fn power_supply_reads_capacity() {
        let path = std::env::temp_dir().join(format!("ble_hid_capacity_{}", std::process::id()));
        fs::write(&path, "87\n").unwrap();
        let mut battery = PowerSupplyBattery::new(&path);
        assert_eq!(battery.sample().unwrap(), 87);

        fs::write(&path, "full").unwrap();
        assert_eq!(battery.sample().unwrap_err().error_type, ErrorType::Sensor);
        fs::remove_file(&path).unwrap();

        assert_eq!(battery.sample().unwrap_err().error_type, ErrorType::Io);
    }
}

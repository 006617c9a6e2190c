//! HID over GATT service (0x1812) shared by the HID profiles.
//!
//! Characteristic order: HID Information, Report Map, HID Control Point,
//! one Report per input report (each with a Report Reference descriptor),
//! Protocol Mode.

use std::time::Duration;

use log::{debug, info};
use uuid::Uuid;

use crate::config::LengthPolicy;
use crate::gatt::characteristic::PeriodicProducer;
use crate::gatt::{
    AttributeFlag, AttributeHandler, Characteristic, CharacteristicId, Descriptor, Flags,
    GattError, GattResult, GattServer, Producer, RequestOptions, Service, ValueLength,
};
use crate::hid::{
    HidInformation, ProtocolMode, ReportReference, HID_CONTROL_POINT, HID_INFORMATION,
    HID_SERVICE, PROTOCOL_MODE, REPORT, REPORT_MAP, REPORT_REFERENCE,
};
use crate::SdpShortUuid;

/// Accepts Boot (0) and Report (1) only.
#[derive(Debug, Default)]
pub struct ProtocolModeHandler;

impl AttributeHandler for ProtocolModeHandler {
    fn write(&mut self, value: Vec<u8>, _options: &RequestOptions) -> GattResult<Vec<u8>> {
        let Some(&first) = value.first() else {
            return Err(GattError::InvalidArguments("empty protocol mode".to_string()));
        };
        let mode = ProtocolMode::try_from(first)
            .map_err(|mode| GattError::InvalidArguments(format!("protocol mode {mode}")))?;
        info!("protocol mode set to {:?}", mode);
        Ok(value)
    }
}

#[derive(Debug, Default)]
pub struct ControlPointHandler;

impl AttributeHandler for ControlPointHandler {
    fn write(&mut self, value: Vec<u8>, _options: &RequestOptions) -> GattResult<Vec<u8>> {
        match value.first() {
            Some(0) => debug!("HID control point: suspend"),
            Some(1) => debug!("HID control point: exit suspend"),
            other => debug!("HID control point: {:?}", other),
        }
        Ok(value)
    }
}

/// Producer that sends `press` immediately followed by `release`.
pub fn pulse(press: Vec<u8>, release: Vec<u8>) -> impl Producer {
    move |server: &mut GattServer, report: CharacteristicId| -> GattResult<()> {
        server.update_value(report, press.clone())?;
        server.update_value(report, release.clone())?;
        Ok(())
    }
}

struct InputReport {
    report_id: u8,
    initial: Vec<u8>,
    producer: Option<(Duration, Box<dyn Producer>)>,
}

pub struct HidServiceBuilder {
    information: HidInformation,
    report_map: Vec<u8>,
    policy: LengthPolicy,
    reports: Vec<InputReport>,
}

impl HidServiceBuilder {
    pub fn new(information: HidInformation, report_map: &[u8], policy: LengthPolicy) -> Self {
        HidServiceBuilder {
            information,
            report_map: report_map.to_vec(),
            policy,
            reports: Vec::new(),
        }
    }

    pub fn input_report(mut self, report_id: u8, initial: Vec<u8>) -> Self {
        self.reports.push(InputReport {
            report_id,
            initial,
            producer: None,
        });
        self
    }

    /// Input report whose value is pushed by `producer` every `period`.
    pub fn producing_report(
        mut self,
        report_id: u8,
        initial: Vec<u8>,
        period: Duration,
        producer: impl Producer + 'static,
    ) -> Self {
        self.reports.push(InputReport {
            report_id,
            initial,
            producer: Some((period, Box::new(producer))),
        });
        self
    }

    fn single_byte(&self) -> ValueLength {
        match self.policy {
            LengthPolicy::Strict => ValueLength::Exact(1),
            LengthPolicy::Lenient => ValueLength::Any,
        }
    }

    pub fn build(self) -> Service {
        let single_byte = self.single_byte();
        let mut service = Service::primary(Uuid::from_sdp_short_uuid(HID_SERVICE))
            .with_characteristic(Characteristic::new(
                Uuid::from_sdp_short_uuid(HID_INFORMATION),
                Flags::new(&[AttributeFlag::Read]),
                self.information.to_bytes().to_vec(),
                vec![],
            ))
            .with_characteristic(Characteristic::new(
                Uuid::from_sdp_short_uuid(REPORT_MAP),
                Flags::new(&[AttributeFlag::Read]),
                self.report_map,
                vec![],
            ))
            .with_characteristic(
                Characteristic::new(
                    Uuid::from_sdp_short_uuid(HID_CONTROL_POINT),
                    Flags::new(&[AttributeFlag::WriteWithoutResponse]),
                    vec![0],
                    vec![],
                )
                .with_length(single_byte)
                .with_handler(ControlPointHandler),
            );

        for report in self.reports {
            let reference = Descriptor::new(
                Uuid::from_sdp_short_uuid(REPORT_REFERENCE),
                Flags::new(&[AttributeFlag::Read]),
                ReportReference::input(report.report_id).to_bytes().to_vec(),
            );
            let mut characteristic = Characteristic::new(
                Uuid::from_sdp_short_uuid(REPORT),
                Flags::new(&[AttributeFlag::SecureRead, AttributeFlag::Notify]),
                report.initial,
                vec![reference],
            );
            characteristic.producer = report
                .producer
                .map(|(period, producer)| PeriodicProducer { period, producer });
            service = service.with_characteristic(characteristic);
        }

        service.with_characteristic(
            Characteristic::new(
                Uuid::from_sdp_short_uuid(PROTOCOL_MODE),
                Flags::new(&[AttributeFlag::Read, AttributeFlag::WriteWithoutResponse]),
                vec![ProtocolMode::Report as u8],
                vec![],
            )
            .with_length(single_byte)
            .with_handler(ProtocolModeHandler),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::report_map::RELATIVE_MOUSE;

    #[test]
    fn characteristic_order() {
        let service = HidServiceBuilder::new(
            HidInformation::new(0x0101),
            RELATIVE_MOUSE,
            LengthPolicy::Strict,
        )
        .input_report(1, vec![0; 4])
        .input_report(2, vec![0; 2])
        .build();
        let uuids: Vec<Uuid> = service.characteristics.iter().map(|c| c.uuid).collect();
        let expected: Vec<Uuid> = [
            HID_INFORMATION,
            REPORT_MAP,
            HID_CONTROL_POINT,
            REPORT,
            REPORT,
            PROTOCOL_MODE,
        ]
        .into_iter()
        .map(|short| Uuid::from_sdp_short_uuid(short))
        .collect();
        assert_eq!(uuids, expected);
        assert_eq!(service.characteristics[4].descriptors[0].value, vec![2, 1]);
        assert_eq!(service.characteristics[5].length, ValueLength::Exact(1));
    }

    #[test]
    fn protocol_mode_rejects_unknown_modes() {
        let mut handler = ProtocolModeHandler;
        let options = RequestOptions::default();
        assert_eq!(handler.write(vec![0], &options), Ok(vec![0]));
        assert!(matches!(
            handler.write(vec![2], &options),
            Err(GattError::InvalidArguments(_))
        ));
        assert!(handler.write(vec![], &options).is_err());
    }
}

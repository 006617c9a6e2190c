//! Absolute pointer driven by hand gestures.
//!
//! The sensor worker posts the newest [`GestureSample`] to a mailbox; every
//! report period the producer takes it and sends a press report followed by
//! a release report. A click therefore shows up as a single button pulse.

use std::time::Duration;

use log::trace;

use crate::config::Config;
use crate::gatt::{CharacteristicId, GattResult, GattServer, Producer, Service};
use crate::hid::{report_map::GESTURE_POINTER, HidInformation, PointerReport};
use crate::sensor::{GestureSample, Mailbox};

use super::hid::HidServiceBuilder;

pub const REPORT_ID: u8 = 1;

pub struct GestureProducer {
    mailbox: Mailbox<GestureSample>,
}

impl GestureProducer {
    pub fn new(mailbox: Mailbox<GestureSample>) -> Self {
        GestureProducer { mailbox }
    }
}

impl Producer for GestureProducer {
    fn produce(&mut self, server: &mut GattServer, report: CharacteristicId) -> GattResult<()> {
        let Some(sample) = self.mailbox.take() else {
            return Ok(());
        };
        trace!("gesture sample {:?}", sample);
        server.update_value(report, sample.press().to_bytes())?;
        server.update_value(report, sample.release().to_bytes())?;
        Ok(())
    }
}

pub fn service(config: &Config, mailbox: Mailbox<GestureSample>) -> Service {
    HidServiceBuilder::new(HidInformation::new(0x0101), GESTURE_POINTER, config.length_policy)
        .producing_report(
            REPORT_ID,
            PointerReport::default().to_bytes(),
            Duration::from_millis(config.gesture.report_period_ms),
            GestureProducer::new(mailbox),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use uuid::Uuid;

    use crate::gatt::{AttributeTree, NotificationSink, ObjectPath, PropertyMap};
    use crate::hid::REPORT;
    use crate::SdpShortUuid;

    #[derive(Clone, Default)]
    struct Values(Rc<RefCell<Vec<Vec<u8>>>>);

    impl NotificationSink for Values {
        fn properties_changed(
            &mut self,
            _path: &ObjectPath,
            _interface: &str,
            changed: &PropertyMap,
            _invalidated: &[String],
        ) {
            let value = changed["Value"].as_bytes().unwrap().to_vec();
            self.0.borrow_mut().push(value);
        }
    }

    #[test]
    fn click_is_press_then_release() {
        let mailbox = Mailbox::new();
        let mut tree = AttributeTree::new(ObjectPath::new("/test").unwrap());
        let service_id = tree.add_service(service(&Config::default(), mailbox.clone())).unwrap();
        let mut producers = tree.take_producers();
        assert_eq!(producers.len(), 1);
        let (report, mut periodic) = producers.remove(0);
        assert_eq!(
            tree.find_characteristic(service_id, Uuid::from_sdp_short_uuid(REPORT)),
            Some(report)
        );

        let values = Values::default();
        let mut server = GattServer::new(tree, values.clone());
        server.start_notify(report).unwrap();

        assert!(server.run_producer(report, periodic.producer.as_mut()));
        assert!(values.0.borrow().is_empty());

        mailbox.post(GestureSample { x: 0x40, y: 0x20, click: true });
        server.run_producer(report, periodic.producer.as_mut());
        assert_eq!(
            *values.0.borrow(),
            vec![
                vec![0x01, 0x00, 0x40, 0x00, 0x20],
                vec![0x00, 0x00, 0x40, 0x00, 0x20],
            ]
        );
    }
}

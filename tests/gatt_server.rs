use std::cell::RefCell;
use std::rc::Rc;

use ble_hid_peripheral::config::{BatteryConfig, Config, LengthPolicy, Profile};
use ble_hid_peripheral::gatt::{
    AttributeFlag, AttributeId, AttributeTree, Characteristic, CharacteristicId, Descriptor,
    Flags, GattError, GattServer, NotificationSink, ObjectPath, PropertyMap, PropertyValue,
    RequestOptions, Service, ValueLength, CHARACTERISTIC_INTERFACE, DESCRIPTOR_INTERFACE,
    SERVICE_INTERFACE,
};
use ble_hid_peripheral::hid::report_map::{GESTURE_POINTER, RELATIVE_MOUSE};
use ble_hid_peripheral::hid::{MouseReport, PointerReport, ReportDescriptor, ReportKind};
use ble_hid_peripheral::scheduler::Scheduler;
use ble_hid_peripheral::services::{self, battery};
use ble_hid_peripheral::SdpShortUuid;
use uuid::Uuid;

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<(String, Vec<u8>)>>>);

impl Recorder {
    fn len(&self) -> usize {
        self.0.borrow().len()
    }

    fn values(&self) -> Vec<Vec<u8>> {
        self.0.borrow().iter().map(|(_, value)| value.clone()).collect()
    }
}

impl NotificationSink for Recorder {
    fn properties_changed(
        &mut self,
        path: &ObjectPath,
        interface: &str,
        changed: &PropertyMap,
        _invalidated: &[String],
    ) {
        assert_eq!(interface, CHARACTERISTIC_INTERFACE);
        let value = changed["Value"].as_bytes().unwrap().to_vec();
        self.0.borrow_mut().push((path.to_string(), value));
    }
}

fn base() -> ObjectPath {
    ObjectPath::new("/org/bluez/example").unwrap()
}

fn characteristic(server: &GattServer, path: &str) -> CharacteristicId {
    match server.resolve(&ObjectPath::new(path).unwrap()).unwrap() {
        AttributeId::Characteristic(id) => id,
        other => panic!("{other:?} is not a characteristic"),
    }
}

#[test]
fn managed_objects_lists_every_attribute_in_order() {
    let mut tree = AttributeTree::new(base());
    tree.add_service(
        Service::primary(Uuid::from_sdp_short_uuid(0x180f_u16))
            .with_characteristic(Characteristic::new(
                Uuid::from_sdp_short_uuid(0x2a19_u16),
                Flags::new(&[AttributeFlag::Read, AttributeFlag::Notify]),
                vec![100],
                vec![],
            ))
            .with_characteristic(Characteristic::new(
                Uuid::from_sdp_short_uuid(0x2a4e_u16),
                Flags::new(&[AttributeFlag::Read]),
                vec![1],
                vec![Descriptor::new(
                    Uuid::from_sdp_short_uuid(0x2908_u16),
                    Flags::new(&[AttributeFlag::Read]),
                    vec![1, 1],
                )],
            )),
    )
    .unwrap();
    let server = GattServer::new(tree, Recorder::default());

    let objects = server.get_managed_objects();
    let paths: Vec<String> = objects.paths().map(ToString::to_string).collect();
    assert_eq!(
        paths,
        vec![
            "/org/bluez/example/service0",
            "/org/bluez/example/service0/char0",
            "/org/bluez/example/service0/char1",
            "/org/bluez/example/service0/char1/desc0",
        ]
    );

    let service = &objects
        .get(&ObjectPath::new("/org/bluez/example/service0").unwrap())
        .unwrap()[SERVICE_INTERFACE];
    assert_eq!(service["Primary"], PropertyValue::Bool(true));
    let descriptor = &objects
        .get(&ObjectPath::new("/org/bluez/example/service0/char1/desc0").unwrap())
        .unwrap()[DESCRIPTOR_INTERFACE];
    assert_eq!(
        descriptor["Characteristic"],
        PropertyValue::ObjectPath(ObjectPath::new("/org/bluez/example/service0/char1").unwrap())
    );
}

#[test]
fn battery_drains_on_every_tick() {
    let config = BatteryConfig::default();
    let mut tree = AttributeTree::new(base());
    tree.add_service(battery::service(&config)).unwrap();
    let producers = tree.take_producers();
    let recorder = Recorder::default();
    let mut server = GattServer::new(tree, recorder.clone());
    let level = characteristic(&server, "/org/bluez/example/service0/char0");

    let mut scheduler: Scheduler<GattServer> = Scheduler::new();
    for (id, mut periodic) in producers {
        scheduler.schedule_periodic(periodic.period, move |server: &mut GattServer| {
            server.run_producer(id, periodic.producer.as_mut());
        });
    }

    // Subscribing pushes the current level right away.
    server.start_notify(level).unwrap();
    assert_eq!(recorder.values(), vec![vec![100]]);

    let period = config.period();
    for tick in 1..=3 {
        assert_eq!(scheduler.fire_due(period * tick, &mut server), 1);
    }
    assert_eq!(server.value(level), Some(&[94][..]));
    assert_eq!(recorder.values(), vec![vec![100], vec![98], vec![96], vec![94]]);

    for tick in 4..=60 {
        scheduler.fire_due(period * tick, &mut server);
    }
    assert_eq!(server.value(level), Some(&[0][..]));
}

#[test]
fn idle_characteristic_sends_nothing() {
    let config = Config {
        profile: Profile::RelativeMouse,
        ..Config::default()
    };
    let mut assembly = services::assemble(&config, None).unwrap();
    let producers = assembly.tree.take_producers();
    let recorder = Recorder::default();
    let mut server = GattServer::new(assembly.tree, recorder.clone());

    for (id, mut periodic) in producers {
        for _ in 0..5 {
            assert!(!server.run_producer(id, periodic.producer.as_mut()));
        }
    }
    assert_eq!(recorder.len(), 0);

    let report = characteristic(&server, "/org/bluez/example/service2/char3");
    let mut changed = PropertyMap::new();
    changed.insert("Value".into(), PropertyValue::Bytes(vec![1]));
    assert!(!server.notify_properties_changed(report, CHARACTERISTIC_INTERFACE, &changed, &[]));
    assert_eq!(recorder.len(), 0);
}

#[test]
fn protocol_mode_length_policy() {
    let options = RequestOptions::default();
    for (policy, accepted) in [(LengthPolicy::Strict, false), (LengthPolicy::Lenient, true)] {
        let config = Config {
            profile: Profile::Keyboard,
            length_policy: policy,
            ..Config::default()
        };
        let assembly = services::assemble(&config, None).unwrap();
        let mut server = GattServer::new(assembly.tree, Recorder::default());
        let protocol_mode = characteristic(&server, "/org/bluez/example/service2/char5");

        let result = server.write_value(protocol_mode, vec![0, 0], &options);
        if accepted {
            assert_eq!(result, Ok(()));
        } else {
            assert_eq!(
                result,
                Err(GattError::InvalidValueLength {
                    expected: ValueLength::Exact(1),
                    actual: 2,
                })
            );
        }
        server.write_value(protocol_mode, vec![0], &options).unwrap();
        assert_eq!(server.read_value(protocol_mode, &options), Ok(vec![0]));
    }
}

#[test]
fn mouse_report_matches_report_map() {
    let descriptor = ReportDescriptor::parse(RELATIVE_MOUSE).unwrap();
    let layout = descriptor.report(1, ReportKind::Input).unwrap();
    let report = MouseReport {
        buttons: 0b101,
        x: -5,
        y: 10,
        wheel: 0,
    };
    let bytes = report.to_bytes();
    assert_eq!(bytes.len(), layout.byte_len());
    assert_eq!(layout.values(&bytes), Some(vec![1, 0, 1, -5, 10, 0]));
    assert_eq!(MouseReport::from_bytes(&bytes), Some(report));
}

#[test]
fn pointer_report_matches_report_map() {
    let descriptor = ReportDescriptor::parse(GESTURE_POINTER).unwrap();
    let layout = descriptor.report(1, ReportKind::Input).unwrap();
    let report = PointerReport::from_gesture(0x7f, 0x01, true);
    let bytes = report.to_bytes();
    assert_eq!(bytes.len(), layout.byte_len());
    assert_eq!(layout.values(&bytes), Some(vec![1, 0, 0, 0x7f00, 0x0100]));
}

#[test]
fn reads_honour_offsets() {
    let config = Config {
        profile: Profile::Test,
        ..Config::default()
    };
    let assembly = services::assemble(&config, None).unwrap();
    let mut server = GattServer::new(assembly.tree, Recorder::default());
    let model = characteristic(&server, "/org/bluez/example/service1/char0");

    assert_eq!(
        server.read_value(model, &RequestOptions::with_offset(5)),
        Ok(b"Remotes".to_vec())
    );
    assert!(matches!(
        server.read_value(model, &RequestOptions::with_offset(200)),
        Err(GattError::InvalidArguments(_))
    ));
    assert_eq!(
        server.write_value(model, vec![1], &RequestOptions::default()),
        Err(GattError::NotPermitted)
    );
}

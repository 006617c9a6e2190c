//! Test service exercising read/write permissions, auxiliary descriptors
//! and a notifying counter.

use std::time::Duration;

use log::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::gatt::{
    AttributeFlag, Characteristic, CharacteristicId, Descriptor, Flags, GattResult, GattServer,
    Service,
};
use crate::SdpShortUuid;

pub const TEST_SERVICE: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef0);
pub const TEST_CHARACTERISTIC: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef1);
pub const TEST_DESCRIPTOR: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef2);
pub const TEST_ENCRYPT_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef3);
pub const TEST_ENCRYPT_DESCRIPTOR: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef4);
pub const TEST_SECURE_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef5);
pub const TEST_SECURE_DESCRIPTOR: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef6);
pub const TEST_NOTIFY_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef7);

pub const USER_DESCRIPTION: u16 = 0x2901;

fn user_description(text: &str, flags: &[AttributeFlag]) -> Descriptor {
    Descriptor::new(
        Uuid::from_sdp_short_uuid(USER_DESCRIPTION),
        Flags::new(flags),
        text.as_bytes().to_vec(),
    )
}

fn counter() -> impl FnMut(&mut GattServer, CharacteristicId) -> GattResult<()> {
    let mut count: u8 = 1;
    move |server: &mut GattServer, characteristic: CharacteristicId| {
        count = count.wrapping_add(1);
        debug!("test counter {}", count);
        server.update_value(characteristic, vec![count])?;
        Ok(())
    }
}

pub fn service(config: &Config) -> Service {
    let read_write = [AttributeFlag::Read, AttributeFlag::Write];

    let plain = Characteristic::new(
        TEST_CHARACTERISTIC,
        Flags::new(&[
            AttributeFlag::Read,
            AttributeFlag::Write,
            AttributeFlag::WritableAuxiliaries,
        ]),
        Vec::new(),
        vec![
            Descriptor::new(TEST_DESCRIPTOR, Flags::new(&read_write), b"Test".to_vec()),
            user_description("This is a characteristic for testing", &read_write),
        ],
    );

    let encrypted = Characteristic::new(
        TEST_ENCRYPT_CHARACTERISTIC,
        Flags::new(&[AttributeFlag::EncryptRead, AttributeFlag::EncryptWrite]),
        Vec::new(),
        vec![Descriptor::new(
            TEST_ENCRYPT_DESCRIPTOR,
            Flags::new(&[AttributeFlag::EncryptRead, AttributeFlag::EncryptWrite]),
            b"Test".to_vec(),
        )],
    );

    let secure = Characteristic::new(
        TEST_SECURE_CHARACTERISTIC,
        Flags::new(&[AttributeFlag::SecureRead, AttributeFlag::SecureWrite]),
        Vec::new(),
        vec![Descriptor::new(
            TEST_SECURE_DESCRIPTOR,
            Flags::new(&[AttributeFlag::SecureRead, AttributeFlag::SecureWrite]),
            b"Test".to_vec(),
        )],
    );

    let notifying = Characteristic::new(
        TEST_NOTIFY_CHARACTERISTIC,
        Flags::new(&[AttributeFlag::Read, AttributeFlag::Notify]),
        vec![1],
        vec![user_description("Test", &read_write)],
    )
    .with_producer(Duration::from_millis(config.pulses.test_counter_ms), counter());

    Service::primary(TEST_SERVICE)
        .with_characteristic(plain)
        .with_characteristic(encrypted)
        .with_characteristic(secure)
        .with_characteristic(notifying)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatt::{AttributeTree, GattError, LogSink, ObjectPath, RequestOptions};

    fn server() -> GattServer {
        let mut tree = AttributeTree::new(ObjectPath::new("/org/bluez/example").unwrap());
        tree.add_service(service(&Config::default())).unwrap();
        GattServer::new(tree, LogSink)
    }

    fn path(server: &GattServer, path: &str) -> crate::gatt::AttributeId {
        server.resolve(&ObjectPath::new(path).unwrap()).unwrap()
    }

    #[test]
    fn user_description_is_writable_with_auxiliaries() {
        let mut server = server();
        let cud = path(&server, "/org/bluez/example/service0/char0/desc1");
        let options = RequestOptions::default();
        server.write_value(cud, b"renamed".to_vec(), &options).unwrap();
        assert_eq!(server.read_value(cud, &options).unwrap(), b"renamed".to_vec());

        let counter_cud = path(&server, "/org/bluez/example/service0/char3/desc0");
        assert_eq!(
            server.write_value(counter_cud, b"x".to_vec(), &options),
            Err(GattError::NotPermitted)
        );
    }

    #[test]
    fn counter_increments_while_notifying() {
        let mut server = server();
        let mut producers = server.tree_mut().take_producers();
        let (id, mut periodic) = producers.remove(0);
        assert!(!server.run_producer(id, periodic.producer.as_mut()));
        assert_eq!(server.value(id), Some(&[1][..]));

        server.start_notify(id).unwrap();
        server.run_producer(id, periodic.producer.as_mut());
        server.run_producer(id, periodic.producer.as_mut());
        assert_eq!(server.value(id), Some(&[3][..]));
    }
}

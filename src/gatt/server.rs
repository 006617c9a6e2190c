//! Read/write/notify dispatch over an [`AttributeTree`].

use log::{debug, info, warn};

use crate::short_uuid;

use super::{
    flags::AttributeFlag,
    notification::NotificationSink,
    object_path::ObjectPath,
    property_map::{self, InterfaceMap, ManagedObjects, PropertyMap, PropertyValue},
    tree::{AttributeId, AttributeTree, CharacteristicId},
    GattError, GattResult, CHARACTERISTIC_INTERFACE,
};

const USER_DESCRIPTION: u16 = 0x2901;

/// Per-attribute behaviour. The defaults serve and replace the stored value.
pub trait AttributeHandler {
    /// Full value for a read; the server applies the offset afterwards.
    fn read(&mut self, value: &[u8], _options: &RequestOptions) -> GattResult<Vec<u8>> {
        Ok(value.to_vec())
    }

    /// Validates a write and returns the value to store.
    fn write(&mut self, value: Vec<u8>, _options: &RequestOptions) -> GattResult<Vec<u8>> {
        Ok(value)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl AttributeHandler for DefaultHandler {}

/// Pulls a sample, encodes it and pushes it through the notify primitive.
pub trait Producer {
    fn produce(
        &mut self,
        server: &mut GattServer,
        characteristic: CharacteristicId,
    ) -> GattResult<()>;
}

impl<F> Producer for F
where
    F: FnMut(&mut GattServer, CharacteristicId) -> GattResult<()>,
{
    fn produce(
        &mut self,
        server: &mut GattServer,
        characteristic: CharacteristicId,
    ) -> GattResult<()> {
        self(server, characteristic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteType {
    Command,
    Request,
    Reliable,
}

impl WriteType {
    fn parse(value: &str) -> GattResult<Self> {
        match value {
            "command" => Ok(WriteType::Command),
            "request" => Ok(WriteType::Request),
            "reliable" => Ok(WriteType::Reliable),
            other => Err(GattError::InvalidArguments(format!("write type {other:?}"))),
        }
    }
}

/// Options dictionary passed with ReadValue and WriteValue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub offset: u16,
    pub mtu: Option<u16>,
    pub device: Option<ObjectPath>,
    pub link: Option<String>,
    pub write_type: Option<WriteType>,
    pub prepare_authorize: bool,
}

impl RequestOptions {
    pub fn with_offset(offset: u16) -> Self {
        RequestOptions {
            offset,
            ..Default::default()
        }
    }

    pub fn from_map(map: &PropertyMap) -> GattResult<Self> {
        let mut options = RequestOptions::default();
        for (key, value) in map {
            match key.as_str() {
                "offset" => options.offset = expect(key, value.as_u16())?,
                "mtu" => options.mtu = Some(expect(key, value.as_u16())?),
                "device" => {
                    let path = expect(key, value.as_str())?;
                    options.device = Some(
                        ObjectPath::new(path)
                            .map_err(|err| GattError::InvalidArguments(err.description))?,
                    );
                }
                "link" => options.link = Some(expect(key, value.as_str())?.to_string()),
                "type" => {
                    options.write_type = Some(WriteType::parse(expect(key, value.as_str())?)?)
                }
                "prepare-authorize" => options.prepare_authorize = expect(key, value.as_bool())?,
                other => debug!("ignoring unknown option {other:?}"),
            }
        }
        Ok(options)
    }
}

fn expect<T>(key: &str, value: Option<T>) -> GattResult<T> {
    value.ok_or_else(|| GattError::InvalidArguments(format!("option {key:?} has the wrong type")))
}

/// Owns the attribute tree and the notification sink.
pub struct GattServer {
    tree: AttributeTree,
    sink: Box<dyn NotificationSink>,
}

impl GattServer {
    pub fn new(tree: AttributeTree, sink: impl NotificationSink + 'static) -> Self {
        GattServer {
            tree,
            sink: Box::new(sink),
        }
    }

    pub fn tree(&self) -> &AttributeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut AttributeTree {
        &mut self.tree
    }

    pub fn resolve(&self, path: &ObjectPath) -> GattResult<AttributeId> {
        self.tree
            .resolve(path)
            .ok_or_else(|| GattError::InvalidArguments(format!("unknown object {path}")))
    }

    pub fn read_value(
        &mut self,
        id: impl Into<AttributeId>,
        options: &RequestOptions,
    ) -> GattResult<Vec<u8>> {
        let value = match id.into() {
            AttributeId::Service(_) => return Err(GattError::NotPermitted),
            AttributeId::Characteristic(id) => {
                let node = self.tree.characteristic_mut(id).ok_or_else(unknown)?;
                if !node.flags.allows_read() {
                    return Err(GattError::NotPermitted);
                }
                debug!("ReadValue {} offset={}", node.path, options.offset);
                node.handler.read(&node.value, options)?
            }
            AttributeId::Descriptor(id) => {
                let (node, _) = self.tree.descriptor_with_parent_mut(id).ok_or_else(unknown)?;
                if !node.flags.allows_read() {
                    return Err(GattError::NotPermitted);
                }
                debug!("ReadValue {} offset={}", node.path, options.offset);
                node.handler.read(&node.value, options)?
            }
        };
        let offset = usize::from(options.offset);
        if offset > value.len() {
            return Err(GattError::InvalidArguments(format!(
                "offset {offset} beyond value of {} bytes",
                value.len()
            )));
        }
        Ok(value[offset..].to_vec())
    }

    /// The payload replaces the stored value from `options.offset` on.
    pub fn write_value(
        &mut self,
        id: impl Into<AttributeId>,
        value: Vec<u8>,
        options: &RequestOptions,
    ) -> GattResult<()> {
        match id.into() {
            AttributeId::Service(_) => Err(GattError::NotPermitted),
            AttributeId::Characteristic(id) => {
                let node = self.tree.characteristic_mut(id).ok_or_else(unknown)?;
                if !node.flags.allows_write() {
                    return Err(GattError::NotPermitted);
                }
                debug!("WriteValue {} {:02x?}", node.path, value);
                let spliced = splice(&node.value, value, options.offset)?;
                node.length.check(spliced.len())?;
                node.value = node.handler.write(spliced, options)?;
                Ok(())
            }
            AttributeId::Descriptor(id) => {
                let (node, parent) = self.tree.descriptor_with_parent_mut(id).ok_or_else(unknown)?;
                if !node.flags.allows_write() {
                    return Err(GattError::NotPermitted);
                }
                if short_uuid(&node.uuid) == Some(USER_DESCRIPTION)
                    && !parent.flags.contains(AttributeFlag::WritableAuxiliaries)
                {
                    return Err(GattError::NotPermitted);
                }
                debug!("WriteValue {} {:02x?}", node.path, value);
                let spliced = splice(&node.value, value, options.offset)?;
                node.length.check(spliced.len())?;
                node.value = node.handler.write(spliced, options)?;
                Ok(())
            }
        }
    }

    pub fn start_notify(&mut self, id: impl Into<AttributeId>) -> GattResult<()> {
        let id = characteristic_id(id.into())?;
        let node = self.tree.characteristic_mut(id).ok_or_else(unknown)?;
        if !node.flags.allows_notify() {
            return Err(GattError::NotPermitted);
        }
        if node.notifying {
            debug!("{}: already notifying, nothing to do", node.path);
            return Ok(());
        }
        node.notifying = true;
        info!("{}: notifications on", node.path);
        if node.notify_on_subscribe {
            self.notify_value(id);
        }
        Ok(())
    }

    pub fn stop_notify(&mut self, id: impl Into<AttributeId>) -> GattResult<()> {
        let id = characteristic_id(id.into())?;
        let node = self.tree.characteristic_mut(id).ok_or_else(unknown)?;
        if !node.flags.allows_notify() {
            return Err(GattError::NotPermitted);
        }
        if !node.notifying {
            debug!("{}: not notifying, nothing to do", node.path);
            return Ok(());
        }
        node.notifying = false;
        info!("{}: notifications off", node.path);
        Ok(())
    }

    pub fn is_notifying(&self, id: CharacteristicId) -> bool {
        self.tree
            .characteristic(id)
            .map(|node| node.notifying)
            .unwrap_or(false)
    }

    /// Emits `PropertiesChanged`. Returns whether a signal went out; nothing is
    /// sent while the characteristic is not notifying.
    pub fn notify_properties_changed(
        &mut self,
        id: CharacteristicId,
        interface: &str,
        changed: &PropertyMap,
        invalidated: &[String],
    ) -> bool {
        let Some(node) = self.tree.characteristic(id) else {
            return false;
        };
        if !node.notifying {
            return false;
        }
        self.sink
            .properties_changed(&node.path, interface, changed, invalidated);
        true
    }

    /// Emits the current value as a `Value` change.
    pub fn notify_value(&mut self, id: CharacteristicId) -> bool {
        let Some(node) = self.tree.characteristic(id) else {
            return false;
        };
        let mut changed = PropertyMap::new();
        changed.insert("Value".into(), PropertyValue::Bytes(node.value.clone()));
        self.notify_properties_changed(id, CHARACTERISTIC_INTERFACE, &changed, &[])
    }

    pub fn value(&self, id: CharacteristicId) -> Option<&[u8]> {
        self.tree.characteristic(id).map(|node| node.value.as_slice())
    }

    /// Replaces the stored value without any permission checks.
    pub fn set_value(&mut self, id: CharacteristicId, value: Vec<u8>) -> GattResult<()> {
        let node = self.tree.characteristic_mut(id).ok_or_else(unknown)?;
        node.value = value;
        Ok(())
    }

    /// `set_value` followed by `notify_value`.
    pub fn update_value(&mut self, id: CharacteristicId, value: Vec<u8>) -> GattResult<bool> {
        self.set_value(id, value)?;
        Ok(self.notify_value(id))
    }

    pub fn properties(&self, id: impl Into<AttributeId>) -> Option<InterfaceMap> {
        property_map::properties(&self.tree, id.into())
    }

    pub fn get_managed_objects(&self) -> ManagedObjects {
        property_map::managed_objects(&self.tree)
    }

    /// Switches every notification off. Returns how many were on.
    pub fn disconnect(&mut self) -> usize {
        let ids: Vec<CharacteristicId> = self.tree.characteristic_ids().collect();
        let mut stopped = 0;
        for id in ids {
            if let Some(node) = self.tree.characteristic_mut(id) {
                if node.notifying {
                    node.notifying = false;
                    stopped += 1;
                }
            }
        }
        info!("disconnected, stopped {} notification(s)", stopped);
        stopped
    }

    /// Runs one producer tick. Idle characteristics are skipped and failures
    /// are logged so the timer keeps running.
    pub fn run_producer(&mut self, id: CharacteristicId, producer: &mut dyn Producer) -> bool {
        if !self.is_notifying(id) {
            return false;
        }
        if let Err(err) = producer.produce(self, id) {
            let path = self
                .tree
                .path_of(id.into())
                .map(ToString::to_string)
                .unwrap_or_default();
            warn!("producer for {} failed: {}", path, err);
        }
        true
    }
}

fn characteristic_id(id: AttributeId) -> GattResult<CharacteristicId> {
    match id {
        AttributeId::Characteristic(id) => Ok(id),
        _ => Err(GattError::NotPermitted),
    }
}

fn unknown() -> GattError {
    GattError::InvalidArguments("unknown attribute".to_string())
}

fn splice(current: &[u8], value: Vec<u8>, offset: u16) -> GattResult<Vec<u8>> {
    let offset = usize::from(offset);
    if offset == 0 {
        return Ok(value);
    }
    if offset > current.len() {
        return Err(GattError::InvalidArguments(format!(
            "offset {offset} beyond value of {} bytes",
            current.len()
        )));
    }
    let mut spliced = current[..offset].to_vec();
    spliced.extend(value);
    Ok(spliced)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use uuid::Uuid;

    use super::*;
    use crate::gatt::{Characteristic, Descriptor, Flags, Service, ValueLength};
    use crate::SdpShortUuid;

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<(String, Vec<u8>)>>>);

    impl NotificationSink for Recorder {
        fn properties_changed(
            &mut self,
            path: &ObjectPath,
            _interface: &str,
            changed: &PropertyMap,
            _invalidated: &[String],
        ) {
            let value = changed["Value"].as_bytes().unwrap().to_vec();
            self.0.borrow_mut().push((path.to_string(), value));
        }
    }

    fn flags(list: &[AttributeFlag]) -> Flags {
        Flags::new(list)
    }

    fn server() -> (GattServer, Recorder) {
        let mut tree = AttributeTree::new(ObjectPath::new("/test").unwrap());
        tree.add_service(
            Service::primary(Uuid::from_sdp_short_uuid(0x1234_u16))
                .with_characteristic(
                    Characteristic::new(
                        Uuid::from_sdp_short_uuid(0x2a19_u16),
                        flags(&[AttributeFlag::Read, AttributeFlag::Notify]),
                        vec![100],
                        vec![],
                    )
                    .notify_on_subscribe(),
                )
                .with_characteristic(
                    Characteristic::new(
                        Uuid::from_sdp_short_uuid(0x2a4e_u16),
                        flags(&[AttributeFlag::Read, AttributeFlag::WriteWithoutResponse]),
                        vec![1],
                        vec![Descriptor::new(
                            Uuid::from_sdp_short_uuid(0x2901_u16),
                            flags(&[AttributeFlag::Read, AttributeFlag::Write]),
                            b"mode".to_vec(),
                        )],
                    )
                    .with_length(ValueLength::Exact(1)),
                )
                .with_characteristic(Characteristic::new(
                    Uuid::from_sdp_short_uuid(0x2a24_u16),
                    flags(&[
                        AttributeFlag::Read,
                        AttributeFlag::Write,
                        AttributeFlag::WritableAuxiliaries,
                    ]),
                    b"model".to_vec(),
                    vec![Descriptor::new(
                        Uuid::from_sdp_short_uuid(0x2901_u16),
                        flags(&[AttributeFlag::Read, AttributeFlag::Write]),
                        b"name".to_vec(),
                    )],
                )),
        )
        .unwrap();
        let recorder = Recorder::default();
        (GattServer::new(tree, recorder.clone()), recorder)
    }

    fn id(server: &GattServer, path: &str) -> AttributeId {
        server.resolve(&ObjectPath::new(path).unwrap()).unwrap()
    }

    #[test]
    fn read_applies_offset() {
        let (mut server, _) = server();
        let model = id(&server, "/test/service0/char2");
        assert_eq!(
            server.read_value(model, &RequestOptions::with_offset(2)).unwrap(),
            b"del".to_vec()
        );
        assert!(matches!(
            server.read_value(model, &RequestOptions::with_offset(9)),
            Err(GattError::InvalidArguments(_))
        ));
    }

    #[test]
    fn write_permissions_and_length() {
        let (mut server, _) = server();
        let battery = id(&server, "/test/service0/char0");
        let mode = id(&server, "/test/service0/char1");
        let options = RequestOptions::default();

        assert_eq!(
            server.write_value(battery, vec![1], &options),
            Err(GattError::NotPermitted)
        );
        assert_eq!(
            server.write_value(mode, vec![0, 0], &options),
            Err(GattError::InvalidValueLength {
                expected: ValueLength::Exact(1),
                actual: 2
            })
        );
        server.write_value(mode, vec![0], &options).unwrap();
        assert_eq!(server.read_value(mode, &options).unwrap(), vec![0]);

        let service = id(&server, "/test/service0");
        assert_eq!(server.read_value(service, &options), Err(GattError::NotPermitted));
    }

    #[test]
    fn write_with_offset_splices() {
        let (mut server, _) = server();
        let model = id(&server, "/test/service0/char2");
        server
            .write_value(model, b"EL".to_vec(), &RequestOptions::with_offset(3))
            .unwrap();
        assert_eq!(
            server.read_value(model, &RequestOptions::default()).unwrap(),
            b"modEL".to_vec()
        );
    }

    #[test]
    fn user_description_needs_writable_auxiliaries() {
        let (mut server, _) = server();
        let options = RequestOptions::default();
        let locked = id(&server, "/test/service0/char1/desc0");
        let open = id(&server, "/test/service0/char2/desc0");
        assert_eq!(
            server.write_value(locked, b"x".to_vec(), &options),
            Err(GattError::NotPermitted)
        );
        server.write_value(open, b"renamed".to_vec(), &options).unwrap();
        assert_eq!(server.read_value(open, &options).unwrap(), b"renamed".to_vec());
    }

    #[test]
    fn start_notify_is_idempotent() {
        let (mut server, recorder) = server();
        let battery = id(&server, "/test/service0/char0");
        server.start_notify(battery).unwrap();
        server.start_notify(battery).unwrap();
        assert_eq!(
            *recorder.0.borrow(),
            vec![("/test/service0/char0".to_string(), vec![100])]
        );
        server.stop_notify(battery).unwrap();
        server.stop_notify(battery).unwrap();

        let AttributeId::Characteristic(battery) = battery else {
            unreachable!()
        };
        assert!(!server.is_notifying(battery));
        assert!(!server.notify_value(battery));
        assert_eq!(recorder.0.borrow().len(), 1);
    }

    #[test]
    fn notify_requires_flag() {
        let (mut server, _) = server();
        let mode = id(&server, "/test/service0/char1");
        assert_eq!(server.start_notify(mode), Err(GattError::NotPermitted));
    }

    #[test]
    fn disconnect_stops_notifications() {
        let (mut server, _) = server();
        let battery = id(&server, "/test/service0/char0");
        server.start_notify(battery).unwrap();
        assert_eq!(server.disconnect(), 1);
        assert_eq!(server.disconnect(), 0);
    }

    #[test]
    fn producer_skipped_while_idle() {
        let (mut server, recorder) = server();
        let AttributeId::Characteristic(battery) = id(&server, "/test/service0/char0") else {
            unreachable!()
        };
        let mut calls = 0;
        let mut producer = |server: &mut GattServer, id: CharacteristicId| {
            calls += 1;
            server.update_value(id, vec![50]).map(|_| ())
        };
        assert!(!server.run_producer(battery, &mut producer));
        server.start_notify(battery).unwrap();
        assert!(server.run_producer(battery, &mut producer));
        drop(producer);
        assert_eq!(calls, 1);
        assert_eq!(recorder.0.borrow().last().unwrap().1, vec![50]);
    }

    #[test]
    fn options_from_map() {
        let mut map = PropertyMap::new();
        map.insert("offset".into(), PropertyValue::U16(4));
        map.insert("type".into(), "command".into());
        map.insert("device".into(), "/org/bluez/hci0/dev_00_11".into());
        let options = RequestOptions::from_map(&map).unwrap();
        assert_eq!(options.offset, 4);
        assert_eq!(options.write_type, Some(WriteType::Command));
        assert_eq!(options.device.unwrap().as_str(), "/org/bluez/hci0/dev_00_11");

        map.insert("mtu".into(), "big".into());
        assert!(RequestOptions::from_map(&map).is_err());
    }
}

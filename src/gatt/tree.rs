//! Attribute arena. Parents are referenced by id, children are kept in
//! registration order and every node owns its object path.

use std::collections::HashMap;

use log::debug;
use uuid::Uuid;

use crate::{Error, ErrorType};

use super::{
    characteristic::{Characteristic, PeriodicProducer, ValueLength},
    descriptor::Descriptor,
    flags::Flags,
    object_path::{AttributeKind, ObjectPath},
    server::AttributeHandler,
    service::Service,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharacteristicId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeId {
    Service(ServiceId),
    Characteristic(CharacteristicId),
    Descriptor(DescriptorId),
}

impl AttributeId {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeId::Service(_) => AttributeKind::Service,
            AttributeId::Characteristic(_) => AttributeKind::Characteristic,
            AttributeId::Descriptor(_) => AttributeKind::Descriptor,
        }
    }
}

impl From<ServiceId> for AttributeId {
    fn from(id: ServiceId) -> Self {
        AttributeId::Service(id)
    }
}

impl From<CharacteristicId> for AttributeId {
    fn from(id: CharacteristicId) -> Self {
        AttributeId::Characteristic(id)
    }
}

impl From<DescriptorId> for AttributeId {
    fn from(id: DescriptorId) -> Self {
        AttributeId::Descriptor(id)
    }
}

#[derive(Debug)]
pub struct ServiceNode {
    pub path: ObjectPath,
    pub uuid: Uuid,
    pub primary: bool,
    pub characteristics: Vec<CharacteristicId>,
}

pub struct CharacteristicNode {
    pub path: ObjectPath,
    pub uuid: Uuid,
    pub flags: Flags,
    pub service: ServiceId,
    pub descriptors: Vec<DescriptorId>,
    pub value: Vec<u8>,
    pub notifying: bool,
    pub length: ValueLength,
    pub notify_on_subscribe: bool,
    pub(crate) handler: Box<dyn AttributeHandler>,
}

pub struct DescriptorNode {
    pub path: ObjectPath,
    pub uuid: Uuid,
    pub flags: Flags,
    pub characteristic: CharacteristicId,
    pub value: Vec<u8>,
    pub length: ValueLength,
    pub(crate) handler: Box<dyn AttributeHandler>,
}

/// Send-able snapshot of the tree shape, handed to platform backends.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceLayout {
    pub path: ObjectPath,
    pub uuid: Uuid,
    pub primary: bool,
    pub characteristics: Vec<CharacteristicLayout>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicLayout {
    pub path: ObjectPath,
    pub uuid: Uuid,
    pub flags: Flags,
    pub descriptors: Vec<DescriptorLayout>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorLayout {
    pub path: ObjectPath,
    pub uuid: Uuid,
    pub flags: Flags,
}

pub struct AttributeTree {
    base: ObjectPath,
    services: Vec<ServiceNode>,
    characteristics: Vec<CharacteristicNode>,
    descriptors: Vec<DescriptorNode>,
    paths: HashMap<ObjectPath, AttributeId>,
    producers: Vec<(CharacteristicId, PeriodicProducer)>,
}

impl AttributeTree {
    pub fn new(base: ObjectPath) -> Self {
        AttributeTree {
            base,
            services: Vec::new(),
            characteristics: Vec::new(),
            descriptors: Vec::new(),
            paths: HashMap::new(),
            producers: Vec::new(),
        }
    }

    pub fn base(&self) -> &ObjectPath {
        &self.base
    }

    /// Registers a service with all of its characteristics and descriptors.
    /// Nothing is registered when any descriptor is invalid.
    pub fn add_service(&mut self, service: Service) -> Result<ServiceId, Error> {
        for characteristic in &service.characteristics {
            for descriptor in &characteristic.descriptors {
                check_descriptor_flags(descriptor)?;
            }
        }

        let Service {
            uuid,
            primary,
            characteristics,
        } = service;
        let id = ServiceId(self.services.len());
        let path = self.base.child(AttributeKind::Service, id.0);
        debug!("register service {} at {}", uuid, path);
        self.paths.insert(path.clone(), id.into());
        self.services.push(ServiceNode {
            path,
            uuid,
            primary,
            characteristics: Vec::new(),
        });

        for characteristic in characteristics {
            self.register_characteristic(id, characteristic)?;
        }
        Ok(id)
    }

    pub fn register_characteristic(
        &mut self,
        service: ServiceId,
        characteristic: Characteristic,
    ) -> Result<CharacteristicId, Error> {
        for descriptor in &characteristic.descriptors {
            check_descriptor_flags(descriptor)?;
        }
        let parent = self
            .services
            .get(service.0)
            .ok_or_else(|| unknown_parent("service", service.0))?;

        let Characteristic {
            uuid,
            flags,
            value,
            descriptors,
            length,
            notify_on_subscribe,
            handler,
            producer,
        } = characteristic;
        let id = CharacteristicId(self.characteristics.len());
        let path = parent
            .path
            .child(AttributeKind::Characteristic, parent.characteristics.len());
        debug!("register characteristic {} at {}", uuid, path);

        self.paths.insert(path.clone(), id.into());
        self.services[service.0].characteristics.push(id);
        self.characteristics.push(CharacteristicNode {
            path,
            uuid,
            flags,
            service,
            descriptors: Vec::new(),
            value,
            notifying: false,
            length,
            notify_on_subscribe,
            handler,
        });
        if let Some(producer) = producer {
            self.producers.push((id, producer));
        }

        for descriptor in descriptors {
            self.register_descriptor(id, descriptor)?;
        }
        Ok(id)
    }

    pub fn register_descriptor(
        &mut self,
        characteristic: CharacteristicId,
        descriptor: Descriptor,
    ) -> Result<DescriptorId, Error> {
        check_descriptor_flags(&descriptor)?;
        let parent = self
            .characteristics
            .get(characteristic.0)
            .ok_or_else(|| unknown_parent("characteristic", characteristic.0))?;

        let Descriptor {
            uuid,
            flags,
            value,
            length,
            handler,
        } = descriptor;
        let id = DescriptorId(self.descriptors.len());
        let path = parent
            .path
            .child(AttributeKind::Descriptor, parent.descriptors.len());
        debug!("register descriptor {} at {}", uuid, path);

        self.paths.insert(path.clone(), id.into());
        self.characteristics[characteristic.0].descriptors.push(id);
        self.descriptors.push(DescriptorNode {
            path,
            uuid,
            flags,
            characteristic,
            value,
            length,
            handler,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn services(&self) -> impl Iterator<Item = ServiceId> + '_ {
        (0..self.services.len()).map(ServiceId)
    }

    pub fn resolve(&self, path: &ObjectPath) -> Option<AttributeId> {
        self.paths.get(path).copied()
    }

    pub fn path_of(&self, id: AttributeId) -> Option<&ObjectPath> {
        match id {
            AttributeId::Service(id) => self.service(id).map(|node| &node.path),
            AttributeId::Characteristic(id) => self.characteristic(id).map(|node| &node.path),
            AttributeId::Descriptor(id) => self.descriptor(id).map(|node| &node.path),
        }
    }

    /// Ordered children of `attribute` with the given kind.
    pub fn children_of_kind(
        &self,
        attribute: AttributeId,
        kind: AttributeKind,
    ) -> Vec<AttributeId> {
        match (attribute, kind) {
            (AttributeId::Service(id), AttributeKind::Characteristic) => self
                .service(id)
                .map(|node| node.characteristics.iter().map(|&c| c.into()).collect())
                .unwrap_or_default(),
            (AttributeId::Characteristic(id), AttributeKind::Descriptor) => self
                .characteristic(id)
                .map(|node| node.descriptors.iter().map(|&d| d.into()).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub fn service(&self, id: ServiceId) -> Option<&ServiceNode> {
        self.services.get(id.0)
    }

    pub fn characteristic(&self, id: CharacteristicId) -> Option<&CharacteristicNode> {
        self.characteristics.get(id.0)
    }

    pub fn characteristic_mut(&mut self, id: CharacteristicId) -> Option<&mut CharacteristicNode> {
        self.characteristics.get_mut(id.0)
    }

    pub fn descriptor(&self, id: DescriptorId) -> Option<&DescriptorNode> {
        self.descriptors.get(id.0)
    }

    /// Descriptor together with its parent characteristic.
    pub(crate) fn descriptor_with_parent_mut(
        &mut self,
        id: DescriptorId,
    ) -> Option<(&mut DescriptorNode, &CharacteristicNode)> {
        let descriptor = self.descriptors.get_mut(id.0)?;
        let parent = self.characteristics.get(descriptor.characteristic.0)?;
        Some((descriptor, parent))
    }

    pub fn characteristic_ids(&self) -> impl Iterator<Item = CharacteristicId> + '_ {
        (0..self.characteristics.len()).map(CharacteristicId)
    }

    /// Finds the first characteristic with `uuid` inside `service`.
    pub fn find_characteristic(&self, service: ServiceId, uuid: Uuid) -> Option<CharacteristicId> {
        self.service(service)?
            .characteristics
            .iter()
            .copied()
            .find(|&id| self.characteristics[id.0].uuid == uuid)
    }

    /// Hands out the periodic producers declared on characteristics. Each is
    /// returned once.
    pub fn take_producers(&mut self) -> Vec<(CharacteristicId, PeriodicProducer)> {
        std::mem::take(&mut self.producers)
    }

    pub fn layout(&self) -> Vec<ServiceLayout> {
        self.services
            .iter()
            .map(|service| ServiceLayout {
                path: service.path.clone(),
                uuid: service.uuid,
                primary: service.primary,
                characteristics: service
                    .characteristics
                    .iter()
                    .map(|&id| {
                        let node = &self.characteristics[id.0];
                        CharacteristicLayout {
                            path: node.path.clone(),
                            uuid: node.uuid,
                            flags: node.flags.clone(),
                            descriptors: node
                                .descriptors
                                .iter()
                                .map(|&id| {
                                    let node = &self.descriptors[id.0];
                                    DescriptorLayout {
                                        path: node.path.clone(),
                                        uuid: node.uuid,
                                        flags: node.flags.clone(),
                                    }
                                })
                                .collect(),
                        }
                    })
                    .collect(),
            })
            .collect()
    }
}

fn check_descriptor_flags(descriptor: &Descriptor) -> Result<(), Error> {
    match descriptor.flags.first_non_descriptor_flag() {
        Some(flag) => Err(Error::new(
            "Descriptor",
            format!("descriptor {} cannot carry flag {flag}", descriptor.uuid),
            ErrorType::InvalidAttribute,
        )),
        None => Ok(()),
    }
}

fn unknown_parent(kind: &str, index: usize) -> Error {
    Error::new(
        "AttributeTree",
        format!("no {kind} with index {index}"),
        ErrorType::InvalidAttribute,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatt::AttributeFlag;
    use crate::SdpShortUuid;

    fn tree() -> AttributeTree {
        AttributeTree::new(ObjectPath::new("/org/bluez/example").unwrap())
    }

    fn characteristic(short: u16) -> Characteristic {
        Characteristic::new(
            Uuid::from_sdp_short_uuid(short),
            Flags::new(&[AttributeFlag::Read]),
            vec![],
            vec![],
        )
    }

    #[test]
    fn paths_follow_sibling_index() {
        let mut tree = tree();
        tree.add_service(Service::primary(Uuid::from_sdp_short_uuid(0x180f_u16)))
            .unwrap();
        let second = tree
            .add_service(
                Service::primary(Uuid::from_sdp_short_uuid(0x180a_u16))
                    .with_characteristic(characteristic(0x2a24))
                    .with_characteristic(characteristic(0x2a25)),
            )
            .unwrap();

        let chars = tree.children_of_kind(second.into(), AttributeKind::Characteristic);
        assert_eq!(chars.len(), 2);
        assert_eq!(
            tree.path_of(chars[1]).unwrap().as_str(),
            "/org/bluez/example/service1/char1"
        );
        let path = ObjectPath::new("/org/bluez/example/service1/char0").unwrap();
        assert_eq!(tree.resolve(&path), Some(chars[0]));
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn descriptor_with_characteristic_flag_is_rejected() {
        let mut tree = tree();
        let bad = Descriptor::new(
            Uuid::from_sdp_short_uuid(0x2908_u16),
            Flags::new(&[AttributeFlag::Read, AttributeFlag::Notify]),
            vec![],
        );
        let err = tree
            .add_service(
                Service::primary(Uuid::from_sdp_short_uuid(0x1812_u16))
                    .with_characteristic(characteristic(0x2a4d).with_descriptor(bad)),
            )
            .unwrap_err();
        assert_eq!(err.error_type, ErrorType::InvalidAttribute);
        assert!(tree.is_empty());
    }

    #[test]
    fn children_of_wrong_kind_are_empty() {
        let mut tree = tree();
        let service = tree
            .add_service(
                Service::primary(Uuid::from_sdp_short_uuid(0x180f_u16))
                    .with_characteristic(characteristic(0x2a19)),
            )
            .unwrap();
        assert!(tree
            .children_of_kind(service.into(), AttributeKind::Descriptor)
            .is_empty());
        assert_eq!(
            tree.layout()[0].characteristics[0].uuid,
            Uuid::from_sdp_short_uuid(0x2a19_u16)
        );
    }
}

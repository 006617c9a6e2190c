//! Property dictionaries exposed for every attribute, in the shape of
//! `org.freedesktop.DBus.ObjectManager.GetManagedObjects`.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::{
    object_path::{AttributeKind, ObjectPath},
    tree::{AttributeId, AttributeTree},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    U16(u16),
    String(String),
    ObjectPath(ObjectPath),
    ObjectPaths(Vec<ObjectPath>),
    Strings(Vec<String>),
    Bytes(Vec<u8>),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            PropertyValue::U16(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(value) => Some(value),
            PropertyValue::ObjectPath(path) => Some(path.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PropertyValue::Bytes(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<u16> for PropertyValue {
    fn from(value: u16) -> Self {
        PropertyValue::U16(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<ObjectPath> for PropertyValue {
    fn from(value: ObjectPath) -> Self {
        PropertyValue::ObjectPath(value)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        PropertyValue::Bytes(value)
    }
}

pub type PropertyMap = BTreeMap<String, PropertyValue>;
pub type InterfaceMap = BTreeMap<String, PropertyMap>;

/// Managed objects keyed by path, in depth-first registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagedObjects(Vec<(ObjectPath, InterfaceMap)>);

impl ManagedObjects {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &ObjectPath> {
        self.0.iter().map(|(path, _)| path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectPath, &InterfaceMap)> {
        self.0.iter().map(|(path, interfaces)| (path, interfaces))
    }

    pub fn get(&self, path: &ObjectPath) -> Option<&InterfaceMap> {
        self.0
            .iter()
            .find(|(candidate, _)| candidate == path)
            .map(|(_, interfaces)| interfaces)
    }

    pub(crate) fn push(&mut self, path: ObjectPath, interfaces: InterfaceMap) {
        self.0.push((path, interfaces));
    }
}

impl Serialize for ManagedObjects {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (path, interfaces) in &self.0 {
            map.serialize_entry(path, interfaces)?;
        }
        map.end()
    }
}

/// Property set of one attribute, built from the current tree state.
pub fn properties(tree: &AttributeTree, id: AttributeId) -> Option<InterfaceMap> {
    let mut props = PropertyMap::new();
    match id {
        AttributeId::Service(id) => {
            let node = tree.service(id)?;
            props.insert("UUID".into(), node.uuid.to_string().into());
            props.insert("Primary".into(), node.primary.into());
            props.insert(
                "Characteristics".into(),
                PropertyValue::ObjectPaths(child_paths(
                    tree,
                    id.into(),
                    AttributeKind::Characteristic,
                )),
            );
            props.insert("Includes".into(), PropertyValue::ObjectPaths(Vec::new()));
        }
        AttributeId::Characteristic(char_id) => {
            let node = tree.characteristic(char_id)?;
            let service = tree.service(node.service)?;
            props.insert("UUID".into(), node.uuid.to_string().into());
            props.insert("Service".into(), service.path.clone().into());
            props.insert("Flags".into(), PropertyValue::Strings(node.flags.to_strings()));
            props.insert(
                "Descriptors".into(),
                PropertyValue::ObjectPaths(child_paths(tree, id, AttributeKind::Descriptor)),
            );
            if node.flags.allows_notify() {
                props.insert("Notifying".into(), node.notifying.into());
            }
        }
        AttributeId::Descriptor(desc_id) => {
            let node = tree.descriptor(desc_id)?;
            let parent = tree.characteristic(node.characteristic)?;
            props.insert("UUID".into(), node.uuid.to_string().into());
            props.insert("Characteristic".into(), parent.path.clone().into());
            props.insert("Flags".into(), PropertyValue::Strings(node.flags.to_strings()));
        }
    }

    let mut interfaces = InterfaceMap::new();
    interfaces.insert(id.kind().interface().to_string(), props);
    Some(interfaces)
}

fn child_paths(tree: &AttributeTree, id: AttributeId, kind: AttributeKind) -> Vec<ObjectPath> {
    tree.children_of_kind(id, kind)
        .into_iter()
        .filter_map(|child| tree.path_of(child).cloned())
        .collect()
}

/// Depth-first walk: service, its characteristics, each with its descriptors.
pub fn managed_objects(tree: &AttributeTree) -> ManagedObjects {
    let mut objects = ManagedObjects::default();
    let mut visit = |id: AttributeId| {
        if let (Some(path), Some(interfaces)) = (tree.path_of(id), properties(tree, id)) {
            objects.push(path.clone(), interfaces);
        }
    };
    for service in tree.services() {
        visit(service.into());
        for characteristic in tree.children_of_kind(service.into(), AttributeKind::Characteristic) {
            visit(characteristic);
            for descriptor in tree.children_of_kind(characteristic, AttributeKind::Descriptor) {
                visit(descriptor);
            }
        }
    }
    objects
}

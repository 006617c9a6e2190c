use std::fmt;

use serde::{Serialize, Serializer};

use crate::{Error, ErrorType};

use super::{CHARACTERISTIC_INTERFACE, DESCRIPTOR_INTERFACE, SERVICE_INTERFACE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Service,
    Characteristic,
    Descriptor,
}

impl AttributeKind {
    /// Path element prefix; the sibling index is appended to it.
    pub fn prefix(&self) -> &'static str {
        match self {
            AttributeKind::Service => "service",
            AttributeKind::Characteristic => "char",
            AttributeKind::Descriptor => "desc",
        }
    }

    pub fn interface(&self) -> &'static str {
        match self {
            AttributeKind::Service => SERVICE_INTERFACE,
            AttributeKind::Characteristic => CHARACTERISTIC_INTERFACE,
            AttributeKind::Descriptor => DESCRIPTOR_INTERFACE,
        }
    }
}

/// A validated D-Bus object path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> Result<Self, Error> {
        let path = path.into();
        validate(&path)?;
        Ok(ObjectPath(path))
    }

    pub fn root() -> Self {
        ObjectPath("/".to_string())
    }

    /// `self + "/" + kind prefix + index`.
    pub fn child(&self, kind: AttributeKind, index: usize) -> ObjectPath {
        let element = format!("{}{}", kind.prefix(), index);
        self.join(&element)
    }

    fn join(&self, element: &str) -> ObjectPath {
        if self.0 == "/" {
            ObjectPath(format!("/{element}"))
        } else {
            ObjectPath(format!("{}/{element}", self.0))
        }
    }

    /// Appends a single validated element.
    pub fn push(&self, element: &str) -> Result<ObjectPath, Error> {
        validate_element(&self.0, element)?;
        Ok(self.join(element))
    }

    pub fn parent(&self) -> Option<ObjectPath> {
        match self.0.rfind('/') {
            Some(0) if self.0.len() > 1 => Some(ObjectPath::root()),
            Some(0) | None => None,
            Some(index) => Some(ObjectPath(self.0[..index].to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(path: &str) -> Result<(), Error> {
    if path == "/" {
        return Ok(());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(invalid(path, "must start with '/'"));
    };
    for element in rest.split('/') {
        validate_element(path, element)?;
    }
    Ok(())
}

fn validate_element(path: &str, element: &str) -> Result<(), Error> {
    if element.is_empty() {
        return Err(invalid(path, "empty path element"));
    }
    if !element
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return Err(invalid(path, "elements may only contain [A-Za-z0-9_]"));
    }
    Ok(())
}

fn invalid(path: &str, reason: &str) -> Error {
    Error::new(
        "ObjectPath",
        format!("{path:?}: {reason}"),
        ErrorType::InvalidAttribute,
    )
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ObjectPath {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ObjectPath::new(value)
    }
}

impl Serialize for ObjectPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_paths_encode_position() {
        let base = ObjectPath::new("/org/bluez/example").unwrap();
        let service = base.child(AttributeKind::Service, 0);
        let desc = service
            .child(AttributeKind::Characteristic, 1)
            .child(AttributeKind::Descriptor, 0);
        assert_eq!(desc.as_str(), "/org/bluez/example/service0/char1/desc0");
        assert_eq!(
            desc.parent().unwrap().as_str(),
            "/org/bluez/example/service0/char1"
        );
        assert_eq!(ObjectPath::root().child(AttributeKind::Service, 3).as_str(), "/service3");
    }

    #[test]
    fn rejects_malformed_paths() {
        for path in ["", "org/bluez", "/org//bluez", "/org/bluez/", "/org/blu-ez"] {
            assert!(ObjectPath::new(path).is_err(), "{path}");
        }
        assert!(ObjectPath::new("/").is_ok());
        assert!(ObjectPath::root().push("a b").is_err());
    }
}

//! LE advertisement object (`org.bluez.LEAdvertisement1`).

use std::fmt;

use uuid::Uuid;

use crate::gatt::{
    property_map::{InterfaceMap, PropertyMap, PropertyValue},
    ObjectPath,
};

pub const ADVERTISEMENT_INTERFACE: &str = "org.bluez.LEAdvertisement1";

/// GAP appearance values used by the HID profiles.
pub mod appearance {
    pub const KEYBOARD: u16 = 0x03C1;
    pub const MOUSE: u16 = 0x03C2;
    pub const DIGITIZER_TABLET: u16 = 0x03C5;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvertisementType {
    Broadcast,
    #[default]
    Peripheral,
}

impl fmt::Display for AdvertisementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvertisementType::Broadcast => f.write_str("broadcast"),
            AdvertisementType::Peripheral => f.write_str("peripheral"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Advertisement {
    pub path: ObjectPath,
    pub ad_type: AdvertisementType,
    pub service_uuids: Vec<Uuid>,
    pub local_name: Option<String>,
    pub appearance: Option<u16>,
    pub discoverable: bool,
    /// System features BlueZ should add, e.g. `tx-power`.
    pub includes: Vec<String>,
}

impl Advertisement {
    pub fn new(path: ObjectPath) -> Self {
        Advertisement {
            path,
            ad_type: AdvertisementType::Peripheral,
            service_uuids: Vec::new(),
            local_name: None,
            appearance: None,
            discoverable: true,
            includes: Vec::new(),
        }
    }

    pub fn with_service_uuid(mut self, uuid: Uuid) -> Self {
        if !self.service_uuids.contains(&uuid) {
            self.service_uuids.push(uuid);
        }
        self
    }

    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }

    pub fn with_appearance(mut self, appearance: u16) -> Self {
        self.appearance = Some(appearance);
        self
    }

    pub fn with_include(mut self, include: impl Into<String>) -> Self {
        let include = include.into();
        if !self.includes.contains(&include) {
            self.includes.push(include);
        }
        self
    }

    pub fn properties(&self) -> InterfaceMap {
        let mut props = PropertyMap::new();
        props.insert("Type".into(), self.ad_type.to_string().into());
        props.insert(
            "ServiceUUIDs".into(),
            PropertyValue::Strings(self.service_uuids.iter().map(Uuid::to_string).collect()),
        );
        if let Some(name) = &self.local_name {
            props.insert("LocalName".into(), name.as_str().into());
        }
        if let Some(appearance) = self.appearance {
            props.insert("Appearance".into(), appearance.into());
        }
        props.insert("Discoverable".into(), self.discoverable.into());
        if !self.includes.is_empty() {
            props.insert("Includes".into(), PropertyValue::Strings(self.includes.clone()));
        }

        let mut interfaces = InterfaceMap::new();
        interfaces.insert(ADVERTISEMENT_INTERFACE.to_string(), props);
        interfaces
    }
}

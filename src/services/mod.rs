//! GATT services of the peripheral and the profile assembly.

pub mod battery;
pub mod device_info;
pub mod gesture_mouse;
pub mod hid;
pub mod keyboard;
pub mod multitap;
pub mod relative_mouse;
pub mod test_service;

use std::time::Duration;

use log::info;
use uuid::Uuid;

use crate::advertisement::{appearance, Advertisement};
use crate::config::{Config, Profile};
use crate::gatt::{AttributeTree, Service};
use crate::sensor::{GestureTracker, LandmarkSource, Mailbox, SensorWorker, SyntheticHand};
use crate::Error;

/// Everything a profile contributes before the server starts.
pub struct Assembly {
    pub tree: AttributeTree,
    pub advertisement: Advertisement,
    /// Running only for the gesture mouse.
    pub sensor: Option<SensorWorker>,
}

pub fn profile_appearance(profile: Profile) -> Option<u16> {
    match profile {
        Profile::GestureMouse | Profile::RelativeMouse => Some(appearance::MOUSE),
        Profile::Keyboard => Some(appearance::KEYBOARD),
        Profile::Multitap => Some(appearance::DIGITIZER_TABLET),
        Profile::Test => None,
    }
}

/// Builds battery (`service0`), device information (`service1`) and the
/// profile service (`service2`) under the configured base path.
///
/// `source` feeds the gesture mouse; a [`SyntheticHand`] is used when none
/// is given.
pub fn assemble(
    config: &Config,
    source: Option<Box<dyn LandmarkSource>>,
) -> Result<Assembly, Error> {
    config.validate()?;
    let base = config.base_path()?;
    let mut tree = AttributeTree::new(base.clone());
    let mut sensor = None;

    let profile_service = match config.profile {
        Profile::GestureMouse => {
            let mailbox = Mailbox::new();
            let source = source
                .unwrap_or_else(|| Box::new(SyntheticHand::new()) as Box<dyn LandmarkSource>);
            sensor = Some(SensorWorker::spawn(
                source,
                GestureTracker::new(&config.gesture),
                mailbox.clone(),
                Duration::from_millis(config.gesture.sensor_period_ms),
            )?);
            gesture_mouse::service(config, mailbox)
        }
        Profile::RelativeMouse => relative_mouse::service(config),
        Profile::Keyboard => keyboard::service(config),
        Profile::Multitap => multitap::service(config),
        Profile::Test => test_service::service(config),
    };

    let services: Vec<Service> = vec![
        battery::service(&config.battery),
        device_info::service(&config.device_info),
        profile_service,
    ];
    let uuids: Vec<Uuid> = services.iter().map(|service| service.uuid).collect();
    for service in services {
        tree.add_service(service)?;
    }

    let mut advertisement = Advertisement::new(base.push("advertisement0")?)
        .with_local_name(config.local_name.clone());
    if let Some(appearance) = profile_appearance(config.profile) {
        advertisement = advertisement.with_appearance(appearance);
    }
    for uuid in uuids {
        advertisement = advertisement.with_service_uuid(uuid);
    }
    for include in &config.advertisement_includes {
        advertisement = advertisement.with_include(include.as_str());
    }

    info!(
        "assembled {:?} profile: {} objects under {}",
        config.profile,
        tree.len(),
        base
    );
    Ok(Assembly {
        tree,
        advertisement,
        sensor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatt::ObjectPath;
    use crate::hid::HID_SERVICE;
    use crate::SdpShortUuid;

    fn config(profile: Profile) -> Config {
        Config {
            profile,
            ..Config::default()
        }
    }

    #[test]
    fn services_in_fixed_order() {
        let assembly = assemble(&config(Profile::Keyboard), None).unwrap();
        let tree = &assembly.tree;
        let uuids: Vec<Uuid> = tree
            .services()
            .map(|id| tree.service(id).unwrap().uuid)
            .collect();
        assert_eq!(
            uuids,
            vec![
                Uuid::from_sdp_short_uuid(battery::BATTERY_SERVICE),
                Uuid::from_sdp_short_uuid(device_info::DEVICE_INFORMATION_SERVICE),
                Uuid::from_sdp_short_uuid(HID_SERVICE),
            ]
        );
        assert!(tree
            .resolve(&ObjectPath::new("/org/bluez/example/service2/char4/desc0").unwrap())
            .is_some());
        assert!(assembly.sensor.is_none());
    }

    #[test]
    fn advertisement_follows_profile() {
        let assembly = assemble(&config(Profile::Multitap), None).unwrap();
        let ad = &assembly.advertisement;
        assert_eq!(ad.path.as_str(), "/org/bluez/example/advertisement0");
        assert_eq!(ad.local_name.as_deref(), Some("AIBot"));
        assert_eq!(ad.appearance, Some(appearance::DIGITIZER_TABLET));
        assert_eq!(ad.service_uuids.len(), 3);

        let test = assemble(&config(Profile::Test), None).unwrap();
        assert_eq!(test.advertisement.appearance, None);
        assert_eq!(
            test.advertisement.service_uuids[2],
            test_service::TEST_SERVICE
        );
    }

    #[test]
    fn advertisement_carries_configured_includes() {
        let config = Config {
            advertisement_includes: vec!["tx-power".to_string()],
            ..config(Profile::Keyboard)
        };
        let assembly = assemble(&config, None).unwrap();
        assert_eq!(assembly.advertisement.includes, vec!["tx-power"]);
        assert_eq!(assembly.advertisement.appearance, Some(appearance::KEYBOARD));
    }

    #[test]
    fn gesture_profile_starts_sensor() {
        let assembly = assemble(&config(Profile::GestureMouse), None).unwrap();
        assert!(assembly.sensor.is_some());
    }
}

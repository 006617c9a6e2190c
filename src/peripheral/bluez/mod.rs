mod characteristic_utils;
mod error;

use std::collections::BTreeSet;

use async_trait::async_trait;
use bluer::{
    adv::{self, AdvertisementHandle},
    gatt::local::{Application, ApplicationHandle},
    Adapter, AdapterEvent, Device, DeviceEvent, DeviceProperty, Session,
};
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc::Sender};
use tokio::task::JoinHandle;

use self::characteristic_utils::{parse_services, Bridge};
use super::PeripheralServer;
use crate::advertisement::{Advertisement, AdvertisementType};
use crate::gatt::peripheral_event::PeripheralEvent;
use crate::gatt::tree::ServiceLayout;
use crate::gatt::Notification;
use crate::Error;

/// BlueZ backend over D-Bus.
pub struct Peripheral {
    _session: Session,
    adapter: Adapter,
    application: Option<ApplicationHandle>,
    advertisement: Option<AdvertisementHandle>,
    monitor: Option<JoinHandle<()>>,
    events: Option<Sender<PeripheralEvent>>,
}

impl Peripheral {
    pub async fn new() -> Result<Self, Error> {
        Peripheral::with_adapter(None).await
    }

    /// Uses adapter `name` (e.g. `hci0`), or the default adapter.
    pub async fn with_adapter(name: Option<&str>) -> Result<Self, Error> {
        let session = Session::new().await?;
        let adapter = match name {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };
        adapter.set_powered(true).await?;
        info!(
            "Initialize Bluetooth adapter {} with address {}",
            adapter.name(),
            adapter.address().await?
        );
        Ok(Peripheral {
            _session: session,
            adapter,
            application: None,
            advertisement: None,
            monitor: None,
            events: None,
        })
    }

    pub fn adapter_name(&self) -> &str {
        self.adapter.name()
    }

    pub async fn is_advertising(&self) -> Result<bool, Error> {
        Ok(self.adapter.active_advertising_instances().await? > 0)
    }

    async fn send(&self, event: PeripheralEvent) {
        if let Some(events) = &self.events {
            if let Err(err) = events.send(event).await {
                warn!("error sending peripheral event: {}", err);
            }
        }
    }
}

#[async_trait]
impl PeripheralServer for Peripheral {
    async fn is_powered(&self) -> Result<bool, Error> {
        Ok(self.adapter.is_powered().await?)
    }

    async fn register_application(
        &mut self,
        layout: Vec<ServiceLayout>,
        events: Sender<PeripheralEvent>,
        notifications: broadcast::Sender<Notification>,
    ) -> Result<(), Error> {
        self.events = Some(events.clone());
        let powered = self.adapter.is_powered().await?;
        self.send(PeripheralEvent::DidUpdateState {
            is_powered: powered,
        })
        .await;

        let bridge = Bridge::new(self.adapter.name(), events.clone(), notifications);
        let application = Application {
            services: parse_services(layout, &bridge),
            ..Default::default()
        };
        match self.adapter.serve_gatt_application(application).await {
            Ok(handle) => {
                debug!("application handle: {:?}", handle);
                self.application = Some(handle);
                self.send(PeripheralEvent::DidRegisterApplication { error: None })
                    .await;
            }
            Err(err) => {
                self.send(PeripheralEvent::DidRegisterApplication {
                    error: Some(err.to_string()),
                })
                .await;
                return Err(err.into());
            }
        }

        self.monitor = Some(tokio::spawn(monitor_connections(
            self.adapter.clone(),
            events,
        )));
        Ok(())
    }

    async fn register_advertisement(
        &mut self,
        advertisement: &Advertisement,
    ) -> Result<(), Error> {
        let le_advertisement = adv::Advertisement {
            advertisement_type: match advertisement.ad_type {
                AdvertisementType::Peripheral => adv::Type::Peripheral,
                AdvertisementType::Broadcast => adv::Type::Broadcast,
            },
            service_uuids: advertisement.service_uuids.iter().copied().collect(),
            local_name: advertisement.local_name.clone(),
            appearance: advertisement.appearance,
            discoverable: Some(advertisement.discoverable),
            system_includes: system_includes(&advertisement.includes),
            ..Default::default()
        };
        match self.adapter.advertise(le_advertisement).await {
            Ok(handle) => {
                debug!("advertisement handle: {:?}", handle);
                self.advertisement = Some(handle);
                self.send(PeripheralEvent::DidStartAdvertising { error: None })
                    .await;
                Ok(())
            }
            Err(err) => {
                self.send(PeripheralEvent::DidStartAdvertising {
                    error: Some(err.to_string()),
                })
                .await;
                Err(err.into())
            }
        }
    }

    async fn unregister(&mut self) -> Result<(), Error> {
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
        // Dropping the handles unregisters them from BlueZ.
        self.advertisement = None;
        self.application = None;
        self.events = None;
        info!("unregistered from {}", self.adapter.name());
        Ok(())
    }
}

fn system_includes(includes: &[String]) -> BTreeSet<adv::Feature> {
    includes
        .iter()
        .filter_map(|include| match include.as_str() {
            "tx-power" => Some(adv::Feature::TxPower),
            "appearance" => Some(adv::Feature::Appearance),
            "local-name" => Some(adv::Feature::LocalName),
            other => {
                debug!("ignoring advertisement include {:?}", other);
                None
            }
        })
        .collect()
}

/// Reports connection changes of every device the adapter knows about.
async fn monitor_connections(adapter: Adapter, events: Sender<PeripheralEvent>) {
    let mut adapter_events = match adapter.events().await {
        Ok(stream) => Box::pin(stream),
        Err(err) => {
            warn!("cannot watch adapter events: {}", err);
            return;
        }
    };
    while let Some(event) = adapter_events.next().await {
        if let AdapterEvent::DeviceAdded(address) = event {
            match adapter.device(address) {
                Ok(device) => {
                    tokio::spawn(watch_device(device, events.clone()));
                }
                Err(err) => warn!("device {}: {}", address, err),
            }
        }
    }
}

async fn watch_device(device: Device, events: Sender<PeripheralEvent>) {
    let mut changes = match device.events().await {
        Ok(stream) => Box::pin(stream),
        Err(err) => {
            debug!("cannot watch device {}: {}", device.address(), err);
            return;
        }
    };
    while let Some(DeviceEvent::PropertyChanged(property)) = changes.next().await {
        if let DeviceProperty::Connected(connected) = property {
            let client = device.address().to_string();
            let event = if connected {
                PeripheralEvent::DidConnect { client }
            } else {
                PeripheralEvent::DidDisconnect { client }
            };
            if events.send(event).await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_map_to_system_features() {
        let includes = ["local-name", "tx-power", "rssi"].map(String::from);
        let features = system_includes(&includes);
        assert_eq!(features.len(), 2);
        assert!(features.contains(&adv::Feature::TxPower));
        assert!(features.contains(&adv::Feature::LocalName));
    }
}

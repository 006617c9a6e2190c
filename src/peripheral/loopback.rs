//! In-process backend: a [`Central`] drives the event loop directly through
//! the same event and notification channels a real stack would use.

use async_trait::async_trait;
use log::{debug, info};
use tokio::sync::{broadcast, mpsc, oneshot};

use super::PeripheralServer;
use crate::advertisement::Advertisement;
use crate::gatt::peripheral_event::PeripheralEvent;
use crate::gatt::tree::ServiceLayout;
use crate::gatt::{GattError, GattResult, ManagedObjects, Notification, ObjectPath, RequestOptions};
use crate::{Error, ErrorType};

struct Link {
    events: mpsc::Sender<PeripheralEvent>,
    notifications: broadcast::Sender<Notification>,
    layout: Vec<ServiceLayout>,
    advertisement: Advertisement,
}

/// Creates a connected pair. The central becomes usable once the
/// application and the advertisement are registered.
pub fn loopback(client: impl Into<String>) -> (LoopbackPeripheral, PendingCentral) {
    let (sender, receiver) = oneshot::channel();
    (
        LoopbackPeripheral {
            link: Some(sender),
            pending: None,
        },
        PendingCentral {
            client: client.into(),
            link: receiver,
        },
    )
}

type Registration = (
    mpsc::Sender<PeripheralEvent>,
    broadcast::Sender<Notification>,
    Vec<ServiceLayout>,
);

pub struct LoopbackPeripheral {
    link: Option<oneshot::Sender<Link>>,
    pending: Option<Registration>,
}

#[async_trait]
impl PeripheralServer for LoopbackPeripheral {
    async fn is_powered(&self) -> Result<bool, Error> {
        Ok(true)
    }

    async fn register_application(
        &mut self,
        layout: Vec<ServiceLayout>,
        events: mpsc::Sender<PeripheralEvent>,
        notifications: broadcast::Sender<Notification>,
    ) -> Result<(), Error> {
        info!("loopback: registering {} service(s)", layout.len());
        send(&events, PeripheralEvent::DidUpdateState { is_powered: true }).await?;
        send(&events, PeripheralEvent::DidRegisterApplication { error: None }).await?;
        self.pending = Some((events, notifications, layout));
        Ok(())
    }

    async fn register_advertisement(
        &mut self,
        advertisement: &Advertisement,
    ) -> Result<(), Error> {
        let (events, notifications, layout) = self.pending.take().ok_or_else(|| {
            Error::new(
                "LoopbackPeripheral",
                "advertisement registered before the application",
                ErrorType::Bluez,
            )
        })?;
        send(&events, PeripheralEvent::DidStartAdvertising { error: None }).await?;

        // The central now owns the only event sender, so the loop stops when
        // it disconnects.
        let link = Link {
            events,
            notifications,
            layout,
            advertisement: advertisement.clone(),
        };
        match self.link.take().map(|sender| sender.send(link)) {
            Some(Ok(())) => Ok(()),
            _ => {
                debug!("loopback: no central waiting");
                Ok(())
            }
        }
    }

    async fn unregister(&mut self) -> Result<(), Error> {
        self.pending = None;
        info!("loopback: unregistered");
        Ok(())
    }
}

async fn send(events: &mpsc::Sender<PeripheralEvent>, event: PeripheralEvent) -> Result<(), Error> {
    events.send(event).await.map_err(|_| closed())
}

fn closed() -> Error {
    Error::new("Central", "event loop is gone", ErrorType::Bluez)
}

pub struct PendingCentral {
    client: String,
    link: oneshot::Receiver<Link>,
}

impl PendingCentral {
    /// Waits for the peripheral to advertise, then connects.
    pub async fn connect(self) -> Result<Central, Error> {
        let link = self.link.await.map_err(|_| closed())?;
        send(
            &link.events,
            PeripheralEvent::DidConnect {
                client: self.client.clone(),
            },
        )
        .await?;
        info!("{} connected to {:?}", self.client, link.advertisement.local_name);
        Ok(Central {
            client: self.client,
            notifications: link.notifications.subscribe(),
            link,
        })
    }
}

/// Remote side of a loopback connection.
pub struct Central {
    client: String,
    link: Link,
    notifications: broadcast::Receiver<Notification>,
}

impl Central {
    pub fn layout(&self) -> &[ServiceLayout] {
        &self.link.layout
    }

    pub fn advertisement(&self) -> &Advertisement {
        &self.link.advertisement
    }

    pub async fn read(&self, attribute: &ObjectPath) -> GattResult<Vec<u8>> {
        self.read_with(attribute, RequestOptions::default()).await
    }

    pub async fn read_with(
        &self,
        attribute: &ObjectPath,
        options: RequestOptions,
    ) -> GattResult<Vec<u8>> {
        let (responder, reply) = oneshot::channel();
        self.request(PeripheralEvent::DidReceiveReadRequest {
            client: self.client.clone(),
            attribute: attribute.clone(),
            options,
            responder,
        })
        .await?;
        reply.await.map_err(|_| gone())?
    }

    pub async fn write(&self, attribute: &ObjectPath, value: Vec<u8>) -> GattResult<()> {
        self.write_with(attribute, value, RequestOptions::default()).await
    }

    pub async fn write_with(
        &self,
        attribute: &ObjectPath,
        value: Vec<u8>,
        options: RequestOptions,
    ) -> GattResult<()> {
        let (responder, reply) = oneshot::channel();
        self.request(PeripheralEvent::DidReceiveWriteRequest {
            client: self.client.clone(),
            attribute: attribute.clone(),
            value,
            options,
            responder,
        })
        .await?;
        reply.await.map_err(|_| gone())?
    }

    pub async fn subscribe(&self, characteristic: &ObjectPath) -> Result<(), Error> {
        send(
            &self.link.events,
            PeripheralEvent::DidSubscribeToCharacteristic {
                client: self.client.clone(),
                characteristic: characteristic.clone(),
            },
        )
        .await
    }

    pub async fn unsubscribe(&self, characteristic: &ObjectPath) -> Result<(), Error> {
        send(
            &self.link.events,
            PeripheralEvent::DidUnsubscribeFromCharacteristic {
                client: self.client.clone(),
                characteristic: characteristic.clone(),
            },
        )
        .await
    }

    pub async fn managed_objects(&self) -> Result<ManagedObjects, Error> {
        let (responder, reply) = oneshot::channel();
        send(&self.link.events, PeripheralEvent::DidRequestManagedObjects { responder }).await?;
        reply.await.map_err(|_| closed())
    }

    /// Next value pushed by the peripheral. Lagged notifications are skipped.
    pub async fn next_notification(&mut self) -> Option<Notification> {
        loop {
            match self.notifications.recv().await {
                Ok(notification) => return Some(notification),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!("{} missed {} notification(s)", self.client, missed);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Disconnects and drops the event sender, ending the peripheral's loop.
    pub async fn disconnect(self) -> Result<(), Error> {
        send(
            &self.link.events,
            PeripheralEvent::DidDisconnect {
                client: self.client,
            },
        )
        .await
    }

    async fn request(&self, event: PeripheralEvent) -> GattResult<()> {
        self.link.events.send(event).await.map_err(|_| gone())
    }
}

fn gone() -> GattError {
    GattError::Failed("peripheral is gone".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advertisement() -> Advertisement {
        Advertisement::new(ObjectPath::new("/org/bluez/example/advertisement0").unwrap())
            .with_local_name("loop")
    }

    #[tokio::test]
    async fn central_receives_link_on_advertise() {
        let (mut peripheral, pending) = loopback("central");
        let (events, mut received) = mpsc::channel(8);
        let (notifications, _) = broadcast::channel(8);
        peripheral
            .register_application(Vec::new(), events, notifications)
            .await
            .unwrap();
        peripheral.register_advertisement(&advertisement()).await.unwrap();

        let central = pending.connect().await.unwrap();
        assert_eq!(central.advertisement().local_name.as_deref(), Some("loop"));
        assert!(central.layout().is_empty());

        let mut connected = false;
        while let Ok(event) = received.try_recv() {
            if let PeripheralEvent::DidConnect { client } = event {
                assert_eq!(client, "central");
                connected = true;
            }
        }
        assert!(connected);
    }

    #[tokio::test]
    async fn advertise_without_central_succeeds() {
        let (mut peripheral, pending) = loopback("central");
        drop(pending);
        let (events, _received) = mpsc::channel(8);
        let (notifications, _) = broadcast::channel(8);
        peripheral
            .register_application(Vec::new(), events, notifications)
            .await
            .unwrap();
        assert!(peripheral.register_advertisement(&advertisement()).await.is_ok());
    }

    #[tokio::test]
    async fn advertise_before_application_fails() {
        let (mut peripheral, _pending) = loopback("central");
        assert!(peripheral.register_advertisement(&advertisement()).await.is_err());
    }
}

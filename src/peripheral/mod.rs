//! Platform seam between the event loop and a Bluetooth stack.

#[cfg(feature = "bluez")]
pub mod bluez;
pub mod loopback;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::advertisement::Advertisement;
use crate::gatt::peripheral_event::PeripheralEvent;
use crate::gatt::tree::ServiceLayout;
use crate::gatt::Notification;
use crate::Error;

/// A Bluetooth stack able to publish a GATT application and an advertisement.
///
/// Remote requests come back as [`PeripheralEvent`]s on `events`; value
/// changes to push to subscribed centrals arrive on `notifications`.
#[async_trait]
pub trait PeripheralServer {
    async fn is_powered(&self) -> Result<bool, Error>;

    async fn register_application(
        &mut self,
        layout: Vec<ServiceLayout>,
        events: mpsc::Sender<PeripheralEvent>,
        notifications: broadcast::Sender<Notification>,
    ) -> Result<(), Error>;

    async fn register_advertisement(&mut self, advertisement: &Advertisement)
        -> Result<(), Error>;

    /// Drops the application and the advertisement.
    async fn unregister(&mut self) -> Result<(), Error>;
}

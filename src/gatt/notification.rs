use log::{debug, trace};
use tokio::sync::broadcast;

use super::{object_path::ObjectPath, property_map::PropertyMap};

/// Receives `PropertiesChanged` signals emitted by the server.
pub trait NotificationSink {
    fn properties_changed(
        &mut self,
        path: &ObjectPath,
        interface: &str,
        changed: &PropertyMap,
        invalidated: &[String],
    );
}

/// Value change forwarded to platform notify sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub path: ObjectPath,
    pub value: Vec<u8>,
}

/// Only logs the signal.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn properties_changed(
        &mut self,
        path: &ObjectPath,
        interface: &str,
        changed: &PropertyMap,
        invalidated: &[String],
    ) {
        debug!(
            "PropertiesChanged {} {} {:?} invalidated={:?}",
            path, interface, changed, invalidated
        );
    }
}

/// Broadcasts `Value` changes to every subscriber.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: broadcast::Sender<Notification>,
}

impl ChannelSink {
    pub fn new(sender: broadcast::Sender<Notification>) -> Self {
        ChannelSink { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl NotificationSink for ChannelSink {
    fn properties_changed(
        &mut self,
        path: &ObjectPath,
        interface: &str,
        changed: &PropertyMap,
        _invalidated: &[String],
    ) {
        let Some(value) = changed.get("Value").and_then(|value| value.as_bytes()) else {
            trace!("{} {}: no value in change set", path, interface);
            return;
        };
        // No receivers just means no central is listening right now.
        if self
            .sender
            .send(Notification {
                path: path.clone(),
                value: value.to_vec(),
            })
            .is_err()
        {
            trace!("{}: notification dropped, no receivers", path);
        }
    }
}

//! Maps the attribute layout onto `bluer` local GATT objects. Every request
//! is forwarded to the event loop and answered through a oneshot reply.

use bluer::gatt::local::{
    service_control, Characteristic, CharacteristicNotifier, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicRead, CharacteristicReadRequest,
    CharacteristicWrite, CharacteristicWriteMethod, CharacteristicWriteRequest, Descriptor,
    DescriptorRead, DescriptorReadRequest, DescriptorWrite, DescriptorWriteRequest, ReqError,
    Service,
};
use std::sync::{Arc, Mutex};

use bluer::gatt::WriteOp;
use bluer::Address;
use futures::FutureExt;
use log::{debug, warn};
use tokio::sync::{broadcast, mpsc::Sender, oneshot};

use crate::gatt::flags::{AttributeFlag, Flags};
use crate::gatt::peripheral_event::PeripheralEvent;
use crate::gatt::server::WriteType;
use crate::gatt::tree::{CharacteristicLayout, DescriptorLayout, ServiceLayout};
use crate::gatt::{Notification, ObjectPath, RequestOptions};

/// Shared state every callback needs.
#[derive(Clone)]
pub struct Bridge {
    pub adapter: String,
    pub events: Sender<PeripheralEvent>,
    pub notifications: broadcast::Sender<Notification>,
    last_client: Arc<Mutex<Option<Address>>>,
}

impl Bridge {
    pub fn new(
        adapter: impl Into<String>,
        events: Sender<PeripheralEvent>,
        notifications: broadcast::Sender<Notification>,
    ) -> Self {
        Bridge {
            adapter: adapter.into(),
            events,
            notifications,
            last_client: Arc::new(Mutex::new(None)),
        }
    }

    fn record_client(&self, client: Address) {
        *self
            .last_client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(client);
    }

    /// StartNotify carries no device, so a subscription is attributed to the
    /// device that last issued a request. Hosts read the report map and
    /// report references before they subscribe.
    fn subscriber(&self) -> String {
        let last = *self
            .last_client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match last {
            Some(address) => address.to_string(),
            None => format!("{}/unknown", self.adapter),
        }
    }
}

pub fn parse_services(layout: Vec<ServiceLayout>, bridge: &Bridge) -> Vec<Service> {
    layout
        .into_iter()
        .map(|service| {
            let (_, control_handle) = service_control();
            Service {
                uuid: service.uuid,
                primary: service.primary,
                characteristics: service
                    .characteristics
                    .into_iter()
                    .map(|characteristic| parse_characteristic(characteristic, bridge))
                    .collect(),
                control_handle,
                ..Default::default()
            }
        })
        .collect()
}

fn parse_characteristic(characteristic: CharacteristicLayout, bridge: &Bridge) -> Characteristic {
    let flags = &characteristic.flags;
    let path = characteristic.path.clone();

    let read = flags.allows_read().then(|| {
        let bridge = bridge.clone();
        let path = path.clone();
        CharacteristicRead {
            read: flags.contains(AttributeFlag::Read),
            encrypt_read: flags.contains(AttributeFlag::EncryptRead),
            encrypt_authenticated_read: flags.contains(AttributeFlag::EncryptAuthenticatedRead),
            secure_read: flags.contains(AttributeFlag::SecureRead),
            fun: Box::new(move |request: CharacteristicReadRequest| {
                let bridge = bridge.clone();
                let path = path.clone();
                async move {
                    let options = RequestOptions {
                        offset: request.offset,
                        mtu: Some(request.mtu),
                        device: device_path(&bridge.adapter, request.device_address),
                        link: request.link.as_ref().map(|link| format!("{link:?}")),
                        ..Default::default()
                    };
                    on_read_request(&bridge, request.device_address, path, options).await
                }
                .boxed()
            }),
            ..Default::default()
        }
    });

    let write = flags.allows_write().then(|| {
        let bridge = bridge.clone();
        let path = path.clone();
        CharacteristicWrite {
            write: flags.contains(AttributeFlag::Write),
            write_without_response: flags.contains(AttributeFlag::WriteWithoutResponse),
            reliable_write: flags.contains(AttributeFlag::ReliableWrite),
            authenticated_signed_writes: flags.contains(AttributeFlag::AuthenticatedSignedWrites),
            encrypt_write: flags.contains(AttributeFlag::EncryptWrite),
            encrypt_authenticated_write: flags.contains(AttributeFlag::EncryptAuthenticatedWrite),
            secure_write: flags.contains(AttributeFlag::SecureWrite),
            method: CharacteristicWriteMethod::Fun(Box::new(
                move |value: Vec<u8>, request: CharacteristicWriteRequest| {
                    let bridge = bridge.clone();
                    let path = path.clone();
                    async move {
                        let options = RequestOptions {
                            offset: request.offset,
                            mtu: Some(request.mtu),
                            device: device_path(&bridge.adapter, request.device_address),
                            link: request.link.as_ref().map(|link| format!("{link:?}")),
                            write_type: Some(write_type(request.op_type)),
                            prepare_authorize: request.prepare_authorize,
                        };
                        on_write_request(&bridge, request.device_address, path, value, options)
                            .await
                    }
                    .boxed()
                },
            )),
            ..Default::default()
        }
    });

    let notify = flags.allows_notify().then(|| {
        let bridge = bridge.clone();
        let path = path.clone();
        CharacteristicNotify {
            notify: flags.contains(AttributeFlag::Notify),
            indicate: flags.contains(AttributeFlag::Indicate),
            method: CharacteristicNotifyMethod::Fun(Box::new(
                move |notifier: CharacteristicNotifier| {
                    let bridge = bridge.clone();
                    let path = path.clone();
                    async move { on_char_notify(bridge, path, notifier).await }.boxed()
                },
            )),
            ..Default::default()
        }
    });

    Characteristic {
        uuid: characteristic.uuid,
        broadcast: flags.contains(AttributeFlag::Broadcast),
        writable_auxiliaries: flags.contains(AttributeFlag::WritableAuxiliaries),
        read,
        write,
        notify,
        descriptors: characteristic
            .descriptors
            .into_iter()
            .map(|descriptor| parse_descriptor(descriptor, bridge))
            .collect(),
        ..Default::default()
    }
}

fn parse_descriptor(descriptor: DescriptorLayout, bridge: &Bridge) -> Descriptor {
    let flags: &Flags = &descriptor.flags;
    let path = descriptor.path.clone();

    let read = flags.allows_read().then(|| {
        let bridge = bridge.clone();
        let path = path.clone();
        DescriptorRead {
            read: flags.contains(AttributeFlag::Read),
            encrypt_read: flags.contains(AttributeFlag::EncryptRead),
            encrypt_authenticated_read: flags.contains(AttributeFlag::EncryptAuthenticatedRead),
            secure_read: flags.contains(AttributeFlag::SecureRead),
            fun: Box::new(move |request: DescriptorReadRequest| {
                let bridge = bridge.clone();
                let path = path.clone();
                async move {
                    let options = RequestOptions {
                        offset: request.offset,
                        device: device_path(&bridge.adapter, request.device_address),
                        link: request.link.as_ref().map(|link| format!("{link:?}")),
                        ..Default::default()
                    };
                    on_read_request(&bridge, request.device_address, path, options).await
                }
                .boxed()
            }),
            ..Default::default()
        }
    });

    let write = flags.allows_write().then(|| {
        let bridge = bridge.clone();
        let path = path.clone();
        DescriptorWrite {
            write: flags.contains(AttributeFlag::Write),
            encrypt_write: flags.contains(AttributeFlag::EncryptWrite),
            encrypt_authenticated_write: flags.contains(AttributeFlag::EncryptAuthenticatedWrite),
            secure_write: flags.contains(AttributeFlag::SecureWrite),
            fun: Box::new(move |value: Vec<u8>, request: DescriptorWriteRequest| {
                let bridge = bridge.clone();
                let path = path.clone();
                async move {
                    let options = RequestOptions {
                        offset: request.offset,
                        device: device_path(&bridge.adapter, request.device_address),
                        link: request.link.as_ref().map(|link| format!("{link:?}")),
                        prepare_authorize: request.prepare_authorize,
                        ..Default::default()
                    };
                    on_write_request(&bridge, request.device_address, path, value, options).await
                }
                .boxed()
            }),
            ..Default::default()
        }
    });

    Descriptor {
        uuid: descriptor.uuid,
        read,
        write,
        ..Default::default()
    }
}

fn write_type(op: WriteOp) -> WriteType {
    match op {
        WriteOp::Command => WriteType::Command,
        WriteOp::Reliable => WriteType::Reliable,
        _ => WriteType::Request,
    }
}

/// BlueZ object path of a remote device, e.g. `/org/bluez/hci0/dev_00_11_22_33_44_55`.
fn device_path(adapter: &str, address: Address) -> Option<ObjectPath> {
    let device = address.to_string().replace(':', "_");
    ObjectPath::new(format!("/org/bluez/{adapter}/dev_{device}")).ok()
}

async fn on_read_request(
    bridge: &Bridge,
    client: Address,
    attribute: ObjectPath,
    options: RequestOptions,
) -> Result<Vec<u8>, ReqError> {
    bridge.record_client(client);
    let (responder, reply) = oneshot::channel();
    let event = PeripheralEvent::DidReceiveReadRequest {
        client: client.to_string(),
        attribute,
        options,
        responder,
    };
    if let Err(err) = bridge.events.send(event).await {
        warn!("error sending read request event: {}", err);
        return Err(ReqError::Failed);
    }
    match reply.await {
        Ok(result) => result.map_err(ReqError::from),
        Err(_) => Err(ReqError::Failed),
    }
}

async fn on_write_request(
    bridge: &Bridge,
    client: Address,
    attribute: ObjectPath,
    value: Vec<u8>,
    options: RequestOptions,
) -> Result<(), ReqError> {
    bridge.record_client(client);
    let (responder, reply) = oneshot::channel();
    let event = PeripheralEvent::DidReceiveWriteRequest {
        client: client.to_string(),
        attribute,
        value,
        options,
        responder,
    };
    if let Err(err) = bridge.events.send(event).await {
        warn!("error sending write request event: {}", err);
        return Err(ReqError::Failed);
    }
    match reply.await {
        Ok(result) => result.map_err(ReqError::from),
        Err(_) => Err(ReqError::Failed),
    }
}

/// Forwards value changes of `path` into `notifier` until the central stops
/// the session.
async fn on_char_notify(bridge: Bridge, path: ObjectPath, mut notifier: CharacteristicNotifier) {
    // Subscribe before StartNotify so the value sent on subscribe is not missed.
    let mut notifications = bridge.notifications.subscribe();
    let client = bridge.subscriber();
    let subscribed = PeripheralEvent::DidSubscribeToCharacteristic {
        client: client.clone(),
        characteristic: path.clone(),
    };
    if bridge.events.send(subscribed).await.is_err() {
        return;
    }

    loop {
        let received = tokio::select! {
            received = notifications.recv() => received,
            _ = notifier.stopped() => break,
        };
        match received {
            Ok(notification) if notification.path == path => {
                if let Err(err) = notifier.notify(notification.value).await {
                    warn!("{}: notify failed: {}", path, err);
                    break;
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                debug!("{}: {} notification(s) lagged", path, missed);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    let unsubscribed = PeripheralEvent::DidUnsubscribeFromCharacteristic {
        client,
        characteristic: path,
    };
    if let Err(err) = bridge.events.send(unsubscribed).await {
        warn!("error sending unsubscribe event: {}", err);
    }
}

use tokio::sync::oneshot;

use super::{
    object_path::ObjectPath, property_map::ManagedObjects, server::RequestOptions, GattResult,
};

/// Calls from the platform stack into the event loop. Requests carry a
/// oneshot responder for the reply.
#[derive(Debug)]
pub enum PeripheralEvent {
    DidUpdateState {
        is_powered: bool,
    },
    DidRegisterApplication {
        error: Option<String>,
    },
    DidStartAdvertising {
        error: Option<String>,
    },
    DidConnect {
        client: String,
    },
    DidDisconnect {
        client: String,
    },
    DidSubscribeToCharacteristic {
        client: String,
        characteristic: ObjectPath,
    },
    DidUnsubscribeFromCharacteristic {
        client: String,
        characteristic: ObjectPath,
    },
    DidReceiveReadRequest {
        client: String,
        attribute: ObjectPath,
        options: RequestOptions,
        responder: oneshot::Sender<GattResult<Vec<u8>>>,
    },
    DidReceiveWriteRequest {
        client: String,
        attribute: ObjectPath,
        value: Vec<u8>,
        options: RequestOptions,
        responder: oneshot::Sender<GattResult<()>>,
    },
    DidRequestManagedObjects {
        responder: oneshot::Sender<ManagedObjects>,
    },
}

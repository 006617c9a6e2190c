//! The runtime context: one [`GattServer`], its timers and the advertisement,
//! driven by a single cooperative event loop.

use std::collections::HashSet;
use std::future::Future;

use log::{debug, error, info, warn};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};

use crate::advertisement::Advertisement;
use crate::config::Config;
use crate::gatt::peripheral_event::PeripheralEvent;
use crate::gatt::tree::ServiceLayout;
use crate::gatt::{ChannelSink, GattServer, Notification};
use crate::peripheral::PeripheralServer;
use crate::scheduler::Scheduler;
use crate::sensor::{LandmarkSource, SensorWorker};
use crate::services::{self, Assembly};
use crate::{Error, ErrorType};

/// Buffered notifications per subscriber before the slowest one lags.
pub const NOTIFICATION_CAPACITY: usize = 64;
/// Buffered platform events.
pub const EVENT_CAPACITY: usize = 32;

pub struct Application {
    server: GattServer,
    scheduler: Scheduler<GattServer>,
    advertisement: Advertisement,
    notifications: broadcast::Sender<Notification>,
    clients: HashSet<String>,
    powered: bool,
    started: Instant,
    // Stopped and joined when the application is dropped.
    _sensor: Option<SensorWorker>,
}

impl Application {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Application::from_config_with_source(config, None)
    }

    pub fn from_config_with_source(
        config: &Config,
        source: Option<Box<dyn LandmarkSource>>,
    ) -> Result<Self, Error> {
        Ok(Application::new(services::assemble(config, source)?))
    }

    /// Wires every periodic producer of the tree to the scheduler.
    pub fn new(assembly: Assembly) -> Self {
        let Assembly {
            mut tree,
            advertisement,
            sensor,
        } = assembly;
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let mut scheduler = Scheduler::new();
        for (characteristic, mut periodic) in tree.take_producers() {
            debug!("producer for {:?} every {:?}", characteristic, periodic.period);
            scheduler.schedule_periodic(periodic.period, move |server: &mut GattServer| {
                server.run_producer(characteristic, periodic.producer.as_mut());
            });
        }

        Application {
            server: GattServer::new(tree, ChannelSink::new(notifications.clone())),
            scheduler,
            advertisement,
            notifications,
            clients: HashSet::new(),
            powered: false,
            started: Instant::now(),
            _sensor: sensor,
        }
    }

    pub fn server(&self) -> &GattServer {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut GattServer {
        &mut self.server
    }

    pub fn advertisement(&self) -> &Advertisement {
        &self.advertisement
    }

    pub fn layout(&self) -> Vec<ServiceLayout> {
        self.server.tree().layout()
    }

    pub fn notification_sender(&self) -> broadcast::Sender<Notification> {
        self.notifications.clone()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn connected_clients(&self) -> usize {
        self.clients.len()
    }

    /// Fires the timers that are due now. Returns how many ran.
    pub fn tick(&mut self) -> usize {
        let now = self.started.elapsed();
        self.scheduler.fire_due(now, &mut self.server)
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.scheduler
            .next_deadline()
            .map(|offset| self.started + offset)
    }

    pub fn handle_event(&mut self, event: PeripheralEvent) {
        match event {
            PeripheralEvent::DidUpdateState { is_powered } => {
                info!("adapter powered: {}", is_powered);
                self.powered = is_powered;
            }
            PeripheralEvent::DidRegisterApplication { error: None } => {
                info!("GATT application registered");
            }
            PeripheralEvent::DidRegisterApplication { error: Some(err) } => {
                error!("failed to register GATT application: {}", err);
            }
            PeripheralEvent::DidStartAdvertising { error: None } => {
                info!("advertising {}", self.advertisement.path);
            }
            PeripheralEvent::DidStartAdvertising { error: Some(err) } => {
                error!("failed to register advertisement: {}", err);
            }
            PeripheralEvent::DidConnect { client } => {
                info!("{} connected", client);
                self.clients.insert(client);
            }
            PeripheralEvent::DidDisconnect { client } => {
                info!("{} disconnected", client);
                self.clients.remove(&client);
                if self.clients.is_empty() {
                    self.server.disconnect();
                }
            }
            PeripheralEvent::DidSubscribeToCharacteristic {
                client,
                characteristic,
            } => {
                debug!("{} subscribed to {}", client, characteristic);
                let result = self
                    .server
                    .resolve(&characteristic)
                    .and_then(|id| self.server.start_notify(id));
                if let Err(err) = result {
                    warn!("StartNotify {} failed: {}", characteristic, err);
                }
            }
            PeripheralEvent::DidUnsubscribeFromCharacteristic {
                client,
                characteristic,
            } => {
                debug!("{} unsubscribed from {}", client, characteristic);
                let result = self
                    .server
                    .resolve(&characteristic)
                    .and_then(|id| self.server.stop_notify(id));
                if let Err(err) = result {
                    warn!("StopNotify {} failed: {}", characteristic, err);
                }
            }
            PeripheralEvent::DidReceiveReadRequest {
                client,
                attribute,
                options,
                responder,
            } => {
                debug!("{} reads {}", client, attribute);
                let result = self
                    .server
                    .resolve(&attribute)
                    .and_then(|id| self.server.read_value(id, &options));
                if responder.send(result).is_err() {
                    warn!("read reply for {} dropped", attribute);
                }
            }
            PeripheralEvent::DidReceiveWriteRequest {
                client,
                attribute,
                value,
                options,
                responder,
            } => {
                debug!("{} writes {}", client, attribute);
                let result = self
                    .server
                    .resolve(&attribute)
                    .and_then(|id| self.server.write_value(id, value, &options));
                if responder.send(result).is_err() {
                    warn!("write reply for {} dropped", attribute);
                }
            }
            PeripheralEvent::DidRequestManagedObjects { responder } => {
                if responder.send(self.server.get_managed_objects()).is_err() {
                    warn!("managed objects reply dropped");
                }
            }
        }
    }

    /// Serves events and timers until every event sender is gone.
    pub async fn run(&mut self, events: mpsc::Receiver<PeripheralEvent>) {
        self.run_until(events, std::future::pending::<()>()).await;
    }

    /// Like [`Application::run`], also returning once `shutdown` completes.
    pub async fn run_until<F>(&mut self, mut events: mpsc::Receiver<PeripheralEvent>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("event loop started with {} timer(s)", self.scheduler.len());
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                _ = sleep_or_pending(deadline) => {
                    self.tick();
                }
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
            }
        }
        info!("event loop stopped");
    }

    /// Registers the tree and the advertisement with `peripheral`, runs the
    /// event loop until `shutdown` completes or the backend drops its event
    /// sender, then unregisters.
    pub async fn serve<P, F>(&mut self, peripheral: &mut P, shutdown: F) -> Result<(), Error>
    where
        P: PeripheralServer + ?Sized,
        F: Future<Output = ()>,
    {
        if !peripheral.is_powered().await? {
            return Err(Error::new(
                "Application",
                "adapter is not powered",
                ErrorType::Bluez,
            ));
        }
        self.powered = true;

        let (sender, receiver) = mpsc::channel(EVENT_CAPACITY);
        peripheral
            .register_application(self.layout(), sender, self.notification_sender())
            .await?;
        peripheral.register_advertisement(&self.advertisement).await?;

        self.run_until(receiver, shutdown).await;
        peripheral.unregister().await
    }
}

async fn sleep_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

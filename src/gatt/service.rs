use super::characteristic::Characteristic;
use uuid::Uuid;

/// Service definition; moved into an [`AttributeTree`](super::AttributeTree) on registration.
#[derive(Debug)]
pub struct Service {
    pub uuid: Uuid,
    pub primary: bool,
    pub characteristics: Vec<Characteristic>,
}

impl Service {
    pub fn new(uuid: Uuid, primary: bool, characteristics: Vec<Characteristic>) -> Self {
        Service {
            uuid,
            primary,
            characteristics,
        }
    }

    pub fn primary(uuid: Uuid) -> Self {
        Service::new(uuid, true, Vec::new())
    }

    pub fn with_characteristic(mut self, characteristic: Characteristic) -> Self {
        self.characteristics.push(characteristic);
        self
    }
}

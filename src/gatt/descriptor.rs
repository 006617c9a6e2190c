use std::fmt;

use uuid::Uuid;

use super::{
    characteristic::ValueLength,
    flags::Flags,
    server::{AttributeHandler, DefaultHandler},
};

pub struct Descriptor {
    pub uuid: Uuid,
    pub flags: Flags,
    pub value: Vec<u8>,
    pub length: ValueLength,
    pub handler: Box<dyn AttributeHandler>,
}

impl Descriptor {
    pub fn new(uuid: Uuid, flags: Flags, value: Vec<u8>) -> Self {
        Descriptor {
            uuid,
            flags,
            value,
            length: ValueLength::Any,
            handler: Box::new(DefaultHandler),
        }
    }

    pub fn with_length(mut self, length: ValueLength) -> Self {
        self.length = length;
        self
    }

    pub fn with_handler(mut self, handler: impl AttributeHandler + 'static) -> Self {
        self.handler = Box::new(handler);
        self
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("uuid", &self.uuid)
            .field("flags", &self.flags)
            .field("value", &self.value)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

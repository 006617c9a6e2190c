use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use super::{
    descriptor::Descriptor,
    flags::Flags,
    server::{AttributeHandler, DefaultHandler, Producer},
    GattError, GattResult,
};

/// Accepted length of an attribute value after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueLength {
    #[default]
    Any,
    Exact(usize),
    Between(usize, usize),
    Max(usize),
}

impl ValueLength {
    pub fn accepts(&self, len: usize) -> bool {
        match *self {
            ValueLength::Any => true,
            ValueLength::Exact(n) => len == n,
            ValueLength::Between(min, max) => (min..=max).contains(&len),
            ValueLength::Max(max) => len <= max,
        }
    }

    pub fn check(&self, len: usize) -> GattResult<()> {
        if self.accepts(len) {
            Ok(())
        } else {
            Err(GattError::InvalidValueLength {
                expected: *self,
                actual: len,
            })
        }
    }
}

impl fmt::Display for ValueLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueLength::Any => write!(f, "any length"),
            ValueLength::Exact(n) => write!(f, "{n} bytes"),
            ValueLength::Between(min, max) => write!(f, "{min}..={max} bytes"),
            ValueLength::Max(max) => write!(f, "at most {max} bytes"),
        }
    }
}

/// A producer the scheduler runs every `period` while the characteristic notifies.
pub struct PeriodicProducer {
    pub period: Duration,
    pub producer: Box<dyn Producer>,
}

impl fmt::Debug for PeriodicProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicProducer")
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

pub struct Characteristic {
    pub uuid: Uuid,
    pub flags: Flags,
    pub value: Vec<u8>,
    pub descriptors: Vec<Descriptor>,
    pub length: ValueLength,
    /// Push the current value when notifications are switched on.
    pub notify_on_subscribe: bool,
    pub handler: Box<dyn AttributeHandler>,
    pub producer: Option<PeriodicProducer>,
}

impl Characteristic {
    pub fn new(uuid: Uuid, flags: Flags, value: Vec<u8>, descriptors: Vec<Descriptor>) -> Self {
        Characteristic {
            uuid,
            flags,
            value,
            descriptors,
            length: ValueLength::Any,
            notify_on_subscribe: false,
            handler: Box::new(DefaultHandler),
            producer: None,
        }
    }

    pub fn with_descriptor(mut self, descriptor: Descriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn with_length(mut self, length: ValueLength) -> Self {
        self.length = length;
        self
    }

    pub fn with_handler(mut self, handler: impl AttributeHandler + 'static) -> Self {
        self.handler = Box::new(handler);
        self
    }

    pub fn with_producer(mut self, period: Duration, producer: impl Producer + 'static) -> Self {
        self.producer = Some(PeriodicProducer {
            period,
            producer: Box::new(producer),
        });
        self
    }

    pub fn notify_on_subscribe(mut self) -> Self {
        self.notify_on_subscribe = true;
        self
    }
}

impl fmt::Debug for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Characteristic")
            .field("uuid", &self.uuid)
            .field("flags", &self.flags)
            .field("value", &self.value)
            .field("descriptors", &self.descriptors)
            .field("length", &self.length)
            .field("notify_on_subscribe", &self.notify_on_subscribe)
            .field("producer", &self.producer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_length_bounds() {
        assert!(ValueLength::Any.accepts(0));
        assert!(ValueLength::Exact(1).accepts(1));
        assert!(!ValueLength::Exact(1).accepts(2));
        assert!(ValueLength::Between(2, 4).accepts(4));
        assert!(!ValueLength::Between(2, 4).accepts(1));
        assert!(!ValueLength::Max(3).accepts(4));
        assert_eq!(
            ValueLength::Exact(1).check(2),
            Err(GattError::InvalidValueLength {
                expected: ValueLength::Exact(1),
                actual: 2
            })
        );
    }
}

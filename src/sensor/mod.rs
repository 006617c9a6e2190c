//! Sensor plumbing. Blocking sources run on a worker thread and hand the
//! latest sample to the event loop through a single-slot [`Mailbox`].

pub mod gesture;
pub mod landmarks;
pub mod worker;

use std::sync::{Arc, Mutex, MutexGuard};

pub use gesture::{GestureSample, GestureTracker};
pub use landmarks::{HandLandmarks, Landmark, LandmarkSource, SyntheticHand};
pub use worker::SensorWorker;

/// Latest-value slot shared between a producer thread and the event loop.
/// Posting overwrites an unread value.
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Mailbox {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Mailbox {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Mailbox::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        // A panicked writer leaves at worst a stale sample behind.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores `value`, returning the unread value it replaced.
    pub fn post(&self, value: T) -> Option<T> {
        self.lock().replace(value)
    }

    /// Stores `value`, folding in an unread value with `merge(new, unread)`.
    pub fn post_merged(&self, value: T, merge: impl FnOnce(T, T) -> T) {
        let mut slot = self.lock();
        let merged = match slot.take() {
            Some(unread) => merge(value, unread),
            None => value,
        };
        *slot = Some(merged);
    }

    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_overwrites_unread_value() {
        let mailbox = Mailbox::new();
        let writer = mailbox.clone();
        assert_eq!(writer.post(1), None);
        assert_eq!(writer.post(2), Some(1));
        assert_eq!(mailbox.take(), Some(2));
        assert_eq!(mailbox.take(), None);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn post_merged_folds_unread_value() {
        let mailbox = Mailbox::new();
        mailbox.post_merged(1, |new, unread| new + unread);
        mailbox.post_merged(2, |new, unread| new + unread);
        assert_eq!(mailbox.take(), Some(3));
        mailbox.post_merged(4, |new, unread| new + unread);
        assert_eq!(mailbox.take(), Some(4));
    }

    #[test]
    fn unread_click_survives_newer_sample() {
        let mailbox = Mailbox::new();
        mailbox.post_merged(GestureSample { x: 1, y: 1, click: true }, GestureSample::merge);
        mailbox.post_merged(GestureSample { x: 9, y: 7, click: false }, GestureSample::merge);
        assert_eq!(mailbox.take(), Some(GestureSample { x: 9, y: 7, click: true }));
        mailbox.post_merged(GestureSample { x: 9, y: 8, click: false }, GestureSample::merge);
        assert_eq!(mailbox.take().map(|sample| sample.click), Some(false));
    }

    #[test]
    fn crosses_threads() {
        let mailbox = Mailbox::new();
        let writer = mailbox.clone();
        std::thread::spawn(move || {
            writer.post("sample");
        })
        .join()
        .unwrap();
        assert_eq!(mailbox.take(), Some("sample"));
    }
}

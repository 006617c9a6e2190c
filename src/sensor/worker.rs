use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use crate::{Error, ErrorType};

use super::{gesture::GestureSample, GestureTracker, LandmarkSource, Mailbox};

/// Polls a [`LandmarkSource`] on its own thread and posts gesture samples
/// to a mailbox. Dropping the worker stops and joins the thread.
#[derive(Debug)]
pub struct SensorWorker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SensorWorker {
    pub fn spawn(
        mut source: Box<dyn LandmarkSource>,
        mut tracker: GestureTracker,
        mailbox: Mailbox<GestureSample>,
        period: Duration,
    ) -> Result<Self, Error> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("gesture-sensor".to_string())
            .spawn(move || {
                info!("sensor worker started, period {:?}", period);
                while !stop_flag.load(Ordering::Relaxed) {
                    match source.next_frame() {
                        Ok(hand) => {
                            if let Some(sample) = tracker.update(hand.as_ref()) {
                                if sample.click {
                                    debug!("click at ({}, {})", sample.x, sample.y);
                                }
                                mailbox.post_merged(sample, GestureSample::merge);
                            }
                        }
                        Err(err) => warn!("ignoring sensor frame: {}", err),
                    }
                    thread::sleep(period);
                }
                info!("sensor worker stopped");
            })
            .map_err(|err| {
                Error::new(
                    "SensorWorker",
                    format!("failed to spawn sensor thread: {err}"),
                    ErrorType::Sensor,
                )
            })?;
        Ok(SensorWorker {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("sensor thread panicked");
            }
        }
    }
}

impl Drop for SensorWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SyntheticHand;

    #[test]
    fn posts_samples_until_stopped() {
        let mailbox = Mailbox::new();
        let mut worker = SensorWorker::spawn(
            Box::new(SyntheticHand::new()),
            GestureTracker::with_params(60, 10, 0.1),
            mailbox.clone(),
            Duration::from_millis(1),
        )
        .unwrap();

        let mut sample = None;
        for _ in 0..500 {
            sample = mailbox.take();
            if sample.is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        worker.stop();
        assert!(sample.is_some());
    }
}

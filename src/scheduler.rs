//! Periodic timers fired cooperatively from the event loop.
//!
//! Time is a [`Duration`] since the loop started. The loop asks for
//! [`Scheduler::next_deadline`], sleeps until then and calls
//! [`Scheduler::fire_due`] with the current time and the context the tasks
//! operate on.

use std::time::Duration;

use log::trace;

/// Shortest accepted period; keeps a zero period from firing on every pass.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

struct Timer<C> {
    handle: TimerHandle,
    period: Duration,
    next_due: Duration,
    task: Box<dyn FnMut(&mut C)>,
}

pub struct Scheduler<C> {
    timers: Vec<Timer<C>>,
    next_handle: u64,
    now: Duration,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Scheduler::new()
    }
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Scheduler {
            timers: Vec::new(),
            next_handle: 0,
            now: Duration::ZERO,
        }
    }

    /// First run is one `period` after the last `fire_due` time.
    pub fn schedule_periodic(
        &mut self,
        period: Duration,
        task: impl FnMut(&mut C) + 'static,
    ) -> TimerHandle {
        let period = period.max(MIN_PERIOD);
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.timers.push(Timer {
            handle,
            period,
            next_due: self.now + period,
            task: Box::new(task),
        });
        trace!("timer {:?} every {:?}", handle, period);
        handle
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.handle != handle);
        before != self.timers.len()
    }

    /// Stops every timer.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.iter().map(|timer| timer.next_due).min()
    }

    /// Fires every timer due at `now` once, earliest first (ties in
    /// registration order), and reschedules it to `now + period`.
    pub fn fire_due(&mut self, now: Duration, cx: &mut C) -> usize {
        self.now = self.now.max(now);
        let mut due: Vec<usize> = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.next_due <= now)
            .map(|(index, _)| index)
            .collect();
        due.sort_by_key(|&index| (self.timers[index].next_due, self.timers[index].handle.0));

        for &index in &due {
            let timer = &mut self.timers[index];
            (timer.task)(cx);
            timer.next_due = now + timer.period;
        }
        due.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn fires_in_due_order() {
        let mut scheduler: Scheduler<Vec<&'static str>> = Scheduler::new();
        scheduler.schedule_periodic(ms(30), |log| log.push("slow"));
        scheduler.schedule_periodic(ms(10), |log| log.push("fast"));
        let mut log = Vec::new();

        assert_eq!(scheduler.next_deadline(), Some(ms(10)));
        assert_eq!(scheduler.fire_due(ms(5), &mut log), 0);
        assert_eq!(scheduler.fire_due(ms(30), &mut log), 2);
        assert_eq!(log, vec!["fast", "slow"]);
        assert_eq!(scheduler.next_deadline(), Some(ms(40)));
    }

    #[test]
    fn late_fire_reschedules_from_now() {
        let mut scheduler: Scheduler<u32> = Scheduler::new();
        scheduler.schedule_periodic(ms(50), |count| *count += 1);
        let mut count = 0;
        // A stalled loop fires once, not once per missed period.
        assert_eq!(scheduler.fire_due(ms(170), &mut count), 1);
        assert_eq!(count, 1);
        assert_eq!(scheduler.next_deadline(), Some(ms(220)));
    }

    #[test]
    fn cancel_and_clear() {
        let mut scheduler: Scheduler<u32> = Scheduler::new();
        let first = scheduler.schedule_periodic(ms(10), |count| *count += 1);
        scheduler.schedule_periodic(ms(20), |count| *count += 10);
        assert!(scheduler.cancel(first));
        assert!(!scheduler.cancel(first));

        let mut count = 0;
        scheduler.fire_due(ms(20), &mut count);
        assert_eq!(count, 10);

        scheduler.clear();
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn zero_period_is_clamped() {
        let mut scheduler: Scheduler<u32> = Scheduler::new();
        scheduler.schedule_periodic(Duration::ZERO, |count| *count += 1);
        assert_eq!(scheduler.next_deadline(), Some(MIN_PERIOD));
    }
}

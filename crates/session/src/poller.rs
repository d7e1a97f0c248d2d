// Single-flight progress timer
//
// The poller never runs code itself. It owns at most one pending deadline; the session worker
// waits on `timer()` alongside its command queue and calls back in when the deadline passes.
// Stopping clears the deadline, so a stale firing cannot be observed after `stop`.

use crossbeam_channel::{after, never, Receiver};
use std::time::{Duration, Instant};

pub struct ProgressPoller {
    interval: Duration,
    deadline: Option<Instant>,
}

impl ProgressPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Affects the next scheduling only; a pending deadline is left alone
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Schedule one firing unless one is already pending. Returns true if newly scheduled.
    pub fn begin(&mut self, now: Instant) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(now + self.interval);
        true
    }

    /// Replace the pending deadline after a firing
    pub fn reschedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    /// Cancel the pending firing. Returns true if one was pending.
    pub fn stop(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Channel that yields once the pending deadline passes, or never when stopped
    pub fn timer(&self) -> Receiver<Instant> {
        match self.deadline {
            Some(deadline) => after(deadline.saturating_duration_since(Instant::now())),
            None => never(),
        }
    }
}

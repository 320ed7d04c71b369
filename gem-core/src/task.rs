//! Cancellable periodic tasks driven by an external clock.
//!
//! The UI loop owns every [`PeriodicTask`] and asks it whether a tick is due.
//! Work issued on a tick carries a [`TaskToken`]; once the task is cancelled or
//! restarted the token no longer validates, so results that arrive late are
//! dropped instead of mutating torn-down state.

use std::time::{Duration, Instant};

/// Generation captured when work is issued by a [`PeriodicTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskToken {
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct PeriodicTask {
    interval: Duration,
    next_due: Option<Instant>,
    generation: u64,
}

impl PeriodicTask {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
            generation: 0,
        }
    }

    /// Creates a task that is already running, first tick one interval after `now`.
    #[must_use]
    pub fn started(interval: Duration, now: Instant) -> Self {
        let mut task = Self::new(interval);
        task.start(now);
        task
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// (Re)starts the task. Tokens from any earlier run stop validating.
    pub fn start(&mut self, now: Instant) -> TaskToken {
        self.generation = self.generation.wrapping_add(1);
        self.next_due = Some(now + self.interval);
        self.token()
    }

    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn token(&self) -> TaskToken {
        TaskToken {
            generation: self.generation,
        }
    }

    pub fn is_live(&self, token: TaskToken) -> bool {
        self.is_running() && token.generation == self.generation
    }

    /// Returns `true` when a tick is due at `now` and schedules the next one.
    ///
    /// Ticks missed while the loop was busy collapse into a single tick.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }

        let mut next = due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next_due = Some(next);
        true
    }

    pub fn until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}

use std::time::{Duration, Instant};

use crate::task::{PeriodicTask, TaskToken};

pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(1000);
pub const MAX_HEALTH_ATTEMPTS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthPhase {
    Idle,
    Polling { attempts: u32 },
    Healthy,
    TimedOut,
}

impl HealthPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, HealthPhase::Healthy | HealthPhase::TimedOut)
    }
}

/// Effect of feeding one probe result into a [`HealthCheck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    /// The result belongs to a run that is no longer polling.
    Stale,
    Retrying { attempts: u32 },
    Healthy,
    TimedOut,
}

/// Bounded-retry readiness check for the backend.
///
/// `Idle -> Polling -> {Healthy, TimedOut}`. Every tick of the inner task asks
/// the owner to issue one probe; the probe's result is reported back with the
/// token it was issued under.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    phase: HealthPhase,
    max_attempts: u32,
    task: PeriodicTask,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthCheck {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(HEALTH_CHECK_INTERVAL, MAX_HEALTH_ATTEMPTS)
    }

    #[must_use]
    pub fn with_limits(interval: Duration, max_attempts: u32) -> Self {
        Self {
            phase: HealthPhase::Idle,
            max_attempts: max_attempts.max(1),
            task: PeriodicTask::new(interval),
        }
    }

    pub fn phase(&self) -> HealthPhase {
        self.phase
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.phase, HealthPhase::Polling { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self.phase {
            HealthPhase::Polling { attempts } => attempts,
            HealthPhase::TimedOut => self.max_attempts,
            HealthPhase::Idle | HealthPhase::Healthy => 0,
        }
    }

    /// Enters `Polling` with a fresh attempt counter.
    pub fn begin(&mut self, now: Instant) -> TaskToken {
        self.phase = HealthPhase::Polling { attempts: 0 };
        self.task.start(now)
    }

    /// Abandons the current run; in-flight results become stale.
    pub fn cancel(&mut self) {
        self.task.cancel();
        if self.is_polling() {
            self.phase = HealthPhase::Idle;
        }
    }

    /// Returns a token when a probe should be issued at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<TaskToken> {
        if !self.is_polling() {
            return None;
        }
        self.task.poll(now).then(|| self.task.token())
    }

    pub fn record(&mut self, token: TaskToken, healthy: bool) -> HealthTransition {
        let HealthPhase::Polling { attempts } = self.phase else {
            return HealthTransition::Stale;
        };
        if !self.task.is_live(token) {
            return HealthTransition::Stale;
        }

        if healthy {
            self.task.cancel();
            self.phase = HealthPhase::Healthy;
            return HealthTransition::Healthy;
        }

        let attempts = attempts + 1;
        if attempts >= self.max_attempts {
            self.task.cancel();
            self.phase = HealthPhase::TimedOut;
            return HealthTransition::TimedOut;
        }

        self.phase = HealthPhase::Polling { attempts };
        HealthTransition::Retrying { attempts }
    }

    pub fn until_next_tick(&self, now: Instant) -> Option<Duration> {
        if self.is_polling() {
            self.task.until_due(now)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(check: &mut HealthCheck, t0: Instant, n: u32) -> TaskToken {
        check
            .poll(t0 + HEALTH_CHECK_INTERVAL * n)
            .expect("tick should be due")
    }

    #[test]
    fn nineteen_failures_then_success_is_healthy() {
        let t0 = Instant::now();
        let mut check = HealthCheck::new();
        check.begin(t0);

        for n in 1..=19 {
            let token = tick(&mut check, t0, n);
            assert_eq!(
                check.record(token, false),
                HealthTransition::Retrying { attempts: n }
            );
        }

        let token = tick(&mut check, t0, 20);
        assert_eq!(check.record(token, true), HealthTransition::Healthy);
        assert_eq!(check.phase(), HealthPhase::Healthy);
        assert_eq!(check.poll(t0 + HEALTH_CHECK_INTERVAL * 21), None);
    }

    #[test]
    fn twenty_failures_time_out_exactly_at_the_bound() {
        let t0 = Instant::now();
        let mut check = HealthCheck::new();
        check.begin(t0);

        for n in 1..=19 {
            let token = tick(&mut check, t0, n);
            check.record(token, false);
            assert!(check.is_polling(), "timed out early at attempt {n}");
        }

        let token = tick(&mut check, t0, 20);
        assert_eq!(check.record(token, false), HealthTransition::TimedOut);
        assert_eq!(check.phase(), HealthPhase::TimedOut);
        assert_eq!(check.poll(t0 + HEALTH_CHECK_INTERVAL * 21), None);
    }

    #[test]
    fn late_result_after_terminal_state_is_stale() {
        let t0 = Instant::now();
        let mut check = HealthCheck::new();
        check.begin(t0);

        let slow = tick(&mut check, t0, 1);
        let fast = tick(&mut check, t0, 2);
        assert_eq!(check.record(fast, true), HealthTransition::Healthy);
        assert_eq!(check.record(slow, false), HealthTransition::Stale);
        assert_eq!(check.phase(), HealthPhase::Healthy);
    }

    #[test]
    fn result_from_previous_run_is_ignored_after_restart() {
        let t0 = Instant::now();
        let mut check = HealthCheck::new();
        check.begin(t0);
        let old = tick(&mut check, t0, 1);

        check.begin(t0 + HEALTH_CHECK_INTERVAL);
        assert_eq!(check.record(old, true), HealthTransition::Stale);
        assert_eq!(check.phase(), HealthPhase::Polling { attempts: 0 });
    }

    #[test]
    fn cancel_returns_to_idle() {
        let t0 = Instant::now();
        let mut check = HealthCheck::new();
        check.begin(t0);
        let token = tick(&mut check, t0, 1);
        check.cancel();
        assert_eq!(check.phase(), HealthPhase::Idle);
        assert_eq!(check.record(token, true), HealthTransition::Stale);
    }
}

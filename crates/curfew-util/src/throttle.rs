//! Last-fired gates for rate-limited effects
//!
//! Every throttled effect in the daemon (lock cooldown, notification
//! interval) is the same primitive: remember when it last fired and refuse
//! to fire again until a minimum interval has passed.

use std::time::Duration;

use crate::MonotonicInstant;

/// Minimum-interval gate keyed on the last time it fired
#[derive(Debug, Clone)]
pub struct Throttle {
    /// Minimum time between two firings
    min_interval: Duration,
    /// Last time the gate fired. `None` means "long ago".
    last_fired: Option<MonotonicInstant>,
}

impl Throttle {
    /// Create a gate that has never fired, so the first attempt always passes
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_fired: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_fired(&self) -> Option<MonotonicInstant> {
        self.last_fired
    }

    /// Whether the gate would let an effect through at `now`
    pub fn is_open(&self, now: MonotonicInstant) -> bool {
        match self.last_fired {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        }
    }

    /// Record a firing at `now` regardless of the gate state
    pub fn mark(&mut self, now: MonotonicInstant) {
        self.last_fired = Some(now);
    }

    /// Fire if open. Returns `true` if the caller may perform the effect.
    pub fn try_fire(&mut self, now: MonotonicInstant) -> bool {
        if self.is_open(now) {
            self.mark(now);
            true
        } else {
            false
        }
    }

    /// Time until the gate opens again, zero if already open
    pub fn remaining(&self, now: MonotonicInstant) -> Duration {
        match self.last_fired {
            None => Duration::ZERO,
            Some(last) => self
                .min_interval
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_always_passes() {
        let mut throttle = Throttle::new(Duration::from_secs(600));
        let now = MonotonicInstant::now();

        assert!(throttle.is_open(now));
        assert!(throttle.try_fire(now));
        assert_eq!(throttle.last_fired(), Some(now));
    }

    #[test]
    fn suppresses_within_interval() {
        let mut throttle = Throttle::new(Duration::from_secs(600));
        let start = MonotonicInstant::now();

        assert!(throttle.try_fire(start));
        assert!(!throttle.try_fire(start + Duration::from_secs(100)));
        assert!(!throttle.try_fire(start + Duration::from_secs(550)));
        assert!(throttle.try_fire(start + Duration::from_secs(650)));
    }

    #[test]
    fn boundary_counts_as_open() {
        let mut throttle = Throttle::new(Duration::from_secs(60));
        let start = MonotonicInstant::now();
        throttle.mark(start);

        assert!(!throttle.is_open(start + Duration::from_secs(59)));
        assert!(throttle.is_open(start + Duration::from_secs(60)));
    }

    #[test]
    fn remaining_counts_down() {
        let mut throttle = Throttle::new(Duration::from_secs(60));
        let start = MonotonicInstant::now();
        assert_eq!(throttle.remaining(start), Duration::ZERO);

        throttle.mark(start);
        assert_eq!(
            throttle.remaining(start + Duration::from_secs(20)),
            Duration::from_secs(40)
        );
        assert_eq!(
            throttle.remaining(start + Duration::from_secs(90)),
            Duration::ZERO
        );
    }
}

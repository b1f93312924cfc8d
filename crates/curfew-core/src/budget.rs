//! Adaptive budget controller
//!
//! Keeps the enforceable limit for one ledger (session or daily). Triggers
//! pull the limit down toward a floor; once the relaxation deadline passes
//! it grows back geometrically until it reaches the baseline again.

use curfew_api::{BreachKind, LimitStatus, TightenKind};
use curfew_config::BudgetPolicy;
use curfew_util::MonotonicInstant;
use std::time::Duration;

/// Smallest relaxation step, so tiny limits still recover
const MIN_RELAX_STEP: Duration = Duration::from_secs(1);

/// Result of a relaxation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaxStep {
    pub limit: Duration,
    /// The limit is back at baseline
    pub recovered: bool,
}

/// Enforceable limit for one ledger
#[derive(Debug, Clone)]
pub struct BudgetController {
    kind: BreachKind,
    baseline: Duration,
    current: Duration,
    floor: Duration,
    soft_factor: f64,
    hard_factor: f64,
    relaxation_period: Duration,
    growth_rate: f64,
    /// Present iff the limit is below baseline
    last_tightened_at: Option<MonotonicInstant>,
    relaxation_deadline: Option<MonotonicInstant>,
}

impl BudgetController {
    pub fn new(kind: BreachKind, baseline: Duration, policy: &BudgetPolicy) -> Self {
        Self {
            kind,
            baseline,
            current: baseline,
            floor: policy.floor.min(baseline),
            soft_factor: policy.soft_factor,
            hard_factor: policy.hard_factor,
            relaxation_period: policy.relaxation_period,
            growth_rate: policy.growth_rate,
            last_tightened_at: None,
            relaxation_deadline: None,
        }
    }

    pub fn kind(&self) -> BreachKind {
        self.kind
    }

    pub fn baseline(&self) -> Duration {
        self.baseline
    }

    pub fn current_limit(&self) -> Duration {
        self.current
    }

    pub fn floor(&self) -> Duration {
        self.floor
    }

    pub fn is_tightened(&self) -> bool {
        self.last_tightened_at.is_some()
    }

    pub fn last_tightened_at(&self) -> Option<MonotonicInstant> {
        self.last_tightened_at
    }

    pub fn relaxation_deadline(&self) -> Option<MonotonicInstant> {
        self.relaxation_deadline
    }

    pub fn factor_for(&self, kind: TightenKind) -> f64 {
        match kind {
            TightenKind::Soft => self.soft_factor,
            TightenKind::Hard => self.hard_factor,
        }
    }

    /// Limit a tighten with `factor` and `floor` would aim for
    pub fn tighten_target(&self, factor: f64, floor: Duration) -> Duration {
        scale(self.baseline, factor)
            .unwrap_or(self.baseline)
            .max(floor)
            .min(self.baseline)
    }

    /// Lower the limit to `max(baseline * factor, floor)` and re-arm the
    /// relaxation deadline. Never raises the limit. Returns the new limit if
    /// it changed.
    pub fn tighten(
        &mut self,
        factor: f64,
        floor: Duration,
        now: MonotonicInstant,
    ) -> Option<Duration> {
        let target = self.tighten_target(factor, floor);
        let previous = self.current;
        self.current = self.current.min(target);

        if self.current < self.baseline {
            self.last_tightened_at = Some(now);
            self.relaxation_deadline = now.checked_add(self.relaxation_period);
        }

        (self.current != previous).then_some(self.current)
    }

    /// Apply every trigger that fired this tick. The most restrictive one
    /// wins. Returns the winning kind and new limit if the limit changed.
    pub fn apply_triggers(
        &mut self,
        triggers: &[TightenKind],
        now: MonotonicInstant,
    ) -> Option<(TightenKind, Duration)> {
        let (kind, factor) = triggers
            .iter()
            .map(|&kind| (kind, self.factor_for(kind)))
            .min_by_key(|&(_, factor)| self.tighten_target(factor, self.floor))?;

        self.tighten(factor, self.floor, now)
            .map(|limit| (kind, limit))
    }

    /// Grow the limit one step if the relaxation deadline has passed
    pub fn maybe_relax(&mut self, now: MonotonicInstant) -> Option<RelaxStep> {
        self.last_tightened_at?;
        let deadline = self.relaxation_deadline?;
        if now < deadline {
            return None;
        }

        // Anything past the representable range is past baseline too
        let grown = match (
            scale(self.current, self.growth_rate),
            self.current.checked_add(MIN_RELAX_STEP),
        ) {
            (Some(scaled), Some(stepped)) => scaled.max(stepped),
            _ => self.baseline,
        };

        if grown >= self.baseline {
            self.current = self.baseline;
            self.last_tightened_at = None;
            self.relaxation_deadline = None;
            Some(RelaxStep {
                limit: self.current,
                recovered: true,
            })
        } else {
            self.current = grown;
            self.relaxation_deadline = now.checked_add(self.relaxation_period);
            Some(RelaxStep {
                limit: self.current,
                recovered: false,
            })
        }
    }

    /// Boundary equality counts as a breach
    pub fn is_breached(&self, used: Duration) -> bool {
        used >= self.current
    }

    pub fn remaining(&self, used: Duration) -> Duration {
        self.current.saturating_sub(used)
    }

    pub fn status(&self, used: Duration) -> LimitStatus {
        LimitStatus {
            kind: self.kind,
            current: self.current,
            baseline: self.baseline,
            used,
            tightened: self.is_tightened(),
        }
    }
}

/// `d * factor`, or `None` if the result is negative, NaN or too large
fn scale(d: Duration, factor: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(d.as_secs_f64() * factor).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_secs(60);

    fn policy() -> BudgetPolicy {
        BudgetPolicy {
            soft_factor: 0.5,
            hard_factor: 0.25,
            floor: MIN,
            relaxation_period: Duration::from_secs(1800),
            growth_rate: 1.1,
        }
    }

    fn controller(baseline: Duration) -> BudgetController {
        BudgetController::new(BreachKind::Daily, baseline, &policy())
    }

    #[test]
    fn starts_at_baseline() {
        let budget = controller(MIN * 15);
        assert_eq!(budget.current_limit(), MIN * 15);
        assert!(!budget.is_tightened());
        assert!(budget.relaxation_deadline().is_none());
    }

    #[test]
    fn tighten_uses_factor_or_floor() {
        let now = MonotonicInstant::now();

        let mut budget = controller(MIN * 20);
        assert_eq!(budget.tighten(0.25, MIN, now), Some(MIN * 5));
        assert!(budget.is_tightened());
        assert_eq!(budget.relaxation_deadline(), Some(now + Duration::from_secs(1800)));

        let mut small = controller(MIN * 2);
        assert_eq!(small.tighten(0.25, MIN, now), Some(MIN));
    }

    #[test]
    fn tighten_never_loosens() {
        let now = MonotonicInstant::now();
        let mut budget = controller(MIN * 20);
        budget.tighten(0.25, MIN, now);

        let later = now + Duration::from_secs(10);
        assert_eq!(budget.tighten(0.5, MIN, later), None);
        assert_eq!(budget.current_limit(), MIN * 5);
        // Re-armed even without a change
        assert_eq!(
            budget.relaxation_deadline(),
            Some(later + Duration::from_secs(1800))
        );
    }

    #[test]
    fn factor_one_leaves_budget_untightened() {
        let mut budget = controller(MIN * 10);
        assert_eq!(budget.tighten(1.0, MIN, MonotonicInstant::now()), None);
        assert!(!budget.is_tightened());
    }

    #[test]
    fn relax_waits_for_deadline() {
        let now = MonotonicInstant::now();
        let mut budget = controller(MIN * 20);
        budget.tighten(0.25, MIN, now);

        assert_eq!(budget.maybe_relax(now + Duration::from_secs(1799)), None);
        assert_eq!(budget.current_limit(), MIN * 5);
    }

    #[test]
    fn relax_grows_to_baseline_then_stops() {
        let t0 = MonotonicInstant::now();
        let baseline = MIN * 20;
        let mut budget = controller(baseline);
        budget.tighten(0.25, MIN, t0);

        let mut now;
        let mut previous = budget.current_limit();
        let mut steps = 0;
        loop {
            now = budget.relaxation_deadline().expect("still tightened");
            let step = budget.maybe_relax(now).expect("deadline reached");
            assert!(step.limit > previous);
            assert!(step.limit <= baseline);
            previous = step.limit;
            steps += 1;
            if step.recovered {
                break;
            }
            assert!(steps < 100);
        }

        assert_eq!(budget.current_limit(), baseline);
        assert!(!budget.is_tightened());
        assert!(budget.relaxation_deadline().is_none());
        assert_eq!(budget.maybe_relax(now + Duration::from_secs(86400)), None);
        assert_eq!(budget.current_limit(), baseline);
    }

    #[test]
    fn huge_relaxation_period_leaves_deadline_unset() {
        let now = MonotonicInstant::now();
        let mut budget = BudgetController::new(
            BreachKind::Daily,
            MIN * 20,
            &BudgetPolicy {
                relaxation_period: Duration::MAX,
                ..policy()
            },
        );

        assert_eq!(budget.tighten(0.25, MIN, now), Some(MIN * 5));
        assert!(budget.is_tightened());
        assert!(budget.relaxation_deadline().is_none());
        assert_eq!(budget.maybe_relax(now + Duration::from_secs(86400)), None);
        assert_eq!(budget.current_limit(), MIN * 5);
    }

    #[test]
    fn huge_growth_rate_recovers_baseline() {
        let now = MonotonicInstant::now();
        let mut budget = BudgetController::new(
            BreachKind::Session,
            MIN * 20,
            &BudgetPolicy {
                growth_rate: 1e300,
                ..policy()
            },
        );
        budget.tighten(0.25, MIN, now);

        let deadline = budget.relaxation_deadline().expect("tightened");
        let step = budget.maybe_relax(deadline).expect("deadline reached");
        assert!(step.recovered);
        assert_eq!(step.limit, MIN * 20);
    }

    #[test]
    fn near_max_baseline_does_not_overflow() {
        let now = MonotonicInstant::now();
        let mut budget = BudgetController::new(
            BreachKind::Daily,
            Duration::MAX,
            &BudgetPolicy {
                growth_rate: 10.0,
                ..policy()
            },
        );

        // Scaling by 1.0 rounds past Duration::MAX in f64 and saturates to baseline
        assert_eq!(budget.tighten_target(1.0, MIN), Duration::MAX);

        let tightened = budget.tighten(0.25, MIN, now).expect("tightened");
        assert!(tightened < Duration::MAX);

        let mut steps = 0;
        while let Some(deadline) = budget.relaxation_deadline() {
            let step = budget.maybe_relax(deadline).expect("deadline reached");
            steps += 1;
            if step.recovered {
                break;
            }
            assert!(steps < 10);
        }
        assert_eq!(budget.current_limit(), Duration::MAX);
        assert!(!budget.is_tightened());
    }

    #[test]
    fn most_restrictive_trigger_wins() {
        let now = MonotonicInstant::now();
        let mut budget = controller(MIN * 20);

        let result = budget.apply_triggers(&[TightenKind::Soft, TightenKind::Hard], now);
        assert_eq!(result, Some((TightenKind::Hard, MIN * 5)));

        assert_eq!(budget.apply_triggers(&[], now), None);
    }

    #[test]
    fn breach_includes_boundary() {
        let mut budget = controller(MIN * 10);
        budget.tighten(0.5, MIN, MonotonicInstant::now());

        assert!(!budget.is_breached(MIN * 5 - Duration::from_millis(1)));
        assert!(budget.is_breached(MIN * 5));
        assert!(budget.is_breached(MIN * 6));
        assert_eq!(budget.remaining(MIN * 3), MIN * 2);
        assert_eq!(budget.remaining(MIN * 6), Duration::ZERO);
    }

    #[test]
    fn status_reports_limits() {
        let mut budget = controller(MIN * 10);
        budget.tighten(0.5, MIN, MonotonicInstant::now());

        let status = budget.status(MIN);
        assert_eq!(status.current, MIN * 5);
        assert_eq!(status.baseline, MIN * 10);
        assert!(status.tightened);
    }
}

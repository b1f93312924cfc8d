//! Core enforcement engine
//!
//! `CoreEngine::tick` is a pure state transition over one probe sample: it
//! owns the session tracker, the daily ledger, the budget controllers and
//! both throttles, and tells the caller which effects are due. Performing
//! those effects is the enforcement loop's job.

use curfew_api::{
    BreachKind, CooldownMode, LimitStatus, STATUS_VERSION, SessionEndReason, StatusSnapshot,
    TightenKind,
};
use curfew_config::Policy;
use curfew_store::{AuditEvent, AuditEventType, Store};
use curfew_util::{MonotonicInstant, SessionId, Throttle, UserName, format_duration};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{BudgetController, CoreEvent, DailyLedger, SessionTracker, SessionTransition};

/// One probe sample
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    pub now: MonotonicInstant,
    pub probe_active: bool,
    pub aux_active: bool,
}

/// A limit that was reached this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breach {
    pub kind: BreachKind,
    pub used: Duration,
    pub limit: Duration,
}

/// The adaptive session enforcement engine
pub struct CoreEngine {
    user: UserName,
    store: Arc<dyn Store>,

    session: SessionTracker,
    ledger: DailyLedger,
    session_budget: Option<BudgetController>,
    daily_budget: Option<BudgetController>,

    cooldown_mode: CooldownMode,
    lock_cooldown: Throttle,
    notify_throttle: Throttle,
    status_updates: bool,

    /// Upper bound on the credit a single tick can earn
    max_credit: Duration,
    last_tick: Option<MonotonicInstant>,
    /// Last successfully computed daily total
    daily_total: Option<Duration>,
}

impl CoreEngine {
    /// Create a new engine
    pub fn new(policy: &Policy, ledger: DailyLedger, store: Arc<dyn Store>) -> Self {
        let limits = &policy.limits;
        let session_budget = limits
            .session_limit
            .map(|limit| BudgetController::new(BreachKind::Session, limit, &policy.budget));
        let daily_budget = limits
            .daily_limit
            .map(|limit| BudgetController::new(BreachKind::Daily, limit, &policy.budget));

        info!(
            user = %policy.target.user,
            scope = ?limits.scope,
            session_limit_secs = limits.session_limit.map(|d| d.as_secs()),
            daily_limit_secs = limits.daily_limit.map(|d| d.as_secs()),
            cooldown_mode = ?policy.lock.cooldown_mode,
            "Core engine initialized"
        );

        let _ = store.append_audit(AuditEvent::new(AuditEventType::PolicyLoaded {
            user: policy.target.user.clone(),
            session_limit: limits.session_limit,
            daily_limit: limits.daily_limit,
        }));

        let daily_total = ledger.get().ok();

        Self {
            user: policy.target.user.clone(),
            store,
            session: SessionTracker::new(),
            ledger,
            session_budget,
            daily_budget,
            cooldown_mode: policy.lock.cooldown_mode,
            lock_cooldown: Throttle::new(policy.lock.cooldown),
            notify_throttle: Throttle::new(policy.notify.interval),
            status_updates: policy.notify.status_updates,
            max_credit: policy.daemon.tick_interval * 2,
            last_tick: None,
            daily_total,
        }
    }

    pub fn user(&self) -> &UserName {
        &self.user
    }

    pub fn session(&self) -> &SessionTracker {
        &self.session
    }

    pub fn ledger(&self) -> &DailyLedger {
        &self.ledger
    }

    pub fn budget(&self, kind: BreachKind) -> Option<&BudgetController> {
        match kind {
            BreachKind::Session => self.session_budget.as_ref(),
            BreachKind::Daily => self.daily_budget.as_ref(),
        }
    }

    pub fn budget_mut(&mut self, kind: BreachKind) -> Option<&mut BudgetController> {
        match kind {
            BreachKind::Session => self.session_budget.as_mut(),
            BreachKind::Daily => self.daily_budget.as_mut(),
        }
    }

    fn budgets(&self) -> impl Iterator<Item = &BudgetController> + '_ {
        self.session_budget.iter().chain(self.daily_budget.iter())
    }

    fn budgets_mut(&mut self) -> impl Iterator<Item = &mut BudgetController> + '_ {
        self.session_budget
            .iter_mut()
            .chain(self.daily_budget.iter_mut())
    }

    /// Advance the engine by one probe sample
    pub fn tick(&mut self, input: TickInput) -> Vec<CoreEvent> {
        let now = input.now;
        let mut events = Vec::new();

        // Session tracking
        match self.session.observe(input.probe_active, now) {
            SessionTransition::Started { session_id } => {
                self.record_session_started(session_id, &mut events);
            }
            SessionTransition::Ended {
                session_id,
                duration,
            } => {
                self.record_session_ended(
                    session_id,
                    SessionEndReason::Inactive,
                    duration,
                    &mut events,
                );
            }
            SessionTransition::Continued { .. } | SessionTransition::Idle => {}
        }

        // Accumulation. `None` means the date is unknown this tick.
        let credit = self.credit_since_last_tick(now);
        let daily_used = if self.session.is_active() {
            match self.ledger.add(credit) {
                Ok(total) => Some(total),
                Err(error) => {
                    warn!(error = %error, "Cannot determine today's date, skipping accumulation");
                    let _ = self
                        .store
                        .append_audit(AuditEvent::new(AuditEventType::ClockUnavailable {
                            reason: error.to_string(),
                        }));
                    events.push(CoreEvent::ClockUnavailable { error });
                    None
                }
            }
        } else {
            self.ledger.get().ok()
        };
        if daily_used.is_some() {
            self.daily_total = daily_used;
        }

        // Breach evaluation
        let session_used = self.session.current_duration(now);
        let breach = if self.session.is_active() {
            self.find_breach(session_used, daily_used)
        } else {
            None
        };

        let mut triggers = Vec::new();
        if let Some(breach) = breach {
            let before = events.len();
            if self.handle_breach(breach, now, &mut events) {
                triggers.push(TightenKind::Hard);
            }
            let locking = events[before..]
                .iter()
                .any(|e| matches!(e, CoreEvent::LockDue { .. }));

            if self.notify_throttle.try_fire(now) {
                events.push(CoreEvent::NotifyDue {
                    message: self.breach_message(&breach, locking),
                });
            }
        } else if input.aux_active && self.session.is_active() {
            triggers.push(TightenKind::Soft);
        }

        self.apply_triggers(&triggers, now, &mut events);
        self.relax(now, &mut events);

        if breach.is_none()
            && self.status_updates
            && self.session.is_active()
            && self.notify_throttle.try_fire(now)
        {
            events.push(CoreEvent::NotifyDue {
                message: self.status_message(now),
            });
        }

        events
    }

    /// End the current session because the daemon is stopping
    pub fn shutdown(&mut self, now: MonotonicInstant) -> Option<CoreEvent> {
        let (session_id, duration) = self.session.reset(now)?;
        let mut events = Vec::with_capacity(1);
        self.record_session_ended(
            session_id,
            SessionEndReason::DaemonShutdown,
            duration,
            &mut events,
        );
        events.pop()
    }

    /// Current state for logging and inspection
    pub fn status(&self, now: MonotonicInstant) -> StatusSnapshot {
        let session_duration = self.session.current_duration(now);
        let daily_used = self.daily_total.unwrap_or(Duration::ZERO);

        let limits: Vec<LimitStatus> = self
            .budgets()
            .map(|budget| match budget.kind() {
                BreachKind::Session => budget.status(session_duration),
                BreachKind::Daily => budget.status(daily_used),
            })
            .collect();

        StatusSnapshot {
            version: STATUS_VERSION,
            timestamp: curfew_util::now(),
            user: self.user.clone(),
            session_id: self.session.session_id().cloned(),
            session_active: self.session.is_active(),
            session_duration,
            daily_total: self.daily_total,
            limits,
        }
    }

    fn credit_since_last_tick(&mut self, now: MonotonicInstant) -> Duration {
        let credit = match self.last_tick {
            Some(last) => now.saturating_duration_since(last).min(self.max_credit),
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);
        credit
    }

    fn find_breach(&self, session_used: Duration, daily_used: Option<Duration>) -> Option<Breach> {
        if let Some(budget) = &self.session_budget
            && budget.is_breached(session_used)
        {
            return Some(Breach {
                kind: BreachKind::Session,
                used: session_used,
                limit: budget.current_limit(),
            });
        }

        if let (Some(budget), Some(used)) = (&self.daily_budget, daily_used)
            && budget.is_breached(used)
        {
            return Some(Breach {
                kind: BreachKind::Daily,
                used,
                limit: budget.current_limit(),
            });
        }

        None
    }

    /// Decide between locking and suppressing. Returns `true` if the lock
    /// opened the cooldown window and the hard tighten applies.
    fn handle_breach(
        &mut self,
        breach: Breach,
        now: MonotonicInstant,
        events: &mut Vec<CoreEvent>,
    ) -> bool {
        let cooldown_open = self.lock_cooldown.is_open(now);

        if !cooldown_open && self.cooldown_mode == CooldownMode::SuppressRelock {
            let cooldown_remaining = self.lock_cooldown.remaining(now);
            debug!(
                breach = %breach.kind,
                used_secs = breach.used.as_secs(),
                cooldown_remaining_secs = cooldown_remaining.as_secs(),
                "Limit reached inside lock cooldown, not locking"
            );
            let _ = self
                .store
                .append_audit(AuditEvent::new(AuditEventType::LockSuppressed {
                    breach: breach.kind,
                    used: breach.used,
                }));
            events.push(CoreEvent::LockSuppressed {
                breach: breach.kind,
                used: breach.used,
                cooldown_remaining,
            });
            return false;
        }

        info!(
            user = %self.user,
            breach = %breach.kind,
            used = %format_duration(breach.used),
            limit = %format_duration(breach.limit),
            "Limit reached, locking screen"
        );
        events.push(CoreEvent::LockDue {
            breach: breach.kind,
            used: breach.used,
            limit: breach.limit,
        });

        if let Some((session_id, duration)) = self.session.reset(now) {
            self.record_session_ended(session_id, SessionEndReason::Locked, duration, events);
        }

        if cooldown_open {
            self.lock_cooldown.mark(now);
        }
        cooldown_open
    }

    fn apply_triggers(
        &mut self,
        triggers: &[TightenKind],
        now: MonotonicInstant,
        events: &mut Vec<CoreEvent>,
    ) {
        if triggers.is_empty() {
            return;
        }

        let changes: Vec<(TightenKind, BreachKind, Duration)> = self
            .budgets_mut()
            .filter_map(|budget| {
                budget
                    .apply_triggers(triggers, now)
                    .map(|(kind, limit)| (kind, budget.kind(), limit))
            })
            .collect();

        for (kind, breach, limit) in changes {
            info!(
                kind = %kind,
                breach = %breach,
                limit = %format_duration(limit),
                "Limit tightened"
            );
            let _ = self
                .store
                .append_audit(AuditEvent::new(AuditEventType::LimitTightened {
                    kind,
                    breach,
                    limit,
                }));
            events.push(CoreEvent::Tightened {
                kind,
                breach,
                limit,
            });
        }
    }

    fn relax(&mut self, now: MonotonicInstant, events: &mut Vec<CoreEvent>) {
        let steps: Vec<_> = self
            .budgets_mut()
            .filter_map(|budget| budget.maybe_relax(now).map(|step| (budget.kind(), step)))
            .collect();

        for (breach, step) in steps {
            info!(
                breach = %breach,
                limit = %format_duration(step.limit),
                recovered = step.recovered,
                "Limit relaxed"
            );
            let _ = self
                .store
                .append_audit(AuditEvent::new(AuditEventType::LimitRelaxed {
                    breach,
                    limit: step.limit,
                    recovered: step.recovered,
                }));
            events.push(CoreEvent::Relaxed {
                breach,
                limit: step.limit,
                recovered: step.recovered,
            });
        }
    }

    fn record_session_started(&self, session_id: SessionId, events: &mut Vec<CoreEvent>) {
        info!(user = %self.user, session_id = %session_id, "Session started");
        let _ = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::SessionStarted {
                session_id: session_id.clone(),
            }));
        events.push(CoreEvent::SessionStarted { session_id });
    }

    fn record_session_ended(
        &self,
        session_id: SessionId,
        reason: SessionEndReason,
        duration: Duration,
        events: &mut Vec<CoreEvent>,
    ) {
        info!(
            user = %self.user,
            session_id = %session_id,
            reason = ?reason,
            duration = %format_duration(duration),
            "Session ended"
        );
        let _ = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::SessionEnded {
                session_id: session_id.clone(),
                reason,
                duration,
            }));
        events.push(CoreEvent::SessionEnded {
            session_id,
            reason,
            duration,
        });
    }

    fn breach_message(&self, breach: &Breach, locking: bool) -> String {
        let scope = match breach.kind {
            BreachKind::Session => "session",
            BreachKind::Daily => "daily",
        };
        let action = if locking {
            "Locking screen."
        } else {
            "Screen was locked recently."
        };
        format!(
            "{} reached the {} limit: {} used of {}. {}",
            self.user,
            scope,
            format_duration(breach.used),
            format_duration(breach.limit),
            action
        )
    }

    fn status_message(&self, now: MonotonicInstant) -> String {
        let mut parts = vec![format!(
            "{} active for {}",
            self.user,
            format_duration(self.session.current_duration(now))
        )];
        if let Some(total) = self.daily_total {
            parts.push(format!("{} today", format_duration(total)));
        }
        for budget in self.budgets() {
            parts.push(format!(
                "{} limit {}{}",
                budget.kind(),
                format_duration(budget.current_limit()),
                if budget.is_tightened() { " (tightened)" } else { "" }
            ));
        }
        parts.join(", ")
    }
}

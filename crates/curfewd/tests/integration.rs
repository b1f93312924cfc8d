//! Integration tests for curfewd
//!
//! These tests drive the enforcement loop end to end: a parsed config, the
//! real engine and audit store, and mock collaborators.

use chrono::NaiveDate;
use curfew_api::{BreachKind, LockOutcome, SessionEndReason};
use curfew_config::{Policy, parse_config};
use curfew_core::{Collaborators, CoreEngine, CoreEvent, DailyLedger, EnforcementLoop};
use curfew_host_api::{MockAnswer, MockLocker, MockNotifier, MockProbe, MockTrigger};
use curfew_store::{AuditEventType, SqliteStore, Store};
use curfew_util::{ManualDateSource, MonotonicInstant};
use std::sync::Arc;
use std::time::Duration;

const SEC: Duration = Duration::from_secs(1);

struct Harness {
    probe: MockProbe,
    trigger: MockTrigger,
    locker: MockLocker,
    notifier: MockNotifier,
    dates: Arc<ManualDateSource>,
    store: Arc<SqliteStore>,
    enforcer: EnforcementLoop,
    _dir: tempfile::TempDir,
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn config(extra: &str) -> Policy {
    let toml = format!(
        r#"
        config_version = 1

        [daemon]
        require_root = false

        [target]
        user = "hsong"

        {extra}
        "#
    );
    parse_config(&toml).unwrap()
}

fn harness(policy: &Policy, initial: Duration) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("curfewd.db")).unwrap());

    let dates = Arc::new(ManualDateSource::fixed(day(1)));
    let ledger = DailyLedger::with_initial(dates.clone(), initial).unwrap();
    let engine = CoreEngine::new(policy, ledger, store.clone());

    let probe = MockProbe::new(true);
    let trigger = MockTrigger::new(false);
    let locker = MockLocker::new();
    let notifier = MockNotifier::new();

    let enforcer = EnforcementLoop::new(
        engine,
        Collaborators {
            probe: Arc::new(probe.clone()),
            trigger: Arc::new(trigger.clone()),
            locker: Arc::new(locker.clone()),
            notifier: Arc::new(notifier.clone()),
        },
        store.clone(),
        policy.daemon.tick_interval,
    );

    Harness {
        probe,
        trigger,
        locker,
        notifier,
        dates,
        store,
        enforcer,
        _dir: dir,
    }
}

fn lock_count(events: &[CoreEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, CoreEvent::LockDue { .. }))
        .count()
}

fn daily_total(h: &Harness) -> Duration {
    h.enforcer.engine().ledger().get().unwrap()
}

#[tokio::test]
async fn daily_limit_locks_once_and_notifies() {
    let policy = config(
        r#"
        [limits]
        daily_seconds = 120

        [notify]
        webhook_url = "http://localhost:9/hook"
        "#,
    );
    let mut h = harness(&policy, Duration::ZERO);
    let t0 = MonotonicInstant::now();

    let mut first_lock = None;
    for k in 0..=130u64 {
        let events = h.enforcer.run_once(t0 + SEC * k as u32).await;
        if lock_count(&events) > 0 && first_lock.is_none() {
            first_lock = Some(k);
        }
    }

    assert_eq!(first_lock, Some(120));
    assert_eq!(h.locker.primary_calls(), 1);

    let delivered = h.notifier.delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].contains("hsong reached the daily limit"));

    let audits = h.store.get_recent_audits(500).unwrap();
    assert!(audits.iter().any(|a| matches!(
        &a.event,
        AuditEventType::LockIssued {
            breach: BreachKind::Daily,
            outcome: LockOutcome::Primary,
            ..
        }
    )));
    assert!(audits.iter().any(|a| matches!(
        &a.event,
        AuditEventType::SessionEnded {
            reason: SessionEndReason::Locked,
            ..
        }
    )));
    assert!(audits.iter().any(|a| matches!(
        &a.event,
        AuditEventType::LimitTightened {
            breach: BreachKind::Daily,
            ..
        }
    )));
}

#[tokio::test]
async fn tightened_limit_breaches_exactly_at_five_minutes() {
    let policy = config(
        r#"
        [limits]
        daily_seconds = 600

        [budget]
        hard_factor = 0.5
        floor_seconds = 60
        "#,
    );
    let mut h = harness(&policy, Duration::ZERO);
    let t0 = MonotonicInstant::now();

    let tightened = h
        .enforcer
        .engine_mut()
        .budget_mut(BreachKind::Daily)
        .unwrap()
        .tighten(
            policy.budget.hard_factor,
            policy.budget.floor,
            t0,
        );
    assert_eq!(tightened, Some(Duration::from_secs(300)));

    let mut locks_at = Vec::new();
    for k in 0..=330u64 {
        let events = h.enforcer.run_once(t0 + SEC * k as u32).await;
        if lock_count(&events) > 0 {
            locks_at.push(k);
        }
    }

    assert_eq!(locks_at, vec![300]);
}

#[tokio::test]
async fn notifications_respect_the_throttle() {
    let policy = config(
        r#"
        [limits]
        daily_seconds = 60

        [lock]
        cooldown_mode = "always_relock"

        [notify]
        interval_seconds = 600
        command = ["notify-send"]
        "#,
    );
    let mut h = harness(&policy, Duration::from_secs(60));
    let t0 = MonotonicInstant::now();

    h.enforcer.run_once(t0).await;
    assert_eq!(h.notifier.delivered().len(), 1);

    h.enforcer.run_once(t0 + SEC * 100).await;
    assert_eq!(h.notifier.delivered().len(), 1);

    h.enforcer.run_once(t0 + SEC * 550).await;
    assert_eq!(h.notifier.delivered().len(), 1);

    h.enforcer.run_once(t0 + SEC * 650).await;
    assert_eq!(h.notifier.delivered().len(), 2);

    // Every breach locked; only notifications were throttled
    assert_eq!(h.locker.primary_calls(), 4);
}

#[tokio::test]
async fn suppressed_relock_inside_cooldown() {
    let policy = config(
        r#"
        [limits]
        daily_seconds = 60

        [lock]
        cooldown_seconds = 30
        "#,
    );
    let mut h = harness(&policy, Duration::from_secs(60));
    let t0 = MonotonicInstant::now();

    let mut suppressed = 0;
    for k in 0..=40u64 {
        let events = h.enforcer.run_once(t0 + SEC * k as u32).await;
        suppressed += events
            .iter()
            .filter(|e| matches!(e, CoreEvent::LockSuppressed { .. }))
            .count();
    }

    // Locked at 0 and again once the cooldown reopened at 30
    assert_eq!(h.locker.primary_calls(), 2);
    assert_eq!(suppressed, 39);
}

#[tokio::test]
async fn alternating_probe_never_builds_a_session() {
    let policy = config("");
    let mut h = harness(&policy, Duration::ZERO);
    h.probe.set(false);
    h.probe.script((0..20).map(|k| {
        if k % 2 == 0 {
            MockAnswer::Inactive
        } else {
            MockAnswer::Active
        }
    }));
    let t0 = MonotonicInstant::now();

    for k in 0..20u32 {
        let now = t0 + SEC * k;
        h.enforcer.run_once(now).await;
        assert!(h.enforcer.engine().session().current_duration(now) <= policy.daemon.tick_interval);
    }

    assert_eq!(daily_total(&h), Duration::from_secs(10));
    assert_eq!(h.locker.lock_attempts(), 0);
}

#[tokio::test]
async fn probe_failures_do_not_accumulate() {
    let policy = config("");
    let mut h = harness(&policy, Duration::ZERO);
    h.probe.set(MockAnswer::Fail);
    let t0 = MonotonicInstant::now();

    for k in 0..10u32 {
        let events = h.enforcer.run_once(t0 + SEC * k).await;
        assert!(events.is_empty());
    }

    assert_eq!(daily_total(&h), Duration::ZERO);
    assert_eq!(h.probe.calls(), 10);
}

#[tokio::test]
async fn clock_failure_skips_accumulation_and_keeps_total() {
    let policy = config("");
    let mut h = harness(&policy, Duration::ZERO);
    let t0 = MonotonicInstant::now();

    for k in 0..10u32 {
        h.enforcer.run_once(t0 + SEC * k).await;
    }
    assert_eq!(daily_total(&h), Duration::from_secs(9));

    h.dates.fail();
    for k in 10..15u32 {
        let now = t0 + SEC * k;
        let events = h.enforcer.run_once(now).await;
        assert!(
            events
                .iter()
                .any(|e| matches!(e, CoreEvent::ClockUnavailable { .. }))
        );
        let status = h.enforcer.engine().status(now);
        assert_eq!(status.daily_total, Some(Duration::from_secs(9)));
    }

    h.dates.set(day(1));
    assert_eq!(daily_total(&h), Duration::from_secs(9));
    h.enforcer.run_once(t0 + SEC * 15).await;
    assert_eq!(daily_total(&h), Duration::from_secs(10));

    let audits = h.store.get_recent_audits(100).unwrap();
    let clock_events = audits
        .iter()
        .filter(|a| matches!(a.event, AuditEventType::ClockUnavailable { .. }))
        .count();
    assert_eq!(clock_events, 5);
}

#[tokio::test]
async fn day_rollover_starts_a_fresh_total() {
    let policy = config("");
    let mut h = harness(&policy, Duration::from_secs(500));
    let t0 = MonotonicInstant::now();

    for k in 0..5u32 {
        h.enforcer.run_once(t0 + SEC * k).await;
    }
    assert_eq!(daily_total(&h), Duration::from_secs(504));

    h.dates.set(day(2));
    h.enforcer.run_once(t0 + SEC * 5).await;

    let ledger = h.enforcer.engine().ledger();
    assert_eq!(ledger.get_on(day(1)), Duration::from_secs(504));
    assert_eq!(ledger.get_on(day(2)), SEC);
    assert_eq!(ledger.len(), 2);
}

#[tokio::test]
async fn lock_falls_back_when_primary_fails() {
    let policy = config(
        r#"
        [limits]
        daily_seconds = 60
        "#,
    );
    let mut h = harness(&policy, Duration::from_secs(60));
    h.locker.set_fail_primary(true);

    h.enforcer.run_once(MonotonicInstant::now()).await;
    assert_eq!(h.locker.primary_calls(), 1);
    assert_eq!(h.locker.fallback_calls(), 1);

    let audits = h.store.get_recent_audits(20).unwrap();
    assert!(audits.iter().any(|a| matches!(
        &a.event,
        AuditEventType::LockIssued {
            outcome: LockOutcome::Fallback { .. },
            ..
        }
    )));
}

#[tokio::test]
async fn failed_lock_does_not_stop_the_loop() {
    let policy = config(
        r#"
        [limits]
        daily_seconds = 60

        [lock]
        cooldown_mode = "always_relock"
        "#,
    );
    let mut h = harness(&policy, Duration::from_secs(60));
    h.locker.set_fail_primary(true);
    h.locker.set_fail_fallback(true);
    h.notifier.set_fail(true);
    let t0 = MonotonicInstant::now();

    for k in 0..3u32 {
        let events = h.enforcer.run_once(t0 + SEC * k).await;
        assert_eq!(lock_count(&events), 1);
    }

    assert_eq!(h.locker.primary_calls(), 3);
    assert_eq!(h.locker.fallback_calls(), 3);
    assert!(h.notifier.delivered().is_empty());

    let audits = h.store.get_recent_audits(50).unwrap();
    assert!(audits.iter().any(|a| matches!(
        &a.event,
        AuditEventType::LockIssued {
            outcome: LockOutcome::Failed { .. },
            ..
        }
    )));
    assert!(
        audits
            .iter()
            .any(|a| matches!(a.event, AuditEventType::NotificationSent { delivered: false }))
    );
}

#[tokio::test]
async fn soft_trigger_tightens_then_relaxes_to_baseline() {
    let policy = config(
        r#"
        [budget]
        soft_factor = 0.5
        relaxation_seconds = 10
        growth_rate = 1.5

        [trigger]
        processes = ["steam"]
        "#,
    );
    let mut h = harness(&policy, Duration::ZERO);
    h.trigger.set(true);
    let t0 = MonotonicInstant::now();

    let events = h.enforcer.run_once(t0).await;
    assert!(events.contains(&CoreEvent::Tightened {
        kind: curfew_api::TightenKind::Soft,
        breach: BreachKind::Daily,
        limit: Duration::from_secs(450),
    }));

    // The user leaves; relaxation continues while idle
    h.trigger.set(false);
    h.probe.set(false);

    let events = h.enforcer.run_once(t0 + SEC * 10).await;
    assert!(events.contains(&CoreEvent::Relaxed {
        breach: BreachKind::Daily,
        limit: Duration::from_secs(675),
        recovered: false,
    }));

    let events = h.enforcer.run_once(t0 + SEC * 20).await;
    assert!(events.contains(&CoreEvent::Relaxed {
        breach: BreachKind::Daily,
        limit: Duration::from_secs(900),
        recovered: true,
    }));

    let budget = h.enforcer.engine().budget(BreachKind::Daily).unwrap();
    assert!(!budget.is_tightened());
    assert_eq!(budget.current_limit(), Duration::from_secs(900));

    let events = h.enforcer.run_once(t0 + SEC * 40).await;
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, CoreEvent::Relaxed { .. }))
    );
}

#[tokio::test]
async fn session_scope_resets_after_a_break() {
    let policy = config(
        r#"
        [limits]
        enforce = "session"
        session_seconds = 120
        "#,
    );
    let mut h = harness(&policy, Duration::ZERO);
    let t0 = MonotonicInstant::now();

    // 100s on, 10s off, 100s on: never a continuous 120s
    for k in 0..210u32 {
        h.probe.set(!(100..110).contains(&k));
        let events = h.enforcer.run_once(t0 + SEC * k).await;
        assert_eq!(lock_count(&events), 0, "unexpected lock at {k}");
    }

    for k in 210..=230u32 {
        let events = h.enforcer.run_once(t0 + SEC * k).await;
        if k == 230 {
            assert!(events.iter().any(|e| matches!(
                e,
                CoreEvent::LockDue {
                    breach: BreachKind::Session,
                    ..
                }
            )));
        }
    }
    assert_eq!(h.locker.primary_calls(), 1);
}

#[tokio::test]
async fn run_stops_on_shutdown_signal() {
    let policy = config("");
    let h = harness(&policy, Duration::ZERO);
    let probe = h.probe.clone();
    let store = h.store.clone();

    let (tx, rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(h.enforcer.run(rx));

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();

    let engine = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop did not stop")
        .unwrap();

    assert!(probe.calls() >= 1);
    assert!(!engine.session().is_active());

    let audits = store.get_recent_audits(20).unwrap();
    assert!(audits.iter().any(|a| matches!(
        &a.event,
        AuditEventType::SessionEnded {
            reason: SessionEndReason::DaemonShutdown,
            ..
        }
    )));
}

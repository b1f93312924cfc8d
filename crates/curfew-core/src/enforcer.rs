//! Enforcement loop
//!
//! Polls the collaborators once per tick, feeds the engine and performs the
//! effects it asks for. Every collaborator failure is absorbed here: probes
//! fail closed, lock and notify failures are logged and audited.

use curfew_host_api::{ActivityProbe, AuxiliaryTrigger, Notifier, ScreenLocker, lock_with_fallback};
use curfew_store::{AuditEvent, AuditEventType, Store};
use curfew_util::MonotonicInstant;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{CoreEngine, CoreEvent, TickInput};

/// The external collaborators the loop drives
#[derive(Clone)]
pub struct Collaborators {
    pub probe: Arc<dyn ActivityProbe>,
    pub trigger: Arc<dyn AuxiliaryTrigger>,
    pub locker: Arc<dyn ScreenLocker>,
    pub notifier: Arc<dyn Notifier>,
}

/// Owns the engine and drives it at a fixed interval
pub struct EnforcementLoop {
    engine: CoreEngine,
    collaborators: Collaborators,
    store: Arc<dyn Store>,
    tick_interval: Duration,
}

impl EnforcementLoop {
    pub fn new(
        engine: CoreEngine,
        collaborators: Collaborators,
        store: Arc<dyn Store>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            engine,
            collaborators,
            store,
            tick_interval,
        }
    }

    pub fn engine(&self) -> &CoreEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CoreEngine {
        &mut self.engine
    }

    /// Run one tick to completion and return the engine's events
    pub async fn run_once(&mut self, now: MonotonicInstant) -> Vec<CoreEvent> {
        let probe_active = self.probe_active().await;
        // The trigger only matters while the user is active
        let aux_active = probe_active && self.trigger_active().await;

        let events = self.engine.tick(TickInput {
            now,
            probe_active,
            aux_active,
        });

        for event in &events {
            self.perform(event).await;
        }

        debug!(status = ?self.engine.status(now), "Tick complete");
        events
    }

    /// Run until `shutdown` flips to true or its sender is dropped.
    /// The tick in progress always completes first.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> CoreEngine {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            user = %self.engine.user(),
            probe = self.collaborators.probe.name(),
            tick_interval_secs = self.tick_interval.as_secs(),
            "Enforcement loop started"
        );

        if !*shutdown.borrow() {
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.run_once(MonotonicInstant::now()).await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        }

        let now = MonotonicInstant::now();
        self.engine.shutdown(now);
        info!(status = ?self.engine.status(now), "Enforcement loop stopped");
        self.engine
    }

    async fn probe_active(&self) -> bool {
        let user = self.engine.user();
        match self.collaborators.probe.is_active(user).await {
            Ok(active) => active,
            Err(e) => {
                warn!(
                    user = %user,
                    probe = self.collaborators.probe.name(),
                    error = %e,
                    "Activity probe failed, treating user as inactive"
                );
                false
            }
        }
    }

    async fn trigger_active(&self) -> bool {
        match self.collaborators.trigger.is_active().await {
            Ok(active) => active,
            Err(e) => {
                warn!(error = %e, "Auxiliary trigger failed, treating as inactive");
                false
            }
        }
    }

    async fn perform(&self, event: &CoreEvent) {
        match event {
            CoreEvent::LockDue {
                breach,
                used,
                limit,
            } => {
                let outcome = lock_with_fallback(self.collaborators.locker.as_ref()).await;
                if outcome.is_locked() {
                    info!(outcome = ?outcome, "Screen locked");
                }
                let _ = self
                    .store
                    .append_audit(AuditEvent::new(AuditEventType::LockIssued {
                        breach: *breach,
                        used: *used,
                        limit: *limit,
                        outcome,
                    }));
            }
            CoreEvent::NotifyDue { message } => {
                let notifier = &self.collaborators.notifier;
                if !notifier.is_configured() {
                    debug!(message = %message, "No notification target configured");
                    return;
                }

                let delivered = match notifier.send(message).await {
                    Ok(()) => {
                        debug!(message = %message, "Notification sent");
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, "Notification failed");
                        false
                    }
                };
                let _ = self
                    .store
                    .append_audit(AuditEvent::new(AuditEventType::NotificationSent {
                        delivered,
                    }));
            }
            _ => {}
        }
    }
}

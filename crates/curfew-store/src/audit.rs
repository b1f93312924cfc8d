//! Audit event types

use chrono::{DateTime, Local};
use curfew_api::{BreachKind, LockOutcome, SessionEndReason, TightenKind};
use curfew_util::{SessionId, UserName};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Daemon started
    DaemonStarted,

    /// Daemon stopped
    DaemonStopped,

    /// Policy loaded
    PolicyLoaded {
        user: UserName,
        session_limit: Option<Duration>,
        daily_limit: Option<Duration>,
    },

    /// Session started
    SessionStarted { session_id: SessionId },

    /// Session ended
    SessionEnded {
        session_id: SessionId,
        reason: SessionEndReason,
        duration: Duration,
    },

    /// Lock attempted after a breach
    LockIssued {
        breach: BreachKind,
        used: Duration,
        limit: Duration,
        outcome: LockOutcome,
    },

    /// Breach inside the cooldown window, no lock attempted
    LockSuppressed { breach: BreachKind, used: Duration },

    /// A limit was tightened
    LimitTightened {
        kind: TightenKind,
        breach: BreachKind,
        limit: Duration,
    },

    /// A limit relaxed toward its baseline
    LimitRelaxed {
        breach: BreachKind,
        limit: Duration,
        recovered: bool,
    },

    /// A notification was handed to the notifier
    NotificationSent { delivered: bool },

    /// Today's date could not be computed, accumulation skipped
    ClockUnavailable { reason: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: curfew_util::now(),
            event,
        }
    }
}

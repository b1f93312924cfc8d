//! Core events emitted by the engine

use curfew_api::{BreachKind, SessionEndReason, TightenKind};
use curfew_util::{ClockError, SessionId};
use std::time::Duration;

/// Events emitted by one engine tick, in the order they happened
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// The probe reported the user active after being idle
    SessionStarted { session_id: SessionId },

    /// Session has ended
    SessionEnded {
        session_id: SessionId,
        reason: SessionEndReason,
        duration: Duration,
    },

    /// A limit was breached and the screen must be locked
    LockDue {
        breach: BreachKind,
        used: Duration,
        limit: Duration,
    },

    /// A limit was breached inside the lock cooldown
    LockSuppressed {
        breach: BreachKind,
        used: Duration,
        cooldown_remaining: Duration,
    },

    /// A limit was lowered
    Tightened {
        kind: TightenKind,
        breach: BreachKind,
        limit: Duration,
    },

    /// A limit grew back toward its baseline
    Relaxed {
        breach: BreachKind,
        limit: Duration,
        recovered: bool,
    },

    /// A notification passed the throttle and should be sent
    NotifyDue { message: String },

    /// Today's date was unavailable; nothing was accumulated this tick
    ClockUnavailable { error: ClockError },
}

//! Shared types for the curfewd enforcement engine

use chrono::{DateTime, Local};
use curfew_util::{SessionId, UserName};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which ledger(s) a deployment enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementScope {
    /// Continuous active-session duration
    Session,
    /// Accumulated active time for the current calendar day
    #[default]
    Daily,
    /// Either ledger can breach
    Both,
}

impl EnforcementScope {
    pub fn enforces_session(&self) -> bool {
        matches!(self, EnforcementScope::Session | EnforcementScope::Both)
    }

    pub fn enforces_daily(&self) -> bool {
        matches!(self, EnforcementScope::Daily | EnforcementScope::Both)
    }
}

/// What the lock cooldown window suppresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownMode {
    /// A breach inside the window neither locks nor hard-tightens
    #[default]
    SuppressRelock,
    /// Every breach locks; the window only gates the hard tighten
    AlwaysRelock,
}

/// Source of a budget tightening
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TightenKind {
    /// Auxiliary condition observed while active
    Soft,
    /// A breach led to a lock
    Hard,
}

impl fmt::Display for TightenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TightenKind::Soft => write!(f, "soft"),
            TightenKind::Hard => write!(f, "hard"),
        }
    }
}

/// Ledger whose limit was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachKind {
    Session,
    Daily,
}

impl fmt::Display for BreachKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreachKind::Session => write!(f, "session"),
            BreachKind::Daily => write!(f, "daily"),
        }
    }
}

/// Result of a best-effort lock attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LockOutcome {
    /// Primary mechanism succeeded
    Primary,
    /// Primary failed, fallback succeeded
    Fallback { primary_error: String },
    /// Both mechanisms failed (or no fallback was configured)
    Failed {
        primary_error: String,
        fallback_error: Option<String>,
    },
}

impl LockOutcome {
    pub fn is_locked(&self) -> bool {
        !matches!(self, LockOutcome::Failed { .. })
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    /// The activity probe reported the user inactive
    Inactive,
    /// The session was reset after a lock
    Locked,
    /// The daemon is shutting down
    DaemonShutdown,
}

/// Enforced limit for one ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitStatus {
    pub kind: BreachKind,
    pub current: Duration,
    pub baseline: Duration,
    pub used: Duration,
    pub tightened: bool,
}

impl LimitStatus {
    pub fn remaining(&self) -> Duration {
        self.current.saturating_sub(self.used)
    }
}

/// Point-in-time view of the enforcement state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub version: u32,
    pub timestamp: DateTime<Local>,
    pub user: UserName,
    pub session_id: Option<SessionId>,
    pub session_active: bool,
    pub session_duration: Duration,
    /// Today's total; `None` when the date could not be determined
    pub daily_total: Option<Duration>,
    pub limits: Vec<LimitStatus>,
}

impl StatusSnapshot {
    pub fn limit(&self, kind: BreachKind) -> Option<&LimitStatus> {
        self.limits.iter().find(|l| l.kind == kind)
    }
}

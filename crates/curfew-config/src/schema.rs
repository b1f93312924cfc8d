//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global daemon settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    /// Who is being watched and how
    pub target: RawTarget,

    /// Baseline limits and enforcement scope
    #[serde(default)]
    pub limits: RawLimits,

    /// Adaptive budget tuning
    #[serde(default)]
    pub budget: RawBudget,

    /// Screen lock mechanism and cooldown
    #[serde(default)]
    pub lock: RawLock,

    /// Auxiliary soft-tighten trigger
    #[serde(default)]
    pub trigger: RawTrigger,

    /// Notification delivery
    #[serde(default)]
    pub notify: RawNotify,
}

impl RawConfig {
    /// Smallest valid config: a target user and defaults for everything else
    pub fn for_user(user: impl Into<String>) -> Self {
        Self {
            config_version: crate::CURRENT_CONFIG_VERSION,
            daemon: RawDaemonConfig::default(),
            target: RawTarget {
                user: user.into(),
                probe: None,
            },
            limits: RawLimits::default(),
            budget: RawBudget::default(),
            lock: RawLock::default(),
            trigger: RawTrigger::default(),
            notify: RawNotify::default(),
        }
    }
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// Data directory for the audit store
    pub data_dir: Option<PathBuf>,

    /// Polling interval in seconds (1-30)
    pub tick_interval_seconds: Option<u64>,

    /// Refuse to start unless running as root
    pub require_root: Option<bool>,

    /// Record enforcement actions in the audit store
    pub audit: Option<bool>,
}

/// Target user and activity probe
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawTarget {
    /// Login name to enforce
    pub user: String,

    /// Probe strategy (defaults to console ownership)
    #[serde(default)]
    pub probe: Option<RawProbe>,
}

/// Activity probe strategy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawProbe {
    /// The user owns the console device
    Console,
    /// logind reports an active session for the user
    Loginctl,
    /// The user runs at least one of the named processes
    Process { names: Vec<String> },
}

/// Limits
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLimits {
    /// "session", "daily" or "both"
    pub enforce: Option<String>,

    /// Baseline continuous-session limit in seconds
    pub session_seconds: Option<u64>,

    /// Baseline daily limit in seconds
    pub daily_seconds: Option<u64>,

    /// Start today's total at this value instead of zero
    pub initial_daily_seconds: Option<u64>,
}

/// Adaptive budget tuning
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawBudget {
    /// Multiplier applied to the baseline by the auxiliary trigger
    pub soft_factor: Option<f64>,

    /// Multiplier applied to the baseline after a lock
    pub hard_factor: Option<f64>,

    /// Lowest limit a tighten may produce, in seconds
    pub floor_seconds: Option<u64>,

    /// Wait before each relaxation step, in seconds
    pub relaxation_seconds: Option<u64>,

    /// Multiplier applied to the limit on each relaxation step
    pub growth_rate: Option<f64>,
}

/// Lock settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLock {
    /// Minimum seconds between two lock actions
    pub cooldown_seconds: Option<u64>,

    /// "suppress_relock" or "always_relock"
    pub cooldown_mode: Option<String>,

    /// Primary lock command argv
    pub primary: Option<Vec<String>>,

    /// Fallback lock command argv
    pub fallback: Option<Vec<String>>,
}

/// Auxiliary trigger
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTrigger {
    /// Process names whose presence tightens the budget
    #[serde(default)]
    pub processes: Vec<String>,
}

/// Notification settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNotify {
    /// Minimum seconds between two notifications
    pub interval_seconds: Option<u64>,

    /// HTTP endpoint receiving `{"text": ...}` posts
    pub webhook_url: Option<String>,

    /// Command argv; the message is appended as the last argument
    pub command: Option<Vec<String>>,

    /// Also send periodic status messages while the user is active
    pub status_updates: Option<bool>,
}

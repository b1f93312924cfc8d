//! Validated policy structures

use crate::schema::{
    RawBudget, RawConfig, RawDaemonConfig, RawLimits, RawLock, RawNotify, RawProbe, RawTarget,
};
use crate::validation::{parse_cooldown_mode, parse_scope};
use curfew_api::{BreachKind, CooldownMode, EnforcementScope};
use curfew_util::{UserName, default_data_dir};
use std::path::PathBuf;
use std::time::Duration;

/// Baseline session and daily limit when none is configured
pub const DEFAULT_LIMIT_SECS: u64 = 900;
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_SOFT_FACTOR: f64 = 0.5;
pub const DEFAULT_HARD_FACTOR: f64 = 0.25;
pub const DEFAULT_FLOOR_SECS: u64 = 60;
pub const DEFAULT_RELAXATION_SECS: u64 = 1800;
pub const DEFAULT_GROWTH_RATE: f64 = 1.1;
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;
pub const DEFAULT_NOTIFY_INTERVAL_SECS: u64 = 600;

/// Validated policy ready for use by the core engine
#[derive(Debug, Clone)]
pub struct Policy {
    pub daemon: DaemonConfig,
    pub target: TargetPolicy,
    pub limits: LimitsPolicy,
    pub budget: BudgetPolicy,
    pub lock: LockPolicy,
    pub trigger: TriggerPolicy,
    pub notify: NotifyPolicy,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonConfig::from_raw(raw.daemon),
            target: TargetPolicy::from_raw(raw.target),
            limits: LimitsPolicy::from_raw(raw.limits),
            budget: BudgetPolicy::from_raw(raw.budget),
            lock: LockPolicy::from_raw(raw.lock),
            trigger: TriggerPolicy {
                processes: raw.trigger.processes,
            },
            notify: NotifyPolicy::from_raw(raw.notify),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub data_dir: PathBuf,
    pub tick_interval: Duration,
    pub require_root: bool,
    pub audit: bool,
}

impl DaemonConfig {
    fn from_raw(raw: RawDaemonConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            tick_interval: Duration::from_secs(
                raw.tick_interval_seconds
                    .unwrap_or(DEFAULT_TICK_INTERVAL_SECS),
            ),
            require_root: raw.require_root.unwrap_or(true),
            audit: raw.audit.unwrap_or(true),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_raw(RawDaemonConfig::default())
    }
}

/// How the daemon decides the target user is active
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProbeStrategy {
    #[default]
    Console,
    Loginctl,
    Process { names: Vec<String> },
}

/// Target user and probe
#[derive(Debug, Clone)]
pub struct TargetPolicy {
    pub user: UserName,
    pub probe: ProbeStrategy,
}

impl TargetPolicy {
    fn from_raw(raw: RawTarget) -> Self {
        let probe = match raw.probe {
            None | Some(RawProbe::Console) => ProbeStrategy::Console,
            Some(RawProbe::Loginctl) => ProbeStrategy::Loginctl,
            Some(RawProbe::Process { names }) => ProbeStrategy::Process { names },
        };

        Self {
            user: UserName::new(raw.user.trim()),
            probe,
        }
    }
}

/// Baseline limits
#[derive(Debug, Clone)]
pub struct LimitsPolicy {
    pub scope: EnforcementScope,
    /// Present only when the scope enforces sessions
    pub session_limit: Option<Duration>,
    /// Present only when the scope enforces the daily total
    pub daily_limit: Option<Duration>,
    pub initial_daily: Option<Duration>,
}

impl LimitsPolicy {
    fn from_raw(raw: RawLimits) -> Self {
        let scope = raw
            .enforce
            .as_deref()
            .and_then(|s| parse_scope(s).ok())
            .unwrap_or_default();

        let session = Duration::from_secs(raw.session_seconds.unwrap_or(DEFAULT_LIMIT_SECS));
        let daily = Duration::from_secs(raw.daily_seconds.unwrap_or(DEFAULT_LIMIT_SECS));

        Self {
            scope,
            session_limit: scope.enforces_session().then_some(session),
            daily_limit: scope.enforces_daily().then_some(daily),
            initial_daily: raw.initial_daily_seconds.map(Duration::from_secs),
        }
    }

    /// Baseline for one kind of limit, if enforced
    pub fn baseline(&self, kind: BreachKind) -> Option<Duration> {
        match kind {
            BreachKind::Session => self.session_limit,
            BreachKind::Daily => self.daily_limit,
        }
    }
}

/// Adaptive budget tuning
#[derive(Debug, Clone)]
pub struct BudgetPolicy {
    pub soft_factor: f64,
    pub hard_factor: f64,
    pub floor: Duration,
    pub relaxation_period: Duration,
    pub growth_rate: f64,
}

impl BudgetPolicy {
    fn from_raw(raw: RawBudget) -> Self {
        Self {
            soft_factor: raw.soft_factor.unwrap_or(DEFAULT_SOFT_FACTOR),
            hard_factor: raw.hard_factor.unwrap_or(DEFAULT_HARD_FACTOR),
            floor: Duration::from_secs(raw.floor_seconds.unwrap_or(DEFAULT_FLOOR_SECS)),
            relaxation_period: Duration::from_secs(
                raw.relaxation_seconds.unwrap_or(DEFAULT_RELAXATION_SECS),
            ),
            growth_rate: raw.growth_rate.unwrap_or(DEFAULT_GROWTH_RATE),
        }
    }
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self::from_raw(RawBudget::default())
    }
}

/// Lock mechanism and cooldown
#[derive(Debug, Clone)]
pub struct LockPolicy {
    pub cooldown: Duration,
    pub cooldown_mode: CooldownMode,
    pub primary: Vec<String>,
    pub fallback: Option<Vec<String>>,
}

impl LockPolicy {
    fn from_raw(raw: RawLock) -> Self {
        let (default_primary, default_fallback) = default_lock_commands();

        // A configured primary without a fallback means "no fallback"
        let fallback = match (&raw.primary, raw.fallback) {
            (_, Some(fallback)) => Some(fallback),
            (None, None) => Some(default_fallback),
            (Some(_), None) => None,
        };

        Self {
            cooldown: Duration::from_secs(raw.cooldown_seconds.unwrap_or(DEFAULT_COOLDOWN_SECS)),
            cooldown_mode: raw
                .cooldown_mode
                .as_deref()
                .and_then(|s| parse_cooldown_mode(s).ok())
                .unwrap_or_default(),
            primary: raw.primary.unwrap_or(default_primary),
            fallback,
        }
    }
}

/// Platform default lock commands (primary, fallback)
pub fn default_lock_commands() -> (Vec<String>, Vec<String>) {
    let to_argv = |parts: &[&str]| parts.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    if cfg!(target_os = "macos") {
        (
            to_argv(&["pmset", "displaysleepnow"]),
            to_argv(&[
                "osascript",
                "-e",
                r#"tell application "System Events" to keystroke "q" using {command down, control down}"#,
            ]),
        )
    } else {
        (
            to_argv(&["loginctl", "lock-sessions"]),
            to_argv(&["xdg-screensaver", "lock"]),
        )
    }
}

/// Auxiliary trigger
#[derive(Debug, Clone, Default)]
pub struct TriggerPolicy {
    /// Empty means the trigger never fires
    pub processes: Vec<String>,
}

/// Notification delivery
#[derive(Debug, Clone)]
pub struct NotifyPolicy {
    pub interval: Duration,
    pub webhook_url: Option<String>,
    pub command: Option<Vec<String>>,
    pub status_updates: bool,
}

impl NotifyPolicy {
    fn from_raw(raw: RawNotify) -> Self {
        Self {
            interval: Duration::from_secs(
                raw.interval_seconds.unwrap_or(DEFAULT_NOTIFY_INTERVAL_SECS),
            ),
            webhook_url: raw.webhook_url,
            command: raw.command,
            status_updates: raw.status_updates.unwrap_or(false),
        }
    }

    /// Whether any delivery channel is configured
    pub fn has_channel(&self) -> bool {
        self.webhook_url.is_some() || self.command.is_some()
    }
}

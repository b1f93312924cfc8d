//! Configuration validation

use crate::policy::{
    DEFAULT_FLOOR_SECS, DEFAULT_GROWTH_RATE, DEFAULT_HARD_FACTOR, DEFAULT_LIMIT_SECS,
    DEFAULT_SOFT_FACTOR,
};
use crate::schema::{RawConfig, RawProbe};
use curfew_api::{CooldownMode, EnforcementScope};
use thiserror::Error;

/// Longest accepted polling interval
pub const MAX_TICK_INTERVAL_SECS: u64 = 30;

/// Longest accepted session or daily limit
pub const MAX_LIMIT_SECS: u64 = 86_400;

/// Longest accepted wait between relaxation steps
pub const MAX_RELAXATION_SECS: u64 = 86_400;

/// Largest accepted relaxation growth rate
pub const MAX_GROWTH_RATE: f64 = 10.0;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Target user cannot be empty")]
    EmptyUser,

    #[error("Invalid enforcement scope '{0}': expected session, daily or both")]
    InvalidScope(String),

    #[error("Invalid cooldown mode '{0}': expected suppress_relock or always_relock")]
    InvalidCooldownMode(String),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("{field} = {value} is outside (0, 1]")]
    FactorOutOfRange { field: &'static str, value: f64 },

    #[error("{field} = {value} exceeds the maximum of {max}")]
    DurationTooLong {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("growth_rate = {0} must be greater than 1 and at most {MAX_GROWTH_RATE}")]
    GrowthRateOutOfRange(f64),

    #[error("floor_seconds {floor}s exceeds {field} {baseline}s")]
    FloorExceedsBaseline {
        field: &'static str,
        floor: u64,
        baseline: u64,
    },

    #[error("tick_interval_seconds = {0} must be between 1 and {MAX_TICK_INTERVAL_SECS}")]
    TickIntervalOutOfRange(u64),

    #[error("{field} command cannot be empty")]
    EmptyCommand { field: &'static str },

    #[error("Invalid webhook URL '{0}': must start with http:// or https://")]
    InvalidWebhookUrl(String),

    #[error("{field} contains an empty process name")]
    EmptyProcessName { field: &'static str },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_target(config));
    errors.extend(validate_limits(config));
    errors.extend(validate_budget(config));
    errors.extend(validate_lock(config));
    errors.extend(validate_notify(config));

    if let Some(tick) = config.daemon.tick_interval_seconds
        && !(1..=MAX_TICK_INTERVAL_SECS).contains(&tick)
    {
        errors.push(ValidationError::TickIntervalOutOfRange(tick));
    }

    if config.trigger.processes.iter().any(|p| p.trim().is_empty()) {
        errors.push(ValidationError::EmptyProcessName {
            field: "trigger.processes",
        });
    }

    errors
}

fn validate_target(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.target.user.trim().is_empty() {
        errors.push(ValidationError::EmptyUser);
    }

    if let Some(RawProbe::Process { names }) = &config.target.probe
        && (names.is_empty() || names.iter().any(|n| n.trim().is_empty()))
    {
        errors.push(ValidationError::EmptyProcessName {
            field: "target.probe.names",
        });
    }

    errors
}

fn validate_limits(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let limits = &config.limits;

    if let Some(scope) = &limits.enforce
        && let Err(e) = parse_scope(scope)
    {
        errors.push(e);
    }

    for (field, value) in [
        ("limits.session_seconds", limits.session_seconds),
        ("limits.daily_seconds", limits.daily_seconds),
    ] {
        match value {
            Some(0) => errors.push(ValidationError::ZeroDuration { field }),
            Some(value) if value > MAX_LIMIT_SECS => {
                errors.push(ValidationError::DurationTooLong {
                    field,
                    value,
                    max: MAX_LIMIT_SECS,
                })
            }
            _ => {}
        }
    }

    errors
}

fn validate_budget(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let budget = &config.budget;

    let soft = budget.soft_factor.unwrap_or(DEFAULT_SOFT_FACTOR);
    if !is_valid_factor(soft) {
        errors.push(ValidationError::FactorOutOfRange {
            field: "budget.soft_factor",
            value: soft,
        });
    }

    let hard = budget.hard_factor.unwrap_or(DEFAULT_HARD_FACTOR);
    if !is_valid_factor(hard) {
        errors.push(ValidationError::FactorOutOfRange {
            field: "budget.hard_factor",
            value: hard,
        });
    }

    let growth = budget.growth_rate.unwrap_or(DEFAULT_GROWTH_RATE);
    if !(growth.is_finite() && growth > 1.0 && growth <= MAX_GROWTH_RATE) {
        errors.push(ValidationError::GrowthRateOutOfRange(growth));
    }

    match budget.relaxation_seconds {
        Some(0) => errors.push(ValidationError::ZeroDuration {
            field: "budget.relaxation_seconds",
        }),
        Some(value) if value > MAX_RELAXATION_SECS => {
            errors.push(ValidationError::DurationTooLong {
                field: "budget.relaxation_seconds",
                value,
                max: MAX_RELAXATION_SECS,
            })
        }
        _ => {}
    }

    // The floor only matters for the limits that are actually enforced
    let floor = budget.floor_seconds.unwrap_or(DEFAULT_FLOOR_SECS);
    let scope = config
        .limits
        .enforce
        .as_deref()
        .and_then(|s| parse_scope(s).ok())
        .unwrap_or_default();

    let mut baselines = Vec::new();
    if scope.enforces_session() {
        baselines.push((
            "limits.session_seconds",
            config.limits.session_seconds.unwrap_or(DEFAULT_LIMIT_SECS),
        ));
    }
    if scope.enforces_daily() {
        baselines.push((
            "limits.daily_seconds",
            config.limits.daily_seconds.unwrap_or(DEFAULT_LIMIT_SECS),
        ));
    }

    for (field, baseline) in baselines {
        if baseline > 0 && floor > baseline {
            errors.push(ValidationError::FloorExceedsBaseline {
                field,
                floor,
                baseline,
            });
        }
    }

    errors
}

fn validate_lock(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let lock = &config.lock;

    if let Some(mode) = &lock.cooldown_mode
        && let Err(e) = parse_cooldown_mode(mode)
    {
        errors.push(e);
    }

    if let Some(argv) = &lock.primary
        && is_empty_argv(argv)
    {
        errors.push(ValidationError::EmptyCommand {
            field: "lock.primary",
        });
    }

    if let Some(argv) = &lock.fallback
        && is_empty_argv(argv)
    {
        errors.push(ValidationError::EmptyCommand {
            field: "lock.fallback",
        });
    }

    errors
}

fn validate_notify(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let notify = &config.notify;

    if notify.interval_seconds == Some(0) {
        errors.push(ValidationError::ZeroDuration {
            field: "notify.interval_seconds",
        });
    }

    if let Some(url) = &notify.webhook_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        errors.push(ValidationError::InvalidWebhookUrl(url.clone()));
    }

    if let Some(argv) = &notify.command
        && is_empty_argv(argv)
    {
        errors.push(ValidationError::EmptyCommand {
            field: "notify.command",
        });
    }

    errors
}

fn is_valid_factor(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value <= 1.0
}

fn is_empty_argv(argv: &[String]) -> bool {
    argv.first().is_none_or(|program| program.trim().is_empty())
}

/// Parse an enforcement scope name
pub fn parse_scope(s: &str) -> Result<EnforcementScope, ValidationError> {
    match s.to_lowercase().as_str() {
        "session" => Ok(EnforcementScope::Session),
        "daily" | "day" => Ok(EnforcementScope::Daily),
        "both" => Ok(EnforcementScope::Both),
        _ => Err(ValidationError::InvalidScope(s.to_string())),
    }
}

/// Parse a cooldown mode name
pub fn parse_cooldown_mode(s: &str) -> Result<CooldownMode, ValidationError> {
    match s.to_lowercase().as_str() {
        "suppress_relock" => Ok(CooldownMode::SuppressRelock),
        "always_relock" => Ok(CooldownMode::AlwaysRelock),
        _ => Err(ValidationError::InvalidCooldownMode(s.to_string())),
    }
}

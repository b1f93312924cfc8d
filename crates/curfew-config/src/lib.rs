//! Configuration parsing and validation for curfewd
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Target user and activity probe selection
//! - Baseline limits, adaptive budget tuning and lock cooldown
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Policy> {
    let path = path.as_ref();
    policy_from_raw(load_raw_config(path)?)
}

/// Read a TOML file into the raw schema without validating it, so callers
/// can apply overrides before [`policy_from_raw`]
pub fn load_raw_config(path: impl AsRef<Path>) -> ConfigResult<RawConfig> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading configuration");
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Policy> {
    let raw: RawConfig = toml::from_str(content)?;
    policy_from_raw(raw)
}

/// Build a policy with defaults for everything except the target user
pub fn policy_for_user(user: &str) -> ConfigResult<Policy> {
    policy_from_raw(RawConfig::for_user(user))
}

/// Version-check, validate and convert a raw config
pub fn policy_from_raw(raw: RawConfig) -> ConfigResult<Policy> {
    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Policy::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use curfew_api::EnforcementScope;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let config = r#"
            config_version = 1

            [target]
            user = "hsong"
        "#;

        let policy = parse_config(config).unwrap();
        assert_eq!(policy.target.user.as_str(), "hsong");
        assert_eq!(policy.limits.scope, EnforcementScope::Daily);
        assert_eq!(policy.limits.daily_limit, Some(Duration::from_secs(900)));
    }

    #[test]
    fn reject_wrong_version() {
        let config = r#"
            config_version = 99

            [target]
            user = "hsong"
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_values() {
        let config = r#"
            config_version = 1

            [target]
            user = "hsong"

            [limits]
            enforce = "weekly"

            [budget]
            growth_rate = 0.9
        "#;

        match parse_config(config) {
            Err(ConfigError::ValidationFailed { errors }) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            config_version = 1

            [target]
            user = "hsong"
            probe = {{ type = "loginctl" }}

            [limits]
            enforce = "session"
            session_seconds = 1200
            "#
        )
        .unwrap();

        let policy = load_config(file.path()).unwrap();
        assert_eq!(policy.target.probe, ProbeStrategy::Loginctl);
        assert_eq!(policy.limits.session_limit, Some(Duration::from_secs(1200)));
        assert_eq!(policy.limits.daily_limit, None);
    }

    #[test]
    fn raw_overrides_are_validated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            config_version = 1

            [target]
            user = "hsong"
            "#
        )
        .unwrap();

        let mut raw = load_raw_config(file.path()).unwrap();
        raw.target.user = "jdoe".into();
        raw.limits.initial_daily_seconds = Some(300);
        let policy = policy_from_raw(raw.clone()).unwrap();
        assert_eq!(policy.target.user.as_str(), "jdoe");
        assert_eq!(policy.limits.initial_daily, Some(Duration::from_secs(300)));

        raw.daemon.tick_interval_seconds = Some(0);
        assert!(matches!(
            policy_from_raw(raw),
            Err(ConfigError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn policy_for_user_rejects_blank_name() {
        assert!(matches!(
            policy_for_user(""),
            Err(ConfigError::ValidationFailed { .. })
        ));
        assert!(policy_for_user("hsong").is_ok());
    }
}

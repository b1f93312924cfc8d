//! Config validation CLI tool
//!
//! Validates a curfewd configuration file and reports any errors.

use curfew_config::{ConfigError, CURRENT_CONFIG_VERSION, ProbeStrategy};
use curfew_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a curfewd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match curfew_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", CURRENT_CONFIG_VERSION);
            println!("  User: {}", policy.target.user);

            let probe = match &policy.target.probe {
                ProbeStrategy::Console => "console owner".to_string(),
                ProbeStrategy::Loginctl => "loginctl session state".to_string(),
                ProbeStrategy::Process { names } => format!("process ({})", names.join(", ")),
            };
            println!("  Probe: {}", probe);
            println!("  Enforce: {:?}", policy.limits.scope);

            if let Some(limit) = policy.limits.session_limit {
                println!("  Session limit: {}", format_duration(limit));
            }
            if let Some(limit) = policy.limits.daily_limit {
                println!("  Daily limit: {}", format_duration(limit));
            }
            println!(
                "  Cooldown: {} ({:?})",
                format_duration(policy.lock.cooldown),
                policy.lock.cooldown_mode
            );
            println!("  Lock command: {}", policy.lock.primary.join(" "));
            if let Some(fallback) = &policy.lock.fallback {
                println!("  Fallback: {}", fallback.join(" "));
            }
            if !policy.trigger.processes.is_empty() {
                println!("  Trigger processes: {}", policy.trigger.processes.join(", "));
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver, CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}

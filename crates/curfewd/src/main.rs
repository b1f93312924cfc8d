//! curfewd - The curfew background service
//!
//! This is the main entry point for the curfewd service.
//! It wires together all the components:
//! - Configuration loading and CLI overrides
//! - Privilege check
//! - Audit store
//! - Unix collaborators (probe, trigger, locker, notifiers)
//! - Core engine and enforcement loop

use anyhow::{Context, Result, bail};
use clap::Parser;
use curfew_config::{
    Policy, ProbeStrategy, RawConfig, load_raw_config, policy_from_raw,
};
use curfew_core::{Collaborators, CoreEngine, DailyLedger, EnforcementLoop};
use curfew_host_api::{ActivityProbe, AuxiliaryTrigger, NeverTrigger, Notifier};
use curfew_host_unix::{
    CommandLocker, CommandNotifier, ConsoleProbe, FanoutNotifier, LoginctlProbe, NullNotifier,
    ProcessProbe, ProcessTrigger, WebhookNotifier,
};
use curfew_store::{AuditEvent, AuditEventType, NullStore, SqliteStore, Store};
use curfew_util::{CurfewError, DateSource, MonotonicInstant, SystemDateSource, default_config_path};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// curfewd - Adaptive screen-time enforcement for one user
#[derive(Parser, Debug)]
#[command(name = "curfewd")]
#[command(about = "Adaptive screen-time enforcement for one user", long_about = None)]
struct Args {
    /// Configuration file path (default: /etc/curfew/config.toml or ~/.config/curfew/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Target user override; also allows running without a config file
    #[arg(short, long)]
    user: Option<String>,

    /// Start today's total at this many seconds
    #[arg(long, value_name = "SECONDS")]
    initial_daily_seconds: Option<u64>,

    /// Data directory override (or set CURFEW_DATA_DIR env var)
    #[arg(short, long, env = "CURFEW_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Skip the root privilege check
    #[arg(long)]
    no_root_check: bool,
}

/// Main service state
struct Service {
    enforcer: EnforcementLoop,
    store: Arc<dyn Store>,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        let policy = load_policy(args)?;

        info!(
            config_path = %args.config.display(),
            user = %policy.target.user,
            scope = ?policy.limits.scope,
            probe = ?policy.target.probe,
            "Configuration loaded"
        );

        check_privileges(&policy, args)?;

        let store = open_store(&policy)?;

        if let Err(e) = store.append_audit(AuditEvent::new(AuditEventType::DaemonStarted)) {
            warn!(error = %e, "Failed to log daemon start");
        }

        if curfew_util::is_mock_time_active() {
            warn!(
                now = %curfew_util::format_datetime_full(&curfew_util::now()),
                "Mock time is active"
            );
        }

        let source: Arc<dyn DateSource> = Arc::new(SystemDateSource);
        let ledger = match policy.limits.initial_daily {
            Some(initial) => DailyLedger::with_initial(source, initial)
                .context("Failed to apply the initial daily total")?,
            None => DailyLedger::new(source),
        };

        let collaborators = build_collaborators(&policy)?;
        let engine = CoreEngine::new(&policy, ledger, store.clone());
        let enforcer = EnforcementLoop::new(
            engine,
            collaborators,
            store.clone(),
            policy.daemon.tick_interval,
        );

        Ok(Self { enforcer, store })
    }

    async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Set up signal handlers
        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        let mut enforcer = tokio::spawn(self.enforcer.run(shutdown_rx));

        info!("Service running");

        let finished = tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully");
                None
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully");
                None
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, shutting down gracefully");
                None
            }
            result = &mut enforcer => {
                error!("Enforcement loop exited on its own");
                Some(result)
            }
        };

        let result = match finished {
            Some(result) => result,
            None => {
                let _ = shutdown_tx.send(true);
                enforcer.await
            }
        };

        match result {
            Ok(engine) => {
                info!(status = ?engine.status(MonotonicInstant::now()), "Final status");
            }
            Err(e) => error!(error = %e, "Enforcement loop task failed"),
        }

        if let Err(e) = self.store.append_audit(AuditEvent::new(AuditEventType::DaemonStopped)) {
            warn!(error = %e, "Failed to log daemon shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }
}

/// Read the config file (or fall back to defaults when `--user` is given),
/// apply CLI overrides and validate the result
fn load_policy(args: &Args) -> Result<Policy> {
    let mut raw = if args.config.exists() {
        load_raw_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?
    } else if let Some(user) = &args.user {
        warn!(
            config_path = %args.config.display(),
            "Config file not found, using built-in defaults"
        );
        RawConfig::for_user(user.as_str())
    } else {
        bail!(
            "Config file {:?} not found; create it or pass --user",
            args.config
        );
    };

    if let Some(user) = &args.user {
        raw.target.user = user.clone();
    }
    if let Some(secs) = args.initial_daily_seconds {
        raw.limits.initial_daily_seconds = Some(secs);
    }
    if let Some(dir) = &args.data_dir {
        raw.daemon.data_dir = Some(dir.clone());
    }

    policy_from_raw(raw).with_context(|| format!("Invalid configuration in {:?}", args.config))
}

fn check_privileges(policy: &Policy, args: &Args) -> Result<()> {
    if args.no_root_check || !policy.daemon.require_root {
        return Ok(());
    }

    if !nix::unistd::geteuid().is_root() {
        return Err(CurfewError::permission(
            "curfewd must run as root to lock another user's session (pass --no-root-check to skip)",
        )
        .into());
    }

    Ok(())
}

fn open_store(policy: &Policy) -> Result<Arc<dyn Store>> {
    if !policy.daemon.audit {
        info!("Audit trail disabled");
        return Ok(Arc::new(NullStore));
    }

    let data_dir = &policy.daemon.data_dir;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let db_path = data_dir.join("curfewd.db");
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open database {:?}", db_path))?;

    if !store.is_healthy() {
        warn!(db_path = %db_path.display(), "Audit store failed its health check");
    }

    info!(db_path = %db_path.display(), "Store initialized");
    Ok(Arc::new(store))
}

fn build_collaborators(policy: &Policy) -> Result<Collaborators> {
    let probe: Arc<dyn ActivityProbe> = match &policy.target.probe {
        ProbeStrategy::Console => Arc::new(ConsoleProbe::new()),
        ProbeStrategy::Loginctl => Arc::new(LoginctlProbe::new()),
        ProbeStrategy::Process { names } => Arc::new(ProcessProbe::new(names.clone())),
    };

    let trigger: Arc<dyn AuxiliaryTrigger> = if policy.trigger.processes.is_empty() {
        Arc::new(NeverTrigger)
    } else {
        info!(processes = ?policy.trigger.processes, "Auxiliary trigger enabled");
        Arc::new(ProcessTrigger::new(policy.trigger.processes.clone()))
    };

    let locker = Arc::new(CommandLocker::new(
        policy.lock.primary.clone(),
        policy.lock.fallback.clone(),
    ));

    let mut targets: Vec<Box<dyn Notifier>> = Vec::new();
    if let Some(url) = &policy.notify.webhook_url {
        targets.push(Box::new(
            WebhookNotifier::new(url.as_str()).context("Failed to create webhook notifier")?,
        ));
    }
    if let Some(argv) = &policy.notify.command {
        targets.push(Box::new(CommandNotifier::new(argv.clone())));
    }
    let notifier: Arc<dyn Notifier> = if targets.is_empty() {
        info!("No notification channel configured");
        Arc::new(NullNotifier)
    } else {
        Arc::new(FanoutNotifier::new(targets))
    };

    Ok(Collaborators {
        probe,
        trigger,
        locker,
        notifier,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "curfewd starting"
    );

    let service = Service::new(&args)?;
    service.run().await
}

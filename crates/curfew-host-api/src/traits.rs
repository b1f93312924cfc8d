//! Collaborator traits

use async_trait::async_trait;
use curfew_api::LockOutcome;
use curfew_util::UserName;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

/// Errors from collaborator operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Not supported")]
    Unsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Answers "is the target user active right now?"
#[async_trait]
pub trait ActivityProbe: Send + Sync {
    /// Short strategy name for logs
    fn name(&self) -> &'static str;

    async fn is_active(&self, user: &UserName) -> HostResult<bool>;
}

/// Secondary signal that soft-tightens the budget while it holds
#[async_trait]
pub trait AuxiliaryTrigger: Send + Sync {
    async fn is_active(&self) -> HostResult<bool>;
}

/// Trigger used when none is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverTrigger;

#[async_trait]
impl AuxiliaryTrigger for NeverTrigger {
    async fn is_active(&self) -> HostResult<bool> {
        Ok(false)
    }
}

/// Locks the screen
#[async_trait]
pub trait ScreenLocker: Send + Sync {
    /// Primary lock mechanism
    async fn lock(&self) -> HostResult<()>;

    /// Optional: second mechanism tried once when the primary fails
    async fn fallback_lock(&self) -> HostResult<()> {
        Err(HostError::Unsupported)
    }
}

/// Run the primary lock and, on failure, the fallback exactly once.
/// Failures are logged and reported in the outcome, never returned.
pub async fn lock_with_fallback(locker: &dyn ScreenLocker) -> LockOutcome {
    let primary_error = match locker.lock().await {
        Ok(()) => return LockOutcome::Primary,
        Err(e) => e,
    };
    warn!(error = %primary_error, "Primary lock failed, trying fallback");

    match locker.fallback_lock().await {
        Ok(()) => LockOutcome::Fallback {
            primary_error: primary_error.to_string(),
        },
        Err(HostError::Unsupported) => {
            error!(error = %primary_error, "Lock failed and no fallback is configured");
            LockOutcome::Failed {
                primary_error: primary_error.to_string(),
                fallback_error: None,
            }
        }
        Err(fallback_error) => {
            error!(
                primary = %primary_error,
                fallback = %fallback_error,
                "Both lock mechanisms failed"
            );
            LockOutcome::Failed {
                primary_error: primary_error.to_string(),
                fallback_error: Some(fallback_error.to_string()),
            }
        }
    }
}

/// Delivers a human-readable message to an external channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> HostResult<()>;

    /// Optional: whether a delivery target exists at all
    fn is_configured(&self) -> bool {
        true
    }
}

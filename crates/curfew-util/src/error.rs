//! Error types for curfewd

use thiserror::Error;

/// Errors that stop the daemon before enforcement begins
#[derive(Debug, Error)]
pub enum CurfewError {
    /// The effective user cannot act on the target user's session
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Clock error: {0}")]
    Clock(#[from] crate::ClockError),
}

impl CurfewError {
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CurfewError>;

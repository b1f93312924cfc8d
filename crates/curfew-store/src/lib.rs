//! Persistence layer for curfewd
//!
//! Provides an append-only audit log of enforcement actions. Accumulated
//! usage is deliberately not stored: every run starts from zero or an
//! explicit override.

mod audit;
mod sqlite;
mod traits;

pub use audit::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cannot encode audit event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

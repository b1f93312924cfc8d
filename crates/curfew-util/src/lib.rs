//! Shared utilities for curfewd
//!
//! This crate provides:
//! - ID types (UserName, SessionId)
//! - Time utilities (monotonic time, mock-aware wall clock, date sources)
//! - Error types
//! - Throttle gates for rate-limited effects
//! - Default config and data paths

mod error;
mod ids;
mod paths;
mod throttle;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use throttle::*;
pub use time::*;

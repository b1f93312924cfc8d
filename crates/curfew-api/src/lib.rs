//! Shared domain types for curfewd
//!
//! These types are shared by the config layer, the enforcement core and the
//! daemon so that every layer speaks about scopes, breaches and lock outcomes
//! the same way.

mod types;

pub use types::*;

/// Version of the serialized status snapshot layout
pub const STATUS_VERSION: u32 = 1;

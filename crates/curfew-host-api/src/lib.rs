//! Collaborator trait interfaces for curfewd
//!
//! This crate defines the boundary between the enforcement engine and the
//! operating system: activity probes, the auxiliary trigger, screen lockers
//! and notifiers. It contains no platform code itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;

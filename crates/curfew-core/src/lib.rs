//! Adaptive session enforcement engine for curfewd
//!
//! This crate is the heart of curfewd, containing:
//! - Daily ledger of accumulated active time
//! - Session state machine (Idle <-> Active)
//! - Adaptive budget controller (tighten, relax, breach detection)
//! - The per-tick engine and the loop that drives collaborators

mod budget;
mod enforcer;
mod engine;
mod events;
mod ledger;
mod session;

pub use budget::*;
pub use enforcer::*;
pub use engine::*;
pub use events::*;
pub use ledger::*;
pub use session::*;

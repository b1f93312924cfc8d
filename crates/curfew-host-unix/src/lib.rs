//! Unix collaborators for curfewd
//!
//! Provides:
//! - Activity probes (console owner, loginctl session state, process presence)
//! - Auxiliary trigger on named processes
//! - Command-based screen locker with a fallback command
//! - Webhook, command and null notifiers

mod command;
mod locker;
mod notifier;
mod probe;
mod process;
mod trigger;

pub use command::*;
pub use locker::*;
pub use notifier::*;
pub use probe::*;
pub use process::*;
pub use trigger::*;

//! Command-based screen locker

use async_trait::async_trait;
use curfew_host_api::{HostError, HostResult, ScreenLocker};
use std::time::Duration;
use tracing::debug;

use crate::{DEFAULT_COMMAND_TIMEOUT, run_command};

/// Locks the screen by running a command, with an optional fallback command
#[derive(Debug, Clone)]
pub struct CommandLocker {
    primary: Vec<String>,
    fallback: Option<Vec<String>>,
    timeout: Duration,
}

impl CommandLocker {
    pub fn new(primary: Vec<String>, fallback: Option<Vec<String>>) -> Self {
        Self {
            primary,
            fallback,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn primary(&self) -> &[String] {
        &self.primary
    }

    pub fn fallback(&self) -> Option<&[String]> {
        self.fallback.as_deref()
    }
}

#[async_trait]
impl ScreenLocker for CommandLocker {
    async fn lock(&self) -> HostResult<()> {
        debug!(command = ?self.primary, "Running lock command");
        run_command(&self.primary, self.timeout).await.map(|_| ())
    }

    async fn fallback_lock(&self) -> HostResult<()> {
        let Some(fallback) = &self.fallback else {
            return Err(HostError::Unsupported);
        };
        debug!(command = ?fallback, "Running fallback lock command");
        run_command(fallback, self.timeout).await.map(|_| ())
    }
}

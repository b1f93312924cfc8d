//! Activity probes

use async_trait::async_trait;
use curfew_host_api::{ActivityProbe, HostError, HostResult};
use curfew_util::UserName;
use nix::unistd::{Uid, User};
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::{DEFAULT_COMMAND_TIMEOUT, names_running, run_command};

/// Device whose owner is the user logged in at the physical console
pub const CONSOLE_DEVICE: &str = "/dev/console";

/// Look up a login name's uid
pub fn uid_for(user: &UserName) -> HostResult<u32> {
    User::from_name(user.as_str())
        .map_err(|e| HostError::Internal(format!("User lookup failed: {}", e)))?
        .map(|u| u.uid.as_raw())
        .ok_or_else(|| HostError::UnknownUser(user.to_string()))
}

/// Active when the target user owns the console device
#[derive(Debug, Clone)]
pub struct ConsoleProbe {
    device: PathBuf,
}

impl ConsoleProbe {
    pub fn new() -> Self {
        Self::with_device(CONSOLE_DEVICE)
    }

    pub fn with_device(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }

    /// Login name owning the console device, if it maps to a user
    pub async fn console_user(&self) -> HostResult<Option<String>> {
        let metadata = tokio::fs::metadata(&self.device).await?;
        let owner = User::from_uid(Uid::from_raw(metadata.uid()))
            .map_err(|e| HostError::Internal(format!("User lookup failed: {}", e)))?;
        Ok(owner.map(|u| u.name))
    }
}

impl Default for ConsoleProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityProbe for ConsoleProbe {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn is_active(&self, user: &UserName) -> HostResult<bool> {
        let owner = self.console_user().await?;
        debug!(device = %self.device.display(), owner = ?owner, "Console owner");
        Ok(owner.as_deref() == Some(user.as_str()))
    }
}

/// Active when logind reports the user's state as `active`
#[derive(Debug, Clone)]
pub struct LoginctlProbe {
    timeout: Duration,
}

impl LoginctlProbe {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl Default for LoginctlProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Interpret `loginctl show-user --property=State --value` output
pub fn is_active_state(state: &str) -> bool {
    state.trim() == "active"
}

#[async_trait]
impl ActivityProbe for LoginctlProbe {
    fn name(&self) -> &'static str {
        "loginctl"
    }

    async fn is_active(&self, user: &UserName) -> HostResult<bool> {
        let argv = [
            "loginctl".to_string(),
            "show-user".to_string(),
            user.to_string(),
            "--property=State".to_string(),
            "--value".to_string(),
        ];

        match run_command(&argv, self.timeout).await {
            Ok(state) => Ok(is_active_state(&state)),
            // logind has no record of users without a session
            Err(HostError::CommandFailed(msg)) if msg.contains("not logged in") => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Active when the user runs at least one of the named processes
#[derive(Debug, Clone)]
pub struct ProcessProbe {
    names: Vec<String>,
}

impl ProcessProbe {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

#[async_trait]
impl ActivityProbe for ProcessProbe {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn is_active(&self, user: &UserName) -> HostResult<bool> {
        let uid = uid_for(user)?;
        names_running(self.names.clone(), Some(uid)).await
    }
}

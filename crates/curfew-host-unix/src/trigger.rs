//! Auxiliary trigger on running processes

use async_trait::async_trait;
use curfew_host_api::{AuxiliaryTrigger, HostResult};

use crate::names_running;

/// Fires while any of the named processes runs, whoever owns it
#[derive(Debug, Clone)]
pub struct ProcessTrigger {
    names: Vec<String>,
}

impl ProcessTrigger {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[async_trait]
impl AuxiliaryTrigger for ProcessTrigger {
    async fn is_active(&self) -> HostResult<bool> {
        if self.names.is_empty() {
            return Ok(false);
        }
        names_running(self.names.clone(), None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_list_never_fires() {
        assert!(!ProcessTrigger::new(vec![]).is_active().await.unwrap());
    }

    #[tokio::test]
    async fn absent_process_does_not_fire() {
        let trigger = ProcessTrigger::new(vec!["curfew-no-such-process".into()]);
        assert!(!trigger.is_active().await.unwrap());
    }
}

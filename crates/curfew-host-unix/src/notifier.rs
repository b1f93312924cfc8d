//! Notifiers

use async_trait::async_trait;
use curfew_host_api::{HostError, HostResult, Notifier};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::{DEFAULT_COMMAND_TIMEOUT, run_command};

/// Timeout for webhook deliveries
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts `{"text": message}` to an HTTP endpoint
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> HostResult<Self> {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .connect_timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| HostError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &str) -> HostResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "text": message }))
            .send()
            .await
            .map_err(|e| HostError::DeliveryFailed(e.to_string()))?;

        let status = response.status();
        debug!(url = %self.url, status = %status, "Webhook delivered");
        if status.is_success() {
            Ok(())
        } else {
            Err(HostError::DeliveryFailed(format!("HTTP {}", status)))
        }
    }
}

/// Runs a command with the message appended as the last argument
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandNotifier {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn send(&self, message: &str) -> HostResult<()> {
        let mut argv = self.argv.clone();
        argv.push(message.to_string());
        run_command(&argv, self.timeout).await.map(|_| ())
    }
}

/// Notifier used when no delivery target is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, _message: &str) -> HostResult<()> {
        Ok(())
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Delivers to several notifiers; succeeds if any of them does
pub struct FanoutNotifier {
    targets: Vec<Box<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Box<dyn Notifier>>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn send(&self, message: &str) -> HostResult<()> {
        let mut last_error = None;
        let mut delivered = false;
        for target in &self.targets {
            match target.send(message).await {
                Ok(()) => delivered = true,
                Err(e) => last_error = Some(e),
            }
        }

        match (delivered, last_error) {
            (true, _) | (false, None) => Ok(()),
            (false, Some(e)) => Err(e),
        }
    }

    fn is_configured(&self) -> bool {
        self.targets.iter().any(|t| t.is_configured())
    }
}

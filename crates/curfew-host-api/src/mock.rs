//! Mock collaborators for testing

use async_trait::async_trait;
use curfew_util::UserName;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::{ActivityProbe, AuxiliaryTrigger, HostError, HostResult, Notifier, ScreenLocker};

/// Scripted answer for a probe or trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockAnswer {
    Active,
    Inactive,
    Fail,
}

impl From<bool> for MockAnswer {
    fn from(active: bool) -> Self {
        if active {
            MockAnswer::Active
        } else {
            MockAnswer::Inactive
        }
    }
}

/// Shared answer source: scripted answers first, then a steady value
#[derive(Debug)]
struct Answers {
    script: Mutex<VecDeque<MockAnswer>>,
    steady: Mutex<MockAnswer>,
    calls: AtomicU64,
}

impl Answers {
    fn new(steady: MockAnswer) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            steady: Mutex::new(steady),
            calls: AtomicU64::new(0),
        }
    }

    fn next(&self, what: &str) -> HostResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(*self.steady.lock().unwrap());

        match answer {
            MockAnswer::Active => Ok(true),
            MockAnswer::Inactive => Ok(false),
            MockAnswer::Fail => Err(HostError::CommandFailed(format!("mock {what} failure"))),
        }
    }
}

/// Mock activity probe
#[derive(Debug, Clone)]
pub struct MockProbe {
    answers: Arc<Answers>,
}

impl MockProbe {
    pub fn new(active: bool) -> Self {
        Self {
            answers: Arc::new(Answers::new(active.into())),
        }
    }

    /// Answer used once the script is exhausted
    pub fn set(&self, answer: impl Into<MockAnswer>) {
        *self.answers.steady.lock().unwrap() = answer.into();
    }

    /// Queue one-shot answers, consumed in order
    pub fn script(&self, answers: impl IntoIterator<Item = MockAnswer>) {
        self.answers.script.lock().unwrap().extend(answers);
    }

    pub fn calls(&self) -> u64 {
        self.answers.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActivityProbe for MockProbe {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn is_active(&self, _user: &UserName) -> HostResult<bool> {
        self.answers.next("probe")
    }
}

/// Mock auxiliary trigger
#[derive(Debug, Clone)]
pub struct MockTrigger {
    answers: Arc<Answers>,
}

impl MockTrigger {
    pub fn new(active: bool) -> Self {
        Self {
            answers: Arc::new(Answers::new(active.into())),
        }
    }

    pub fn set(&self, answer: impl Into<MockAnswer>) {
        *self.answers.steady.lock().unwrap() = answer.into();
    }

    pub fn script(&self, answers: impl IntoIterator<Item = MockAnswer>) {
        self.answers.script.lock().unwrap().extend(answers);
    }
}

#[async_trait]
impl AuxiliaryTrigger for MockTrigger {
    async fn is_active(&self) -> HostResult<bool> {
        self.answers.next("trigger")
    }
}

/// Mock screen locker recording every call
#[derive(Debug, Clone)]
pub struct MockLocker {
    has_fallback: bool,

    /// Configure the primary mechanism to fail
    pub fail_primary: Arc<AtomicBool>,

    /// Configure the fallback mechanism to fail
    pub fail_fallback: Arc<AtomicBool>,

    primary_calls: Arc<AtomicU64>,
    fallback_calls: Arc<AtomicU64>,
}

impl MockLocker {
    pub fn new() -> Self {
        Self {
            has_fallback: true,
            fail_primary: Arc::new(AtomicBool::new(false)),
            fail_fallback: Arc::new(AtomicBool::new(false)),
            primary_calls: Arc::new(AtomicU64::new(0)),
            fallback_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn without_fallback() -> Self {
        Self {
            has_fallback: false,
            ..Self::new()
        }
    }

    pub fn set_fail_primary(&self, fail: bool) {
        self.fail_primary.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_fallback(&self, fail: bool) {
        self.fail_fallback.store(fail, Ordering::SeqCst);
    }

    pub fn primary_calls(&self) -> u64 {
        self.primary_calls.load(Ordering::SeqCst)
    }

    pub fn fallback_calls(&self) -> u64 {
        self.fallback_calls.load(Ordering::SeqCst)
    }

    /// Lock attempts, counting each primary invocation once
    pub fn lock_attempts(&self) -> u64 {
        self.primary_calls()
    }
}

impl Default for MockLocker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScreenLocker for MockLocker {
    async fn lock(&self) -> HostResult<()> {
        self.primary_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_primary.load(Ordering::SeqCst) {
            return Err(HostError::CommandFailed("mock primary lock failure".into()));
        }
        Ok(())
    }

    async fn fallback_lock(&self) -> HostResult<()> {
        if !self.has_fallback {
            return Err(HostError::Unsupported);
        }
        self.fallback_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fallback.load(Ordering::SeqCst) {
            return Err(HostError::CommandFailed("mock fallback lock failure".into()));
        }
        Ok(())
    }
}

/// Mock notifier recording delivered messages
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    /// Configure delivery to fail
    pub fail: Arc<AtomicBool>,

    attempts: Arc<AtomicU64>,
    delivered: Arc<Mutex<Vec<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Messages that were successfully delivered
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }

    /// Every send call, including failed ones
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, message: &str) -> HostResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(HostError::DeliveryFailed("mock delivery failure".into()));
        }
        self.delivered.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_script_then_steady() {
        let probe = MockProbe::new(false);
        probe.script([MockAnswer::Active, MockAnswer::Fail]);
        let user = UserName::new("hsong");

        assert!(probe.is_active(&user).await.unwrap());
        assert!(probe.is_active(&user).await.is_err());
        assert!(!probe.is_active(&user).await.unwrap());

        probe.set(true);
        assert!(probe.is_active(&user).await.unwrap());
        assert_eq!(probe.calls(), 4);
    }

    #[tokio::test]
    async fn notifier_records_only_delivered() {
        let notifier = MockNotifier::new();
        notifier.send("first").await.unwrap();
        notifier.set_fail(true);
        assert!(notifier.send("second").await.is_err());

        assert_eq!(notifier.delivered(), vec!["first".to_string()]);
        assert_eq!(notifier.attempts(), 2);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let locker = MockLocker::new();
        let handle = locker.clone();
        locker.lock().await.unwrap();
        assert_eq!(handle.primary_calls(), 1);
    }
}

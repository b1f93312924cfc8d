//! Session state machine

use curfew_util::{MonotonicInstant, SessionId};
use std::time::Duration;

/// Current session state. The start time exists only while active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active {
        session_id: SessionId,
        started_at: MonotonicInstant,
    },
}

/// What one probe observation did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    /// Idle -> Active
    Started { session_id: SessionId },
    /// Active -> Active
    Continued {
        session_id: SessionId,
        duration: Duration,
    },
    /// Active -> Idle
    Ended {
        session_id: SessionId,
        duration: Duration,
    },
    /// Idle -> Idle
    Idle,
}

/// Tracks continuous active sessions from probe results
#[derive(Debug, Clone)]
pub struct SessionTracker {
    state: SessionState,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active { .. })
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match &self.state {
            SessionState::Active { session_id, .. } => Some(session_id),
            SessionState::Idle => None,
        }
    }

    /// Feed one probe result
    pub fn observe(&mut self, active: bool, now: MonotonicInstant) -> SessionTransition {
        match (&self.state, active) {
            (SessionState::Idle, true) => {
                let session_id = SessionId::new();
                self.state = SessionState::Active {
                    session_id: session_id.clone(),
                    started_at: now,
                };
                SessionTransition::Started { session_id }
            }
            (SessionState::Active { session_id, started_at }, true) => {
                SessionTransition::Continued {
                    session_id: session_id.clone(),
                    duration: now.saturating_duration_since(*started_at),
                }
            }
            (SessionState::Active { .. }, false) => match self.reset(now) {
                Some((session_id, duration)) => SessionTransition::Ended {
                    session_id,
                    duration,
                },
                None => SessionTransition::Idle,
            },
            (SessionState::Idle, false) => SessionTransition::Idle,
        }
    }

    /// Continuous active duration, zero when idle
    pub fn current_duration(&self, now: MonotonicInstant) -> Duration {
        match &self.state {
            SessionState::Active { started_at, .. } => now.saturating_duration_since(*started_at),
            SessionState::Idle => Duration::ZERO,
        }
    }

    /// Force Idle. Returns the ended session and its duration, if one was active.
    pub fn reset(&mut self, now: MonotonicInstant) -> Option<(SessionId, Duration)> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Active {
                session_id,
                started_at,
            } => Some((session_id, now.saturating_duration_since(started_at))),
            SessionState::Idle => None,
        }
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

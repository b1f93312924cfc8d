//! Time utilities for curfewd
//!
//! Provides monotonic time (for session durations, cooldowns and throttles)
//! and wall-clock dates (for the daily ledger key).
//!
//! # Mock Time for Development
//!
//! In debug builds, the `CURFEW_MOCK_TIME` environment variable can be set
//! to override the system time for all wall-clock operations. This is useful
//! for exercising day rollover of the daily ledger.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 23:59:30`)
//!
//! Example:
//! ```bash
//! CURFEW_MOCK_TIME="2025-12-25 23:59:30" ./target/debug/curfewd --no-root-check
//! ```

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "CURFEW_MOCK_TIME";

/// Format used for ledger date keys
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Offset between mock time and real time, fixed at first use so mock
/// time keeps advancing.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[allow(clippy::disallowed_methods)] // wraps Local::now() for mock support
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        if !cfg!(debug_assertions) {
            return None;
        }
        let value = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
        let offset = parse_mock_time(&value)?.signed_duration_since(chrono::Local::now());
        tracing::info!(
            mock_time = %value,
            offset_secs = offset.num_seconds(),
            "Mock time enabled"
        );
        Some(offset)
    })
}

fn parse_mock_time(value: &str) -> Option<DateTime<Local>> {
    let Ok(naive) = NaiveDateTime::parse_from_str(value, MOCK_TIME_FORMAT) else {
        tracing::warn!(
            mock_time = %value,
            expected_format = MOCK_TIME_FORMAT,
            "Ignoring malformed mock time"
        );
        return None;
    };

    let local = Local.from_local_datetime(&naive).single();
    if local.is_none() {
        tracing::warn!(mock_time = %value, "Mock time does not exist in the local timezone");
    }
    local
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format(MOCK_TIME_FORMAT).to_string()
}

/// Ledger key for a calendar date (`YYYY-MM-DD`)
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Represents a point in monotonic time for duration enforcement.
/// This is immune to wall-clock changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub fn duration_since(&self, earlier: MonotonicInstant) -> Duration {
        self.0.duration_since(earlier.0)
    }

    /// Duration since `earlier`, or zero if `earlier` is in the future
    pub fn saturating_duration_since(&self, earlier: MonotonicInstant) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }

    /// `self + duration`, or `None` past the platform's representable range
    pub fn checked_add(&self, duration: Duration) -> Option<MonotonicInstant> {
        self.0.checked_add(duration).map(MonotonicInstant)
    }
}

impl std::ops::Add<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        MonotonicInstant(self.0 + rhs)
    }
}

/// Failure to determine today's calendar date
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("system clock is set before the Unix epoch")]
    BeforeEpoch,

    #[error("system time is outside the representable range")]
    OutOfRange,

    #[error("clock unavailable: {0}")]
    Unavailable(String),
}

/// Source of "today" for the daily ledger
pub trait DateSource: Send + Sync {
    fn today(&self) -> Result<NaiveDate, ClockError>;
}

/// Local calendar date derived from the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDateSource;

impl DateSource for SystemDateSource {
    fn today(&self) -> Result<NaiveDate, ClockError> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| ClockError::BeforeEpoch)?;
        let secs = i64::try_from(since_epoch.as_secs()).map_err(|_| ClockError::OutOfRange)?;
        let utc = DateTime::<Utc>::from_timestamp(secs, since_epoch.subsec_nanos())
            .ok_or(ClockError::OutOfRange)?;

        let mut local = utc.with_timezone(&Local);
        if let Some(offset) = get_mock_time_offset() {
            local = local
                .checked_add_signed(offset)
                .ok_or(ClockError::OutOfRange)?;
        }

        Ok(local.date_naive())
    }
}

/// Date source driven by hand, for tests and simulations.
///
/// Holds either a date or nothing; nothing means the clock is unavailable.
#[derive(Debug, Default)]
pub struct ManualDateSource {
    date: Mutex<Option<NaiveDate>>,
}

impl ManualDateSource {
    pub fn fixed(date: NaiveDate) -> Self {
        Self {
            date: Mutex::new(Some(date)),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.date.lock().unwrap_or_else(PoisonError::into_inner) = Some(date);
    }

    /// Make subsequent `today()` calls fail
    pub fn fail(&self) {
        *self.date.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl DateSource for ManualDateSource {
    fn today(&self) -> Result<NaiveDate, ClockError> {
        // A plain Option cannot be left half-written, so poisoning is ignored
        let guard = self.date.lock().unwrap_or_else(PoisonError::into_inner);
        guard.ok_or_else(|| ClockError::Unavailable("manual date source unset".into()))
    }
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

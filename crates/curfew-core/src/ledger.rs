//! Per-day accumulated active time

use chrono::NaiveDate;
use curfew_util::{ClockError, DateSource, date_key};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Accumulated active time keyed by calendar date (`YYYY-MM-DD`).
///
/// Entries are created lazily on the first increment of a day and only ever
/// grow. If today's date cannot be computed, operations fail with
/// [`ClockError`] and the ledger is left exactly as it was.
pub struct DailyLedger {
    source: Arc<dyn DateSource>,
    totals: BTreeMap<String, Duration>,
}

impl DailyLedger {
    pub fn new(source: Arc<dyn DateSource>) -> Self {
        Self {
            source,
            totals: BTreeMap::new(),
        }
    }

    /// Create a ledger whose entry for today starts at `initial`
    pub fn with_initial(source: Arc<dyn DateSource>, initial: Duration) -> Result<Self, ClockError> {
        let key = date_key(source.today()?);
        let mut ledger = Self::new(source);
        ledger.totals.insert(key, initial);
        Ok(ledger)
    }

    /// Add `amount` to today's total and return the new total
    pub fn add(&mut self, amount: Duration) -> Result<Duration, ClockError> {
        let key = date_key(self.source.today()?);
        let total = self.totals.entry(key).or_insert(Duration::ZERO);
        *total = total.saturating_add(amount);
        Ok(*total)
    }

    /// Today's total, zero if nothing was recorded today
    pub fn get(&self) -> Result<Duration, ClockError> {
        let today = self.source.today()?;
        Ok(self.get_on(today))
    }

    /// Total for a specific date
    pub fn get_on(&self, date: NaiveDate) -> Duration {
        self.totals
            .get(&date_key(date))
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// All recorded days, oldest first
    pub fn entries(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.totals.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

impl std::fmt::Debug for DailyLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyLedger")
            .field("totals", &self.totals)
            .finish()
    }
}

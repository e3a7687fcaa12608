/// Bounded, time-ordered buffer of recent readings

use chrono::{Duration, Utc};
use tracing::debug;

use crate::types::Reading;

/// Readings older than this (relative to the add call) are evicted
pub const RETENTION_MINUTES: i64 = 60;

/// Signed gap between two instants in fractional minutes
pub(crate) fn minutes_between(
    earlier: chrono::DateTime<Utc>,
    later: chrono::DateTime<Utc>,
) -> f64 {
    later.signed_duration_since(earlier).num_milliseconds() as f64 / 60_000.0
}

/// Size cap used when none is configured
pub const DEFAULT_MAX_HISTORY: usize = 60;

/// Recent reading history, sorted ascending by timestamp.
///
/// Only `add` mutates the buffer: it appends, re-sorts, drops entries
/// outside the retention window, then trims to the size cap. Queries
/// see a read-only snapshot.
#[derive(Debug, Clone)]
pub struct ReadingHistory {
    max_entries: usize,
    readings: Vec<Reading>,
}

impl ReadingHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            readings: Vec::new(),
        }
    }

    pub fn add(&mut self, reading: Reading) {
        self.readings.push(reading);

        // Full re-sort guards against any out-of-order arrival
        self.readings.sort_by_key(|r| r.timestamp);

        let cutoff = Utc::now() - Duration::minutes(RETENTION_MINUTES);
        let before = self.readings.len();
        self.readings.retain(|r| r.timestamp > cutoff);
        if self.readings.len() < before {
            debug!(
                evicted = before - self.readings.len(),
                "Evicted readings older than {} minutes", RETENTION_MINUTES
            );
        }

        if self.readings.len() > self.max_entries {
            let excess = self.readings.len() - self.max_entries;
            self.readings.drain(..excess);
        }
    }

    pub fn clear(&mut self) {
        self.readings.clear();
        debug!("Cleared reading history");
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Most recent reading, the anchor for rate and delta queries
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.last()
    }

    pub fn as_slice(&self) -> &[Reading] {
        &self.readings
    }
}

impl Default for ReadingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

/// Trend engine facade: ingress, staleness gate, query orchestration

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::algo::{classify_rate, estimate_rate, smooth_trend};
use crate::algo::delta::delta_for_minutes;
use crate::history::{minutes_between, ReadingHistory, DEFAULT_MAX_HISTORY};
use crate::ingest::{self, RawReading};
use crate::types::{DeltaResult, Reading, Trend, TrendAssessment, TrendRecord};

/// Trend queries short-circuit to a stale result past this age
pub const DATA_TIMEOUT_MINUTES: f64 = 10.0;

/// Smoothing kicks in once this many readings are buffered
const SMOOTHING_MIN_HISTORY: usize = 3;

/// One engine instance tracks one reading series.
///
/// Readings are pushed in by the polling collaborator; trend and delta
/// queries are pulled independently at render time and never mutate
/// state. Invalid input is dropped silently; no operation here
/// surfaces an error to the caller.
pub struct TrendEngine {
    history: ReadingHistory,
    last_accepted: Option<DateTime<Utc>>,
}

impl TrendEngine {
    pub fn new() -> Self {
        Self::with_max_history(DEFAULT_MAX_HISTORY)
    }

    pub fn with_max_history(max_entries: usize) -> Self {
        Self {
            history: ReadingHistory::new(max_entries),
            last_accepted: None,
        }
    }

    /// Push a wire reading; malformed payloads are dropped silently
    pub fn add_measurement(&mut self, raw: &RawReading) {
        match ingest::parse_reading(raw) {
            Ok(reading) => self.add_reading(reading),
            Err(err) => debug!(%err, "Dropped malformed reading"),
        }
    }

    /// Push a loose JSON payload; malformed payloads are dropped silently
    pub fn add_json(&mut self, payload: &serde_json::Value) {
        match ingest::parse_json(payload) {
            Ok(reading) => self.add_reading(reading),
            Err(err) => debug!(%err, "Dropped malformed reading payload"),
        }
    }

    /// Accept an already-parsed reading.
    ///
    /// A timestamp equal to the immediately preceding accepted
    /// reading's is suppressed; older entries are not consulted.
    pub fn add_reading(&mut self, reading: Reading) {
        if self.last_accepted == Some(reading.timestamp) {
            debug!(
                timestamp = %reading.timestamp,
                value = reading.value,
                "Skipping duplicate reading"
            );
            return;
        }

        self.last_accepted = Some(reading.timestamp);
        self.history.add(reading);
    }

    /// Run the staleness gate and, when the data is fresh enough, the
    /// estimate → classify → smooth pipeline.
    pub fn assess_trend(&self) -> TrendAssessment {
        let Some(latest) = self.history.latest() else {
            debug!("No historical data available");
            return TrendAssessment::Stale {
                minutes_since_last: 0.0,
                history_count: 0,
            };
        };

        let minutes_since_last = minutes_between(latest.timestamp, Utc::now());
        if minutes_since_last > DATA_TIMEOUT_MINUTES {
            warn!(
                minutes_since_last,
                "Latest reading is too old, returning stale state"
            );
            return TrendAssessment::Stale {
                minutes_since_last,
                history_count: self.history.len(),
            };
        }

        if self.history.len() < 2 {
            debug!("Not enough data for trend calculation");
            return self.fallback(latest);
        }

        match estimate_rate(self.history.as_slice()) {
            Some(rate) => {
                let mut trend = classify_rate(rate);
                if self.history.len() >= SMOOTHING_MIN_HISTORY {
                    trend = smooth_trend(trend, self.history.as_slice());
                }
                debug!(rate, trend = %trend, "Calculated trend");
                TrendAssessment::Computed {
                    trend,
                    rate,
                    history_count: self.history.len(),
                    minutes_since_last,
                }
            }
            // Degrade rather than propagate when the estimator comes up empty
            None => self.fallback(latest),
        }
    }

    fn fallback(&self, latest: &Reading) -> TrendAssessment {
        let trend = latest
            .device_trend
            .and_then(|hint| hint.as_trend())
            .unwrap_or(Trend::Stable);
        TrendAssessment::Fallback {
            trend,
            history_count: self.history.len(),
        }
    }

    /// Trend query flattened into the downstream record shape
    pub fn trend_record(&self) -> TrendRecord {
        self.assess_trend().to_record()
    }

    /// Delta queries run independently of the staleness gate; consumers
    /// are expected to suppress the display themselves when the trend
    /// query reports stale data
    pub fn delta_for_minutes(&self, window_minutes: f64) -> DeltaResult {
        delta_for_minutes(self.history.as_slice(), window_minutes)
    }

    pub fn delta_1min(&self) -> DeltaResult {
        self.delta_for_minutes(1.0)
    }

    pub fn delta_5min(&self) -> DeltaResult {
        self.delta_for_minutes(5.0)
    }

    pub fn delta_15min(&self) -> DeltaResult {
        self.delta_for_minutes(15.0)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl Default for TrendEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Clonable handle for hosts that dispatch adds and queries from
/// different threads. One lock covers the whole add-prune-trim sequence
/// and every buffer-iterating read.
#[derive(Clone)]
pub struct SharedTrendEngine {
    inner: Arc<Mutex<TrendEngine>>,
}

impl SharedTrendEngine {
    pub fn new() -> Self {
        Self::with_max_history(DEFAULT_MAX_HISTORY)
    }

    pub fn with_max_history(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrendEngine::with_max_history(max_entries))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrendEngine> {
        self.inner.lock().expect("trend engine lock poisoned")
    }

    pub fn add_measurement(&self, raw: &RawReading) {
        self.lock().add_measurement(raw);
    }

    pub fn add_json(&self, payload: &serde_json::Value) {
        self.lock().add_json(payload);
    }

    pub fn add_reading(&self, reading: Reading) {
        self.lock().add_reading(reading);
    }

    pub fn assess_trend(&self) -> TrendAssessment {
        self.lock().assess_trend()
    }

    pub fn trend_record(&self) -> TrendRecord {
        self.lock().trend_record()
    }

    pub fn delta_for_minutes(&self, window_minutes: f64) -> DeltaResult {
        self.lock().delta_for_minutes(window_minutes)
    }

    pub fn delta_1min(&self) -> DeltaResult {
        self.lock().delta_1min()
    }

    pub fn delta_5min(&self) -> DeltaResult {
        self.lock().delta_5min()
    }

    pub fn delta_15min(&self) -> DeltaResult {
        self.lock().delta_15min()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history_len()
    }

    pub fn clear_history(&self) {
        self.lock().clear_history();
    }
}

impl Default for SharedTrendEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Core data types for the trend estimation engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single validated glucose reading, normalized at the ingress boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Absolute instant of the measurement, resolved to UTC
    pub timestamp: DateTime<Utc>,

    /// Glucose concentration in mg/dL
    pub value: f64,

    /// Trend hint reported by the upstream sensor, if any
    pub device_trend: Option<DeviceTrend>,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            device_trend: None,
        }
    }

    pub fn with_device_trend(timestamp: DateTime<Utc>, value: f64, hint: DeviceTrend) -> Self {
        Self {
            timestamp,
            value,
            device_trend: Some(hint),
        }
    }
}

/// Trend category, ordered from steepest fall to steepest rise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    FallingFast,
    Falling,
    Stable,
    Rising,
    RisingFast,
}

impl Trend {
    /// Canonical wire name, e.g. "FALLING_FAST"
    pub fn name(self) -> &'static str {
        match self {
            Trend::FallingFast => "FALLING_FAST",
            Trend::Falling => "FALLING",
            Trend::Stable => "STABLE",
            Trend::Rising => "RISING",
            Trend::RisingFast => "RISING_FAST",
        }
    }

    /// Single-glyph direction indicator
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::FallingFast => "↓",
            Trend::Falling => "↘",
            Trend::Stable => "→",
            Trend::Rising => "↗",
            Trend::RisingFast => "↑",
        }
    }

    /// Human-readable description
    pub fn description(self) -> &'static str {
        match self {
            Trend::FallingFast => "Falling fast",
            Trend::Falling => "Falling",
            Trend::Stable => "Stable",
            Trend::Rising => "Rising",
            Trend::RisingFast => "Rising fast",
        }
    }

    /// Position on the ordered five-level scale (0 = FALLING_FAST)
    pub fn level(self) -> i32 {
        match self {
            Trend::FallingFast => 0,
            Trend::Falling => 1,
            Trend::Stable => 2,
            Trend::Rising => 3,
            Trend::RisingFast => 4,
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Trend hint vocabulary reported by the upstream sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceTrend {
    DoubleDown,
    SingleDown,
    FortyFiveDown,
    Flat,
    FortyFiveUp,
    SingleUp,
    DoubleUp,
}

impl DeviceTrend {
    /// Parse an upstream hint code. Unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "DOUBLE_DOWN" => Some(DeviceTrend::DoubleDown),
            "SINGLE_DOWN" => Some(DeviceTrend::SingleDown),
            "FORTY_FIVE_DOWN" => Some(DeviceTrend::FortyFiveDown),
            "FLAT" => Some(DeviceTrend::Flat),
            "FORTY_FIVE_UP" => Some(DeviceTrend::FortyFiveUp),
            "SINGLE_UP" => Some(DeviceTrend::SingleUp),
            "DOUBLE_UP" => Some(DeviceTrend::DoubleUp),
            _ => None,
        }
    }

    /// Lossy mapping onto the five-level scale. Distinct codes collapse
    /// onto the same category, and FLAT casts no vote at all.
    pub fn as_trend(self) -> Option<Trend> {
        match self {
            DeviceTrend::DoubleDown | DeviceTrend::SingleDown => Some(Trend::FallingFast),
            DeviceTrend::FortyFiveDown => Some(Trend::Falling),
            DeviceTrend::Flat => None,
            DeviceTrend::FortyFiveUp => Some(Trend::Rising),
            DeviceTrend::SingleUp | DeviceTrend::DoubleUp => Some(Trend::RisingFast),
        }
    }
}

/// Outcome of a trend query. Each case carries only the fields that are
/// meaningful to it; `to_record` flattens into the downstream wire shape.
#[derive(Debug, Clone, PartialEq)]
pub enum TrendAssessment {
    /// Newest reading is too old to trust (or there is none at all)
    Stale {
        minutes_since_last: f64,
        history_count: usize,
    },

    /// Too little fresh history to compute; category comes from the
    /// newest device hint
    Fallback { trend: Trend, history_count: usize },

    /// Rate was estimated and classified from history
    Computed {
        trend: Trend,
        rate: f64,
        history_count: usize,
        minutes_since_last: f64,
    },
}

impl TrendAssessment {
    pub fn is_calculated(&self) -> bool {
        matches!(self, TrendAssessment::Computed { .. })
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, TrendAssessment::Stale { .. })
    }

    /// Category of the assessment, absent for stale data
    pub fn trend(&self) -> Option<Trend> {
        match self {
            TrendAssessment::Stale { .. } => None,
            TrendAssessment::Fallback { trend, .. } => Some(*trend),
            TrendAssessment::Computed { trend, .. } => Some(*trend),
        }
    }

    /// Flatten into the key-for-key record consumed downstream
    pub fn to_record(&self) -> TrendRecord {
        match *self {
            TrendAssessment::Stale {
                minutes_since_last,
                history_count,
            } => TrendRecord {
                trend: "STALE_DATA".to_string(),
                rate: 0.0,
                arrow: "-".to_string(),
                description: format!("Data outdated ({:.0} min)", minutes_since_last),
                calculated: false,
                history_count,
                data_is_fresh: false,
                minutes_since_last,
            },
            TrendAssessment::Fallback {
                trend,
                history_count,
            } => TrendRecord {
                trend: trend.name().to_string(),
                rate: 0.0,
                arrow: trend.arrow().to_string(),
                description: trend.description().to_string(),
                calculated: false,
                history_count,
                data_is_fresh: true,
                minutes_since_last: 0.0,
            },
            TrendAssessment::Computed {
                trend,
                rate,
                history_count,
                minutes_since_last,
            } => TrendRecord {
                trend: trend.name().to_string(),
                rate,
                arrow: trend.arrow().to_string(),
                description: trend.description().to_string(),
                calculated: true,
                history_count,
                data_is_fresh: true,
                minutes_since_last,
            },
        }
    }
}

/// Flat trend record with keys preserved verbatim for downstream consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRecord {
    pub trend: String,
    pub rate: f64,
    pub arrow: String,
    pub description: String,
    pub calculated: bool,
    pub history_count: usize,
    pub data_is_fresh: bool,
    pub minutes_since_last: f64,
}

/// Result of a fixed-lookback delta query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaResult {
    pub delta_value: f64,
    pub time_diff: f64,
    pub found: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_window: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_window: Option<f64>,
}

impl DeltaResult {
    /// Not-found result carrying a diagnostic note
    pub fn not_found(note: impl Into<String>) -> Self {
        Self {
            delta_value: 0.0,
            time_diff: 0.0,
            found: false,
            note: Some(note.into()),
            requested_window: None,
            actual_window: None,
        }
    }
}

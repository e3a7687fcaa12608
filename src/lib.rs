// Core data types and time-ordered history
pub mod history;
pub mod types;

// Trend estimation algorithms
pub mod algo;

// Reading ingress boundary
pub mod ingest;

// Engine facade
pub mod engine;

// Re-export commonly used types for convenience
pub use engine::{SharedTrendEngine, TrendEngine, DATA_TIMEOUT_MINUTES};
pub use history::{ReadingHistory, DEFAULT_MAX_HISTORY, RETENTION_MINUTES};
pub use ingest::{IngestError, RawReading};
pub use types::{DeltaResult, DeviceTrend, Reading, Trend, TrendAssessment, TrendRecord};

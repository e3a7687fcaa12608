/// Trend estimation algorithms

pub mod classifier;
pub mod delta;
pub mod rate;

pub use classifier::{classify_rate, smooth_trend};
pub use delta::delta_for_minutes;
pub use rate::{estimate_rate, rate_between};

/// Rate classification and device-hint smoothing

use tracing::debug;

use crate::types::{Reading, Trend};

/// mg/dL to mmol/L conversion factor
const MGDL_TO_MMOL: f64 = 0.0555;

// Thresholds in mmol/L per minute. The two falling bounds are
// inclusive, the rising side is exclusive.
const FALLING_FAST_AT: f64 = -0.166;
const FALLING_AT: f64 = -0.055;
const RISING_AT: f64 = 0.055;
const RISING_FAST_AT: f64 = 0.166;

/// Number of trailing readings whose device hints vote in smoothing
const SMOOTHING_HINT_COUNT: usize = 3;

/// Map a rate of change in mg/dL per minute onto the five-level scale.
/// Thresholds are conventionally quoted in mmol/L per minute, so the
/// rate is converted before comparison.
pub fn classify_rate(rate_mgdl_per_min: f64) -> Trend {
    classify_mmol(rate_mgdl_per_min * MGDL_TO_MMOL)
}

fn classify_mmol(rate_mmol: f64) -> Trend {
    if rate_mmol <= FALLING_FAST_AT {
        Trend::FallingFast
    } else if rate_mmol <= FALLING_AT {
        Trend::Falling
    } else if rate_mmol < RISING_AT {
        Trend::Stable
    } else if rate_mmol < RISING_FAST_AT {
        Trend::Rising
    } else {
        Trend::RisingFast
    }
}

/// Damp single-sample flips by voting the computed category against the
/// device hints of the three newest readings.
///
/// Hints map through the lossy device vocabulary; unmapped hints are
/// discarded. A category other than the computed one wins only with a
/// plurality of at least two votes, and only when it sits within one
/// position of the computed category, so smoothing never papers over a
/// large jump.
pub fn smooth_trend(computed: Trend, history: &[Reading]) -> Trend {
    if history.len() < SMOOTHING_HINT_COUNT {
        return computed;
    }

    let recent = &history[history.len() - SMOOTHING_HINT_COUNT..];
    let mapped: Vec<Trend> = recent
        .iter()
        .filter_map(|r| r.device_trend.and_then(|hint| hint.as_trend()))
        .collect();

    if mapped.is_empty() {
        return computed;
    }

    // Tally in insertion order; on a tie the first category to reach
    // the top count wins
    let mut votes: Vec<(Trend, usize)> = Vec::new();
    for trend in mapped.into_iter().chain(std::iter::once(computed)) {
        match votes.iter_mut().find(|(t, _)| *t == trend) {
            Some((_, count)) => *count += 1,
            None => votes.push((trend, 1)),
        }
    }

    let mut winner = votes[0];
    for &(trend, count) in &votes[1..] {
        if count > winner.1 {
            winner = (trend, count);
        }
    }

    let (winner_trend, winner_count) = winner;
    if winner_trend != computed
        && winner_count >= 2
        && (winner_trend.level() - computed.level()).abs() <= 1
    {
        debug!(
            computed = %computed,
            smoothed = %winner_trend,
            "Device hints overrode computed trend"
        );
        return winner_trend;
    }

    computed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceTrend;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_classification_buckets() {
        assert_eq!(classify_rate(-4.0), Trend::FallingFast);
        assert_eq!(classify_rate(-2.0), Trend::Falling);
        assert_eq!(classify_rate(0.0), Trend::Stable);
        assert_eq!(classify_rate(2.0), Trend::Rising);
        assert_eq!(classify_rate(6.0), Trend::RisingFast);
    }

    #[test]
    fn test_boundary_inclusivity() {
        // Falling bounds are inclusive, rising bounds exclusive
        assert_eq!(classify_mmol(-0.166), Trend::FallingFast);
        assert_eq!(classify_mmol(-0.055), Trend::Falling);
        assert_eq!(classify_mmol(0.055), Trend::Rising);
        assert_eq!(classify_mmol(0.166), Trend::RisingFast);
        assert_eq!(classify_mmol(0.0549), Trend::Stable);
        assert_eq!(classify_mmol(-0.0549), Trend::Stable);
    }

    fn hinted_history(hints: &[Option<DeviceTrend>]) -> Vec<Reading> {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        hints
            .iter()
            .enumerate()
            .map(|(i, hint)| Reading {
                timestamp: base + Duration::minutes(i as i64),
                value: 100.0,
                device_trend: *hint,
            })
            .collect()
    }

    #[test]
    fn test_smoothing_requires_three_readings() {
        let history = hinted_history(&[Some(DeviceTrend::SingleDown), Some(DeviceTrend::SingleDown)]);
        assert_eq!(smooth_trend(Trend::Falling, &history), Trend::Falling);
    }

    #[test]
    fn test_smoothing_without_mapped_hints_keeps_computed() {
        let history = hinted_history(&[Some(DeviceTrend::Flat), None, Some(DeviceTrend::Flat)]);
        assert_eq!(smooth_trend(Trend::Rising, &history), Trend::Rising);
    }

    #[test]
    fn test_adjacent_plurality_overrides() {
        // Two FALLING_FAST votes against computed FALLING, one step apart
        let history = hinted_history(&[
            Some(DeviceTrend::SingleDown),
            Some(DeviceTrend::DoubleDown),
            None,
        ]);
        assert_eq!(smooth_trend(Trend::Falling, &history), Trend::FallingFast);
    }

    #[test]
    fn test_distant_plurality_is_refused() {
        // RISING_FAST plurality is four steps from computed FALLING_FAST
        let history = hinted_history(&[
            Some(DeviceTrend::DoubleUp),
            Some(DeviceTrend::DoubleUp),
            None,
        ]);
        assert_eq!(smooth_trend(Trend::FallingFast, &history), Trend::FallingFast);
    }

    #[test]
    fn test_single_votes_never_override() {
        let history = hinted_history(&[
            Some(DeviceTrend::SingleUp),
            Some(DeviceTrend::FortyFiveUp),
            None,
        ]);
        assert_eq!(smooth_trend(Trend::Stable, &history), Trend::Stable);
    }

    #[test]
    fn test_tie_prefers_first_tallied_but_respects_distance() {
        // FALLING ties RISING at two votes; FALLING tallies first but
        // sits two steps away, so the computed category stands
        let history = hinted_history(&[
            Some(DeviceTrend::FortyFiveDown),
            Some(DeviceTrend::FortyFiveDown),
            Some(DeviceTrend::FortyFiveUp),
        ]);
        assert_eq!(smooth_trend(Trend::Rising, &history), Trend::Rising);
    }

    #[test]
    fn test_only_newest_three_vote() {
        let history = hinted_history(&[
            Some(DeviceTrend::SingleDown),
            Some(DeviceTrend::SingleDown),
            None,
            None,
            Some(DeviceTrend::FortyFiveUp),
        ]);
        // The two FALLING_FAST hints fell outside the voting window
        assert_eq!(smooth_trend(Trend::Stable, &history), Trend::Stable);
    }
}

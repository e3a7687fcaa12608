/// Fixed-lookback value deltas with a tolerance band

use tracing::debug;

use crate::history::minutes_between;
use crate::types::{DeltaResult, Reading};

/// Symmetric tolerance around the lookback target, as a share of the window
const TOLERANCE_RATIO: f64 = 0.2;

/// Answer "how much did the value change over roughly `window_minutes`?"
///
/// The newest reading anchors the comparison. Earlier readings are
/// scanned newest to oldest and the first whose gap to the anchor lands
/// within ±20% of the window is the comparison point: the match
/// closest to now, not necessarily closest to the nominal target.
pub fn delta_for_minutes(history: &[Reading], window_minutes: f64) -> DeltaResult {
    if history.len() < 2 {
        return DeltaResult::not_found("not_enough_data");
    }

    let latest = &history[history.len() - 1];
    let tolerance = window_minutes * TOLERANCE_RATIO;

    for candidate in history[..history.len() - 1].iter().rev() {
        let gap = minutes_between(candidate.timestamp, latest.timestamp);
        if gap >= window_minutes - tolerance && gap <= window_minutes + tolerance {
            let delta_value = latest.value - candidate.value;
            debug!(
                window_minutes,
                gap_minutes = gap,
                delta_value,
                "Found delta comparison point"
            );
            return DeltaResult {
                delta_value,
                time_diff: gap,
                found: true,
                note: None,
                requested_window: Some(window_minutes),
                actual_window: Some((gap * 10.0).round() / 10.0),
            };
        }
    }

    debug!(window_minutes, "No reading inside the delta tolerance band");
    DeltaResult::not_found(format!("no_measurement_{}min_window", window_minutes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn reading(minutes_before_base: f64, value: f64) -> Reading {
        let offset = Duration::milliseconds((minutes_before_base * 60_000.0) as i64);
        Reading::new(base_time() - offset, value)
    }

    fn spaced_history() -> Vec<Reading> {
        vec![
            reading(15.0, 80.0),
            reading(5.0, 95.0),
            reading(0.0, 110.0),
        ]
    }

    #[test]
    fn test_not_enough_data() {
        let result = delta_for_minutes(&[reading(0.0, 100.0)], 5.0);
        assert!(!result.found);
        assert_eq!(result.note.as_deref(), Some("not_enough_data"));
        assert_eq!(result.delta_value, 0.0);
    }

    #[test]
    fn test_five_minute_delta() {
        let result = delta_for_minutes(&spaced_history(), 5.0);
        assert!(result.found);
        assert_eq!(result.delta_value, 15.0);
        assert_eq!(result.requested_window, Some(5.0));
        assert_eq!(result.actual_window, Some(5.0));
    }

    #[test]
    fn test_fifteen_minute_delta() {
        let result = delta_for_minutes(&spaced_history(), 15.0);
        assert!(result.found);
        assert_eq!(result.delta_value, 30.0);
        assert!((result.time_diff - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_reading_in_band() {
        let result = delta_for_minutes(&spaced_history(), 1.0);
        assert!(!result.found);
        assert_eq!(result.note.as_deref(), Some("no_measurement_1min_window"));
        assert!(result.requested_window.is_none());
    }

    #[test]
    fn test_first_in_band_match_wins() {
        // Gaps of 4.2 and 5.0 minutes both sit inside the 5-minute
        // band; the newest-first scan picks 4.2 even though 5.0 is
        // nearer the nominal target
        let history = vec![
            reading(5.0, 90.0),
            reading(4.2, 100.0),
            reading(0.0, 112.0),
        ];
        let result = delta_for_minutes(&history, 5.0);
        assert!(result.found);
        assert_eq!(result.delta_value, 12.0);
        assert!((result.time_diff - 4.2).abs() < 1e-9);
        assert_eq!(result.actual_window, Some(4.2));
    }

    #[test]
    fn test_generic_fractional_window() {
        let history = vec![reading(0.5, 104.0), reading(0.0, 106.0)];
        let result = delta_for_minutes(&history, 0.5);
        assert!(result.found);
        assert_eq!(result.delta_value, 2.0);

        let missed = delta_for_minutes(&history, 2.5);
        assert!(!missed.found);
        assert_eq!(missed.note.as_deref(), Some("no_measurement_2.5min_window"));
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let at_upper = vec![reading(6.0, 100.0), reading(0.0, 103.0)];
        assert!(delta_for_minutes(&at_upper, 5.0).found);

        let at_lower = vec![reading(4.0, 100.0), reading(0.0, 103.0)];
        assert!(delta_for_minutes(&at_lower, 5.0).found);

        let outside = vec![reading(6.1, 100.0), reading(0.0, 103.0)];
        assert!(!delta_for_minutes(&outside, 5.0).found);
    }
}

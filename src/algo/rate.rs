/// Rate-of-change estimation over multiple lookback windows

use tracing::debug;

use crate::history::minutes_between;
use crate::types::Reading;

/// Nominal lookback with its acceptance band and confidence weight
struct LookbackWindow {
    nominal_minutes: f64,
    min_gap_minutes: f64,
    max_gap_minutes: f64,
    weight: f64,
}

// Shorter windows track current momentum best and carry more weight
const LOOKBACK_WINDOWS: [LookbackWindow; 3] = [
    LookbackWindow {
        nominal_minutes: 1.0,
        min_gap_minutes: 0.5,
        max_gap_minutes: 1.5,
        weight: 3.0,
    },
    LookbackWindow {
        nominal_minutes: 5.0,
        min_gap_minutes: 4.0,
        max_gap_minutes: 6.0,
        weight: 2.0,
    },
    LookbackWindow {
        nominal_minutes: 15.0,
        min_gap_minutes: 14.0,
        max_gap_minutes: 16.0,
        weight: 1.0,
    },
];

/// Estimate the instantaneous rate of change in mg/dL per minute.
///
/// The newest reading anchors the estimate. Each lookback window
/// contributes at most one candidate rate: the first earlier reading
/// (scanning newest to oldest) whose gap to the anchor falls inside the
/// window's acceptance band. Candidates are averaged by confidence
/// weight; when no band matches, the rate falls back to a plain
/// two-point comparison against the anchor's immediate predecessor.
///
/// Returns `None` below 2 readings; the caller must branch to its
/// fallback result.
pub fn estimate_rate(history: &[Reading]) -> Option<f64> {
    if history.len() < 2 {
        return None;
    }

    let anchor = history.last()?;
    let earlier = &history[..history.len() - 1];

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for window in &LOOKBACK_WINDOWS {
        if let Some((rate, gap)) = window_candidate(anchor, earlier, window) {
            debug!(
                window_minutes = window.nominal_minutes,
                gap_minutes = gap,
                rate,
                "Lookback window matched"
            );
            weighted_sum += rate * window.weight;
            total_weight += window.weight;
        }
    }

    if total_weight > 0.0 {
        return Some(weighted_sum / total_weight);
    }

    // No band matched anything: two-point rate against the immediate
    // predecessor, 0.0 when the gap is not strictly positive
    let previous = &earlier[earlier.len() - 1];
    debug!("No lookback window matched, using two-point fallback rate");
    Some(rate_between(previous, anchor))
}

fn window_candidate(
    anchor: &Reading,
    earlier: &[Reading],
    window: &LookbackWindow,
) -> Option<(f64, f64)> {
    for candidate in earlier.iter().rev() {
        let gap = minutes_between(candidate.timestamp, anchor.timestamp);
        if gap >= window.min_gap_minutes && gap <= window.max_gap_minutes {
            let rate = (anchor.value - candidate.value) / gap;
            return Some((rate, gap));
        }
    }
    None
}

/// Plain two-point rate in mg/dL per minute; 0.0 on a non-positive gap
pub fn rate_between(earlier: &Reading, later: &Reading) -> f64 {
    let gap = minutes_between(earlier.timestamp, later.timestamp);
    if gap <= 0.0 {
        return 0.0;
    }
    (later.value - earlier.value) / gap
}

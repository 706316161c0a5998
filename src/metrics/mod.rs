//! Reward aggregation for the live chart
//!
//! Pure functions over a reward history and a window size, plus the
//! [`ChartSeries`] they feed. The controller calls [`is_window_boundary`] as
//! each reward arrives, so building the chart costs O(window) per point rather
//! than a pass over the whole history.

mod chart;

pub use chart::{ChartPoint, ChartSeries, ChartStats};

/// Smallest window the chart ever uses
pub const MIN_WINDOW: usize = 10;

/// Largest window the chart ever uses
pub const MAX_WINDOW: usize = 100;

/// Window size for a run of `total_episodes`: 10% of the run, clamped to `[10, 100]`
#[must_use]
pub fn window_size(total_episodes: u64) -> usize {
    let tenth = usize::try_from(total_episodes / 10).unwrap_or(usize::MAX);
    tenth.clamp(MIN_WINDOW, MAX_WINDOW)
}

/// Mean of the last `min(window, history.len())` rewards
///
/// Returns `None` for an empty history or a zero window.
#[must_use]
pub fn moving_average(history: &[f64], window: usize) -> Option<f64> {
    if history.is_empty() || window == 0 {
        return None;
    }
    let tail = &history[history.len().saturating_sub(window)..];
    Some(tail.iter().sum::<f64>() / tail.len() as f64)
}

/// Whether appending the reward that made the history `new_len` long closes a window
#[must_use]
pub const fn is_window_boundary(new_len: usize, window: usize) -> bool {
    window != 0 && new_len % window == 0
}

/// Whether a trailing partial-window point is due at stream completion
#[must_use]
pub const fn final_point_needed(len: usize, window: usize) -> bool {
    window != 0 && len % window != 0
}

//! Display-ready windowed-average series
//!
//! The series is published in every snapshot, so cloning it and reading its
//! stats must not depend on how many points it holds. Points accumulate in a
//! short tail; a full tail is sealed into an immutable segment linked to the
//! previous one, and clones share every sealed segment.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use super::{final_point_needed, is_window_boundary, moving_average};

/// Points held in the unsealed tail before it becomes a shared segment
const SEGMENT_LEN: usize = 64;

/// One chart point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Number of episodes the point covers (x axis)
    pub episode: u64,
    /// Windowed average reward ending at `episode`
    pub average: f64,
}

/// Summary figures shown next to the chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartStats {
    /// Episode count of the last point
    pub episodes_trained: u64,
    /// Average of the last point
    pub current_average: f64,
    /// Highest average in the series
    pub best_average: f64,
}

/// Sealed run of points, newest segment first
struct Segment {
    points: Box<[ChartPoint]>,
    prev: Option<Arc<Segment>>,
}

impl Drop for Segment {
    // Unlink iteratively so a long chain cannot exhaust the stack
    fn drop(&mut self) {
        let mut prev = self.prev.take();
        while let Some(segment) = prev {
            prev = match Arc::try_unwrap(segment) {
                Ok(mut owned) => owned.prev.take(),
                Err(_) => None,
            };
        }
    }
}

/// Append-only series of windowed averages, strictly increasing in episode
#[derive(Clone, Default)]
pub struct ChartSeries {
    sealed: Option<Arc<Segment>>,
    tail: Vec<ChartPoint>,
    len: usize,
    best_average: Option<f64>,
}

impl ChartSeries {
    /// Create an empty series
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sealed: None,
            tail: Vec::new(),
            len: 0,
            best_average: None,
        }
    }

    /// Feed the history right after a reward was appended
    ///
    /// Appends a point when the new length closes a window. Returns the point
    /// that was appended, if any.
    pub fn observe(&mut self, history: &[f64], window: usize) -> Option<ChartPoint> {
        if !is_window_boundary(history.len(), window) {
            return None;
        }
        self.append(history, window)
    }

    /// Feed the history as it stands at stream completion
    ///
    /// Appends the trailing partial-window point so the series ends at the
    /// last episode. Returns the point that was appended, if any.
    pub fn complete(&mut self, history: &[f64], window: usize) -> Option<ChartPoint> {
        if !final_point_needed(history.len(), window) {
            return None;
        }
        self.append(history, window)
    }

    fn append(&mut self, history: &[f64], window: usize) -> Option<ChartPoint> {
        let average = moving_average(history, window)?;
        let episode = history.len() as u64;

        if self.last().is_some_and(|last| last.episode >= episode) {
            log::warn!("Dropping out-of-order chart point at episode {episode}");
            return None;
        }

        let point = ChartPoint { episode, average };
        self.tail.push(point);
        self.len += 1;
        self.best_average = Some(self.best_average.map_or(average, |best| best.max(average)));

        if self.tail.len() == SEGMENT_LEN {
            self.sealed = Some(Arc::new(Segment {
                points: std::mem::take(&mut self.tail).into_boxed_slice(),
                prev: self.sealed.take(),
            }));
        }
        Some(point)
    }

    /// Points in episode order
    pub fn points(&self) -> impl Iterator<Item = &ChartPoint> {
        let mut segments = Vec::new();
        let mut cursor = self.sealed.as_deref();
        while let Some(segment) = cursor {
            segments.push(&segment.points);
            cursor = segment.prev.as_deref();
        }
        segments
            .into_iter()
            .rev()
            .flat_map(|points| points.iter())
            .chain(self.tail.iter())
    }

    /// Number of points
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the series has no points
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Last point
    #[must_use]
    pub fn last(&self) -> Option<&ChartPoint> {
        self.tail
            .last()
            .or_else(|| self.sealed.as_ref().and_then(|segment| segment.points.last()))
    }

    /// Remove every point
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Summary figures, `None` until the first point exists
    #[must_use]
    pub fn stats(&self) -> Option<ChartStats> {
        let last = self.last()?;
        Some(ChartStats {
            episodes_trained: last.episode,
            current_average: last.average,
            best_average: self.best_average.unwrap_or(last.average),
        })
    }

    /// X-axis ticks at 10% steps of the configured run length
    #[must_use]
    pub fn axis_ticks(total_episodes: u64) -> Vec<u64> {
        if total_episodes == 0 {
            return vec![0];
        }
        (0..=10u64)
            .map(|i| ((total_episodes * i) as f64 / 10.0).round() as u64)
            .collect()
    }
}

impl PartialEq for ChartSeries {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.points().eq(other.points())
    }
}

impl fmt::Debug for ChartSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.points()).finish()
    }
}

impl Serialize for ChartSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.points())
    }
}

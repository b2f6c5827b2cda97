//! Binning helpers: 1D histogram over the time axis and 2D (scalar, time)
//! density grid. Values on or past the upper edge land in the last bin.

use serde::Serialize;

pub const TIME_BUCKETS: usize = 10;
pub const DEFAULT_GRID_SIZE: usize = 20;
/// Largest per-axis bin count a density grid accepts.
pub const MAX_GRID_SIZE: usize = 1000;

/// Bin index of `value` in `bins` equal-width bins over `[lo, hi]`.
pub fn bin_index(value: f64, lo: f64, hi: f64, bins: usize) -> usize {
    if bins == 0 {
        return 0;
    }
    let width = (hi - lo) / bins as f64;
    if width.is_nan() || width <= 0.0 || !value.is_finite() {
        return 0;
    }
    let idx = ((value - lo) / width).floor();
    if idx <= 0.0 {
        0
    } else {
        (idx as usize).min(bins - 1)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bucket {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeHistogram {
    pub duration: f64,
    pub buckets: Vec<Bucket>,
}

impl TimeHistogram {
    pub fn new(duration: f64) -> Self {
        let width = duration / TIME_BUCKETS as f64;
        let buckets = (0..TIME_BUCKETS)
            .map(|i| Bucket {
                start: width * i as f64,
                end: width * (i + 1) as f64,
                count: 0,
            })
            .collect();
        Self { duration, buckets }
    }

    pub fn record(&mut self, time: f64) {
        let idx = bin_index(time, 0.0, self.duration, TIME_BUCKETS);
        self.buckets[idx].count += 1;
    }

    pub fn counts(&self) -> Vec<usize> {
        self.buckets.iter().map(|b| b.count).collect()
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DensityCell {
    pub scalar_bin: usize,
    pub time_bin: usize,
    pub scalar_start: f64,
    pub scalar_end: f64,
    pub time_start: f64,
    pub time_end: f64,
    pub count: usize,
}

/// Sparse (scalar, time) occupancy grid. Scalars span `[0, 1]` across
/// columns, time spans `[0, duration]` across rows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DensityGrid {
    pub scalar_bins: usize,
    pub time_bins: usize,
    pub duration: f64,
    pub cells: Vec<DensityCell>,
    pub max_count: usize,
}

impl DensityGrid {
    /// Bin counts are clamped to `1..=MAX_GRID_SIZE`.
    pub fn build(
        points: &[(f64, f64)],
        duration: f64,
        scalar_bins: usize,
        time_bins: usize,
    ) -> Self {
        let scalar_bins = scalar_bins.clamp(1, MAX_GRID_SIZE);
        let time_bins = time_bins.clamp(1, MAX_GRID_SIZE);
        let mut counts = vec![0usize; scalar_bins * time_bins];
        for &(scalar, time) in points {
            let col = bin_index(scalar, 0.0, 1.0, scalar_bins);
            let row = bin_index(time, 0.0, duration, time_bins);
            counts[row * scalar_bins + col] += 1;
        }

        let scalar_width = 1.0 / scalar_bins as f64;
        let time_width = duration / time_bins as f64;
        let mut cells = Vec::new();
        let mut max_count = 0;
        for (i, &count) in counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let (row, col) = (i / scalar_bins, i % scalar_bins);
            max_count = max_count.max(count);
            cells.push(DensityCell {
                scalar_bin: col,
                time_bin: row,
                scalar_start: scalar_width * col as f64,
                scalar_end: scalar_width * (col + 1) as f64,
                time_start: time_width * row as f64,
                time_end: time_width * (row + 1) as f64,
                count,
            });
        }
        Self {
            scalar_bins,
            time_bins,
            duration,
            cells,
            max_count,
        }
    }

    pub fn total(&self) -> usize {
        self.cells.iter().map(|c| c.count).sum()
    }
}

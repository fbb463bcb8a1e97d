//! Multi-resolution loudness history.
//!
//! [`HistoryStore`] keeps the most recent `N` raw samples in a circular buffer
//! and, alongside it, a ring of `N / D` min/max pairs where every entry folds
//! `D` consecutive raw samples. The overview is built incrementally as samples
//! arrive, so coarse zoom levels never scan the raw ring.
//!
//! The store is owned by the consumer tick and is not shared across threads.

mod ring;

use serde::{Deserialize, Serialize};

use crate::{config::HistoryConfig, Result};

use self::ring::{clamp_ago, slot_ago};

/// Extremes of a run of loudness samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: f32,
    pub max: f32,
}

impl MinMax {
    /// Sentinel returned for empty or inverted ranges.
    pub const ZERO: Self = Self { min: 0.0, max: 0.0 };

    /// Identity for [`MinMax::merge`].
    const EMPTY: Self = Self {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    pub fn merge(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    fn include(&mut self, sample: f32) {
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
    }
}

/// Partial overview entry collecting the next `D` samples.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    extrema: MinMax,
    count: usize,
}

impl Accumulator {
    const fn new() -> Self {
        Self {
            extrema: MinMax::EMPTY,
            count: 0,
        }
    }
}

/// Raw loudness ring plus its decimated min/max overview.
pub struct HistoryStore {
    raw: Vec<f32>,
    raw_write: usize,
    overview: Vec<MinMax>,
    overview_write: usize,
    decimation: usize,
    accumulator: Accumulator,
    total_ingested: u64,
}

impl HistoryStore {
    /// Allocates both rings. Fails when the decimation factor does not divide
    /// the raw capacity.
    pub fn new(config: &HistoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            raw: vec![0.0; config.capacity],
            raw_write: 0,
            overview: vec![MinMax::ZERO; config.overview_capacity()],
            overview_write: 0,
            decimation: config.decimation,
            accumulator: Accumulator::new(),
            total_ingested: 0,
        })
    }

    /// Appends one sample and commits an overview entry every `D` samples.
    ///
    /// Negative and non-finite values are stored as `0.0`.
    pub fn ingest(&mut self, sample: f32) {
        let sample = if sample.is_finite() { sample.max(0.0) } else { 0.0 };

        self.raw[self.raw_write] = sample;
        self.raw_write = (self.raw_write + 1) % self.raw.len();
        self.total_ingested += 1;

        self.accumulator.extrema.include(sample);
        self.accumulator.count += 1;
        if self.accumulator.count == self.decimation {
            self.overview[self.overview_write] = self.accumulator.extrema;
            self.overview_write = (self.overview_write + 1) % self.overview.len();
            self.accumulator = Accumulator::new();
        }
    }

    pub fn ingest_all(&mut self, samples: impl IntoIterator<Item = f32>) {
        for sample in samples {
            self.ingest(sample);
        }
    }

    /// Raw sample `samples_ago` positions before the newest one.
    ///
    /// Offsets past the retained history clamp to the oldest sample. An empty
    /// store reads as `0.0`.
    pub fn query_raw(&self, samples_ago: usize) -> f32 {
        let available = self.len();
        if available == 0 {
            return 0.0;
        }
        let ago = clamp_ago(samples_ago, available);
        self.raw[slot_ago(self.raw_write, ago, self.raw.len())]
    }

    /// Linear interpolation between the two raw samples around a fractional
    /// offset. Offset `0.0` returns the newest sample exactly.
    pub fn query_raw_interpolated(&self, samples_ago: f64) -> f32 {
        let samples_ago = if samples_ago.is_finite() {
            samples_ago.max(0.0)
        } else {
            0.0
        };
        let whole = samples_ago.floor();
        let frac = (samples_ago - whole) as f32;
        let index = whole as usize;

        let near = self.query_raw(index);
        if frac == 0.0 {
            return near;
        }
        let far = self.query_raw(index.saturating_add(1));
        near + frac * (far - near)
    }

    /// Extremes over the inclusive offset range `[start_ago, end_ago]`.
    ///
    /// Returns [`MinMax::ZERO`] when the range is inverted or starts beyond
    /// the retained history. The end is clamped to the oldest sample.
    pub fn query_min_max_in_range(&self, start_ago: usize, end_ago: usize) -> MinMax {
        let available = self.len();
        if start_ago > end_ago || start_ago >= available {
            return MinMax::ZERO;
        }
        let end_ago = clamp_ago(end_ago, available);
        let len = self.raw.len();
        (start_ago..=end_ago)
            .map(|ago| self.raw[slot_ago(self.raw_write, ago, len)])
            .fold(MinMax::EMPTY, |mut acc, sample| {
                acc.include(sample);
                acc
            })
    }

    /// Overview entry `blocks_ago` commits before the newest one.
    ///
    /// Clamps to the oldest committed entry; [`MinMax::ZERO`] before the first
    /// commit.
    pub fn query_pyramid(&self, blocks_ago: usize) -> MinMax {
        let available = self.pyramid_len();
        if available == 0 {
            return MinMax::ZERO;
        }
        let ago = clamp_ago(blocks_ago, available);
        self.overview[slot_ago(self.overview_write, ago, self.overview.len())]
    }

    /// Extremes and sample count of the block that has not been committed
    /// yet. These are the newest `count` raw samples.
    pub fn pending(&self) -> Option<(MinMax, usize)> {
        (self.accumulator.count > 0).then_some((self.accumulator.extrema, self.accumulator.count))
    }

    /// Raw samples currently retained.
    pub fn len(&self) -> usize {
        self.total_ingested.min(self.raw.len() as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.total_ingested == 0
    }

    /// Overview entries currently retained.
    pub fn pyramid_len(&self) -> usize {
        let committed = self.total_ingested / self.decimation as u64;
        committed.min(self.overview.len() as u64) as usize
    }

    pub fn total_ingested(&self) -> u64 {
        self.total_ingested
    }

    pub fn capacity(&self) -> usize {
        self.raw.len()
    }

    pub fn decimation(&self) -> usize {
        self.decimation
    }
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("capacity", &self.raw.len())
            .field("decimation", &self.decimation)
            .field("len", &self.len())
            .field("pyramid_len", &self.pyramid_len())
            .field("total_ingested", &self.total_ingested)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(capacity: usize, decimation: usize) -> HistoryStore {
        HistoryStore::new(&HistoryConfig {
            capacity,
            decimation,
        })
        .unwrap()
    }

    #[test]
    fn rejects_non_dividing_decimation() {
        let result = HistoryStore::new(&HistoryConfig {
            capacity: 100,
            decimation: 64,
        });
        assert!(result.is_err());
    }

    #[test]
    fn raw_queries_count_back_from_newest() {
        let mut history = store(8, 2);
        history.ingest_all([1.0, 2.0, 3.0]);

        assert_eq!(history.query_raw(0), 3.0);
        assert_eq!(history.query_raw(2), 1.0);
        // Past the populated range: oldest sample, never an unwritten slot.
        assert_eq!(history.query_raw(5), 1.0);
        assert_eq!(history.query_raw(usize::MAX), 1.0);
    }

    #[test]
    fn raw_ring_keeps_the_newest_window() {
        let mut history = store(4, 2);
        history.ingest_all((1..=10).map(|v| v as f32));

        assert_eq!(history.len(), 4);
        assert_eq!(history.query_raw(0), 10.0);
        assert_eq!(history.query_raw(3), 7.0);
        assert_eq!(history.query_raw(100), 7.0);
    }

    #[test]
    fn empty_store_reads_zero() {
        let history = store(8, 4);
        assert!(history.is_empty());
        assert_eq!(history.query_raw(0), 0.0);
        assert_eq!(history.query_raw_interpolated(1.5), 0.0);
        assert_eq!(history.query_min_max_in_range(0, 3), MinMax::ZERO);
        assert_eq!(history.query_pyramid(0), MinMax::ZERO);
        assert!(history.pending().is_none());
    }

    #[test]
    fn interpolation_is_exact_at_zero_and_linear_between() {
        let mut history = store(16, 4);
        history.ingest_all([0.25, 0.5, 0.125]);

        assert_eq!(history.query_raw_interpolated(0.0), 0.125);
        assert!((history.query_raw_interpolated(0.5) - 0.3125).abs() < 1e-6);
        assert!((history.query_raw_interpolated(1.25) - 0.4375).abs() < 1e-6);
        assert_eq!(history.query_raw_interpolated(-3.0), 0.125);
    }

    #[test]
    fn min_max_range_is_inclusive_and_tolerates_bad_ranges() {
        let mut history = store(16, 4);
        history.ingest_all([0.9, 0.1, 0.5, 0.7]);

        let all = history.query_min_max_in_range(0, 3);
        assert_eq!(all, MinMax { min: 0.1, max: 0.9 });

        let newest_two = history.query_min_max_in_range(0, 1);
        assert_eq!(newest_two, MinMax { min: 0.5, max: 0.7 });

        assert_eq!(history.query_min_max_in_range(3, 1), MinMax::ZERO);
        assert_eq!(history.query_min_max_in_range(10, 12), MinMax::ZERO);
        assert_eq!(
            history.query_min_max_in_range(2, 50),
            MinMax { min: 0.1, max: 0.9 }
        );
    }

    #[test]
    fn pyramid_entries_hold_block_extrema() {
        let decimation = 4;
        let mut history = store(64, decimation);
        let samples: Vec<f32> = (0..40).map(|i| ((i * 37) % 11) as f32 / 10.0).collect();
        history.ingest_all(samples.iter().copied());

        let blocks = samples.len() / decimation;
        assert_eq!(history.pyramid_len(), blocks);
        for (index, block) in samples.chunks(decimation).enumerate() {
            let expected_min = block.iter().copied().fold(f32::INFINITY, f32::min);
            let expected_max = block.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let entry = history.query_pyramid(blocks - 1 - index);
            assert_eq!(entry.min, expected_min, "block {index}");
            assert_eq!(entry.max, expected_max, "block {index}");
        }
    }

    #[test]
    fn overview_ring_keeps_the_newest_blocks_after_wrapping() {
        // Four overview slots; 23 samples commit eleven blocks and leave one pending.
        let mut history = store(8, 2);
        history.ingest_all((0..23).map(|v| v as f32));

        assert_eq!(history.pyramid_len(), 4);
        assert_eq!(history.query_pyramid(0), MinMax { min: 20.0, max: 21.0 });
        assert_eq!(history.query_pyramid(1), MinMax { min: 18.0, max: 19.0 });
        assert_eq!(history.query_pyramid(3), MinMax { min: 14.0, max: 15.0 });
        assert_eq!(history.query_pyramid(5), MinMax { min: 14.0, max: 15.0 });
        assert_eq!(history.query_pyramid(usize::MAX), MinMax { min: 14.0, max: 15.0 });
        assert_eq!(history.pending(), Some((MinMax { min: 22.0, max: 22.0 }, 1)));
    }

    #[test]
    fn silent_block_reports_zero_minimum() {
        let mut history = store(16, 4);
        history.ingest_all([0.0; 4]);
        assert_eq!(history.query_pyramid(0), MinMax::ZERO);
    }

    #[test]
    fn pending_block_tracks_uncommitted_samples() {
        let mut history = store(16, 4);
        history.ingest_all([0.2, 0.6, 0.4, 0.3, 0.8]);

        assert_eq!(history.pyramid_len(), 1);
        let (extrema, count) = history.pending().unwrap();
        assert_eq!(count, 1);
        assert_eq!(extrema, MinMax { min: 0.8, max: 0.8 });
    }

    #[test]
    fn negative_and_nan_samples_are_stored_as_zero() {
        let mut history = store(8, 2);
        history.ingest(-0.5);
        history.ingest(f32::NAN);
        assert_eq!(history.query_raw(0), 0.0);
        assert_eq!(history.query_raw(1), 0.0);
        assert_eq!(history.query_pyramid(0), MinMax::ZERO);
    }

    #[test]
    fn down_spike_survives_decimation() {
        let decimation = 64;
        let mut history = store(1 << 20, decimation);
        history.ingest_all(std::iter::repeat(1.0).take(100_000));
        history.ingest(0.0);
        history.ingest_all(std::iter::repeat(1.0).take(100_000));

        let spike_position = 100_000_u64;
        let spike_block = (spike_position / decimation as u64) as usize;
        let committed = (history.total_ingested() / decimation as u64) as usize;
        let blocks_ago = committed - 1 - spike_block;

        assert_eq!(history.query_pyramid(blocks_ago).min, 0.0);
        assert_eq!(history.query_pyramid(blocks_ago).max, 1.0);
        assert_eq!(history.query_pyramid(blocks_ago - 1).min, 1.0);
        assert_eq!(history.query_pyramid(blocks_ago + 1).min, 1.0);
    }
}

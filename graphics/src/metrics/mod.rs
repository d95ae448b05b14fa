//! GPU timing per pass and per category.
//!
//! [`MetricInstrumentation`] is a [`PassObserver`]: it wraps every pass with
//! a pair of timestamp queries while the graph records commands. Once the
//! frame has completed, [`resolve_frame`](MetricInstrumentation::resolve_frame)
//! reads the queries back and folds the per-pass times into category
//! series (every bloom mip pass rolls into "Bloom", and so on).
//!
//! A query that has not resolved yields a zero sample for that frame.

mod scrolling;

pub use scrolling::{DEFAULT_HISTORY_CAPACITY, ScrollingBuffer};

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::command::CommandEncoder;
use crate::device::GraphicsDevice;
use crate::graph::{Pass, PassObserver};

/// Categories the stock frame reports into.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Depth Prepass",
    "Shadows",
    "Rendering G-Buffer",
    "Ambient Occlusion",
    "Screen Space Reflections",
    "Sky Rendering",
    "Composition",
    "Bloom",
    "Depth Of Field",
    "Auto Exposure",
    "Temporal Anti-Aliasing",
    "Tone Mapping",
    "UI",
];

/// Default number of timed passes.
pub const DEFAULT_QUERY_CAPACITY: u32 = 64;

#[derive(Debug, Clone)]
struct RecordedPass {
    name: String,
    category: String,
    first_query: u32,
}

/// Per-pass GPU timer and category history.
#[derive(Debug)]
pub struct MetricInstrumentation {
    query_capacity: u32,
    history_capacity: usize,
    queries: HashMap<String, u32>,
    next_query: u32,
    warned: HashSet<String>,
    recorded: Vec<RecordedPass>,
    categories: BTreeMap<String, ScrollingBuffer<f32>>,
    time_axis: ScrollingBuffer<f32>,
    latest: BTreeMap<String, f32>,
    total_gpu_ms: f32,
}

impl Default for MetricInstrumentation {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_CAPACITY, DEFAULT_HISTORY_CAPACITY)
    }
}

impl MetricInstrumentation {
    /// Create an instrument timing up to `query_capacity` passes and keeping
    /// `history_capacity` samples per series.
    pub fn new(query_capacity: u32, history_capacity: usize) -> Self {
        let categories = DEFAULT_CATEGORIES
            .iter()
            .map(|name| (name.to_string(), ScrollingBuffer::new(history_capacity)))
            .collect();
        Self {
            query_capacity,
            history_capacity,
            queries: HashMap::new(),
            next_query: 0,
            warned: HashSet::new(),
            recorded: Vec::new(),
            categories,
            time_axis: ScrollingBuffer::new(history_capacity),
            latest: BTreeMap::new(),
            total_gpu_ms: 0.0,
        }
    }

    /// Number of passes that can be timed.
    pub fn query_capacity(&self) -> u32 {
        self.query_capacity
    }

    /// Timestamp queries in use (two per timed pass).
    pub fn queries_in_use(&self) -> u32 {
        self.next_query
    }

    /// Every category series, by name.
    pub fn categories(&self) -> &BTreeMap<String, ScrollingBuffer<f32>> {
        &self.categories
    }

    /// One category series.
    pub fn category(&self, name: &str) -> Option<&ScrollingBuffer<f32>> {
        self.categories.get(name)
    }

    /// Elapsed-time axis shared by every series.
    pub fn time_axis(&self) -> &ScrollingBuffer<f32> {
        &self.time_axis
    }

    /// Milliseconds per pass for the last resolved frame.
    pub fn latest_timings(&self) -> &BTreeMap<String, f32> {
        &self.latest
    }

    /// Sum of all pass timings for the last resolved frame.
    pub fn total_gpu_time_ms(&self) -> f32 {
        self.total_gpu_ms
    }

    fn query_for(&mut self, pass: &str) -> Option<u32> {
        if let Some(&query) = self.queries.get(pass) {
            return Some(query);
        }
        if self.next_query / 2 >= self.query_capacity {
            if self.warned.insert(pass.to_string()) {
                log::warn!(
                    "MetricInstrumentation: query pool exhausted, pass '{}' is not timed",
                    pass
                );
            }
            return None;
        }
        let query = self.next_query;
        self.next_query += 2;
        self.queries.insert(pass.to_string(), query);
        Some(query)
    }

    /// Read this frame's timestamps and append one sample to every series.
    ///
    /// Call after the frame's submission has completed.
    pub fn resolve_frame(&mut self, device: &GraphicsDevice, elapsed_time: f32) {
        let period_ns = f64::from(device.timestamp_period_ns());
        let timestamps = device.read_timestamps(0, self.next_query);

        for series in self.categories.values_mut() {
            series.push(0.0);
        }
        self.time_axis.push(elapsed_time);
        self.latest.clear();
        self.total_gpu_ms = 0.0;

        for pass in self.recorded.drain(..) {
            let start = timestamps.get(pass.first_query as usize).copied().flatten();
            let end = timestamps.get(pass.first_query as usize + 1).copied().flatten();
            let milliseconds = match (start, end) {
                (Some(start), Some(end)) => {
                    (end.saturating_sub(start) as f64 * period_ns / 1_000_000.0) as f32
                }
                _ => {
                    log::warn!(
                        "MetricInstrumentation: timestamps for '{}' not resolved, recording 0",
                        pass.name
                    );
                    0.0
                }
            };

            self.total_gpu_ms += milliseconds;
            *self.latest.entry(pass.name).or_insert(0.0) += milliseconds;

            let history = self.history_capacity;
            let axis_len = self.time_axis.len();
            let series = self.categories.entry(pass.category).or_insert_with(|| {
                // Zero-filled up to the axis so samples line up with earlier frames.
                let mut series = ScrollingBuffer::new(history);
                for _ in 0..axis_len {
                    series.push(0.0);
                }
                series
            });
            if let Some(current) = series.current_mut() {
                *current += milliseconds;
            }
        }
    }

    /// Forget query assignments, e.g. after the pass set was rebuilt.
    pub fn reset_queries(&mut self) {
        self.queries.clear();
        self.warned.clear();
        self.recorded.clear();
        self.next_query = 0;
    }
}

impl PassObserver for MetricInstrumentation {
    fn before_pass(&mut self, pass: &Pass, encoder: &mut CommandEncoder) {
        let Some(query) = self.query_for(pass.name()) else {
            return;
        };
        encoder.write_timestamp(query);
        self.recorded.push(RecordedPass {
            name: pass.name().to_string(),
            category: pass.category().to_string(),
            first_query: query,
        });
    }

    fn after_pass(&mut self, pass: &Pass, encoder: &mut CommandEncoder) {
        if let Some(&query) = self.queries.get(pass.name()) {
            encoder.write_timestamp(query + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::DummyBackend;
    use crate::command::Command;

    fn record(metrics: &mut MetricInstrumentation, passes: &[Pass]) -> CommandEncoder {
        let mut encoder = CommandEncoder::new();
        for pass in passes {
            encoder.begin_pass(pass.name());
            metrics.before_pass(pass, &mut encoder);
            encoder.draw("fullscreen", 3, 1);
            metrics.after_pass(pass, &mut encoder);
            encoder.end_pass();
        }
        encoder
    }

    fn bloom_passes() -> Vec<Pass> {
        vec![
            Pass::compute("bloom downsample - 0", |_| Ok(())).with_category("Bloom"),
            Pass::compute("bloom downsample - 1", |_| Ok(())).with_category("Bloom"),
            Pass::graphics("tone mapping", |_| Ok(())).with_category("Tone Mapping"),
        ]
    }

    #[test]
    fn test_timestamps_wrap_passes() {
        let mut metrics = MetricInstrumentation::default();
        let encoder = record(&mut metrics, &bloom_passes());
        let queries: Vec<u32> = encoder
            .commands()
            .iter()
            .filter_map(|command| match command {
                Command::WriteTimestamp { query } => Some(*query),
                _ => None,
            })
            .collect();
        assert_eq!(queries, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(metrics.queries_in_use(), 6);
    }

    #[test]
    fn test_categories_accumulate_passes() {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::new(backend);
        let mut metrics = MetricInstrumentation::default();

        let encoder = record(&mut metrics, &bloom_passes());
        device.submit(encoder.finish()).unwrap();
        metrics.resolve_frame(&device, 0.5);

        let bloom = *metrics.category("Bloom").unwrap().current().unwrap();
        let tone = *metrics.category("Tone Mapping").unwrap().current().unwrap();
        assert!(bloom > 0.0);
        assert!((bloom - 2.0 * tone).abs() < 1e-6);
        assert_eq!(metrics.category("Shadows").unwrap().current(), Some(&0.0));
        assert_eq!(metrics.time_axis().current(), Some(&0.5));
        assert_eq!(metrics.latest_timings().len(), 3);
        assert!((metrics.total_gpu_time_ms() - (bloom + tone)).abs() < 1e-6);
    }

    #[test]
    fn test_unresolved_timestamps_yield_zero() {
        let backend = Arc::new(DummyBackend::new());
        backend.set_timestamps_enabled(false);
        let device = GraphicsDevice::new(backend);
        let mut metrics = MetricInstrumentation::default();

        let encoder = record(&mut metrics, &bloom_passes());
        device.submit(encoder.finish()).unwrap();
        metrics.resolve_frame(&device, 0.1);

        assert_eq!(metrics.category("Bloom").unwrap().current(), Some(&0.0));
        assert_eq!(metrics.total_gpu_time_ms(), 0.0);
    }

    #[test]
    fn test_pool_exhaustion_leaves_pass_untimed() {
        let mut metrics = MetricInstrumentation::new(1, 16);
        let encoder = record(&mut metrics, &bloom_passes());
        let timestamps = encoder
            .commands()
            .iter()
            .filter(|command| matches!(command, Command::WriteTimestamp { .. }))
            .count();
        assert_eq!(timestamps, 2);
    }

    #[test]
    fn test_unknown_category_is_created() {
        let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
        let mut metrics = MetricInstrumentation::new(8, 16);
        let passes = vec![Pass::compute("custom", |_| Ok(())).with_category("Custom")];
        let encoder = record(&mut metrics, &passes);
        device.submit(encoder.finish()).unwrap();
        metrics.resolve_frame(&device, 0.0);
        assert!(metrics.category("Custom").is_some());
    }

    #[test]
    fn test_late_category_matches_time_axis() {
        let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
        let mut metrics = MetricInstrumentation::new(8, 16);
        for frame in 0..2 {
            let encoder = record(&mut metrics, &bloom_passes());
            device.submit(encoder.finish()).unwrap();
            metrics.resolve_frame(&device, frame as f32 * 0.1);
        }

        let mut passes = bloom_passes();
        passes.push(Pass::compute("custom", |_| Ok(())).with_category("Custom"));
        let encoder = record(&mut metrics, &passes);
        device.submit(encoder.finish()).unwrap();
        metrics.resolve_frame(&device, 0.2);

        let custom = metrics.category("Custom").unwrap();
        assert_eq!(custom.len(), metrics.time_axis().len());
        assert_eq!(custom.len(), 3);
        let samples: Vec<f32> = custom.iter().copied().collect();
        assert_eq!(&samples[..2], &[0.0, 0.0]);
        assert!(samples[2] > 0.0);
        for series in metrics.categories().values() {
            assert_eq!(series.len(), metrics.time_axis().len());
        }
    }
}

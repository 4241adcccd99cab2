use std::collections::HashMap;
use std::time::Instant;

/// Observer for frame-dispatch events.
///
/// Keeps per-stage timings out of the dispatcher itself so hosts can route
/// them to `log`, a profiler, or nowhere.
pub trait DispatchLogger: Send {
    /// Called once per dispatched frame.
    fn frame(&mut self, index: u64);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. detection count).
    fn metric(&mut self, name: &str, value: f64);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullDispatchLogger;

impl DispatchLogger for NullDispatchLogger {
    fn frame(&mut self, _index: u64) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
}

/// Running aggregate of one timing stage or metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageStats {
    pub count: u64,
    pub total: f64,
    pub max: f64,
}

impl StageStats {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 { value } else { self.max.max(value) };
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        self.total / self.count.max(1) as f64
    }
}

/// Aggregates timings and metrics and reports through the `log` facade.
///
/// Memory is one [`StageStats`] per distinct stage or metric name, however
/// long the session runs. Progress lines are throttled to every
/// `throttle_frames` frames.
pub struct LogDispatchLogger {
    throttle_frames: u64,
    timings: HashMap<String, StageStats>,
    metrics: HashMap<String, StageStats>,
    start_time: Instant,
    frames: u64,
}

impl LogDispatchLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Dispatch summary ({} frames, {:.1}s):",
            self.frames,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stats = &self.timings[stage];
            let (avg_ms, max_ms, total_ms) = (stats.mean(), stats.max, stats.total);
            lines.push(format!(
                "  {stage:20}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let avg = self.metrics[name].mean();
            lines.push(format!("  {name}: avg {avg:.1}"));
        }

        if self.frames > 0 && elapsed_ms > 0.0 {
            let fps = self.frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<StageStats> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<StageStats> {
        self.metrics.get(name).copied()
    }

    /// Number of distinct stages and metrics being aggregated.
    pub fn tracked(&self) -> usize {
        self.timings.len() + self.metrics.len()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for LogDispatchLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl DispatchLogger for LogDispatchLogger {
    fn frame(&mut self, index: u64) {
        self.frames += 1;
        if index % self.throttle_frames == 0 {
            log::debug!("Dispatched frame {index}");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        record(&mut self.timings, stage, duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        record(&mut self.metrics, name, value);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn record(series: &mut HashMap<String, StageStats>, name: &str, value: f64) {
    match series.get_mut(name) {
        Some(stats) => stats.record(value),
        None => series.entry(name.to_string()).or_default().record(value),
    }
}

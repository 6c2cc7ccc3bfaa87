//! Observability: request/object counters, request latency histogram,
//! throughput logging.
//! Counters are monotonic atomics shared by every request task; they are
//! rendered in Prometheus text format by the metrics listener.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Per-object processing status, the `status` label of the objects counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectStatus {
    Successful,
    Unsuccessful,
}

impl ObjectStatus {
    pub fn label(self) -> &'static str {
        match self {
            ObjectStatus::Successful => "successful",
            ObjectStatus::Unsuccessful => "unsuccessful",
        }
    }
}

/// Sink for the service's observability events.
///
/// Constructed once at startup and handed to every component that records
/// something. Recording must never fail or block for long.
pub trait MetricsSink: Send + Sync {
    /// A request on the main listener finished, whatever its outcome.
    fn request_finished(&self, elapsed: Duration);
    fn invalid_request(&self);
    fn error_logged(&self);
    fn object_processed(&self, status: ObjectStatus);
    /// Counted by display name, so unknown codes share the "Unknown" series.
    fn language_detected(&self, name: &str);
}

/// Sink that discards everything. Used by unit tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn request_finished(&self, _elapsed: Duration) {}
    fn invalid_request(&self) {}
    fn error_logged(&self) {}
    fn object_processed(&self, _status: ObjectStatus) {}
    fn language_detected(&self, _name: &str) {}
}

/// Fixed-capacity ring buffer for histogram samples.
struct SampleRing {
    samples: Vec<f64>,
    pos: usize,
    count: usize,
    capacity: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            pos: 0,
            count: 0,
            capacity,
        }
    }

    fn push(&mut self, value: f64) {
        self.samples[self.pos] = value;
        self.pos = (self.pos + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples[..self.count].to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((p / 100.0) * (self.count as f64 - 1.0)).round() as usize;
        let idx = idx.min(self.count - 1);
        sorted[idx]
    }
}

/// Well-known metric names.
pub mod metric_names {
    pub const REQUESTS_TOTAL: &str = "augmentation_requests_total";
    pub const INVALID_REQUESTS_TOTAL: &str = "augmentation_invalid_requests_total";
    pub const REQUEST_DURATION_MS: &str = "augmentation_request_duration_milliseconds";
    pub const ERRORS_LOGGED_TOTAL: &str = "augmentation_errors_logged_total";
    pub const OBJECTS_PROCESSED_TOTAL: &str = "augmentation_objects_processed_total";
    pub const DETECTED_LANGUAGE: &str = "augmentation_detected_language";
    pub const REQUEST_LATENCY_US: &str = "augmentation_request_latency_microseconds";
}

const LATENCY_RING_CAPACITY: usize = 1024;
const LATENCY_QUANTILES: [f64; 3] = [50.0, 95.0, 99.0];

/// Process-wide counters backing the metrics endpoint.
pub struct MetricsRegistry {
    requests_total: AtomicU64,
    invalid_requests_total: AtomicU64,
    request_duration_us: AtomicU64,
    errors_logged_total: AtomicU64,
    objects_successful: AtomicU64,
    objects_unsuccessful: AtomicU64,
    languages: RwLock<HashMap<String, AtomicU64>>,
    latency_us: Mutex<SampleRing>,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub invalid_requests_total: u64,
    pub request_duration_ms: f64,
    pub errors_logged_total: u64,
    pub objects_successful: u64,
    pub objects_unsuccessful: u64,
    pub languages: BTreeMap<String, u64>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            invalid_requests_total: AtomicU64::new(0),
            request_duration_us: AtomicU64::new(0),
            errors_logged_total: AtomicU64::new(0),
            objects_successful: AtomicU64::new(0),
            objects_unsuccessful: AtomicU64::new(0),
            languages: RwLock::new(HashMap::new()),
            latency_us: Mutex::new(SampleRing::new(LATENCY_RING_CAPACITY)),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let languages = self
            .languages
            .read()
            .iter()
            .map(|(name, count)| (name.clone(), count.load(Ordering::Relaxed)))
            .collect();
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            invalid_requests_total: self.invalid_requests_total.load(Ordering::Relaxed),
            request_duration_ms: self.request_duration_us.load(Ordering::Relaxed) as f64 / 1000.0,
            errors_logged_total: self.errors_logged_total.load(Ordering::Relaxed),
            objects_successful: self.objects_successful.load(Ordering::Relaxed),
            objects_unsuccessful: self.objects_unsuccessful.load(Ordering::Relaxed),
            languages,
        }
    }

    #[cfg(test)]
    fn latency_percentile(&self, p: f64) -> f64 {
        self.latency_us.lock().percentile(p)
    }

    /// Render every metric in Prometheus text exposition format.
    pub fn render(&self) -> String {
        use metric_names::*;

        let snap = self.snapshot();
        let mut out = String::with_capacity(2048);

        write_counter(
            &mut out,
            REQUESTS_TOTAL,
            "The total number of requests received.",
            snap.requests_total,
        );
        write_counter(
            &mut out,
            INVALID_REQUESTS_TOTAL,
            "The total number of invalid requests received.",
            snap.invalid_requests_total,
        );
        let _ = writeln!(
            out,
            "# HELP {REQUEST_DURATION_MS} The total amount of time spent processing requests."
        );
        let _ = writeln!(out, "# TYPE {REQUEST_DURATION_MS} counter");
        let _ = writeln!(out, "{REQUEST_DURATION_MS} {}", snap.request_duration_ms);
        write_counter(
            &mut out,
            ERRORS_LOGGED_TOTAL,
            "The total number of errors logged.",
            snap.errors_logged_total,
        );

        let _ = writeln!(
            out,
            "# HELP {OBJECTS_PROCESSED_TOTAL} The total number of objects processed."
        );
        let _ = writeln!(out, "# TYPE {OBJECTS_PROCESSED_TOTAL} counter");
        for (status, value) in [
            (ObjectStatus::Successful, snap.objects_successful),
            (ObjectStatus::Unsuccessful, snap.objects_unsuccessful),
        ] {
            let _ = writeln!(
                out,
                "{OBJECTS_PROCESSED_TOTAL}{{status=\"{}\"}} {value}",
                status.label()
            );
        }

        let _ = writeln!(out, "# HELP {DETECTED_LANGUAGE} Counts of languages detected.");
        let _ = writeln!(out, "# TYPE {DETECTED_LANGUAGE} counter");
        for (name, value) in &snap.languages {
            let _ = writeln!(
                out,
                "{DETECTED_LANGUAGE}{{language=\"{}\"}} {value}",
                escape_label(name)
            );
        }

        let _ = writeln!(
            out,
            "# HELP {REQUEST_LATENCY_US} Latency of recent requests in microseconds."
        );
        let _ = writeln!(out, "# TYPE {REQUEST_LATENCY_US} summary");
        {
            let ring = self.latency_us.lock();
            for p in LATENCY_QUANTILES {
                let _ = writeln!(
                    out,
                    "{REQUEST_LATENCY_US}{{quantile=\"{}\"}} {}",
                    p / 100.0,
                    ring.percentile(p)
                );
            }
            let _ = writeln!(out, "{REQUEST_LATENCY_US}_count {}", ring.count);
        }

        out
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for MetricsRegistry {
    fn request_finished(&self, elapsed: Duration) {
        let elapsed_us = elapsed.as_micros() as u64;
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.request_duration_us
            .fetch_add(elapsed_us, Ordering::Relaxed);
        self.latency_us.lock().push(elapsed_us as f64);
    }

    fn invalid_request(&self) {
        self.invalid_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    fn error_logged(&self) {
        self.errors_logged_total.fetch_add(1, Ordering::Relaxed);
    }

    fn object_processed(&self, status: ObjectStatus) {
        let counter = match status {
            ObjectStatus::Successful => &self.objects_successful,
            ObjectStatus::Unsuccessful => &self.objects_unsuccessful,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn language_detected(&self, name: &str) {
        if let Some(count) = self.languages.read().get(name) {
            count.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.languages
            .write()
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }
}

fn write_counter(out: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {value}");
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

struct ThroughputWindow {
    count: u64,
    started: Instant,
}

/// Logs a throughput line every `interval` processed objects.
pub struct ThroughputLog {
    interval: u64,
    window: Mutex<ThroughputWindow>,
}

impl ThroughputLog {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            window: Mutex::new(ThroughputWindow {
                count: 0,
                started: Instant::now(),
            }),
        }
    }

    /// Count one processed object. Returns true when this object completed
    /// a window and the throughput line was written.
    pub fn tick(&self) -> bool {
        let mut window = self.window.lock();
        window.count += 1;
        if window.count < self.interval {
            return false;
        }

        let took = window.started.elapsed();
        window.count = 0;
        window.started = Instant::now();
        drop(window);

        let secs = took.as_secs_f64();
        let per_second = if secs > 0.0 {
            self.interval as f64 / secs
        } else {
            0.0
        };
        tracing::info!(
            took = ?took,
            throughput = %format!("{per_second:.2}"),
            "Processed {} objects in {:?} ({:.2} per second)",
            self.interval,
            took,
            per_second
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counters_accumulate() {
        let m = MetricsRegistry::new();
        m.request_finished(Duration::from_millis(2));
        m.request_finished(Duration::from_millis(3));
        m.invalid_request();
        m.error_logged();
        m.object_processed(ObjectStatus::Successful);
        m.object_processed(ObjectStatus::Successful);
        m.object_processed(ObjectStatus::Unsuccessful);
        m.language_detected("English");
        m.language_detected("English");
        m.language_detected("Unknown");

        let snap = m.snapshot();
        assert_eq!(snap.requests_total, 2);
        assert_eq!(snap.invalid_requests_total, 1);
        assert_eq!(snap.request_duration_ms, 5.0);
        assert_eq!(snap.errors_logged_total, 1);
        assert_eq!(snap.objects_successful, 2);
        assert_eq!(snap.objects_unsuccessful, 1);
        assert_eq!(snap.languages.get("English"), Some(&2));
        assert_eq!(snap.languages.get("Unknown"), Some(&1));
    }

    #[test]
    fn concurrent_language_counts_are_not_lost() {
        let m = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&m);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        m.language_detected("French");
                        m.object_processed(ObjectStatus::Successful);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let snap = m.snapshot();
        assert_eq!(snap.languages.get("French"), Some(&4000));
        assert_eq!(snap.objects_successful, 4000);
    }

    #[test]
    fn render_includes_both_object_series_before_traffic() {
        let m = MetricsRegistry::new();
        let text = m.render();
        assert!(text.contains("augmentation_objects_processed_total{status=\"successful\"} 0"));
        assert!(text.contains("augmentation_objects_processed_total{status=\"unsuccessful\"} 0"));
        assert!(text.contains("augmentation_requests_total 0"));
        assert!(text.contains("augmentation_request_latency_microseconds_count 0"));
    }

    #[test]
    fn render_escapes_language_labels() {
        let m = MetricsRegistry::new();
        m.language_detected("Odd\"Name");
        let text = m.render();
        assert!(text.contains("augmentation_detected_language{language=\"Odd\\\"Name\"} 1"));
    }

    #[test]
    fn latency_percentiles() {
        let m = MetricsRegistry::new();
        for us in 1..=100u64 {
            m.request_finished(Duration::from_micros(us));
        }
        assert_eq!(m.latency_percentile(50.0), 51.0);
        assert_eq!(m.latency_percentile(99.0), 99.0);
        assert_eq!(MetricsRegistry::new().latency_percentile(50.0), 0.0);
    }

    #[test]
    fn throughput_fires_every_interval() {
        let log = ThroughputLog::new(3);
        assert!(!log.tick());
        assert!(!log.tick());
        assert!(log.tick(), "third tick completes the window");
        assert!(!log.tick());
        assert!(!log.tick());
        assert!(log.tick());
    }
}

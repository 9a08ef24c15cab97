//! Windowed metric aggregation with lazy retention purge.
//!
//! Samples are appended per metric name and never mutated. Aggregates are
//! derived on demand over `(now - window, now]`. Every `record` call checks
//! whether `cleanup_interval` has elapsed since the last purge and, if so,
//! drops samples older than `retention` for every name.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::bounded::lock;
use crate::clock::{Clock, SystemClock};

pub type Tags = BTreeMap<String, String>;

/// One timestamped observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub tags: Tags,
}

/// Summary over the samples of one metric inside a time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateWindow {
    pub count: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl AggregateWindow {
    fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            count,
            avg: sum / count as f64,
            min,
            max,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AggregatorSettings {
    /// Maximum sample age before it is eligible for purge.
    pub retention: Duration,
    /// Minimum spacing between two lazy purges.
    pub cleanup_interval: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            retention: Duration::hours(24),
            cleanup_interval: Duration::hours(1),
        }
    }
}

struct Series {
    samples: HashMap<String, Vec<MetricSample>>,
    last_cleanup: DateTime<Utc>,
}

/// Per-name sample store. Construct once, then share via `Arc`.
pub struct MetricAggregator {
    settings: AggregatorSettings,
    clock: Arc<dyn Clock>,
    inner: Mutex<Series>,
}

impl MetricAggregator {
    pub fn new(settings: AggregatorSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: AggregatorSettings, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            settings,
            clock,
            inner: Mutex::new(Series {
                samples: HashMap::new(),
                last_cleanup: now,
            }),
        }
    }

    /// Append a sample under `name`, stamped with the current time.
    ///
    /// Non-finite values are dropped.
    pub fn record(&self, name: &str, value: f64, tags: Tags) {
        if !value.is_finite() {
            tracing::warn!(metric = %name, value, "dropping non-finite sample");
            return;
        }

        let now = self.clock.now();
        let mut inner = lock(&self.inner);

        if now - inner.last_cleanup >= self.settings.cleanup_interval {
            let removed = purge(&mut inner.samples, self.retention_cutoff(now));
            inner.last_cleanup = now;
            if removed > 0 {
                tracing::debug!(removed, "purged expired metric samples");
            }
        }

        inner
            .samples
            .entry(name.to_string())
            .or_default()
            .push(MetricSample {
                name: name.to_string(),
                value,
                timestamp: now,
                tags,
            });
    }

    /// Aggregate samples of `name` newer than `window_minutes` ago.
    /// Unknown names and empty windows yield the all-zero result.
    pub fn aggregate(&self, name: &str, window_minutes: u64) -> AggregateWindow {
        let cutoff = self.cutoff(window_minutes);
        let inner = lock(&self.inner);
        match inner.samples.get(name) {
            Some(samples) => AggregateWindow::from_values(
                samples
                    .iter()
                    .filter(|s| s.timestamp > cutoff)
                    .map(|s| s.value),
            ),
            None => AggregateWindow::default(),
        }
    }

    /// Aggregates for every known metric, sorted by name.
    pub fn aggregate_all(&self, window_minutes: u64) -> Vec<(String, AggregateWindow)> {
        let cutoff = self.cutoff(window_minutes);
        let inner = lock(&self.inner);
        let mut out: Vec<(String, AggregateWindow)> = inner
            .samples
            .iter()
            .map(|(name, samples)| {
                let agg = AggregateWindow::from_values(
                    samples
                        .iter()
                        .filter(|s| s.timestamp > cutoff)
                        .map(|s| s.value),
                );
                (name.clone(), agg)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Samples of `name` inside the window, oldest first.
    pub fn samples(&self, name: &str, window_minutes: u64) -> Vec<MetricSample> {
        let cutoff = self.cutoff(window_minutes);
        let inner = lock(&self.inner);
        inner
            .samples
            .get(name)
            .map(|s| s.iter().filter(|s| s.timestamp > cutoff).cloned().collect())
            .unwrap_or_default()
    }

    pub fn metric_names(&self) -> Vec<String> {
        let inner = lock(&self.inner);
        let mut names: Vec<String> = inner.samples.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of retained samples for `name`, regardless of window.
    pub fn sample_count(&self, name: &str) -> usize {
        lock(&self.inner).samples.get(name).map(Vec::len).unwrap_or(0)
    }

    /// Purge samples older than the retention period now, bypassing the
    /// cleanup interval. Returns the number of samples removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = lock(&self.inner);
        inner.last_cleanup = now;
        purge(&mut inner.samples, self.retention_cutoff(now))
    }

    fn retention_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.settings.retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn cutoff(&self, window_minutes: u64) -> DateTime<Utc> {
        let now = self.clock.now();
        i64::try_from(window_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

fn purge(samples: &mut HashMap<String, Vec<MetricSample>>, cutoff: DateTime<Utc>) -> usize {
    let mut removed = 0;
    samples.retain(|_, series| {
        let before = series.len();
        series.retain(|s| s.timestamp >= cutoff);
        removed += before - series.len();
        !series.is_empty()
    });
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn fixture() -> (Arc<ManualClock>, MetricAggregator) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();
        let clock = Arc::new(ManualClock::new(start));
        let agg = MetricAggregator::with_clock(AggregatorSettings::default(), clock.clone());
        (clock, agg)
    }

    #[test]
    fn empty_window_is_all_zero() {
        let (_clock, agg) = fixture();
        assert_eq!(agg.aggregate("nope", 5), AggregateWindow::default());
    }

    #[test]
    fn aggregate_counts_only_window() {
        let (clock, agg) = fixture();
        agg.record("latency", 100.0, Tags::new());
        clock.advance(Duration::minutes(10));
        agg.record("latency", 10.0, Tags::new());
        agg.record("latency", 30.0, Tags::new());
        agg.record("latency", 20.0, Tags::new());

        let w = agg.aggregate("latency", 5);
        assert_eq!(w.count, 3);
        assert!((w.avg - 20.0).abs() < 1e-9);
        assert_eq!(w.min, 10.0);
        assert_eq!(w.max, 30.0);

        let all = agg.aggregate("latency", 60);
        assert_eq!(all.count, 4);
        assert!((all.avg - 40.0).abs() < 1e-9);
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let (clock, agg) = fixture();
        agg.record("m", 1.0, Tags::new());
        clock.advance(Duration::minutes(5));
        // Sample is exactly `now - 5min`, so it falls outside `> cutoff`.
        assert_eq!(agg.aggregate("m", 5).count, 0);
        assert_eq!(agg.aggregate("m", 6).count, 1);
    }

    #[test]
    fn lazy_purge_waits_for_cleanup_interval() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();
        let clock = Arc::new(ManualClock::new(start));
        let settings = AggregatorSettings {
            retention: Duration::minutes(30),
            cleanup_interval: Duration::hours(1),
        };
        let agg = MetricAggregator::with_clock(settings, clock.clone());

        agg.record("old", 1.0, Tags::new());
        clock.advance(Duration::minutes(45));
        agg.record("new", 2.0, Tags::new());
        // Expired, but the cleanup interval has not elapsed yet.
        assert_eq!(agg.sample_count("old"), 1);

        clock.advance(Duration::minutes(20));
        agg.record("new", 3.0, Tags::new());
        assert_eq!(agg.sample_count("old"), 0);
        assert_eq!(agg.metric_names(), vec!["new".to_string()]);
        assert_eq!(agg.sample_count("new"), 2);
    }

    #[test]
    fn purge_expired_is_immediate() {
        let (clock, agg) = fixture();
        agg.record("a", 1.0, Tags::new());
        clock.advance(Duration::hours(25));
        agg.record("b", 1.0, Tags::new());
        // The record above already triggered a purge (interval elapsed).
        assert_eq!(agg.sample_count("a"), 0);

        clock.advance(Duration::hours(25));
        assert_eq!(agg.purge_expired(), 1);
        assert!(agg.metric_names().is_empty());
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let (_clock, agg) = fixture();
        agg.record("m", f64::NAN, Tags::new());
        agg.record("m", f64::INFINITY, Tags::new());
        assert_eq!(agg.sample_count("m"), 0);
    }

    #[test]
    fn aggregate_all_is_sorted_and_tags_kept() {
        let (_clock, agg) = fixture();
        let mut tags = Tags::new();
        tags.insert("route".into(), "/health".into());
        agg.record("zeta", 1.0, Tags::new());
        agg.record("alpha", 2.0, tags.clone());

        let names: Vec<String> = agg.aggregate_all(5).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
        assert_eq!(agg.samples("alpha", 5)[0].tags, tags);
    }
}

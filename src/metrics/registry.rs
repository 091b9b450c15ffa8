//! Metric registries
//!
//! [`MetricsRegistry`] is the narrow surface the sink writes through:
//! labelled gauges that can be set or removed, and labelled counters that
//! only go up. [`PrometheusRegistry`] backs it with the `prometheus` crate
//! and renders the text exposition format; [`MemoryRegistry`] keeps plain
//! values for inspection.

use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Label set as ordered (name, value) pairs
pub type Labels = Vec<(String, String)>;

/// Write side of a metrics backend
///
/// Implementations must not fail the caller: registration or cardinality
/// problems are logged and the update is dropped.
pub trait MetricsRegistry: Send + Sync {
    fn set_gauge(&self, name: &str, help: &str, labels: &[(&str, &str)], value: f64);

    /// Removes one gauge series; unknown series are ignored
    fn remove_gauge(&self, name: &str, labels: &[(&str, &str)]);

    fn increment_counter(&self, name: &str, help: &str, labels: &[(&str, &str)]);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry exported at `/metrics`
///
/// Every series carries the common labels `application` and `version`.
/// Metric vectors are registered on first use.
pub struct PrometheusRegistry {
    registry: Registry,
    gauges: Mutex<HashMap<String, GaugeVec>>,
    counters: Mutex<HashMap<String, CounterVec>>,
}

impl PrometheusRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let mut common = HashMap::new();
        common.insert("application".to_string(), "beian-exporter".to_string());
        common.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());

        Ok(Self {
            registry: Registry::new_custom(None, Some(common))?,
            gauges: Mutex::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
        })
    }

    fn gauge_vec(
        &self,
        name: &str,
        help: &str,
        labels: &[(&str, &str)],
    ) -> Result<GaugeVec, prometheus::Error> {
        let mut gauges = lock(&self.gauges);
        if let Some(vec) = gauges.get(name) {
            return Ok(vec.clone());
        }

        let names: Vec<&str> = labels.iter().map(|(k, _)| *k).collect();
        let vec = GaugeVec::new(Opts::new(name, help), &names)?;
        self.registry.register(Box::new(vec.clone()))?;
        gauges.insert(name.to_string(), vec.clone());
        Ok(vec)
    }

    fn counter_vec(
        &self,
        name: &str,
        help: &str,
        labels: &[(&str, &str)],
    ) -> Result<CounterVec, prometheus::Error> {
        let mut counters = lock(&self.counters);
        if let Some(vec) = counters.get(name) {
            return Ok(vec.clone());
        }

        let names: Vec<&str> = labels.iter().map(|(k, _)| *k).collect();
        let vec = CounterVec::new(Opts::new(name, help), &names)?;
        self.registry.register(Box::new(vec.clone()))?;
        counters.insert(name.to_string(), vec.clone());
        Ok(vec)
    }

    /// Encodes every registered metric in the Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = String::new();
        encoder.encode_utf8(&families, &mut buffer)?;
        Ok(buffer)
    }

    /// Content type of [`render`](Self::render) output
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

fn label_map<'a>(labels: &[(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
    labels.iter().copied().collect()
}

impl MetricsRegistry for PrometheusRegistry {
    fn set_gauge(&self, name: &str, help: &str, labels: &[(&str, &str)], value: f64) {
        let result = self
            .gauge_vec(name, help, labels)
            .and_then(|vec| vec.get_metric_with(&label_map(labels)));

        match result {
            Ok(gauge) => gauge.set(value),
            Err(e) => tracing::warn!("Failed to set gauge {}: {}", name, e),
        }
    }

    fn remove_gauge(&self, name: &str, labels: &[(&str, &str)]) {
        let vec = match lock(&self.gauges).get(name) {
            Some(vec) => vec.clone(),
            None => return,
        };

        if let Err(e) = vec.remove(&label_map(labels)) {
            tracing::debug!("Gauge {} had no series to remove: {}", name, e);
        }
    }

    fn increment_counter(&self, name: &str, help: &str, labels: &[(&str, &str)]) {
        let result = self
            .counter_vec(name, help, labels)
            .and_then(|vec| vec.get_metric_with(&label_map(labels)));

        match result {
            Ok(counter) => counter.inc(),
            Err(e) => tracing::warn!("Failed to increment counter {}: {}", name, e),
        }
    }
}

type SeriesKey = (String, Labels);

fn series_key(name: &str, labels: &[(&str, &str)]) -> SeriesKey {
    let mut labels: Labels = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    labels.sort();
    (name.to_string(), labels)
}

/// In-process registry holding raw values
///
/// Label order does not matter for lookups.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    gauges: Mutex<BTreeMap<SeriesKey, f64>>,
    counters: Mutex<BTreeMap<SeriesKey, f64>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        lock(&self.gauges).get(&series_key(name, labels)).copied()
    }

    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        lock(&self.counters).get(&series_key(name, labels)).copied()
    }

    /// All gauge series for `name`, labels sorted by name
    pub fn series(&self, name: &str) -> Vec<(Labels, f64)> {
        lock(&self.gauges)
            .iter()
            .filter(|((n, _), _)| n == name)
            .map(|((_, labels), value)| (labels.clone(), *value))
            .collect()
    }
}

impl MetricsRegistry for MemoryRegistry {
    fn set_gauge(&self, name: &str, _help: &str, labels: &[(&str, &str)], value: f64) {
        lock(&self.gauges).insert(series_key(name, labels), value);
    }

    fn remove_gauge(&self, name: &str, labels: &[(&str, &str)]) {
        lock(&self.gauges).remove(&series_key(name, labels));
    }

    fn increment_counter(&self, name: &str, _help: &str, labels: &[(&str, &str)]) {
        *lock(&self.counters)
            .entry(series_key(name, labels))
            .or_insert(0.0) += 1.0;
    }
}

//! In-process metrics rendered in Prometheus text exposition format.

pub mod scaling;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use scaling::ScalingMetrics;

/// A lightweight, thread-safe registry of labeled counters and gauges.
///
/// Families are registered once with their help text; series are created
/// lazily the first time a label set is written.
pub struct MetricsRegistry {
    families: RwLock<BTreeMap<String, Family>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Counter,
    Gauge,
}

struct Family {
    kind: Kind,
    help: String,
    counters: BTreeMap<String, AtomicU64>,
    gauges: BTreeMap<String, AtomicI64>,
}

fn render_labels(labels: &[(&str, &str)]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            families: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Family>> {
        self.families.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Family>> {
        self.families.write().unwrap_or_else(|e| e.into_inner())
    }

    fn register(&self, name: &str, help: &str, kind: Kind) {
        self.write().entry(name.to_string()).or_insert_with(|| Family {
            kind,
            help: help.to_string(),
            counters: BTreeMap::new(),
            gauges: BTreeMap::new(),
        });
    }

    /// Register a counter family. If it already exists, this is a no-op.
    pub fn register_counter(&self, name: &str, help: &str) {
        self.register(name, help, Kind::Counter);
    }

    /// Register a gauge family. If it already exists, this is a no-op.
    pub fn register_gauge(&self, name: &str, help: &str) {
        self.register(name, help, Kind::Gauge);
    }

    /// Increment a counter series by a given amount.
    pub fn counter_add(&self, name: &str, labels: &[(&str, &str)], val: u64) {
        let key = render_labels(labels);
        {
            let families = self.read();
            match families.get(name) {
                Some(f) if f.kind == Kind::Counter => {
                    if let Some(c) = f.counters.get(&key) {
                        c.fetch_add(val, Ordering::Relaxed);
                        return;
                    }
                }
                _ => return,
            }
        }
        if let Some(f) = self.write().get_mut(name) {
            f.counters
                .entry(key)
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(val, Ordering::Relaxed);
        }
    }

    /// Increment a counter series by 1.
    pub fn counter_inc(&self, name: &str, labels: &[(&str, &str)]) {
        self.counter_add(name, labels, 1);
    }

    /// Set a gauge series to a specific value.
    pub fn gauge_set(&self, name: &str, labels: &[(&str, &str)], val: i64) {
        let key = render_labels(labels);
        {
            let families = self.read();
            match families.get(name) {
                Some(f) if f.kind == Kind::Gauge => {
                    if let Some(g) = f.gauges.get(&key) {
                        g.store(val, Ordering::Relaxed);
                        return;
                    }
                }
                _ => return,
            }
        }
        if let Some(f) = self.write().get_mut(name) {
            f.gauges
                .entry(key)
                .or_insert_with(|| AtomicI64::new(0))
                .store(val, Ordering::Relaxed);
        }
    }

    /// Drop every series of every family carrying this exact label pair.
    pub fn remove_series_with(&self, label: &str, value: &str) {
        let needle = render_labels(&[(label, value)]);
        let needle = &needle[1..needle.len() - 1];
        let matches = |key: &String| {
            key.trim_start_matches('{')
                .trim_end_matches('}')
                .split(',')
                .any(|pair| pair == needle)
        };
        for family in self.write().values_mut() {
            family.counters.retain(|k, _| !matches(k));
            family.gauges.retain(|k, _| !matches(k));
        }
    }

    /// Current value of a counter series, if it exists.
    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        let key = render_labels(labels);
        self.read()
            .get(name)
            .and_then(|f| f.counters.get(&key))
            .map(|c| c.load(Ordering::Relaxed))
    }

    /// Current value of a gauge series, if it exists.
    pub fn gauge_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<i64> {
        let key = render_labels(labels);
        self.read()
            .get(name)
            .and_then(|f| f.gauges.get(&key))
            .map(|g| g.load(Ordering::Relaxed))
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut output = String::new();
        for (name, family) in self.read().iter() {
            let kind = match family.kind {
                Kind::Counter => "counter",
                Kind::Gauge => "gauge",
            };
            output.push_str(&format!("# HELP {} {}\n", name, family.help));
            output.push_str(&format!("# TYPE {} {}\n", name, kind));
            for (labels, c) in &family.counters {
                output.push_str(&format!("{}{} {}\n", name, labels, c.load(Ordering::Relaxed)));
            }
            for (labels, g) in &family.gauges {
                output.push_str(&format!("{}{} {}\n", name, labels, g.load(Ordering::Relaxed)));
            }
        }
        output
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

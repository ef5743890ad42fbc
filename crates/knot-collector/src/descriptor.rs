//! Metric descriptors and the on-demand descriptor registry.
//!
//! Every statistic is exported twice: as a gauge `<name>` and as a counter
//! `<name>_total`, both carrying the same value and labels. A [`DescPair`]
//! holds the two descriptors.
//!
//! Global and per-zone statistics are named by the server, so their
//! descriptors are created the first time a name shows up and then kept
//! for the life of the process.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::names::sanitize_metric_name;

/// Prometheus metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Gauge => f.write_str("gauge"),
            MetricKind::Counter => f.write_str("counter"),
        }
    }
}

/// Name, help text, type and label schema of one metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub labels: Vec<&'static str>,
}

impl MetricDesc {
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        kind: MetricKind,
        labels: &[&'static str],
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            labels: labels.to_vec(),
        }
    }
}

/// Gauge `<name>` plus counter `<name>_total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescPair {
    pub value: Arc<MetricDesc>,
    pub total: Arc<MetricDesc>,
}

impl DescPair {
    pub fn new(name: &str, help: &str, labels: &[&'static str]) -> Self {
        Self {
            value: Arc::new(MetricDesc::new(name, help, MetricKind::Gauge, labels)),
            total: Arc::new(MetricDesc::new(
                format!("{name}_total"),
                help,
                MetricKind::Counter,
                labels,
            )),
        }
    }

    pub fn name(&self) -> &str {
        &self.value.name
    }
}

#[derive(Default)]
struct RegistryMaps {
    /// Raw statistic name → pair.
    by_item: HashMap<String, Arc<DescPair>>,
    /// Metric name → pair. Distinct raw names may sanitize to one metric.
    by_metric: HashMap<String, Arc<DescPair>>,
}

/// Concurrency-safe cache of descriptor pairs keyed by raw statistic name.
///
/// Each registry has a fixed metric-name prefix and label schema, so a
/// metric name it hands out can never appear with a different schema.
pub struct DescriptorRegistry {
    prefix: &'static str,
    help_prefix: &'static str,
    labels: &'static [&'static str],
    maps: RwLock<RegistryMaps>,
}

impl DescriptorRegistry {
    pub fn new(
        prefix: &'static str,
        help_prefix: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            prefix,
            help_prefix,
            labels,
            maps: RwLock::new(RegistryMaps::default()),
        }
    }

    /// Registry for `stats`: `knot_stats_<item>{module, type}`.
    pub fn global() -> Self {
        Self::new("knot_stats", "Global statistic", &["module", "type"])
    }

    /// Registry for `zone-stats`: `knot_zone_stats_<item>{zone, module, type}`.
    pub fn zone() -> Self {
        Self::new("knot_zone_stats", "Zone statistic", &["zone", "module", "type"])
    }

    /// Return the pair for `item`, creating it on first use.
    pub fn get(&self, item: &str) -> Arc<DescPair> {
        {
            let maps = self.maps.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(pair) = maps.by_item.get(item) {
                return Arc::clone(pair);
            }
        }

        let mut maps = self.maps.write().unwrap_or_else(PoisonError::into_inner);

        // Another scrape may have created it while we waited for the lock.
        if let Some(pair) = maps.by_item.get(item) {
            return Arc::clone(pair);
        }

        let metric_name = format!("{}_{}", self.prefix, sanitize_metric_name(item));
        let pair = match maps.by_metric.get(&metric_name) {
            Some(existing) => Arc::clone(existing),
            None => {
                let help = format!("{}: {item}", self.help_prefix);
                let pair = Arc::new(DescPair::new(&metric_name, &help, self.labels));
                maps.by_metric.insert(metric_name.clone(), Arc::clone(&pair));
                debug!(metric = %metric_name, labels = ?self.labels, "created statistic descriptor");
                pair
            }
        };
        maps.by_item.insert(item.to_string(), Arc::clone(&pair));
        pair
    }

    /// Number of distinct raw names seen.
    pub fn len(&self) -> usize {
        self.maps.read().unwrap_or_else(PoisonError::into_inner).by_item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All pairs created so far, sorted by metric name.
    pub fn pairs(&self) -> Vec<Arc<DescPair>> {
        let maps = self.maps.read().unwrap_or_else(PoisonError::into_inner);
        let mut pairs: Vec<_> = maps.by_metric.values().cloned().collect();
        pairs.sort_by(|a, b| a.name().cmp(b.name()));
        pairs
    }
}

impl fmt::Debug for DescriptorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorRegistry")
            .field("prefix", &self.prefix)
            .field("labels", &self.labels)
            .field("len", &self.len())
            .finish()
    }
}

/// Every descriptor the exporter can emit.
///
/// Built once and shared by all collection passes; tests build their own
/// to keep registries isolated.
#[derive(Debug)]
pub struct KnotDescriptors {
    pub build_info: Arc<MetricDesc>,
    pub memory_usage: DescPair,
    pub zone_serial: DescPair,
    pub zone_refresh: DescPair,
    pub zone_retry: DescPair,
    pub zone_expiration: DescPair,
    pub zone_status_refresh: DescPair,
    pub zone_status_expiration: DescPair,
    pub global_stats: DescriptorRegistry,
    pub zone_stats: DescriptorRegistry,
}

impl KnotDescriptors {
    pub fn new() -> Self {
        Self {
            build_info: Arc::new(MetricDesc::new(
                "knot_build_info",
                "Build information about the exporter and the control library",
                MetricKind::Gauge,
                &["version", "build_time", "git_commit", "ctl_version", "platform"],
            )),
            memory_usage: DescPair::new(
                "knot_memory_usage_bytes",
                "Memory usage of Knot DNS processes",
                &["pid"],
            ),
            zone_serial: DescPair::new("knot_zone_serial", "Zone serial number from Knot DNS", &["zone"]),
            zone_refresh: DescPair::new("knot_zone_refresh_seconds", "Zone SOA refresh timer", &["zone"]),
            zone_retry: DescPair::new("knot_zone_retry_seconds", "Zone SOA retry timer", &["zone"]),
            zone_expiration: DescPair::new(
                "knot_zone_expiration_seconds",
                "Zone SOA expiration timer",
                &["zone"],
            ),
            zone_status_refresh: DescPair::new(
                "knot_zone_status_refresh_seconds",
                "Zone refresh timer from zone-status",
                &["zone"],
            ),
            zone_status_expiration: DescPair::new(
                "knot_zone_status_expiration_seconds",
                "Zone expiration timer from zone-status",
                &["zone"],
            ),
            global_stats: DescriptorRegistry::global(),
            zone_stats: DescriptorRegistry::zone(),
        }
    }
}

impl Default for KnotDescriptors {
    fn default() -> Self {
        Self::new()
    }
}

//! knot-collector — turns Knot DNS control responses into Prometheus metrics.
//!
//! Every scrape runs one collection pass. The pass opens a fresh control
//! session per command, walks the tagged response stream and pushes
//! samples into a [`MetricSink`]. Statistic names the server reports are
//! not known in advance; they become metrics on first sight through a
//! [`DescriptorRegistry`].
//!
//! # Architecture
//!
//! ```text
//! KnotCollector::collect()            (single-flight mutex)
//!   ├── knot_build_info               (always)
//!   ├── memory usage                  ← ProcessMemory
//!   ├── phases::global_stats          ← session #1  "stats"
//!   ├── phases::zone_status           ← session #2  "zone-status"
//!   ├── phases::zone_stats            ← session #3  "zone-stats"
//!   └── phases::zone_timers           ← session #4  "zone-read" SOA
//!
//! MetricBuffer → render_prometheus() → text/plain for /metrics
//! ```

pub mod collector;
pub mod descriptor;
pub mod duration;
pub mod names;
pub mod phases;
pub mod process;
pub mod prometheus;

#[cfg(test)]
mod testing;

pub use collector::{BuildInfo, CollectorConfig, KnotCollector, Phase};
pub use descriptor::{DescPair, DescriptorRegistry, KnotDescriptors, MetricDesc, MetricKind};
pub use duration::{convert_state_time, parse_duration};
pub use names::sanitize_metric_name;
pub use process::{ProcessMemory, SysinfoMemory};
pub use prometheus::{MetricBuffer, MetricSink, Sample, render_prometheus};

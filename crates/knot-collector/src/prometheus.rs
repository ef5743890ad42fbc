//! Metric samples and Prometheus text exposition.
//!
//! Collection pushes [`Sample`]s into a [`MetricSink`]; the HTTP layer
//! renders the buffered samples with [`render_prometheus`].

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use crate::descriptor::{DescPair, MetricDesc};

/// One observed value of one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub desc: Arc<MetricDesc>,
    pub value: f64,
    /// Label values, in the order of `desc.labels`.
    pub labels: Vec<String>,
}

impl Sample {
    pub fn new(desc: &Arc<MetricDesc>, value: f64, labels: &[&str]) -> Self {
        debug_assert_eq!(
            desc.labels.len(),
            labels.len(),
            "label count mismatch for {}",
            desc.name
        );
        Self {
            desc: Arc::clone(desc),
            value,
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    /// Value of the label called `label`, if the metric has it.
    pub fn label(&self, label: &str) -> Option<&str> {
        let pos = self.desc.labels.iter().position(|l| *l == label)?;
        self.labels.get(pos).map(String::as_str)
    }
}

/// Receives samples produced by a collection pass.
pub trait MetricSink {
    fn observe(&mut self, sample: Sample);

    /// Push `value` once against each descriptor of `pair`.
    fn emit_pair(&mut self, pair: &DescPair, value: f64, labels: &[&str]) {
        self.observe(Sample::new(&pair.value, value, labels));
        self.observe(Sample::new(&pair.total, value, labels));
    }
}

/// Sink that keeps every sample in arrival order.
#[derive(Debug, Default)]
pub struct MetricBuffer {
    samples: Vec<Sample>,
}

impl MetricBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples whose metric is called `name`.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Sample> + 'a {
        self.samples.iter().filter(move |s| s.name() == name)
    }
}

impl MetricSink for MetricBuffer {
    fn observe(&mut self, sample: Sample) {
        self.samples.push(sample);
    }
}

/// Render samples in the Prometheus text exposition format (0.0.4).
///
/// Samples are grouped into families by metric name, in the order each
/// name first appears. HELP and TYPE come from the first sample's
/// descriptor.
pub fn render_prometheus(samples: &[Sample]) -> String {
    let mut order: Vec<&str> = Vec::new();
    let mut families: HashMap<&str, Vec<&Sample>> = HashMap::new();
    for sample in samples {
        families
            .entry(sample.name())
            .or_insert_with(|| {
                order.push(sample.name());
                Vec::new()
            })
            .push(sample);
    }

    let mut out = String::new();
    for name in order {
        let family = &families[name];
        let desc = &family[0].desc;

        let _ = writeln!(out, "# HELP {name} {}", escape_help(&desc.help));
        let _ = writeln!(out, "# TYPE {name} {}", desc.kind);

        for sample in family {
            out.push_str(name);
            if !sample.labels.is_empty() {
                out.push('{');
                for (i, (label, value)) in desc.labels.iter().zip(&sample.labels).enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{label}=\"{}\"", escape_label_value(value));
                }
                out.push('}');
            }
            let _ = writeln!(out, " {}", format_value(sample.value));
        }
    }
    out
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

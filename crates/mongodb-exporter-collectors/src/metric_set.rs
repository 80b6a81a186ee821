//! Metric families produced by one collector run.
//!
//! A [`MetricSet`] is filled by a collector and then registered as a plain
//! [`prometheus::core::Collector`] into the request-scoped registry, so the
//! registry sees real descriptors and can reject conflicting names.

use mongodb::bson::{Bson, Document};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, GaugeVec, Opts};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::CollectorError;

/// Gauges and counters gathered during one collection
#[derive(Default)]
pub struct MetricSet {
    const_labels: HashMap<String, String>,
    gauges: BTreeMap<String, (Vec<String>, GaugeVec)>,
    counters: BTreeMap<String, (Vec<String>, CounterVec)>,
}

impl MetricSet {
    /// Create an empty set whose metrics all carry `const_labels`
    pub fn new(const_labels: HashMap<String, String>) -> Self {
        Self {
            const_labels,
            ..Default::default()
        }
    }

    /// Number of distinct metric names
    pub fn len(&self) -> usize {
        self.gauges.len() + self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a metric with this exact name was recorded
    pub fn contains(&self, name: &str) -> bool {
        self.gauges.contains_key(name) || self.counters.contains_key(name)
    }

    /// Set a gauge sample.
    ///
    /// The first sample for a name fixes its label names; later samples must
    /// use the same names in the same order.
    pub fn gauge(
        &mut self,
        name: &str,
        help: &str,
        labels: &[(&str, &str)],
        value: f64,
    ) -> Result<(), CollectorError> {
        if self.counters.contains_key(name) {
            return Err(type_conflict(name));
        }
        let (label_names, label_values) = split_labels(labels);
        if !self.gauges.contains_key(name) {
            let vec = GaugeVec::new(self.opts(name, help), &label_names)?;
            self.gauges.insert(name.to_string(), (owned(&label_names), vec));
        }
        let Some((known, vec)) = self.gauges.get(name) else {
            return Err(type_conflict(name));
        };
        check_labels(name, known, &label_names)?;
        vec.get_metric_with_label_values(&label_values[..])?.set(value);
        Ok(())
    }

    /// Add to a counter sample. Negative values are rejected.
    pub fn counter(
        &mut self,
        name: &str,
        help: &str,
        labels: &[(&str, &str)],
        value: f64,
    ) -> Result<(), CollectorError> {
        if value < 0.0 {
            return Err(CollectorError::Metric(prometheus::Error::Msg(format!(
                "counter {name} cannot take negative value {value}"
            ))));
        }
        if self.gauges.contains_key(name) {
            return Err(type_conflict(name));
        }
        let (label_names, label_values) = split_labels(labels);
        if !self.counters.contains_key(name) {
            let vec = CounterVec::new(self.opts(name, help), &label_names)?;
            self.counters.insert(name.to_string(), (owned(&label_names), vec));
        }
        let Some((known, vec)) = self.counters.get(name) else {
            return Err(type_conflict(name));
        };
        check_labels(name, known, &label_names)?;
        vec.get_metric_with_label_values(&label_values[..])?.inc_by(value);
        Ok(())
    }

    /// Turn every numeric field of `document` into a gauge named
    /// `mongodb_<prefix>_<path>`. Nested documents extend the path, arrays and
    /// strings are ignored. Returns the number of samples written.
    pub fn flatten(&mut self, prefix: &str, document: &Document, labels: &[(&str, &str)]) -> usize {
        let mut written = 0;
        self.flatten_into(prefix, "", document, labels, &mut written);
        written
    }

    fn flatten_into(
        &mut self,
        prefix: &str,
        path: &str,
        document: &Document,
        labels: &[(&str, &str)],
        written: &mut usize,
    ) {
        for (key, value) in document {
            let key_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{path}.{key}")
            };

            if let Bson::Document(inner) = value {
                self.flatten_into(prefix, &key_path, inner, labels, written);
                continue;
            }

            let Some(sample) = as_f64(value) else {
                continue;
            };
            let name = metric_name(prefix, &key_path);
            match self.gauge(&name, &key_path, labels, sample) {
                Ok(()) => *written += 1,
                Err(e) => debug!(metric = %name, error = %e, "Skipping field"),
            }
        }
    }

    fn opts(&self, name: &str, help: &str) -> Opts {
        let help = if help.is_empty() { name } else { help };
        Opts::new(name, help).const_labels(self.const_labels.clone())
    }
}

impl Collector for MetricSet {
    fn desc(&self) -> Vec<&Desc> {
        self.gauges
            .values()
            .flat_map(|(_, vec)| vec.desc())
            .chain(self.counters.values().flat_map(|(_, vec)| vec.desc()))
            .collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.gauges
            .values()
            .flat_map(|(_, vec)| vec.collect())
            .chain(self.counters.values().flat_map(|(_, vec)| vec.collect()))
            .collect()
    }
}

/// Numeric view of a BSON value. Dates become unix seconds.
pub fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
        Bson::DateTime(dt) => Some(dt.timestamp_millis() as f64 / 1000.0),
        Bson::Timestamp(ts) => Some(f64::from(ts.time)),
        _ => None,
    }
}

/// Build `mongodb_<prefix>_<path>` with every non-alphanumeric run collapsed
/// to a single underscore.
pub fn metric_name(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        sanitize_name(&format!("mongodb_{path}"))
    } else {
        sanitize_name(&format!("mongodb_{prefix}_{path}"))
    }
}

pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{trimmed}")
    } else {
        trimmed.to_string()
    }
}

fn split_labels<'a>(labels: &[(&'a str, &'a str)]) -> (Vec<&'a str>, Vec<&'a str>) {
    labels.iter().copied().unzip()
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn check_labels(name: &str, known: &[String], given: &[&str]) -> Result<(), CollectorError> {
    if known.iter().map(String::as_str).eq(given.iter().copied()) {
        Ok(())
    } else {
        Err(CollectorError::Metric(prometheus::Error::Msg(format!(
            "metric {name} expects labels {known:?}, got {given:?}"
        ))))
    }
}

fn type_conflict(name: &str) -> CollectorError {
    CollectorError::Metric(prometheus::Error::Msg(format!(
        "metric {name} already recorded with another type"
    )))
}

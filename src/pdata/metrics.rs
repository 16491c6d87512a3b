//! Metrics document: resource -> scope -> gauge metrics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub resource_metrics: Vec<ResourceMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub schema_url: String,
    pub scope_metrics: Vec<ScopeMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeMetrics {
    pub schema_url: String,
    pub metrics: Vec<Metric>,
}

/// A named gauge time series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub unit: String,
    pub gauge: Gauge,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gauge {
    pub data_points: Vec<NumberDataPoint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberDataPoint {
    pub time_unix_nano: u64,
    pub value: f64,
}

impl Metric {
    pub fn gauge(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            gauge: Gauge::default(),
        }
    }

    pub fn push(&mut self, time_unix_nano: u64, value: f64) {
        self.gauge.data_points.push(NumberDataPoint {
            time_unix_nano,
            value,
        });
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// No resource entries at all
    pub fn is_empty(&self) -> bool {
        self.resource_metrics.is_empty()
    }

    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.resource_metrics
            .iter()
            .flat_map(|rm| rm.scope_metrics.iter())
            .flat_map(|sm| sm.metrics.iter())
    }

    /// First metric with the given name
    pub fn find(&self, name: &str) -> Option<&Metric> {
        self.metrics().find(|m| m.name == name)
    }

    pub fn metric_count(&self) -> usize {
        self.metrics().count()
    }

    pub fn data_point_count(&self) -> usize {
        self.metrics().map(|m| m.gauge.data_points.len()).sum()
    }

    /// Move all resource entries of `other` into this document
    pub fn merge_from(&mut self, mut other: Metrics) {
        self.resource_metrics.append(&mut other.resource_metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(name: &str, points: usize) -> Metrics {
        let mut metric = Metric::gauge(name, "bytes");
        for i in 0..points {
            metric.push(i as u64, i as f64);
        }
        Metrics {
            resource_metrics: vec![ResourceMetrics {
                schema_url: String::new(),
                scope_metrics: vec![ScopeMetrics {
                    schema_url: String::new(),
                    metrics: vec![metric],
                }],
            }],
        }
    }

    #[test]
    fn test_merge_concatenates_resources() {
        let mut dst = doc_with("a", 2);
        dst.merge_from(doc_with("a", 3));

        assert_eq!(dst.resource_metrics.len(), 2);
        assert_eq!(dst.metric_count(), 2);
        assert_eq!(dst.data_point_count(), 5);
    }

    #[test]
    fn test_find_metric() {
        let doc = doc_with("runtime.go.gc.heap_goal", 1);
        assert!(doc.find("runtime.go.gc.heap_goal").is_some());
        assert!(doc.find("missing").is_none());
        assert!(Metrics::new().is_empty());
    }
}

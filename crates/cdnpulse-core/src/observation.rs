//! Canonical metric schema and the snapshot handed to sinks

use crate::error::FieldError;
use crate::types::{Category, ChannelId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Namespace shared by all exported CDN metrics
pub const NAMESPACE: &str = "chinacache";

/// Subsystem shared by all exported CDN metrics
pub const SUBSYSTEM: &str = "metrics";

/// Every metric the exporter can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    HitMissTotal,
    IspTotalBytes,
    IspFluxRatio,
    RegionTotalBytes,
    RegionFluxRatio,
    StatusCodeRequestRatio,
    StatusCodeRequestCount,
}

impl MetricKind {
    pub const ALL: [MetricKind; 7] = [
        MetricKind::HitMissTotal,
        MetricKind::IspTotalBytes,
        MetricKind::IspFluxRatio,
        MetricKind::RegionTotalBytes,
        MetricKind::RegionFluxRatio,
        MetricKind::StatusCodeRequestRatio,
        MetricKind::StatusCodeRequestCount,
    ];

    /// Metric name without namespace and subsystem
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::HitMissTotal => "hit_miss_total",
            MetricKind::IspTotalBytes => "isp_total_bytes",
            MetricKind::IspFluxRatio => "isp_specific_flux_ratio",
            MetricKind::RegionTotalBytes => "region_total_bytes",
            MetricKind::RegionFluxRatio => "region_specific_flux_ratio",
            MetricKind::StatusCodeRequestRatio => "statuscodes_request_ratio",
            MetricKind::StatusCodeRequestCount => "statuscodes_request_count",
        }
    }

    pub fn fq_name(&self) -> String {
        format!("{}_{}_{}", NAMESPACE, SUBSYSTEM, self.name())
    }

    pub fn help(&self) -> &'static str {
        match self {
            MetricKind::HitMissTotal => "Hits and misses total values.",
            MetricKind::IspTotalBytes => "Total traffic in bytes.",
            MetricKind::IspFluxRatio => "Flow rate for a single ISP.",
            MetricKind::RegionTotalBytes => "Total traffic in bytes.",
            MetricKind::RegionFluxRatio => "Flow rate for a single region.",
            MetricKind::StatusCodeRequestRatio => {
                "Fraction of requests (0-1) that result in the given status code."
            }
            MetricKind::StatusCodeRequestCount => {
                "Number of requests that result in the given status code."
            }
        }
    }

    /// Ordered label names; observation label values follow this order
    pub fn label_names(&self) -> &'static [&'static str] {
        match self {
            MetricKind::HitMissTotal => &["channel", "HitOrMiss"],
            MetricKind::IspTotalBytes | MetricKind::RegionTotalBytes => &["channel"],
            MetricKind::IspFluxRatio => &["channel", "isp"],
            MetricKind::RegionFluxRatio => &["channel", "region", "name"],
            MetricKind::StatusCodeRequestRatio | MetricKind::StatusCodeRequestCount => {
                &["channel", "StatusCode"]
            }
        }
    }

    pub fn category(&self) -> Category {
        match self {
            MetricKind::HitMissTotal => Category::HitRate,
            MetricKind::IspTotalBytes | MetricKind::IspFluxRatio => Category::IspBreakdown,
            MetricKind::RegionTotalBytes | MetricKind::RegionFluxRatio => {
                Category::RegionBreakdown
            }
            MetricKind::StatusCodeRequestRatio | MetricKind::StatusCodeRequestCount => {
                Category::StatusCodeBreakdown
            }
        }
    }
}

/// One metric value with its full label set
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    metric: MetricKind,
    value: f64,
    labels: Vec<String>,
}

impl Observation {
    /// Build an observation; every label of `metric` must be present and non-empty
    pub fn new(metric: MetricKind, value: f64, labels: Vec<String>) -> Result<Self, FieldError> {
        let names = metric.label_names();
        if labels.len() != names.len() {
            return Err(FieldError::LabelCount {
                expected: names.len(),
                actual: labels.len(),
            });
        }
        if let Some((name, _)) = names.iter().zip(&labels).find(|(_, v)| v.trim().is_empty()) {
            return Err(FieldError::EmptyLabel { label: *name });
        }
        Ok(Self {
            metric,
            value,
            labels,
        })
    }

    /// Observation labeled only by channel
    pub fn for_channel(metric: MetricKind, value: f64, channel: &ChannelId) -> Result<Self, FieldError> {
        Self::new(metric, value, vec![channel.to_string()])
    }

    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// `(name, value)` label pairs
    pub fn label_pairs(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.metric
            .label_names()
            .iter()
            .copied()
            .zip(self.labels.iter().map(String::as_str))
    }

    /// Value of the `channel` label
    pub fn channel(&self) -> &str {
        &self.labels[0]
    }
}

/// All observations of one completed collection cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub observations: Vec<Observation>,
}

impl Snapshot {
    pub fn new(taken_at: DateTime<Utc>, observations: Vec<Observation>) -> Self {
        Self {
            taken_at,
            observations,
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observations of a single metric
    pub fn of_metric(&self, metric: MetricKind) -> impl Iterator<Item = &Observation> {
        self.observations.iter().filter(move |o| o.metric == metric)
    }

    /// Observations for a single channel
    pub fn for_channel<'a>(&'a self, channel: &'a str) -> impl Iterator<Item = &'a Observation> {
        self.observations.iter().filter(move |o| o.channel() == channel)
    }
}

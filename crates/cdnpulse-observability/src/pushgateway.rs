//! Prometheus Pushgateway sink
//!
//! Every snapshot is rendered into a fresh registry, so series that vanished
//! from the provider are not pushed again from a previous cycle.

use crate::metrics::self_metric_families;
use async_trait::async_trait;
use cdnpulse_core::{MetricKind, MetricSink, SinkError, Snapshot, NAMESPACE, SUBSYSTEM};
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Render a snapshot in the Prometheus text exposition format
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String, SinkError> {
    let registry = snapshot_registry(snapshot)?;
    TextEncoder::new()
        .encode_to_string(&registry.gather())
        .map_err(|e| SinkError::Encode(e.to_string()))
}

fn snapshot_registry(snapshot: &Snapshot) -> Result<Registry, SinkError> {
    let registry = Registry::new();

    for metric in MetricKind::ALL {
        let gauges = GaugeVec::new(
            Opts::new(metric.name(), metric.help())
                .namespace(NAMESPACE)
                .subsystem(SUBSYSTEM),
            metric.label_names(),
        )
        .map_err(|e| SinkError::Encode(e.to_string()))?;

        for observation in snapshot.of_metric(metric) {
            let labels: Vec<&str> = observation.labels().iter().map(String::as_str).collect();
            gauges
                .get_metric_with_label_values(&labels)
                .map_err(|e| SinkError::Encode(e.to_string()))?
                .set(observation.value());
        }

        registry
            .register(Box::new(gauges))
            .map_err(|e| SinkError::Encode(e.to_string()))?;
    }

    Ok(registry)
}

/// Pushes each snapshot to a Prometheus Pushgateway under one job
pub struct PushGatewaySink {
    http: Client,
    endpoint: Url,
    include_self_metrics: bool,
}

impl PushGatewaySink {
    pub fn new(gateway: &str, job: &str) -> Result<Self, SinkError> {
        let endpoint = push_url(gateway, job)?;
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SinkError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            include_self_metrics: true,
        })
    }

    /// Push only the snapshot, without the process metrics
    pub fn without_self_metrics(mut self) -> Self {
        self.include_self_metrics = false;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn encode(&self, snapshot: &Snapshot) -> Result<String, SinkError> {
        let mut families = snapshot_registry(snapshot)?.gather();
        if self.include_self_metrics {
            families.extend(self_metric_families());
        }

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| SinkError::Encode(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| SinkError::Encode(e.to_string()))
    }
}

/// `{gateway}/metrics/job/{job}`, with the job name escaped as a path segment
fn push_url(gateway: &str, job: &str) -> Result<Url, SinkError> {
    let mut url = Url::parse(gateway)
        .map_err(|e| SinkError::Http(format!("invalid pushgateway URL {:?}: {}", gateway, e)))?;

    url.path_segments_mut()
        .map_err(|_| SinkError::Http(format!("pushgateway URL {:?} cannot be a base", gateway)))?
        .pop_if_empty()
        .extend(["metrics", "job", job]);

    Ok(url)
}

#[async_trait]
impl MetricSink for PushGatewaySink {
    async fn publish(&self, snapshot: &Snapshot) -> Result<(), SinkError> {
        let body = self.encode(snapshot)?;
        debug!(
            endpoint = %self.endpoint,
            bytes = body.len(),
            "Pushing snapshot"
        );

        // POST adds to the group instead of replacing it
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, TextEncoder::new().format_type())
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        info!(
            endpoint = %self.endpoint,
            observations = snapshot.len(),
            "Pushed snapshot to Pushgateway"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "pushgateway"
    }
}

use async_trait::async_trait;
use cdnpulse_core::{MetricSink, SinkError, Snapshot};
use tracing::info;

/// Writes every observation to the log instead of pushing it
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricSink for LogSink {
    async fn publish(&self, snapshot: &Snapshot) -> Result<(), SinkError> {
        for observation in &snapshot.observations {
            let labels: Vec<String> = observation
                .label_pairs()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            info!(
                metric = %observation.metric().fq_name(),
                labels = %labels.join(","),
                value = observation.value(),
                "Observation"
            );
        }

        info!(
            taken_at = %snapshot.taken_at,
            observations = snapshot.len(),
            "Snapshot logged"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

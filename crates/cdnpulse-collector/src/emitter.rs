//! Per-cycle fan-out over all channels and snapshot delivery

use crate::aggregator::ChannelAggregator;
use crate::category::CategoryCollector;
use crate::report::{CategoryReport, CollectionReport, CycleReport};
use cdnpulse_core::{
    Category, ChannelId, FetchError, MetricSink, MetricSource, QueryWindow, Snapshot,
    TranslationTable,
};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Collects every configured channel and hands one snapshot per cycle to the sink
pub struct SnapshotEmitter {
    aggregator: ChannelAggregator,
    sink: Arc<dyn MetricSink>,
    query_duration: Duration,
}

impl SnapshotEmitter {
    pub fn new(
        source: Arc<dyn MetricSource>,
        translations: Arc<TranslationTable>,
        sink: Arc<dyn MetricSink>,
        query_duration: Duration,
    ) -> Self {
        let collector = CategoryCollector::new(source, translations);
        Self {
            aggregator: ChannelAggregator::new(collector),
            sink,
            query_duration,
        }
    }

    pub fn query_duration(&self) -> Duration {
        self.query_duration
    }

    /// Collect all channels over `window` without publishing.
    ///
    /// Waits for every channel task; a slow channel delays the result but
    /// never cuts another channel short.
    pub async fn collect(&self, channels: &[ChannelId], window: &QueryWindow) -> CollectionReport {
        let tasks = channels.iter().cloned().map(|channel| {
            let aggregator = self.aggregator.clone();
            let window = *window;
            let task_channel = channel.clone();
            let handle =
                tokio::spawn(async move { aggregator.aggregate(&task_channel, &window).await });
            async move { (channel, handle.await) }
        });

        let mut report = CollectionReport::default();
        for (channel, joined) in join_all(tasks).await {
            match joined {
                Ok(channel_report) => report.merge(channel_report),
                Err(e) => {
                    error!(channel = %channel, error = %e, "Channel task failed");
                    for category in Category::ALL {
                        report.absorb(CategoryReport::failed(
                            category,
                            channel.clone(),
                            FetchError::TaskFailed(e.to_string()),
                        ));
                    }
                }
            }
        }
        report
    }

    /// Run one full cycle: collect every channel, then publish a single snapshot
    pub async fn collect_all(&self, channels: &[ChannelId]) -> CycleReport {
        let started = Instant::now();
        let window = QueryWindow::trailing(self.query_duration);

        info!(
            channels = channels.len(),
            start = %window.start,
            end = %window.end,
            "Starting collection cycle"
        );

        let report = self.collect(channels, &window).await;
        let snapshot = Snapshot::new(Utc::now(), report.observations);

        let publish_error = match self.sink.publish(&snapshot).await {
            Ok(()) => None,
            Err(e) => {
                warn!(sink = self.sink.name(), error = %e, "Could not publish snapshot");
                Some(e)
            }
        };

        let elapsed = started.elapsed();
        info!(
            observations = snapshot.len(),
            failures = report.failures.len(),
            diagnostics = report.diagnostics.len(),
            published = publish_error.is_none(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Collection cycle finished"
        );

        CycleReport {
            window,
            channels: channels.len(),
            snapshot,
            failures: report.failures,
            diagnostics: report.diagnostics,
            elapsed,
            publish_error,
        }
    }
}

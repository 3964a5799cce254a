//! Per-channel fan-out over all categories

use crate::category::CategoryCollector;
use crate::report::{CategoryReport, CollectionReport};
use cdnpulse_core::{Category, ChannelId, FetchError, QueryWindow};
use futures::future::join_all;
use tracing::{debug, error};

/// Runs every category collector for one channel concurrently
#[derive(Clone)]
pub struct ChannelAggregator {
    collector: CategoryCollector,
}

impl ChannelAggregator {
    pub fn new(collector: CategoryCollector) -> Self {
        Self { collector }
    }

    /// Collect all categories for `channel` and merge the results.
    ///
    /// Returns once all four category tasks have finished. A failed category
    /// only removes its own observations.
    pub async fn aggregate(&self, channel: &ChannelId, window: &QueryWindow) -> CollectionReport {
        let tasks = Category::ALL.into_iter().map(|category| {
            let collector = self.collector.clone();
            let channel = channel.clone();
            let window = *window;
            let handle =
                tokio::spawn(async move { collector.collect(category, &channel, &window).await });
            async move { (category, handle.await) }
        });

        let mut report = CollectionReport::default();
        for (category, joined) in join_all(tasks).await {
            match joined {
                Ok(category_report) => report.absorb(category_report),
                Err(e) => {
                    error!(
                        channel = %channel,
                        category = %category,
                        error = %e,
                        "Category task failed"
                    );
                    report.absorb(CategoryReport::failed(
                        category,
                        channel.clone(),
                        FetchError::TaskFailed(e.to_string()),
                    ));
                }
            }
        }

        debug!(
            channel = %channel,
            observations = report.observations.len(),
            failures = report.failures.len(),
            "Channel aggregated"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{canonical, channel, window, MockSource};
    use cdnpulse_core::{
        BreakdownEntry, HitRatePayload, IspPayload, RegionPayload, StatusCodeEntry,
        StatusCodePayload, TranslationTable,
    };
    use std::sync::Arc;

    fn full_source(id: &str) -> MockSource {
        MockSource::new()
            .respond(
                Category::HitRate,
                id,
                HitRatePayload {
                    hit: 120,
                    miss: 30,
                    ..Default::default()
                },
            )
            .respond(
                Category::IspBreakdown,
                id,
                IspPayload {
                    total_flux: 2048,
                    isps: vec![BreakdownEntry::new("联通", 0.7), BreakdownEntry::new("移动", 0.3)],
                    code: 0,
                },
            )
            .respond(
                Category::RegionBreakdown,
                id,
                RegionPayload {
                    total_flux: 2048,
                    ..Default::default()
                },
            )
            .respond(
                Category::StatusCodeBreakdown,
                id,
                StatusCodePayload {
                    entries: vec![StatusCodeEntry {
                        http_code: "200".into(),
                        request_count: 99,
                        request_percent: "99%".into(),
                        flux_percent: "99%".into(),
                    }],
                    success: true,
                    ..Default::default()
                },
            )
    }

    fn aggregator(source: MockSource) -> ChannelAggregator {
        ChannelAggregator::new(CategoryCollector::new(
            Arc::new(source),
            Arc::new(TranslationTable::builtin()),
        ))
    }

    #[tokio::test]
    async fn test_aggregate_merges_all_categories() {
        let report = aggregator(full_source("8123"))
            .aggregate(&channel("8123"), &window())
            .await;

        // hit/miss 2 + isp 3 + region 1 + status 2
        assert_eq!(report.observations.len(), 8);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_failed_category_does_not_affect_others() {
        let source = full_source("8123").fail(
            Category::IspBreakdown,
            "8123",
            FetchError::Decode("unexpected token".into()),
        );
        let report = aggregator(source).aggregate(&channel("8123"), &window()).await;

        assert_eq!(report.observations.len(), 5);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].category, Category::IspBreakdown);
    }

    #[tokio::test]
    async fn test_panicking_category_is_isolated() {
        let source = full_source("8123").panic_on(Category::HitRate, "8123");
        let report = aggregator(source).aggregate(&channel("8123"), &window()).await;

        assert_eq!(report.observations.len(), 6);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, FetchError::TaskFailed(_)));
    }

    #[tokio::test]
    async fn test_every_category_fetched_once() {
        let source = Arc::new(full_source("8123"));
        let agg = ChannelAggregator::new(CategoryCollector::new(
            source.clone(),
            Arc::new(TranslationTable::builtin()),
        ));
        agg.aggregate(&channel("8123"), &window()).await;
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn test_aggregate_is_idempotent() {
        let agg = aggregator(full_source("8123"));
        let first = agg.aggregate(&channel("8123"), &window()).await;
        let second = agg.aggregate(&channel("8123"), &window()).await;
        assert_eq!(canonical(&first.observations), canonical(&second.observations));
    }
}

//! Per (channel, category) collection
//!
//! Fetches one category from the metric source and maps the payload into
//! canonical observations. Every failure is logged here, once, and folded
//! into the returned [`CategoryReport`]; nothing propagates to sibling
//! categories or channels.

use crate::report::CategoryReport;
use cdnpulse_core::{
    BreakdownEntry, Category, ChannelId, FetchError, FieldError, HitRatePayload, IspPayload,
    MetricKind, MetricSource, Observation, Payload, QueryWindow, RegionPayload, StatusCodePayload,
    TranslationTable,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Region discriminator for domestic entries
pub const PROVINCE: &str = "Province";

/// Region discriminator for overseas entries
pub const STATE: &str = "State";

/// Collects a single category for a single channel
#[derive(Clone)]
pub struct CategoryCollector {
    source: Arc<dyn MetricSource>,
    translations: Arc<TranslationTable>,
}

impl CategoryCollector {
    pub fn new(source: Arc<dyn MetricSource>, translations: Arc<TranslationTable>) -> Self {
        Self {
            source,
            translations,
        }
    }

    /// Fetch and map one category. Never fails; problems end up in the report.
    pub async fn collect(
        &self,
        category: Category,
        channel: &ChannelId,
        window: &QueryWindow,
    ) -> CategoryReport {
        let started = Instant::now();
        let fetched = self.source.fetch(category, channel, window).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match fetched {
            Ok(payload) => {
                let report = self.map_payload(category, channel, payload);
                debug!(
                    channel = %channel,
                    category = %category,
                    observations = report.observations.len(),
                    elapsed_ms,
                    "Category collected"
                );
                report
            }
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    channel = %channel,
                    category = %category,
                    kind = %e.kind(),
                    error = %e,
                    elapsed_ms,
                    "Couldn't collect category"
                );
                CategoryReport::failed(category, channel.clone(), e)
            }
        }
    }

    /// Map a fetched payload into observations
    pub fn map_payload(
        &self,
        category: Category,
        channel: &ChannelId,
        payload: Payload,
    ) -> CategoryReport {
        match (category, payload) {
            (Category::HitRate, Payload::HitRate(p)) => map_hit_rate(channel, &p),
            (Category::IspBreakdown, Payload::Isp(p)) => map_isp(channel, &p, &self.translations),
            (Category::RegionBreakdown, Payload::Region(p)) => {
                map_region(channel, &p, &self.translations)
            }
            (Category::StatusCodeBreakdown, Payload::StatusCodes(p)) => {
                map_status_codes(channel, &p)
            }
            (category, other) => {
                let e = FetchError::Decode(format!(
                    "expected {} payload, got {}",
                    category,
                    other.category()
                ));
                warn!(channel = %channel, category = %category, error = %e, "Mismatched payload");
                CategoryReport::failed(category, channel.clone(), e)
            }
        }
    }
}

/// Hit and miss counters, always exactly two observations
pub fn map_hit_rate(channel: &ChannelId, payload: &HitRatePayload) -> CategoryReport {
    let mut report = CategoryReport::empty(Category::HitRate, channel.clone());
    for (disposition, value) in [("Hit", payload.hit), ("Miss", payload.miss)] {
        report.push(
            Observation::new(
                MetricKind::HitMissTotal,
                value as f64,
                vec![channel.to_string(), disposition.to_string()],
            ),
            disposition,
        );
    }
    report
}

/// Total traffic plus one flux ratio per carrier
pub fn map_isp(
    channel: &ChannelId,
    payload: &IspPayload,
    translations: &TranslationTable,
) -> CategoryReport {
    let mut report = CategoryReport::empty(Category::IspBreakdown, channel.clone());
    report.push(
        Observation::for_channel(MetricKind::IspTotalBytes, payload.total_flux as f64, channel),
        "total",
    );

    // Only populated when the window spans the provider's daily rollup
    let entries = payload.isps.iter().map(|e| (None, e));
    for merged in merge_aliases(channel, entries, translations) {
        report.push(
            Observation::new(
                MetricKind::IspFluxRatio,
                merged.flux_ratio,
                vec![channel.to_string(), merged.name.to_string()],
            ),
            merged.raw,
        );
    }
    report
}

/// Total traffic plus one flux ratio per province and per state
pub fn map_region(
    channel: &ChannelId,
    payload: &RegionPayload,
    translations: &TranslationTable,
) -> CategoryReport {
    let mut report = CategoryReport::empty(Category::RegionBreakdown, channel.clone());
    report.push(
        Observation::for_channel(MetricKind::RegionTotalBytes, payload.total_flux as f64, channel),
        "total",
    );

    let entries = payload
        .provinces
        .iter()
        .map(|e| (Some(PROVINCE), e))
        .chain(payload.states.iter().map(|e| (Some(STATE), e)));
    for merged in merge_aliases(channel, entries, translations) {
        report.push(
            Observation::new(
                MetricKind::RegionFluxRatio,
                merged.flux_ratio,
                vec![
                    channel.to_string(),
                    merged.region.unwrap_or(PROVINCE).to_string(),
                    merged.name.to_string(),
                ],
            ),
            merged.raw,
        );
    }
    report
}

/// Breakdown entry after translation
struct MergedEntry<'a> {
    region: Option<&'static str>,
    name: &'a str,
    /// First raw label seen for this name
    raw: &'a str,
    flux_ratio: f64,
}

/// Translate breakdown entries and sum the flux ratios of raw labels that
/// share a display name, so each label set is emitted once
fn merge_aliases<'a>(
    channel: &ChannelId,
    entries: impl Iterator<Item = (Option<&'static str>, &'a BreakdownEntry)>,
    translations: &'a TranslationTable,
) -> Vec<MergedEntry<'a>> {
    let mut merged: Vec<MergedEntry<'a>> = Vec::new();
    for (region, entry) in entries {
        let name = translations.translate(&entry.name);
        match merged
            .iter_mut()
            .find(|m| m.region == region && m.name == name)
        {
            Some(existing) => {
                debug!(
                    channel = %channel,
                    name,
                    first = existing.raw,
                    alias = %entry.name,
                    "Merging aliased breakdown entry"
                );
                existing.flux_ratio += entry.flux_ratio;
            }
            None => merged.push(MergedEntry {
                region,
                name,
                raw: &entry.name,
                flux_ratio: entry.flux_ratio,
            }),
        }
    }
    merged
}

/// Request ratio and count per HTTP status code.
///
/// An unsuccessful payload yields nothing and marks the category failed. A
/// malformed percentage only drops that entry's ratio; its count is kept.
pub fn map_status_codes(channel: &ChannelId, payload: &StatusCodePayload) -> CategoryReport {
    if !payload.success {
        error!(
            channel = %channel,
            status = payload.status,
            payload = ?payload,
            "Status code query didn't succeed"
        );
        return CategoryReport::failed(
            Category::StatusCodeBreakdown,
            channel.clone(),
            FetchError::Provider(format!(
                "success=false status={} msg={:?}",
                payload.status, payload.message
            )),
        );
    }

    let mut report = CategoryReport::empty(Category::StatusCodeBreakdown, channel.clone());
    for entry in &payload.entries {
        let labels = vec![channel.to_string(), entry.http_code.clone()];

        match parse_percentage(&entry.request_percent) {
            Ok(ratio) => report.push(
                Observation::new(MetricKind::StatusCodeRequestRatio, ratio, labels.clone()),
                &entry.http_code,
            ),
            Err(e) => report.diagnose(&entry.http_code, e),
        }

        report.push(
            Observation::new(
                MetricKind::StatusCodeRequestCount,
                entry.request_count as f64,
                labels,
            ),
            &entry.http_code,
        );
    }
    report
}

/// Parse `"12.5%"` into the fraction `0.125`
pub fn parse_percentage(raw: &str) -> Result<f64, FieldError> {
    let number = raw
        .trim()
        .strip_suffix('%')
        .ok_or_else(|| FieldError::MissingPercentSign {
            raw: raw.to_string(),
        })?
        .trim();

    let value: f64 = number.parse().map_err(|e: std::num::ParseFloatError| {
        FieldError::InvalidNumber {
            raw: raw.to_string(),
            reason: e.to_string(),
        }
    })?;

    if !value.is_finite() {
        return Err(FieldError::InvalidNumber {
            raw: raw.to_string(),
            reason: "not a finite number".to_string(),
        });
    }

    Ok(value / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockSource, channel};
    use cdnpulse_core::StatusCodeEntry;

    fn status_entry(code: &str, count: u64, percent: &str) -> StatusCodeEntry {
        StatusCodeEntry {
            http_code: code.to_string(),
            request_count: count,
            request_percent: percent.to_string(),
            flux_percent: "0%".to_string(),
        }
    }

    #[test]
    fn test_parse_percentage() {
        assert_eq!(parse_percentage("12.5%").unwrap(), 0.125);
        assert_eq!(parse_percentage(" 100% ").unwrap(), 1.0);
        assert_eq!(parse_percentage("0%").unwrap(), 0.0);
        assert!(matches!(
            parse_percentage("N/A%"),
            Err(FieldError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_percentage("12.5"),
            Err(FieldError::MissingPercentSign { .. })
        ));
        assert!(matches!(
            parse_percentage(""),
            Err(FieldError::MissingPercentSign { .. })
        ));
        assert!(matches!(
            parse_percentage("%"),
            Err(FieldError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_percentage("NaN%"),
            Err(FieldError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_hit_rate_yields_hit_and_miss() {
        let ch = channel("8123");
        let report = map_hit_rate(
            &ch,
            &HitRatePayload {
                hit: 120,
                miss: 30,
                ..Default::default()
            },
        );

        assert!(!report.is_failed());
        assert_eq!(report.observations.len(), 2);
        let hit = &report.observations[0];
        assert_eq!(hit.metric(), MetricKind::HitMissTotal);
        assert_eq!(hit.value(), 120.0);
        assert_eq!(hit.labels(), ["8123", "Hit"]);
        let miss = &report.observations[1];
        assert_eq!(miss.value(), 30.0);
        assert_eq!(miss.labels(), ["8123", "Miss"]);
    }

    #[test]
    fn test_region_without_breakdown_yields_only_total() {
        let ch = channel("8123");
        let report = map_region(
            &ch,
            &RegionPayload {
                total_flux: 4096,
                ..Default::default()
            },
            &TranslationTable::builtin(),
        );

        assert_eq!(report.observations.len(), 1);
        assert_eq!(report.observations[0].metric(), MetricKind::RegionTotalBytes);
        assert_eq!(report.observations[0].value(), 4096.0);
        assert!(report.diagnostics.is_empty());
        assert!(!report.is_failed());
    }

    #[test]
    fn test_region_breakdown_translates_and_discriminates() {
        let ch = channel("8123");
        let report = map_region(
            &ch,
            &RegionPayload {
                total_flux: 100,
                provinces: vec![BreakdownEntry::new("广东", 0.4)],
                states: vec![BreakdownEntry::new("美国", 0.1)],
                code: 0,
            },
            &TranslationTable::builtin(),
        );

        assert_eq!(report.observations.len(), 3);
        assert_eq!(report.observations[1].labels(), ["8123", "Province", "Guangdong"]);
        assert_eq!(report.observations[1].value(), 0.4);
        assert_eq!(report.observations[2].labels(), ["8123", "State", "United States"]);
    }

    #[test]
    fn test_isp_untranslated_label_is_kept_verbatim() {
        let ch = channel("8123");
        let report = map_isp(
            &ch,
            &IspPayload {
                total_flux: 10,
                isps: vec![BreakdownEntry::new("电信", 0.6), BreakdownEntry::new("星链", 0.4)],
                code: 0,
            },
            &TranslationTable::builtin(),
        );

        assert_eq!(report.observations.len(), 3);
        assert_eq!(report.observations[1].labels(), ["8123", "China Telecom"]);
        assert_eq!(report.observations[2].labels(), ["8123", "星链"]);
    }

    #[test]
    fn test_isp_aliases_are_summed_into_one_series() {
        let ch = channel("8123");
        let report = map_isp(
            &ch,
            &IspPayload {
                total_flux: 10,
                isps: vec![
                    BreakdownEntry::new("电信", 0.5),
                    BreakdownEntry::new("联通", 0.125),
                    BreakdownEntry::new("中国电信", 0.25),
                ],
                code: 0,
            },
            &TranslationTable::builtin(),
        );

        assert_eq!(report.observations.len(), 3);
        assert_eq!(report.observations[1].labels(), ["8123", "China Telecom"]);
        assert_eq!(report.observations[1].value(), 0.75);
        assert_eq!(report.observations[2].labels(), ["8123", "China Unicom"]);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_region_aliases_merge_only_within_discriminator() {
        let ch = channel("8123");
        let translations = TranslationTable::empty().with_overrides([("甲", "Alpha"), ("乙", "Alpha")]);
        let report = map_region(
            &ch,
            &RegionPayload {
                total_flux: 100,
                provinces: vec![BreakdownEntry::new("甲", 0.25), BreakdownEntry::new("乙", 0.25)],
                states: vec![BreakdownEntry::new("甲", 0.125)],
                code: 0,
            },
            &translations,
        );

        assert_eq!(report.observations.len(), 3);
        assert_eq!(report.observations[1].labels(), ["8123", "Province", "Alpha"]);
        assert_eq!(report.observations[1].value(), 0.5);
        assert_eq!(report.observations[2].labels(), ["8123", "State", "Alpha"]);
        assert_eq!(report.observations[2].value(), 0.125);
    }

    #[test]
    fn test_isp_entry_with_empty_name_is_skipped() {
        let ch = channel("8123");
        let report = map_isp(
            &ch,
            &IspPayload {
                total_flux: 10,
                isps: vec![BreakdownEntry::new("", 0.6)],
                code: 0,
            },
            &TranslationTable::empty(),
        );

        assert_eq!(report.observations.len(), 1);
        assert_eq!(report.diagnostics.len(), 1);
        assert!(!report.is_failed());
    }

    #[test]
    fn test_status_codes_parse_failure_keeps_count() {
        let ch = channel("8123");
        let report = map_status_codes(
            &ch,
            &StatusCodePayload {
                entries: vec![
                    status_entry("200", 800, "80%"),
                    status_entry("404", 125, "12.5%"),
                    status_entry("502", 3, "N/A%"),
                ],
                success: true,
                ..Default::default()
            },
        );

        let ratios: Vec<_> = report
            .observations
            .iter()
            .filter(|o| o.metric() == MetricKind::StatusCodeRequestRatio)
            .collect();
        let counts: Vec<_> = report
            .observations
            .iter()
            .filter(|o| o.metric() == MetricKind::StatusCodeRequestCount)
            .collect();

        assert_eq!(ratios.len(), 2);
        assert_eq!(counts.len(), 3);
        assert_eq!(ratios[1].labels(), ["8123", "404"]);
        assert_eq!(ratios[1].value(), 0.125);
        assert_eq!(counts[2].labels(), ["8123", "502"]);
        assert_eq!(counts[2].value(), 3.0);

        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].subject, "502");
        assert_eq!(report.diagnostics[0].category, Category::StatusCodeBreakdown);
        assert!(!report.is_failed());
    }

    #[test]
    fn test_status_codes_unsuccessful_yields_nothing() {
        let ch = channel("8123");
        let report = map_status_codes(
            &ch,
            &StatusCodePayload {
                entries: vec![status_entry("200", 800, "80%")],
                message: "invalid api key".to_string(),
                status: 401,
                success: false,
            },
        );

        assert!(report.observations.is_empty());
        let failure = report.failure.expect("provider failure");
        assert!(matches!(failure.error, FetchError::Provider(_)));
    }

    #[tokio::test]
    async fn test_collect_fetch_failure_yields_empty_report() {
        let ch = channel("8123");
        let source = MockSource::new().fail(
            Category::HitRate,
            "8123",
            FetchError::Transport("connection refused".into()),
        );
        let collector = CategoryCollector::new(Arc::new(source), Arc::new(TranslationTable::builtin()));

        let report = collector
            .collect(Category::HitRate, &ch, &crate::testing::window())
            .await;
        assert!(report.observations.is_empty());
        assert_eq!(
            report.failure.unwrap().error,
            FetchError::Transport("connection refused".into())
        );
    }

    #[tokio::test]
    async fn test_collect_rejects_mismatched_payload() {
        let ch = channel("8123");
        let source = MockSource::new().respond(
            Category::IspBreakdown,
            "8123",
            HitRatePayload::default(),
        );
        let collector = CategoryCollector::new(Arc::new(source), Arc::new(TranslationTable::empty()));

        let report = collector
            .collect(Category::IspBreakdown, &ch, &crate::testing::window())
            .await;
        assert!(report.observations.is_empty());
        assert!(matches!(
            report.failure.unwrap().error,
            FetchError::Decode(_)
        ));
    }
}

//! ChinaCache statistics client
//!
//! Hit rate, ISP and region data come from the statistics API, status codes
//! from the REST API. Both interpret timestamps in GMT+8.

use crate::wire::{decode_payload, excerpt};
use async_trait::async_trait;
use cdnpulse_core::{Category, ChannelId, FetchError, MetricSource, Payload, QueryWindow};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use reqwest::{Client, Url};
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Offset of the provider's reporting time zone
const PROVIDER_UTC_OFFSET_HOURS: i64 = 8;
const PROVIDER_TIME_ZONE: &str = "GMT+8";

const API_PATH: &str = "api/public/statistics";
const REST_API_PATH: &str = "rest-api/public/statistics";

/// Timestamp format of the statistics API
const API_TIME_FORMAT: &str = "%Y%m%d%H%M";
/// Date format of the REST API
const REST_DATE_FORMAT: &str = "%Y%m%d";

/// Configuration for the ChinaCache client
#[derive(Clone)]
pub struct ChinaCacheConfig {
    pub api_base: String,
    pub user: String,
    pub pass: String,
    pub timeout: Duration,
}

impl ChinaCacheConfig {
    pub fn new(api_base: impl Into<String>, user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            user: user.into(),
            pass: pass.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ChinaCacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChinaCacheConfig")
            .field("api_base", &self.api_base)
            .field("user", &self.user)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Endpoint a category is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Api(&'static str),
    Rest(&'static str),
}

fn endpoint(category: Category) -> Endpoint {
    match category {
        Category::HitRate => Endpoint::Api("getHitRate"),
        Category::IspBreakdown => Endpoint::Api("getIsp"),
        Category::RegionBreakdown => Endpoint::Api("getRegion"),
        Category::StatusCodeBreakdown => Endpoint::Rest("http_code"),
    }
}

/// Wall-clock time in the provider's time zone
fn provider_time(t: DateTime<Utc>) -> NaiveDateTime {
    t.naive_utc() + ChronoDuration::hours(PROVIDER_UTC_OFFSET_HOURS)
}

/// HTTP client for the ChinaCache portal API
pub struct ChinaCacheClient {
    http: Client,
    config: ChinaCacheConfig,
}

impl ChinaCacheClient {
    pub fn new(config: ChinaCacheConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("cdnpulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Request URL for one category, channel and window
    pub fn build_url(
        &self,
        category: Category,
        channel: &ChannelId,
        window: &QueryWindow,
    ) -> Result<Url, FetchError> {
        let base = self.config.api_base.trim_end_matches('/');
        let start = provider_time(window.start);
        let end = provider_time(window.end);

        let parsed = match endpoint(category) {
            Endpoint::Api(method) => {
                let start = start.format(API_TIME_FORMAT).to_string();
                let end = end.format(API_TIME_FORMAT).to_string();
                Url::parse_with_params(
                    &format!("{}/{}/{}.do", base, API_PATH, method),
                    &[
                        ("userName", self.config.user.as_str()),
                        ("apiPasswd", self.config.pass.as_str()),
                        ("channelIds", channel.as_str()),
                        ("startTime", start.as_str()),
                        ("endTime", end.as_str()),
                        ("timeZone", PROVIDER_TIME_ZONE),
                    ],
                )
            }
            Endpoint::Rest(method) => {
                let start = start.format(REST_DATE_FORMAT).to_string();
                let end = end.format(REST_DATE_FORMAT).to_string();
                Url::parse_with_params(
                    &format!("{}/{}/{}", base, REST_API_PATH, method),
                    &[
                        ("api_user", self.config.user.as_str()),
                        ("api_key", self.config.pass.as_str()),
                        ("start_time", start.as_str()),
                        ("end_time", end.as_str()),
                        ("channel_id", channel.as_str()),
                        ("timeZone", PROVIDER_TIME_ZONE),
                    ],
                )
            }
        };

        parsed.map_err(|e| FetchError::Transport(format!("invalid API base {:?}: {}", base, e)))
    }

    /// Single GET, returning the body of a 2xx response
    async fn request(&self, url: Url) -> Result<String, FetchError> {
        // reqwest errors carry the URL, which contains the credentials
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                body: excerpt(&body).to_string(),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl MetricSource for ChinaCacheClient {
    async fn fetch(
        &self,
        category: Category,
        channel: &ChannelId,
        window: &QueryWindow,
    ) -> Result<Payload, FetchError> {
        let url = self.build_url(category, channel, window)?;
        let started = Instant::now();

        debug!(
            channel = %channel,
            category = %category,
            path = url.path(),
            "Requesting ChinaCache statistics"
        );

        let body = self.request(url).await?;

        debug!(
            channel = %channel,
            category = %category,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ChinaCache response received"
        );

        decode_payload(category, &body)
    }

    fn name(&self) -> &str {
        "chinacache"
    }
}

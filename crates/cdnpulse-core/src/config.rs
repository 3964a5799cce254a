//! Runtime configuration
//!
//! Settings arrive as raw strings (CLI flags with environment fallbacks) and
//! are validated once at startup. Only missing required settings and an empty
//! channel list are fatal; malformed durations fall back to defaults.

use crate::error::ConfigError;
use crate::types::ChannelId;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Query window length used when none (or garbage) is configured
pub const DEFAULT_QUERY_MINUTES: u64 = 5;

/// Longest accepted query window, 31 days
pub const MAX_QUERY_MINUTES: u64 = 31 * 24 * 60;

pub const DEFAULT_API_BASE: &str = "https://portal-api.chinacache.com:444";

pub const DEFAULT_PUSH_JOB: &str = "ChinaCachePush";

/// Unvalidated settings as read from flags and environment
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    pub pushgateway: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub channel_ids: Option<String>,
    pub interval: Option<String>,
    pub query_time: Option<String>,
    pub translations: Option<PathBuf>,
    pub api_base: Option<String>,
    pub job: Option<String>,
    pub dry_run: bool,
}

/// API credentials; the password is never printed
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Pushgateway base URL; `None` only in dry-run mode
    pub gateway: Option<String>,
    pub job: String,
}

/// Validated application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub channels: Vec<ChannelId>,
    pub query_duration: Duration,
    /// `None` runs a single cycle
    pub interval: Option<Duration>,
    pub api_base: String,
    pub push: PushConfig,
    pub translations: Option<PathBuf>,
    pub dry_run: bool,
}

impl AppConfig {
    pub fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let present = |v: &Option<String>| v.as_deref().map_or(false, |s| !s.trim().is_empty());

        let mut missing = Vec::new();
        if !raw.dry_run && !present(&raw.pushgateway) {
            missing.push("PUSHGATEWAY");
        }
        if !present(&raw.user) {
            missing.push("CHINACACHE_USER");
        }
        if !present(&raw.pass) {
            missing.push("CHINACACHE_PASS");
        }
        if !present(&raw.channel_ids) {
            missing.push("CHINACACHE_CHANNEL_IDS");
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingSettings(missing));
        }

        let channels = parse_channel_list(raw.channel_ids.as_deref().unwrap_or_default())?;
        let query_duration = Duration::from_secs(
            parse_query_minutes(raw.query_time.as_deref())
                .checked_mul(60)
                .unwrap_or(DEFAULT_QUERY_MINUTES * 60),
        );
        let interval = parse_interval(raw.interval.as_deref());

        let api_base = raw
            .api_base
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            credentials: Credentials {
                user: raw.user.unwrap_or_default(),
                pass: raw.pass.unwrap_or_default(),
            },
            channels,
            query_duration,
            interval,
            api_base,
            push: PushConfig {
                gateway: raw
                    .pushgateway
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.trim_end_matches('/').to_string()),
                job: raw
                    .job
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_PUSH_JOB.to_string()),
            },
            translations: raw.translations,
            dry_run: raw.dry_run,
        })
    }

    pub fn is_one_shot(&self) -> bool {
        self.interval.is_none()
    }
}

/// Parse a comma-separated channel list.
///
/// Whitespace is removed, empty segments are dropped and duplicates keep
/// their first position.
pub fn parse_channel_list(raw: &str) -> Result<Vec<ChannelId>, ConfigError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let mut seen = HashSet::new();
    let mut channels = Vec::new();

    for id in compact.split(',').filter_map(ChannelId::new) {
        if seen.insert(id.clone()) {
            channels.push(id);
        } else {
            warn!(channel = %id, "Duplicate channel id ignored");
        }
    }

    if channels.is_empty() {
        return Err(ConfigError::EmptyChannelList);
    }
    Ok(channels)
}

/// Query duration in minutes, defaulting when absent, unparsable, zero or
/// longer than [`MAX_QUERY_MINUTES`]
pub fn parse_query_minutes(raw: Option<&str>) -> u64 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => DEFAULT_QUERY_MINUTES,
        Some(s) => match s.parse::<u64>() {
            Ok(0) => {
                warn!(value = s, default = DEFAULT_QUERY_MINUTES, "QUERYTIME must be positive, using default");
                DEFAULT_QUERY_MINUTES
            }
            Ok(minutes) if minutes > MAX_QUERY_MINUTES => {
                warn!(
                    value = s,
                    max = MAX_QUERY_MINUTES,
                    default = DEFAULT_QUERY_MINUTES,
                    "QUERYTIME too large, using default"
                );
                DEFAULT_QUERY_MINUTES
            }
            Ok(minutes) => minutes,
            Err(e) => {
                warn!(value = s, error = %e, default = DEFAULT_QUERY_MINUTES, "Couldn't parse QUERYTIME, using default");
                DEFAULT_QUERY_MINUTES
            }
        },
    }
}

/// Poll interval; absent, zero or unparsable means a single cycle
pub fn parse_interval(raw: Option<&str>) -> Option<Duration> {
    let s = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match humantime::parse_duration(s) {
        Ok(d) if d.is_zero() => None,
        Ok(d) => Some(d),
        Err(e) => {
            warn!(value = s, error = %e, "Couldn't parse interval, running once");
            None
        }
    }
}

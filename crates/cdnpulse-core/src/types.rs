//! Channel, category and query-window types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel identifier as configured for the ChinaCache account
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Create a channel identifier, rejecting empty or blank input
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Metric families fetched for every channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    HitRate,
    IspBreakdown,
    RegionBreakdown,
    StatusCodeBreakdown,
}

impl Category {
    /// All categories, in collection order
    pub const ALL: [Category; 4] = [
        Category::HitRate,
        Category::IspBreakdown,
        Category::RegionBreakdown,
        Category::StatusCodeBreakdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::HitRate => "hit_rate",
            Category::IspBreakdown => "isp",
            Category::RegionBreakdown => "region",
            Category::StatusCodeBreakdown => "status_codes",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time range requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QueryWindow {
    /// Window of `duration` ending at `end`, clamped to the earliest
    /// representable time
    pub fn ending_at(end: DateTime<Utc>, duration: std::time::Duration) -> Self {
        let start = Duration::from_std(duration)
            .ok()
            .and_then(|span| end.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    /// Window of `duration` ending now
    pub fn trailing(duration: std::time::Duration) -> Self {
        Self::ending_at(Utc::now(), duration)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

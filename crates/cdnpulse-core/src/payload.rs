//! Decoded provider payloads, one shape per category

use crate::types::Category;
use serde::{Deserialize, Serialize};

/// Hit/miss counters for a channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitRatePayload {
    pub hit: u64,
    pub miss: u64,
    pub hit_percent: f64,
    pub miss_percent: f64,
    pub code: i64,
}

/// One entry of an ISP or region breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    /// Provider label, usually in Chinese
    pub name: String,
    pub flux_ratio: f64,
    pub hit_count: u64,
    pub hit_ratio: f64,
}

impl BreakdownEntry {
    pub fn new(name: impl Into<String>, flux_ratio: f64) -> Self {
        Self {
            name: name.into(),
            flux_ratio,
            ..Default::default()
        }
    }
}

/// Traffic per carrier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IspPayload {
    pub total_flux: u64,
    /// Empty unless the window crosses the provider's daily boundary
    pub isps: Vec<BreakdownEntry>,
    pub code: i64,
}

/// Traffic per province (domestic) and state (overseas)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionPayload {
    pub total_flux: u64,
    pub provinces: Vec<BreakdownEntry>,
    pub states: Vec<BreakdownEntry>,
    pub code: i64,
}

/// Request distribution for one HTTP status code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCodeEntry {
    pub http_code: String,
    pub request_count: u64,
    /// Textual percentage such as `"12.5%"`
    pub request_percent: String,
    pub flux_percent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCodePayload {
    pub entries: Vec<StatusCodeEntry>,
    pub message: String,
    pub status: i64,
    pub success: bool,
}

/// Payload returned by a metric source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Payload {
    HitRate(HitRatePayload),
    Isp(IspPayload),
    Region(RegionPayload),
    StatusCodes(StatusCodePayload),
}

impl Payload {
    /// Category this payload answers
    pub fn category(&self) -> Category {
        match self {
            Payload::HitRate(_) => Category::HitRate,
            Payload::Isp(_) => Category::IspBreakdown,
            Payload::Region(_) => Category::RegionBreakdown,
            Payload::StatusCodes(_) => Category::StatusCodeBreakdown,
        }
    }
}

impl From<HitRatePayload> for Payload {
    fn from(p: HitRatePayload) -> Self {
        Payload::HitRate(p)
    }
}

impl From<IspPayload> for Payload {
    fn from(p: IspPayload) -> Self {
        Payload::Isp(p)
    }
}

impl From<RegionPayload> for Payload {
    fn from(p: RegionPayload) -> Self {
        Payload::Region(p)
    }
}

impl From<StatusCodePayload> for Payload {
    fn from(p: StatusCodePayload) -> Self {
        Payload::StatusCodes(p)
    }
}

//! ChinaCache JSON response shapes
//!
//! Lists are optional on the wire: the provider sends `null` or omits them
//! outside the daily rollup, and both decode as empty.

use cdnpulse_core::{
    BreakdownEntry, Category, FetchError, HitRatePayload, IspPayload, Payload, RegionPayload,
    StatusCodeEntry, StatusCodePayload,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Longest body excerpt carried in a decode error
const MAX_BODY_EXCERPT: usize = 256;

/// Response of `getHitRate.do`
#[derive(Debug, Deserialize)]
struct HitRateResponse {
    #[serde(rename = "Hit")]
    hit: u64,
    #[serde(rename = "Miss")]
    miss: u64,
    #[serde(rename = "HitPercent", default)]
    hit_percent: f64,
    #[serde(rename = "MissPercent", default)]
    miss_percent: f64,
    #[serde(default)]
    code: i64,
}

/// Response of `getIsp.do`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IspResponse {
    total_flux: u64,
    #[serde(default)]
    isps: Option<Vec<IspEntry>>,
    #[serde(default)]
    code: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IspEntry {
    isp: String,
    #[serde(default)]
    flux_ratio: f64,
    #[serde(default)]
    hit_count: u64,
    #[serde(default)]
    hit_ratio: f64,
}

/// Response of `getRegion.do`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegionResponse {
    total_flux: u64,
    #[serde(default)]
    provinces: Option<Vec<ProvinceEntry>>,
    #[serde(default)]
    states: Option<Vec<StateEntry>>,
    #[serde(default)]
    code: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvinceEntry {
    province_name: String,
    #[serde(default)]
    flux_ratio: f64,
    #[serde(default)]
    hit_count: u64,
    #[serde(default)]
    hit_ratio: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateEntry {
    state_or_region_name: String,
    #[serde(default)]
    flux_ratio: f64,
    #[serde(default)]
    hit_count: u64,
    #[serde(default)]
    hit_ratio: f64,
}

/// Response of the REST `http_code` endpoint
#[derive(Debug, Deserialize)]
struct StatusCodesResponse {
    #[serde(default)]
    data: Option<Vec<StatusCodeRow>>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    status: i64,
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct StatusCodeRow {
    http_code: String,
    #[serde(default)]
    request_count: u64,
    #[serde(default)]
    request_percent: String,
    #[serde(default)]
    flux_percent: String,
}

impl From<HitRateResponse> for HitRatePayload {
    fn from(r: HitRateResponse) -> Self {
        Self {
            hit: r.hit,
            miss: r.miss,
            hit_percent: r.hit_percent,
            miss_percent: r.miss_percent,
            code: r.code,
        }
    }
}

impl From<IspResponse> for IspPayload {
    fn from(r: IspResponse) -> Self {
        Self {
            total_flux: r.total_flux,
            isps: r
                .isps
                .unwrap_or_default()
                .into_iter()
                .map(|e| BreakdownEntry {
                    name: e.isp,
                    flux_ratio: e.flux_ratio,
                    hit_count: e.hit_count,
                    hit_ratio: e.hit_ratio,
                })
                .collect(),
            code: r.code,
        }
    }
}

impl From<RegionResponse> for RegionPayload {
    fn from(r: RegionResponse) -> Self {
        Self {
            total_flux: r.total_flux,
            provinces: r
                .provinces
                .unwrap_or_default()
                .into_iter()
                .map(|e| BreakdownEntry {
                    name: e.province_name,
                    flux_ratio: e.flux_ratio,
                    hit_count: e.hit_count,
                    hit_ratio: e.hit_ratio,
                })
                .collect(),
            states: r
                .states
                .unwrap_or_default()
                .into_iter()
                .map(|e| BreakdownEntry {
                    name: e.state_or_region_name,
                    flux_ratio: e.flux_ratio,
                    hit_count: e.hit_count,
                    hit_ratio: e.hit_ratio,
                })
                .collect(),
            code: r.code,
        }
    }
}

impl From<StatusCodesResponse> for StatusCodePayload {
    fn from(r: StatusCodesResponse) -> Self {
        Self {
            entries: r
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|row| StatusCodeEntry {
                    http_code: row.http_code,
                    request_count: row.request_count,
                    request_percent: row.request_percent,
                    flux_percent: row.flux_percent,
                })
                .collect(),
            message: r.msg.unwrap_or_default(),
            status: r.status,
            success: r.success,
        }
    }
}

/// Decode a response body for `category`
pub fn decode_payload(category: Category, body: &str) -> Result<Payload, FetchError> {
    match category {
        Category::HitRate => decode::<HitRateResponse>(body).map(|r| HitRatePayload::from(r).into()),
        Category::IspBreakdown => decode::<IspResponse>(body).map(|r| IspPayload::from(r).into()),
        Category::RegionBreakdown => {
            decode::<RegionResponse>(body).map(|r| RegionPayload::from(r).into())
        }
        Category::StatusCodeBreakdown => {
            decode::<StatusCodesResponse>(body).map(|r| StatusCodePayload::from(r).into())
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| {
        FetchError::Decode(format!("{} (body: {:?})", e, excerpt(body)))
    })
}

/// Leading part of `body`, cut on a char boundary
pub(crate) fn excerpt(body: &str) -> &str {
    if body.len() <= MAX_BODY_EXCERPT {
        return body;
    }
    let mut end = MAX_BODY_EXCERPT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hit_rate() {
        let body = r#"{"HitPercent":80.0,"Hit":120,"code":0,"MissPercent":20.0,"Miss":30}"#;
        match decode_payload(Category::HitRate, body).unwrap() {
            Payload::HitRate(p) => {
                assert_eq!(p.hit, 120);
                assert_eq!(p.miss, 30);
                assert_eq!(p.hit_percent, 80.0);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_decode_isp_with_null_list() {
        let body = r#"{"totalFlux":123456,"isps":null,"code":0}"#;
        match decode_payload(Category::IspBreakdown, body).unwrap() {
            Payload::Isp(p) => {
                assert_eq!(p.total_flux, 123456);
                assert!(p.isps.is_empty());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_decode_region_breakdown() {
        let body = r#"{
            "totalFlux": 5000,
            "provinces": [
                {"provinceName": "北京", "fluxRatio": 0.25, "hitCount": 10, "hitRatio": 0.9}
            ],
            "states": [
                {"stateOrRegionName": "日本", "fluxRatio": 0.05, "hitCount": 2, "hitRatio": 0.5}
            ],
            "code": 0
        }"#;
        match decode_payload(Category::RegionBreakdown, body).unwrap() {
            Payload::Region(p) => {
                assert_eq!(p.provinces.len(), 1);
                assert_eq!(p.provinces[0].name, "北京");
                assert_eq!(p.provinces[0].flux_ratio, 0.25);
                assert_eq!(p.states[0].name, "日本");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_decode_status_codes() {
        let body = r#"{
            "data": [
                {"flux_percent": "90%", "http_code": "200", "request_count": 900, "request_percent": "90%"},
                {"flux_percent": "10%", "http_code": "404", "request_count": 100, "request_percent": "10%"}
            ],
            "msg": "ok",
            "status": 0,
            "success": true
        }"#;
        match decode_payload(Category::StatusCodeBreakdown, body).unwrap() {
            Payload::StatusCodes(p) => {
                assert!(p.success);
                assert_eq!(p.entries.len(), 2);
                assert_eq!(p.entries[1].http_code, "404");
                assert_eq!(p.entries[1].request_percent, "10%");
                assert_eq!(p.message, "ok");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_decode_unsuccessful_status_codes_is_not_a_decode_error() {
        let body = r#"{"data":null,"msg":"auth failed","status":401,"success":false}"#;
        match decode_payload(Category::StatusCodeBreakdown, body).unwrap() {
            Payload::StatusCodes(p) => {
                assert!(!p.success);
                assert!(p.entries.is_empty());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(
            decode_payload(Category::HitRate, "<html>502 Bad Gateway</html>"),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            decode_payload(Category::IspBreakdown, r#"{"code":500}"#),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let body = "广".repeat(200);
        let cut = excerpt(&body);
        assert!(cut.len() <= MAX_BODY_EXCERPT);
        assert!(body.starts_with(cut));
    }
}

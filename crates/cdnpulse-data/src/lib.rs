//! cdnpulse data
//!
//! REST client for the ChinaCache statistics API.

pub mod chinacache_client;
pub mod wire;

pub use chinacache_client::{ChinaCacheClient, ChinaCacheConfig};
pub use wire::decode_payload;

//! cdnpulse core
//!
//! Core types, traits and errors shared by the collector, the ChinaCache
//! client and the sinks.

pub mod config;
pub mod error;
pub mod observation;
pub mod payload;
pub mod traits;
pub mod translation;
pub mod types;

// Re-export commonly used types
pub use config::*;
pub use error::*;
pub use observation::*;
pub use payload::*;
pub use traits::*;
pub use translation::*;
pub use types::*;

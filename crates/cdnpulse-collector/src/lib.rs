//! cdnpulse collector
//!
//! Concurrent collection engine: one task per channel, one task per category
//! within each channel, joined at two barriers into a single snapshot.

pub mod aggregator;
pub mod category;
pub mod emitter;
pub mod report;

#[cfg(test)]
mod testing;

pub use aggregator::ChannelAggregator;
pub use category::{parse_percentage, CategoryCollector};
pub use emitter::SnapshotEmitter;
pub use report::{CategoryReport, CollectionFailure, CollectionReport, CycleReport, FieldDiagnostic};

//! cdnpulse Observability
//!
//! Logging, self-metrics, and snapshot sinks.

pub mod log_sink;
pub mod logging;
pub mod metrics;
pub mod pushgateway;

pub use log_sink::LogSink;
pub use logging::{init_logging, LogFormat};
pub use metrics::{gather_metrics, record_cycle, register_metrics, self_metric_families};
pub use pushgateway::{encode_snapshot, PushGatewaySink};

//! Tower middleware for the call pipeline.
//!
//! - [`metrics`]: per-call tracing span, outcome log line, and `metrics` counters

pub mod metrics;

pub use self::metrics::{MetricsLayer, MetricsService, UNKNOWN_OPERATION};

//! Monitoring Module
//!
//! Provides observability for the relay:
//! - Prometheus-style relay metrics
//! - Structured logging setup

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use metrics::{Counter, Gauge, Histogram, MetricsSnapshot, RelayMetrics};

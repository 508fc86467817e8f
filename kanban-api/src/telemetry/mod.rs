//! Kanban Telemetry - Structured Logging
//!
//! Subscriber setup and the per-request span middleware.

pub mod middleware;
pub mod tracer;

pub use middleware::observability_middleware;
pub use tracer::{init_tracer, LogFormat, TelemetryConfig};

//! Middleware stack for the gateway.
//!
//! Layer order: Request → Tracing → RateLimit → Timeout → BodyLimit → Handler

pub mod metrics;
pub mod rate_limit;
pub mod timeout;
pub mod tracing;

pub use metrics::{GatewayMetrics, RequestTimer};
pub use rate_limit::{EndpointClass, RateLimitLayer, RateLimitState};
pub use timeout::TimeoutLayer;
pub use tracing::TracingLayer;

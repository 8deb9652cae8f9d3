//! Bootstrap Gateway - HTTP surface for shared-secret admin registration.
//!
//! Serves the two bootstrap endpoints on top of [`bootstrap_core`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     BOOTSTRAP GATEWAY                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  GET  /_synapse/admin/v1/register/nonce   → issue nonce       │
//! │  POST /_synapse/admin/v1/register         → verify + create   │
//! │  GET  /health, /metrics                                       │
//! │                                                               │
//! │  Tracing → RateLimit → Timeout → BodyLimit → Handler          │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │
//!                  AdminRegistrationApi (core)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use bootstrap_gateway::{BootstrapGateway, GatewayConfig};
//!
//! let config = GatewayConfig::load(Some(path))?;
//! BootstrapGateway::new(config)?.start(shutdown_signal).await?;
//! ```
//!
//! # Security
//!
//! - Registration is off unless a shared secret is configured
//! - Every verification failure yields the same status and body
//! - Per-IP token buckets on both endpoints
//! - Request body size and handler time limits

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod middleware;
pub mod routes;
pub mod service;

pub use domain::config::{ConfigError, GatewayConfig};
pub use domain::error::{ApiError, ApiResult, GatewayError};
pub use middleware::GatewayMetrics;
pub use routes::{build_router, AppState};
pub use service::BootstrapGateway;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

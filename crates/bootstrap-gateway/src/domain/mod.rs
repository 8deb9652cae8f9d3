//! Configuration and error types for the gateway.

pub mod config;
pub mod error;

pub use config::{
    ConfigError, GatewayConfig, HttpConfig, LimitsConfig, RateLimitConfig, RegistrationConfig,
    TimeoutConfig,
};
pub use error::{ApiError, ApiResult, GatewayError};

//! Gateway error types with Matrix-style error codes.
//!
//! Every error body has the shape `{"errcode": "...", "error": "..."}`.

use std::fmt;

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bootstrap_core::wire::ErrorResponse;
use bootstrap_core::{AccountError, ConfigurationError, NonceCapacityExceeded, RegistrationError};

use super::config::ConfigError;

/// Matrix error codes used by the gateway
pub mod codes {
    pub const FORBIDDEN: &str = "M_FORBIDDEN";
    pub const BAD_JSON: &str = "M_BAD_JSON";
    pub const NOT_JSON: &str = "M_NOT_JSON";
    pub const INVALID_PARAM: &str = "M_INVALID_PARAM";
    pub const USER_IN_USE: &str = "M_USER_IN_USE";
    pub const LIMIT_EXCEEDED: &str = "M_LIMIT_EXCEEDED";
    pub const TOO_LARGE: &str = "M_TOO_LARGE";
    pub const NOT_FOUND: &str = "M_NOT_FOUND";
    pub const UNKNOWN: &str = "M_UNKNOWN";
}

/// Message of the generic denial. Identical for every rejection cause.
pub const DENIAL_MESSAGE: &str = "Registration denied";

/// Message returned while bootstrap registration is switched off.
pub const DISABLED_MESSAGE: &str = "Admin registration is not enabled";

/// HTTP-facing error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub errcode: &'static str,
    pub message: String,
    pub retry_after_ms: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, errcode: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            errcode,
            message: message.into(),
            retry_after_ms: None,
        }
    }

    /// The single authentication failure, with the configured status.
    pub fn registration_denied(status: StatusCode) -> Self {
        Self::new(status, codes::FORBIDDEN, DENIAL_MESSAGE)
    }

    pub fn registration_disabled() -> Self {
        Self::new(StatusCode::FORBIDDEN, codes::FORBIDDEN, DISABLED_MESSAGE)
    }

    pub fn bad_json(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_JSON, details)
    }

    pub fn not_json(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::NOT_JSON, details)
    }

    pub fn invalid_param(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::INVALID_PARAM, details)
    }

    pub fn user_in_use() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::USER_IN_USE,
            "User ID already taken",
        )
    }

    pub fn too_large() -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            codes::TOO_LARGE,
            "Request body too large",
        )
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, "Unrecognized request")
    }

    /// Nonce table full; the caller should retry after outstanding nonces expire.
    pub fn nonces_exhausted() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::LIMIT_EXCEEDED,
            "Too many outstanding nonces",
        )
    }

    pub fn timeout() -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            codes::UNKNOWN,
            "Request timed out",
        )
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, codes::UNKNOWN, details)
    }

    /// Rate limited
    pub fn rate_limited(retry_after_ms: u64) -> Self {
        Self {
            retry_after_ms: Some(retry_after_ms),
            ..Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                codes::LIMIT_EXCEEDED,
                "Too many requests",
            )
        }
    }

    /// Map a registration failure, giving denials the configured status.
    pub fn from_registration(err: RegistrationError, denial_status: StatusCode) -> Self {
        match err {
            RegistrationError::Denied(_) => Self::registration_denied(denial_status),
            RegistrationError::Invalid(invalid) => Self::invalid_param(invalid.to_string()),
            RegistrationError::Account(AccountError::UserInUse(_)) => Self::user_in_use(),
            RegistrationError::Account(AccountError::Unavailable(_)) => {
                Self::internal("Account creation failed")
            }
        }
    }

    pub fn body(&self) -> ErrorResponse {
        ErrorResponse {
            errcode: self.errcode.to_string(),
            error: self.message.clone(),
            retry_after_ms: self.retry_after_ms,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] {}", self.status.as_u16(), self.errcode, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body())).into_response();
        if let Some(ms) = self.retry_after_ms {
            let secs = ms.div_ceil(1000).max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::not_json("Content-Type must be application/json")
            }
            JsonRejection::JsonSyntaxError(e) => ApiError::not_json(e.body_text()),
            JsonRejection::JsonDataError(e) => ApiError::bad_json(e.body_text()),
            other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => ApiError::too_large(),
            other => ApiError::bad_json(other.body_text()),
        }
    }
}

impl From<NonceCapacityExceeded> for ApiError {
    fn from(_: NonceCapacityExceeded) -> Self {
        ApiError::nonces_exhausted()
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway-level errors (startup and serving)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Registration core could not be built
    #[error("registration setup failed: {0}")]
    Registration(#[from] ConfigurationError),

    /// Server socket bind error
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Server loop failed
    #[error("server error: {0}")]
    Server(#[source] std::io::Error),
}

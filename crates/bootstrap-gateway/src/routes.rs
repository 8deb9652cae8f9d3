//! HTTP handlers and router assembly.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bootstrap_core::wire::{NonceResponse, RegisterRequest, RegisterResponse, NONCE_PATH, REGISTER_PATH};
use bootstrap_core::AdminRegistrationApi;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::debug;

use crate::domain::config::GatewayConfig;
use crate::domain::error::{ApiError, ApiResult};
use crate::middleware::{GatewayMetrics, RateLimitLayer, RateLimitState, TimeoutLayer, TracingLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// `None` while bootstrap registration is disabled
    pub registration: Option<Arc<dyn AdminRegistrationApi>>,
    pub denial_status: StatusCode,
    pub metrics: Arc<GatewayMetrics>,
    pub rate_limit: Arc<RateLimitState>,
    pub started_at: Instant,
}

impl AppState {
    fn registration(&self) -> ApiResult<&Arc<dyn AdminRegistrationApi>> {
        self.registration
            .as_ref()
            .ok_or_else(ApiError::registration_disabled)
    }
}

/// Build the full router with its middleware stack.
pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TracingLayer::new(Arc::clone(&state.metrics)))
        .layer(RateLimitLayer::new(
            Arc::clone(&state.rate_limit),
            Arc::clone(&state.metrics),
        ))
        .layer(TimeoutLayer::new(
            config.timeouts.request,
            Arc::clone(&state.metrics),
        ));

    Router::new()
        .route(NONCE_PATH, get(issue_nonce))
        .route(REGISTER_PATH, post(register))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(config.limits.max_request_size))
        .layer(middleware)
        .with_state(state)
}

async fn issue_nonce(State(state): State<AppState>) -> ApiResult<Json<NonceResponse>> {
    let token = state.registration()?.issue_nonce()?;
    debug!(nonce = %token.short(), "Nonce handed out");
    Ok(Json(NonceResponse {
        nonce: token.into_inner(),
    }))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterResponse>> {
    // Disabled takes precedence over a malformed body.
    let api = state.registration()?;
    let Json(request) = payload?;

    api.register(request.into())
        .await
        .map(Json)
        .map_err(|err| ApiError::from_registration(err, state.denial_status))
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "bootstrap-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "registration_enabled": state.registration.is_some(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let mut body = state.metrics.to_json();
    body["rate_limiting"]["buckets"] = state.rate_limit.bucket_count().into();
    body["registration"] = match &state.registration {
        Some(api) => serde_json::to_value(api.snapshot()).unwrap_or_default(),
        None => serde_json::Value::Null,
    };
    Json(body)
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

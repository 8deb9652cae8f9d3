//! Gateway service: builds the registration core from config and serves it over HTTP.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::Router;
use bootstrap_core::{
    AdminRegistrationApi, AdminRegistrationService, Clock, InMemoryAccountRegistrar, NonceStore,
    SystemClock,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::middleware::{rate_limit, GatewayMetrics, RateLimitState};
use crate::routes::{build_router, AppState};

/// Bootstrap gateway service state
pub struct BootstrapGateway {
    config: GatewayConfig,
    registration: Option<Arc<dyn AdminRegistrationApi>>,
    metrics: Arc<GatewayMetrics>,
    rate_limit: Arc<RateLimitState>,
    started_at: Instant,
}

impl BootstrapGateway {
    /// Create a gateway on the system clock
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a gateway whose nonce expiry follows `clock`
    pub fn with_clock(config: GatewayConfig, clock: Arc<dyn Clock>) -> Result<Self, GatewayError> {
        config.validate()?;

        let registration: Option<Arc<dyn AdminRegistrationApi>> = if config.registration.enabled {
            let reg = &config.registration;
            let secret = reg.shared_secret()?;
            let nonces = NonceStore::with_clock(reg.nonce_ttl, clock)?
                .with_capacity(reg.max_outstanding_nonces);
            let registrar = InMemoryAccountRegistrar::new(reg.server_name.clone(), reg.token_lifetime);
            info!(
                server_name = %reg.server_name,
                nonce_ttl_ms = reg.nonce_ttl.as_millis() as u64,
                "Admin bootstrap registration enabled"
            );
            let api: Arc<dyn AdminRegistrationApi> = Arc::new(AdminRegistrationService::new(
                Arc::new(nonces),
                secret,
                Arc::new(registrar),
            ));
            Some(api)
        } else {
            warn!("Admin bootstrap registration is disabled; endpoints will answer 403");
            None
        };

        Ok(Self {
            rate_limit: Arc::new(RateLimitState::new(config.rate_limit.clone())),
            metrics: Arc::new(GatewayMetrics::new()),
            started_at: Instant::now(),
            registration,
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn registration(&self) -> Option<Arc<dyn AdminRegistrationApi>> {
        self.registration.clone()
    }

    /// Router with all routes and middleware attached
    pub fn router(&self) -> Router {
        let state = AppState {
            registration: self.registration.clone(),
            denial_status: StatusCode::from_u16(self.config.registration.denial_status)
                .unwrap_or(StatusCode::FORBIDDEN),
            metrics: Arc::clone(&self.metrics),
            rate_limit: Arc::clone(&self.rate_limit),
            started_at: self.started_at,
        };
        build_router(&self.config, state)
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn start<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr().map_err(GatewayError::Server)?;
        let router = self.router();
        let tasks = self.start_cleanup_tasks();

        info!(addr = %local_addr, "Starting bootstrap gateway");
        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        for task in tasks {
            task.abort();
        }
        info!("Bootstrap gateway stopped");
        result.map_err(GatewayError::Server)
    }

    /// Start background cleanup tasks
    fn start_cleanup_tasks(&self) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::with_capacity(2);

        if let Some(api) = self.registration.clone() {
            let interval = self.config.registration.sweep_interval;
            tasks.push(tokio::spawn(nonce_sweep_task(api, interval)));
        }

        if self.config.rate_limit.enabled {
            let state = Arc::clone(&self.rate_limit);
            let interval = (self.config.rate_limit.bucket_idle_timeout / 2).max(Duration::from_secs(1));
            tasks.push(tokio::spawn(rate_limit::cleanup_task(state, interval)));
        }

        tasks
    }
}

/// Periodically purge expired nonces
pub async fn nonce_sweep_task(api: Arc<dyn AdminRegistrationApi>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let removed = api.sweep_expired();
        if removed > 0 {
            tracing::debug!(removed, "Nonce sweep");
        }
    }
}

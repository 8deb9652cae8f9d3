//! Per-IP rate limiting of the bootstrap endpoints using token buckets.
//!
//! The nonce and register endpoints draw from separate buckets. Other paths are not
//! limited.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    response::{IntoResponse, Response},
};
use bootstrap_core::wire::{NONCE_PATH, REGISTER_PATH};
use dashmap::DashMap;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::metrics::GatewayMetrics;
use crate::domain::config::RateLimitConfig;
use crate::domain::error::ApiError;

/// Which bucket a request draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    Nonce,
    Register,
}

impl EndpointClass {
    pub fn for_path(path: &str) -> Option<Self> {
        match path {
            NONCE_PATH => Some(Self::Nonce),
            REGISTER_PATH => Some(Self::Register),
            _ => None,
        }
    }
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Token bucket entry for an IP address
struct TokenBucket {
    nonce_limiter: DirectLimiter,
    register_limiter: DirectLimiter,
    /// Last access time (for cleanup)
    last_access: Instant,
}

fn per_minute_quota(rate: u32, burst: Option<u32>) -> Quota {
    let rate = NonZeroU32::new(rate).unwrap_or(NonZeroU32::MIN);
    let burst = burst.and_then(NonZeroU32::new).unwrap_or(rate);
    Quota::per_minute(rate).allow_burst(burst)
}

impl TokenBucket {
    fn new(config: &RateLimitConfig) -> Self {
        Self {
            nonce_limiter: RateLimiter::direct(per_minute_quota(
                config.nonce_per_minute,
                config.burst_size,
            )),
            register_limiter: RateLimiter::direct(per_minute_quota(
                config.register_per_minute,
                config.burst_size,
            )),
            last_access: Instant::now(),
        }
    }

    fn check(&mut self, class: EndpointClass) -> Result<(), Duration> {
        self.last_access = Instant::now();
        let limiter = match class {
            EndpointClass::Nonce => &self.nonce_limiter,
            EndpointClass::Register => &self.register_limiter,
        };
        limiter.check().map_err(|not_until| {
            not_until.wait_time_from(governor::clock::Clock::now(&DefaultClock::default()))
        })
    }
}

/// Rate limiter state shared across requests
pub struct RateLimitState {
    /// Per-IP token buckets
    buckets: DashMap<IpAddr, TokenBucket>,
    config: RateLimitConfig,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
        }
    }

    /// Check if request should be allowed
    pub fn check(&self, ip: IpAddr, class: EndpointClass) -> Result<(), Duration> {
        if !self.config.enabled || self.config.whitelist.contains(&ip) {
            return Ok(());
        }

        let mut bucket = self.buckets.entry(ip).or_insert_with(|| {
            debug!(ip = %ip, "Creating new rate limit bucket");
            TokenBucket::new(&self.config)
        });
        bucket.check(class)
    }

    /// Drop buckets idle for longer than the configured timeout
    pub fn cleanup(&self) {
        self.cleanup_older_than(self.config.bucket_idle_timeout);
    }

    pub fn cleanup_older_than(&self, max_age: Duration) {
        let now = Instant::now();
        self.buckets.retain(|ip, bucket| {
            let age = now.duration_since(bucket.last_access);
            if age > max_age {
                debug!(ip = %ip, age_secs = age.as_secs(), "Removing stale rate limit bucket");
                false
            } else {
                true
            }
        });
    }

    /// Get number of tracked IPs
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn trust_forwarded_for(&self) -> bool {
        self.config.trust_forwarded_for
    }
}

/// Rate limit layer
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RateLimitState>,
    metrics: Arc<GatewayMetrics>,
}

impl RateLimitLayer {
    pub fn new(state: Arc<RateLimitState>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { state, metrics }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: Arc::clone(&self.state),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Rate limit service
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<RateLimitState>,
    metrics: Arc<GatewayMetrics>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = Arc::clone(&self.state);
        let metrics = Arc::clone(&self.metrics);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(class) = EndpointClass::for_path(req.uri().path()) else {
                return inner.call(req).await;
            };

            let ip = extract_client_ip(&req, state.trust_forwarded_for());
            match state.check(ip, class) {
                Ok(()) => inner.call(req).await,
                Err(retry_after) => {
                    let retry_ms = retry_after.as_millis() as u64;
                    warn!(
                        ip = %ip,
                        retry_after_ms = retry_ms,
                        endpoint = ?class,
                        "Rate limit exceeded"
                    );
                    metrics.record_rate_limit_rejection();
                    Ok(ApiError::rate_limited(retry_ms).into_response())
                }
            }
        })
    }
}

/// Extract the client IP used as the bucket key.
///
/// Forwarding headers are only honored when the gateway sits behind a trusted proxy.
pub fn extract_client_ip<B>(req: &Request<B>, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        // Take the first IP (original client)
        if let Some(ip) = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok())
        {
            return ip;
        }

        if let Some(ip) = req
            .headers()
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
        {
            return ip;
        }
    }

    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip();
    }

    // Unknown peers share one non-whitelisted bucket
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

/// Background task to clean up stale rate limit buckets
pub async fn cleanup_task(state: Arc<RateLimitState>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        state.cleanup();
    }
}

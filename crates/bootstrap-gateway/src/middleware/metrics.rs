//! Request-level gateway metrics, exported as JSON on `/metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Gateway metrics
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    // Request counters
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub requests_client_error: AtomicU64,
    pub requests_server_error: AtomicU64,

    // Rate limit counters
    pub rate_limit_rejected: AtomicU64,

    pub timeouts: AtomicU64,

    // Latency tracking (simplified - no histograms)
    pub total_latency_ms: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed request by status code
    pub fn record_request(&self, status: u16, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        match status {
            500..=599 => self.requests_server_error.fetch_add(1, Ordering::Relaxed),
            400..=499 => self.requests_client_error.fetch_add(1, Ordering::Relaxed),
            _ => self.requests_success.fetch_add(1, Ordering::Relaxed),
        };
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_rate_limit_rejection(&self) {
        self.rate_limit_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.requests_total.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "success": self.requests_success.load(Ordering::Relaxed),
                "client_error": self.requests_client_error.load(Ordering::Relaxed),
                "server_error": self.requests_server_error.load(Ordering::Relaxed),
                "timeouts": self.timeouts.load(Ordering::Relaxed),
            },
            "rate_limiting": {
                "rejected": self.rate_limit_rejected.load(Ordering::Relaxed),
            },
            "latency": {
                "average_ms": self.average_latency_ms(),
            }
        })
    }
}

/// Request timing helper
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<GatewayMetrics>,
}

impl RequestTimer {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn finish(self, status: u16) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.metrics.record_request(status, latency_ms);
    }
}

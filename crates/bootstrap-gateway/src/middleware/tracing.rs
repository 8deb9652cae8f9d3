//! Request tracing middleware.
//!
//! Opens an `api_request` span per request, links W3C `traceparent` context when the
//! caller sends one, and feeds [`GatewayMetrics`] on completion.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{body::Body, http::Request, response::Response};
use tower::{Layer, Service};
use tracing::{info_span, Instrument, Span};

use super::metrics::{GatewayMetrics, RequestTimer};

/// Tracing layer that creates spans for each request
#[derive(Clone)]
pub struct TracingLayer {
    metrics: Arc<GatewayMetrics>,
}

impl TracingLayer {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService {
            inner,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Tracing service
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
    metrics: Arc<GatewayMetrics>,
}

impl<S> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let timer = RequestTimer::new(Arc::clone(&self.metrics));

        let span = info_span!(
            "api_request",
            http.method = %req.method(),
            http.target = %req.uri().path(),
            http.status_code = tracing::field::Empty,
        );

        if let Some(parent) = extract_trace_context(&req) {
            span.follows_from(parent);
        }

        Box::pin(
            async move {
                let result = inner.call(req).await;

                if let Ok(response) = &result {
                    let status = response.status().as_u16();
                    Span::current().record("http.status_code", status);
                    timer.finish(status);
                }

                result
            }
            .instrument(span),
        )
    }
}

/// Extract trace context from request headers (W3C Trace Context)
fn extract_trace_context<B>(req: &Request<B>) -> Option<Span> {
    let traceparent = req.headers().get("traceparent")?.to_str().ok()?;

    // version-trace_id-parent_id-trace_flags
    let parts: Vec<&str> = traceparent.split('-').collect();
    if parts.len() != 4 {
        return None;
    }

    Some(info_span!(
        "parent_trace",
        trace_id = parts[1],
        parent_span_id = parts[2]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traceparent_parsing() {
        let req = Request::builder()
            .header(
                "traceparent",
                "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01",
            )
            .body(Body::empty())
            .unwrap();

        assert!(extract_trace_context(&req).is_some());
    }

    #[test]
    fn test_invalid_traceparent() {
        let req = Request::builder()
            .header("traceparent", "invalid")
            .body(Body::empty())
            .unwrap();

        assert!(extract_trace_context(&req).is_none());
    }

    #[test]
    fn test_no_traceparent() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert!(extract_trace_context(&req).is_none());
    }
}

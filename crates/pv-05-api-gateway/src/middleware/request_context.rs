//! Per-request span, correlation id and HTTP metrics.

use crate::domain::{CorrelationId, REQUEST_ID_HEADER};
use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use provenance_telemetry::{HTTP_REQUESTS, HTTP_REQUEST_DURATION};
use std::time::Instant;
use tracing::{field, info, info_span, warn, Instrument};

/// Wrap the request in an `api_request` span and echo `x-request-id`.
pub async fn request_context(req: Request, next: Next) -> Response {
    let id = CorrelationId::from_inbound(
        req.headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    );
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let span = info_span!(
        "api_request",
        request_id = %id,
        method = %method,
        path = %req.uri().path(),
        status = field::Empty,
    );

    async move {
        let started = Instant::now();
        let mut response = next.run(req).await;
        let elapsed = started.elapsed();
        let status = response.status();

        tracing::Span::current().record("status", status.as_u16());
        HTTP_REQUESTS
            .with_label_values(&[method.as_str(), route.as_str(), status.as_str()])
            .inc();
        HTTP_REQUEST_DURATION.observe(elapsed.as_secs_f64());

        if status.is_server_error() {
            warn!(latency_ms = elapsed.as_millis() as u64, "Request failed");
        } else {
            info!(latency_ms = elapsed.as_millis() as u64, "Request handled");
        }

        if let Ok(value) = HeaderValue::from_str(id.as_str()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

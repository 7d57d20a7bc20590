//! Per-route request counters and latency

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use newsrag_common::metrics::RequestMetrics;

/// Records `newsrag_requests_total` and `newsrag_request_duration_seconds`,
/// labelled by the route template rather than the raw path.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let timer = RequestMetrics::start(request.method().as_str(), &endpoint);
    let response = next.run(request).await;
    timer.finish(response.status().as_u16());

    response
}

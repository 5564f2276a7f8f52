//! Request metrics middleware

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use cpsu_common::metrics::RequestMetrics;

/// Count and time every request, labelled by route template rather than the
/// raw path so ids do not explode label cardinality
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = request.method().to_string();

    let timer = RequestMetrics::start(&method, &endpoint);
    let response = next.run(request).await;
    timer.finish(response.status().as_u16());

    response
}

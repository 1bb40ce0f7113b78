use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Log method, path, status and latency of every request at `info`
pub async fn request_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

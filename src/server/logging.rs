use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

const LOG_TARGET: &str = "cup_picks::server::http";

/// Middleware that logs incoming HTTP requests and their responses inside a
/// per-request span.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let query = request.uri().query().unwrap_or("").to_owned();
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("request", %request_id);

    async move {
        if query.is_empty() {
            tracing::info!(target: LOG_TARGET, %method, %path, "incoming request");
        } else {
            tracing::info!(target: LOG_TARGET, %method, %path, %query, "incoming request");
        }

        let start = Instant::now();
        let response = next.run(request).await;
        let status = response.status();

        if status.is_server_error() {
            tracing::error!(
                target: LOG_TARGET,
                %method,
                %path,
                status = %status.as_u16(),
                duration_ms = %start.elapsed().as_millis(),
                "request failed"
            );
        } else {
            tracing::info!(
                target: LOG_TARGET,
                %method,
                %path,
                status = %status.as_u16(),
                duration_ms = %start.elapsed().as_millis(),
                "request completed"
            );
        }

        response
    }
    .instrument(span)
    .await
}

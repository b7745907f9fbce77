//! Audit logging middleware.
//!
//! Logs every authenticated API request with user id, role, method,
//! path and response status. Runs innermost (after auth has injected
//! `AuthContext`).

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::AuthContext;

/// Log API access for the audit trail.
pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let caller = req
        .extensions()
        .get::<AuthContext>()
        .map(|a| (a.user.id, a.user.role));

    let started = Instant::now();
    let response = next.run(req).await;
    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match caller {
        Some((user_id, role)) => tracing::info!(
            %user_id,
            %role,
            %method,
            %path,
            status,
            elapsed_ms,
            "API access"
        ),
        None => tracing::info!(%method, %path, status, elapsed_ms, "API access (anonymous)"),
    }

    response
}

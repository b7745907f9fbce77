//! Portal API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Trace layer → 2. Auth validator (protected routes) → 3. Audit logger

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Room for multipart boundaries and the description field on top of
/// the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the portal API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn portal_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Build router from a pre-constructed `ApiContext`.
///
/// Used by tests that need the shared session store.
#[cfg(test)]
pub(crate) fn portal_router_with_ctx(ctx: ApiContext) -> Router {
    build_router(ctx)
}

fn build_router(ctx: ApiContext) -> Router {
    let upload_limit = ctx.core.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    // Protected routes: require a login session.
    //
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Auth → Audit (innermost) → Handler
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/me", get(endpoints::auth::me))
        .route("/dashboard", get(endpoints::dashboard::get))
        // Patient
        .route("/patient/profile", put(endpoints::profiles::update_patient))
        .route("/patient/permissions", put(endpoints::profiles::set_permissions))
        .route("/insurers", get(endpoints::profiles::insurers))
        .route("/doctors/search", get(endpoints::doctors::search))
        .route("/doctors/:id/slots", get(endpoints::doctors::slots))
        .route(
            "/doctors/:id/reviews",
            get(endpoints::doctors::reviews).post(endpoints::doctors::create_review),
        )
        .route("/appointments", post(endpoints::appointments::book))
        .route("/appointments/:id/pay", post(endpoints::appointments::pay))
        .route("/appointments/:id/claim", post(endpoints::appointments::claim))
        // Doctor
        .route("/doctor/profile", put(endpoints::profiles::update_doctor))
        .route("/doctor/availability", put(endpoints::profiles::set_availability))
        .route("/appointments/:id/confirm", post(endpoints::appointments::confirm))
        .route("/appointments/:id/cancel", post(endpoints::appointments::cancel))
        .route("/appointments/:id/complete", post(endpoints::appointments::complete))
        .route("/appointments/:id/bill", put(endpoints::appointments::bill))
        .route(
            "/appointments/:id/mark-paid",
            post(endpoints::appointments::mark_paid),
        )
        .route(
            "/patients/:id/records",
            get(endpoints::records::chart).post(endpoints::records::add),
        )
        .route(
            "/patients/:id/files",
            post(endpoints::files::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Insurance
        .route("/insurance/profile", put(endpoints::profiles::update_insurance))
        .route("/claims/:id/:decision", post(endpoints::claims::decide))
        // Patient or doctor
        .route("/files/:id", get(endpoints::files::download))
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes (no session required)
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/register", post(endpoints::auth::register))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::audit::log_access));

    Router::new()
        .nest("/api", protected.merge(unprotected))
        .layer(TraceLayer::new_for_http())
}

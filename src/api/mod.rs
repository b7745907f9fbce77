//! JSON HTTP API.
//!
//! Exposes the portal operations as HTTP endpoints. Routes are nested
//! under `/api/`; protected routes pass through Auth → Audit before the
//! handler.
//!
//! The router is composable: `portal_router()` returns a `Router` that
//! can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::portal_router;
pub use server::{serve, start_server, PortalServer, ServerSession};
pub use types::ApiContext;

//! Request extractors whose rejections surface as `ApiError`.
//!
//! axum's own `Json` and `Query` reject with plain-text 4xx bodies; these
//! wrappers keep malformed input on the `{"error":{...}}` envelope.

use axum::extract::{FromRequest, FromRequestParts};

use crate::api::error::ApiError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

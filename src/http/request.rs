//! Request identification.
//!
//! The `x-request-id` header is stamped by tower-http's `SetRequestIdLayer`
//! (see `server.rs`); this module only reads it back for log lines and the
//! outbound call.

use axum::http::{HeaderMap, HeaderName};

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Read the request ID from `headers`, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

//! Per-request dispatch.
//!
//! # Flow
//! ```text
//! read body ──err──▶ fault envelope
//!     → decode ──err──▶ 403, empty body
//!     → validate ──err──▶ 403, empty body
//!     → enroll? comment policy ──mismatch──▶ fault envelope
//!     → registry lookup ──miss──▶ fault envelope
//!     → forward (headers cloned) ──err / no headers by deadline──▶ fault envelope
//!     → mirror status + headers, stream body back until the same deadline
//! ```
//!
//! Nothing is retried. Dropping the handler future (caller disconnected)
//! drops the in-flight backend call with it.

use std::error::Error as StdError;
use std::io;
use std::time::Instant;

use futures_util::StreamExt;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::request::{request_id, X_REQUEST_ID};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::protocol;

/// Main proxy handler.
pub async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();

    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            metrics::record_request("body_error", start);
            return fault(&error_chain(&e));
        }
    };

    let envelope = match protocol::decode(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Rejecting malformed envelope");
            metrics::record_request("malformed", start);
            return StatusCode::FORBIDDEN.into_response();
        }
    };

    if let Err(e) = envelope.validate() {
        tracing::debug!(request_id = %request_id, error = %e, "Rejecting incomplete envelope");
        metrics::record_request("invalid", start);
        return StatusCode::FORBIDDEN.into_response();
    }

    tracing::debug!(
        request_id = %request_id,
        alias = %envelope.alias,
        operation = %envelope.name,
        version = %envelope.version,
        "Dispatching call"
    );

    if envelope.is_enroll() {
        if let Err(message) = state.comment_policy.check(&envelope.params.comment) {
            tracing::info!(
                request_id = %request_id,
                alias = %envelope.alias,
                comment = %envelope.params.comment.trim(),
                "Commit comment rejected"
            );
            metrics::record_request("comment_rejected", start);
            return fault(&message);
        }
    }

    let endpoint = match state.registry.get(&envelope.version) {
        Ok(endpoint) => endpoint,
        Err(_) => {
            tracing::warn!(request_id = %request_id, version = %envelope.version, "No backend for version");
            metrics::record_request("unknown_version", start);
            return fault(&format!(
                "There is no {} version of repository server installed on the server.",
                envelope.version
            ));
        }
    };

    let uri = match state.upstream.forward_uri(&endpoint, parts.uri.path_and_query()) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, endpoint = %endpoint, error = %e, "Cannot build backend URI");
            metrics::record_request("upstream_error", start);
            return fault(&e.to_string());
        }
    };

    let mut outbound = Request::builder().method(parts.method).uri(uri);
    if let Some(headers) = outbound.headers_mut() {
        clone_headers(&parts.headers, headers);
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert(X_REQUEST_ID, value);
        }
    }
    let outbound = match outbound.body(Body::from(body)) {
        Ok(req) => req,
        Err(e) => {
            metrics::record_request("upstream_error", start);
            return fault(&e.to_string());
        }
    };

    tracing::debug!(request_id = %request_id, backend = %endpoint, "Forwarding call");

    let deadline = tokio::time::Instant::now() + state.upstream_timeout;
    match tokio::time::timeout_at(deadline, state.client.request(outbound)).await {
        Ok(Ok(response)) => {
            metrics::record_request("forwarded", start);
            tracing::debug!(request_id = %request_id, status = %response.status(), "Backend responded");
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, body_until(Body::new(body), deadline, &request_id))
        }
        Ok(Err(e)) => {
            tracing::error!(request_id = %request_id, backend = %endpoint, error = %error_chain(&e), "Upstream error");
            metrics::record_request("upstream_error", start);
            fault(&error_chain(&e))
        }
        Err(_) => {
            tracing::error!(
                request_id = %request_id,
                backend = %endpoint,
                timeout_secs = state.upstream_timeout.as_secs(),
                "Upstream timeout"
            );
            metrics::record_request("upstream_timeout", start);
            fault(&format!(
                "Repository server {} did not respond within {} seconds.",
                endpoint,
                state.upstream_timeout.as_secs()
            ))
        }
    }
}

/// Stream `body` until `deadline`, then fail it.
///
/// The status line is already sent by then, so the caller sees the
/// connection abort mid-body.
fn body_until(body: Body, deadline: tokio::time::Instant, request_id: &str) -> Body {
    let request_id = request_id.to_string();
    let chunks = futures_util::stream::unfold(Some(body.into_data_stream()), move |state| {
        let request_id = request_id.clone();
        async move {
            let mut chunks = state?;
            match tokio::time::timeout_at(deadline, chunks.next()).await {
                Ok(Some(chunk)) => Some((chunk, Some(chunks))),
                Ok(None) => None,
                Err(_) => {
                    tracing::error!(request_id = %request_id, "Upstream body exceeded deadline");
                    let elapsed = io::Error::new(io::ErrorKind::TimedOut, "upstream deadline elapsed");
                    Some((Err(axum::Error::new(elapsed)), None))
                }
            }
        }
    });
    Body::from_stream(chunks)
}

/// Wrap `message` in a `crs:call_exception` response.
pub fn fault(message: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        protocol::encode_error(message),
    )
        .into_response()
}

/// Copy every header value, keeping repeated names. `Host` and
/// `Transfer-Encoding` describe the inbound connection and are left for the
/// client to set.
fn clone_headers(src: &HeaderMap, dst: &mut HeaderMap) {
    for (name, value) in src {
        if *name == header::HOST || *name == header::TRANSFER_ENCODING {
            continue;
        }
        dst.append(name.clone(), value.clone());
    }
}

/// Render an error and its sources as `outer: inner: root`.
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

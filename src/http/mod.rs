//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → tower-http request-id layers (set + echo x-request-id)
//!     → dispatcher.rs (decode envelope, policy, registry lookup)
//!     → upstream.rs (build backend URI)
//!     → hyper client → repository server
//!     → response streamed back unchanged
//! ```

pub mod dispatcher;
pub mod policy;
pub mod request;
pub mod server;
pub mod upstream;

pub use policy::CommentPolicy;
pub use request::{request_id, X_REQUEST_ID};
pub use server::HttpServer;
pub use upstream::{UpstreamBase, UpstreamError};

//! Legacy repository-server wire protocol.
//!
//! # Data Flow
//! ```text
//! Inbound body (XML call envelope)
//!     → envelope.rs (decode: alias/name/version + params)
//!     → envelope.rs (validate: non-empty scalar fields)
//!     → Dispatcher routes the call
//!
//! Any refusal after validation:
//!     message
//!     → fault.rs (tuple literal → base64 → <crs:call_exception>)
//!     → 200 OK, application/xml
//! ```
//!
//! # Design Decisions
//! - Element and attribute names are matched by local name; the `crs:`
//!   prefix is not significant
//! - Malformed or incomplete envelopes never produce a fault document; the
//!   client expects a bare rejection for those
//! - The fault layout is a protocol constant, reproduced byte for byte

pub mod envelope;
pub mod fault;

pub use envelope::{decode, CallEnvelope, CallParams, DecodeError, ValidationError, ENROLL_OPERATION};
pub use fault::{encode_error, CALL_EXCEPTION_CLSID, CRS_NAMESPACE};

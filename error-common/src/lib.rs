//! Common error handling utilities for the SIGPOL engine
//!
//! This module provides the standardized error codes and the uniform
//! response envelope shared by every SIGPOL module. It ensures the
//! transport layer always emits the same shape regardless of which
//! subsystem produced the outcome.
//!
//! # Envelope
//!
//! Every response is `{success, data?, message?, error?: {code, message},
//! metadata}`. Error codes are stable strings the frontend matches on
//! (`INVALID_CREDENTIALS`, `ACCOUNT_LOCKED`, ...) and each code maps to a
//! fixed HTTP status class.
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, Envelope};
//!
//! let reply = Envelope::<()>::error(codes::auth::INVALID_CREDENTIALS, "Credenciales inválidas");
//! assert!(!reply.success);
//! assert_eq!(error_common::http_status(codes::auth::INVALID_CREDENTIALS), 401);
//! ```

pub mod codes;
pub mod envelope;

pub use codes::http_status;
pub use envelope::*;

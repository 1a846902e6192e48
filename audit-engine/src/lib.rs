//! Audit logging engine for the SIGPOL engine
//!
//! Records security-relevant actions (logins, lockouts, password changes,
//! session revocations) as append-only rows. Recording is fire-and-forget:
//! an audit failure is logged and swallowed, it never aborts the operation
//! that triggered it.
//!
//! # Example
//!
//! ```rust,no_run
//! use audit_engine::{AuditEntry, AuditLogger, MemoryAuditSink};
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let logger = AuditLogger::new(Arc::new(MemoryAuditSink::new()));
//!
//! logger
//!     .log(
//!         AuditEntry::new("login", "auth")
//!             .with_details(serde_json::json!({"legajo": "A1"}))
//!             .with_client(Some("10.0.0.1".into()), Some("Mozilla/5.0".into())),
//!     )
//!     .await;
//! # }
//! ```

pub mod engine;
pub mod entry;
pub mod error;

pub use engine::*;
pub use entry::*;
pub use error::*;

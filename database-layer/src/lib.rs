//! Database layer for the SIGPOL engine
//!
//! Thin abstraction over a PostgreSQL connection pool used by every
//! SIGPOL repository:
//! - Connection pooling with health monitoring
//! - A single transaction entry point so multi-step mutations commit or
//!   roll back as one unit
//!
//! Rows are plain relational data; encryption, migrations and backups are
//! operated outside this crate.

pub mod connection;
pub mod error;

pub use connection::*;
pub use error::*;

//! # sluice-rdbc
//!
//! Relational database connectivity for the sluice batch sink.
//!
//! This crate provides the small driver surface a batched writer needs:
//! connect with a URL and optional credentials, prepare one parameterized
//! statement, bind positional parameters, accumulate rows into a batch and
//! execute it.
//!
//! ## Features
//!
//! - **Driver Registry**: resolve drivers by name or JDBC-style class name
//! - **Typed Binding**: JDBC-style SQL type tags with typed NULLs
//! - **Multi-Database Support**: PostgreSQL and MySQL behind one trait set
//! - **In-Memory Driver**: recording driver with fault injection for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sluice_rdbc::prelude::*;
//!
//! let registry = DriverRegistry::with_defaults();
//! let driver = registry.resolve("org.postgresql.Driver")?;
//! let mut conn = driver
//!     .connect(&ConnectionConfig::new("postgres://localhost/app"))
//!     .await?;
//!
//! let mut stmt = conn.prepare("INSERT INTO books (id, title) VALUES ($1, $2)").await?;
//! stmt.bind(1, Param::Typed(SqlType::Integer, TypedValue::Int(1)))?;
//! stmt.bind(2, Param::Null(SqlType::Varchar))?;
//! stmt.add_batch()?;
//! stmt.execute_batch().await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `postgres` - PostgreSQL support via tokio-postgres
//! - `mysql` - MySQL/MariaDB support via mysql_async
//! - `full` - All features enabled

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod connection;
pub mod driver;
pub mod error;
pub mod memory;
pub mod types;

// Backend implementations (conditionally compiled)
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result};

    // Value and type system
    pub use crate::types::{Param, Record, SqlType, TypedValue, Value};

    // Connection traits and config
    pub use crate::connection::{
        redact_url, Connection, ConnectionConfig, Credentials, Driver, PreparedStatement,
    };

    // Drivers
    pub use crate::driver::DriverRegistry;
    pub use crate::memory::{Fault, Journal, MemoryDriver, MemoryEvent};
}

// Re-export commonly used items at crate root
pub use error::{Error, Result};
pub use types::{Param, Record, SqlType, TypedValue, Value};

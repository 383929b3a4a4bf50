//! # sluice-sink
//!
//! Batched relational database output sink.
//!
//! Records produced by a pipeline are bound to a parameterized insert
//! statement and written in batches: the batch is executed every
//! `batch_size` records and once more on close.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sluice_sink::prelude::*;
//!
//! let mut writer = SinkBuilder::new()
//!     .driver("org.postgresql.Driver")
//!     .url("postgres://db.internal/library")
//!     .username("writer")
//!     .password(std::env::var("DB_PASSWORD")?)
//!     .insert_statement("INSERT INTO books (id, title) VALUES ($1, $2)")
//!     .column_types(vec![SqlType::Integer, SqlType::Varchar])
//!     .batch_size(1000)
//!     .finish()?;
//!
//! writer.open(0, 1).await?;
//! for record in records {
//!     writer.write(&record).await?;
//! }
//! let report = writer.close().await;
//! ```
//!
//! Settings can also be loaded from a YAML or JSON document with
//! [`SinkSettings`] and turned into a builder with
//! [`SinkBuilder::from_settings`].
//!
//! ## Feature Flags
//!
//! - `postgres` - PostgreSQL driver
//! - `mysql` - MySQL/MariaDB driver
//! - `full` - All drivers

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod binder;
pub mod builder;
pub mod config;
pub mod error;
pub mod secret;
pub mod settings;
pub mod stats;
pub mod writer;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::builder::SinkBuilder;
    pub use crate::config::{SinkConfig, DEFAULT_BATCH_SIZE};
    pub use crate::error::{OpenError, Result, ShutdownFailure, SinkError, WriteError};
    pub use crate::secret::SensitiveString;
    pub use crate::settings::SinkSettings;
    pub use crate::stats::SinkStats;
    pub use crate::writer::{BatchWriter, CloseReport, WriterState};

    pub use sluice_rdbc::driver::DriverRegistry;
    pub use sluice_rdbc::{Record, SqlType, Value};
}

// Re-export commonly used items at crate root
pub use builder::SinkBuilder;
pub use config::SinkConfig;
pub use error::{OpenError, Result, ShutdownFailure, SinkError, WriteError};
pub use secret::SensitiveString;
pub use settings::SinkSettings;
pub use stats::SinkStats;
pub use writer::{BatchWriter, CloseReport, WriterState};

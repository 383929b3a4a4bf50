//! Error types for sluice-sink
//!
//! Every failure the sink reports wraps the driver error that caused it, so
//! callers can walk the `source()` chain down to the database's message.

use sluice_rdbc::{Error as DriverError, SqlType};
use thiserror::Error;

/// Result type alias for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

/// Main error type for the sink
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink was configured incompletely or inconsistently
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong
        message: String,
    },

    /// The writer could not be opened
    #[error(transparent)]
    Open(#[from] OpenError),

    /// A record could not be written
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl SinkError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// The driver error at the root of this failure, if any
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::Configuration { .. } => None,
            Self::Open(e) => e.driver_error(),
            Self::Write(e) => e.driver_error(),
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retriable(&self) -> bool {
        self.driver_error().is_some_and(DriverError::is_retriable)
    }
}

/// Failures of [`BatchWriter::open`](crate::BatchWriter::open)
#[derive(Debug, Error)]
pub enum OpenError {
    /// No driver is registered under the configured name
    #[error("unable to load database driver '{driver}'")]
    DriverLoad {
        /// Configured driver name
        driver: String,
        /// Registry lookup error
        #[source]
        source: DriverError,
    },

    /// The driver could not establish a connection
    #[error("unable to connect to database")]
    Connection {
        /// Driver error
        #[source]
        source: DriverError,
    },

    /// The insert statement could not be prepared
    #[error("unable to prepare statement '{sql}'")]
    StatementPrepare {
        /// Statement text
        sql: String,
        /// Driver error
        #[source]
        source: DriverError,
    },

    /// `open` was called on an open writer
    #[error("writer is already open")]
    AlreadyOpen,

    /// `open` was called on a closed writer
    #[error("writer has been closed")]
    Closed,
}

impl OpenError {
    fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::DriverLoad { source, .. }
            | Self::Connection { source }
            | Self::StatementPrepare { source, .. } => Some(source),
            Self::AlreadyOpen | Self::Closed => None,
        }
    }
}

/// Failures of [`BatchWriter::write`](crate::BatchWriter::write) and
/// [`BatchWriter::flush`](crate::BatchWriter::flush)
#[derive(Debug, Error)]
pub enum WriteError {
    /// A field's value does not fit the column type declared for it
    #[error("field {position} holds a {actual} value, which cannot be bound as {expected}")]
    BindTypeMismatch {
        /// 1-based parameter position
        position: usize,
        /// Declared column type
        expected: SqlType,
        /// Variant name of the offending value
        actual: &'static str,
        /// Conversion error
        #[source]
        source: DriverError,
    },

    /// The driver rejected a parameter
    #[error("unable to bind parameter {position}")]
    Bind {
        /// 1-based parameter position
        position: usize,
        /// Driver error
        #[source]
        source: DriverError,
    },

    /// The bound row could not be added to the batch
    #[error("unable to add record to batch")]
    AddBatch {
        /// Driver error
        #[source]
        source: DriverError,
    },

    /// Executing the accumulated batch failed
    #[error("execution of a batch of {rows} records failed")]
    BatchExecution {
        /// Records in the failed batch
        rows: usize,
        /// Driver error
        #[source]
        source: DriverError,
    },

    /// The writer has not been opened, or has been closed
    #[error("writer is not open")]
    NotOpen,
}

impl WriteError {
    fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::BindTypeMismatch { source, .. }
            | Self::Bind { source, .. }
            | Self::AddBatch { source }
            | Self::BatchExecution { source, .. } => Some(source),
            Self::NotOpen => None,
        }
    }
}

/// A failure during [`BatchWriter::close`](crate::BatchWriter::close)
///
/// Close never fails; these are collected in a
/// [`CloseReport`](crate::CloseReport) instead.
#[derive(Debug, Error)]
pub enum ShutdownFailure {
    /// Flushing the records still pending failed
    #[error("final flush of {rows} records failed")]
    Flush {
        /// Records in the failed batch
        rows: usize,
        /// Driver error
        #[source]
        source: DriverError,
    },

    /// Releasing the prepared statement failed
    #[error("closing the statement failed")]
    CloseStatement {
        /// Driver error
        #[source]
        source: DriverError,
    },

    /// Closing the connection failed
    #[error("closing the connection failed")]
    CloseConnection {
        /// Driver error
        #[source]
        source: DriverError,
    },
}

//! Batch writer
//!
//! Owns one connection and one prepared insert statement between `open` and
//! `close`. Each written record is bound and added to the statement's batch;
//! the batch is executed once `batch_size` records are pending and once more
//! on close for whatever is left.

use sluice_rdbc::connection::{redact_url, Connection, PreparedStatement};
use sluice_rdbc::driver::DriverRegistry;
use sluice_rdbc::Record;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::binder::bind_record;
use crate::config::SinkConfig;
use crate::error::{OpenError, Result, ShutdownFailure, WriteError};
use crate::stats::{AtomicSinkStats, SinkStats};

/// Lifecycle of a [`BatchWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriterState {
    /// Built but never successfully opened
    Unopened,
    /// Connected with a prepared statement
    Active,
    /// Closed; terminal
    Closed,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unopened => write!(f, "unopened"),
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// What went wrong while closing a writer
///
/// Closing always completes; failures along the way are logged and
/// collected here rather than returned as errors.
#[derive(Debug, Default)]
pub struct CloseReport {
    /// Failures in the order they happened
    pub suppressed: Vec<ShutdownFailure>,
}

impl CloseReport {
    /// Whether every resource was released without error
    pub fn is_clean(&self) -> bool {
        self.suppressed.is_empty()
    }

    /// Whether the final flush of pending records failed
    pub fn flush_failed(&self) -> bool {
        self.suppressed
            .iter()
            .any(|f| matches!(f, ShutdownFailure::Flush { .. }))
    }
}

/// Writes records to a relational table in batches
///
/// # Example
///
/// ```rust
/// use sluice_rdbc::{Record, SqlType, Value};
/// use sluice_sink::SinkBuilder;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut writer = SinkBuilder::new()
///     .driver("memory")
///     .url("jdbc:test")
///     .insert_statement("INSERT INTO books (id, title) VALUES (?, ?)")
///     .column_types(vec![SqlType::Integer, SqlType::Varchar])
///     .batch_size(2)
///     .finish()?;
///
/// writer.open(0, 1).await?;
/// writer
///     .write(&Record::new(vec![Value::Int32(1), Value::from("Dune")]))
///     .await?;
/// let report = writer.close().await;
/// assert!(report.is_clean());
/// assert_eq!(writer.stats().records_flushed, 1);
/// # Ok(())
/// # }
/// ```
pub struct BatchWriter {
    config: SinkConfig,
    registry: Arc<DriverRegistry>,
    connection: Option<Box<dyn Connection>>,
    statement: Option<Box<dyn PreparedStatement>>,
    pending: usize,
    state: WriterState,
    stats: Arc<AtomicSinkStats>,
}

impl BatchWriter {
    pub(crate) fn new(config: SinkConfig, registry: Arc<DriverRegistry>) -> Self {
        Self {
            config,
            registry,
            connection: None,
            statement: None,
            pending: 0,
            state: WriterState::Unopened,
            stats: Arc::new(AtomicSinkStats::default()),
        }
    }

    /// Connect and prepare the insert statement
    ///
    /// The indices identify this writer among parallel instances and are
    /// only used for diagnostics. On failure the writer stays unopened and
    /// `open` may be retried.
    #[instrument(skip(self), fields(driver = %self.config.driver))]
    pub async fn open(&mut self, instance_index: usize, total_instances: usize) -> Result<()> {
        match self.state {
            WriterState::Unopened => {}
            WriterState::Active => return Err(OpenError::AlreadyOpen.into()),
            WriterState::Closed => return Err(OpenError::Closed.into()),
        }

        let driver = self
            .registry
            .resolve(&self.config.driver)
            .map_err(|source| OpenError::DriverLoad {
                driver: self.config.driver.clone(),
                source,
            })?;

        let mut connection = driver
            .connect(&self.config.connection_config())
            .await
            .map_err(|source| OpenError::Connection { source })?;

        let statement = match connection.prepare(&self.config.insert_statement).await {
            Ok(statement) => statement,
            Err(source) => {
                if let Err(e) = connection.close().await {
                    warn!(error = %e, "Failed to close connection after prepare failure");
                }
                return Err(OpenError::StatementPrepare {
                    sql: self.config.insert_statement.clone(),
                    source,
                }
                .into());
            }
        };

        self.connection = Some(connection);
        self.statement = Some(statement);
        self.pending = 0;
        self.state = WriterState::Active;

        info!(
            url = %redact_url(&self.config.url),
            batch_size = self.config.batch_size,
            "Batch writer opened"
        );
        Ok(())
    }

    /// Bind a record and add it to the batch, flushing once the batch is full
    ///
    /// A failed write leaves the writer open. When the flush fails the
    /// records of that batch are lost; the pending count starts over.
    pub async fn write(&mut self, record: &Record) -> Result<()> {
        if self.state != WriterState::Active {
            return Err(WriteError::NotOpen.into());
        }
        let statement = self
            .statement
            .as_deref_mut()
            .ok_or(WriteError::NotOpen)?;

        let column_types = self.config.column_types.as_deref();
        if let Some(types) = column_types {
            if types.len() != record.arity() {
                warn!(
                    declared = types.len(),
                    fields = record.arity(),
                    "Column types and record arity differ"
                );
            }
        }

        let added = bind_record(statement, record, column_types).and_then(|()| {
            statement
                .add_batch()
                .map_err(|source| WriteError::AddBatch { source })
        });
        if let Err(e) = added {
            self.stats.record_rejection();
            return Err(e.into());
        }

        self.pending += 1;
        self.stats.record_write();

        if self.pending >= self.config.batch_size {
            self.execute_pending().await?;
        }
        Ok(())
    }

    /// Execute the pending batch now
    ///
    /// Does nothing when no records are pending.
    pub async fn flush(&mut self) -> Result<()> {
        if self.state != WriterState::Active {
            return Err(WriteError::NotOpen.into());
        }
        self.execute_pending().await?;
        Ok(())
    }

    async fn execute_pending(&mut self) -> std::result::Result<(), WriteError> {
        if self.pending == 0 {
            return Ok(());
        }
        let statement = self.statement.as_mut().ok_or(WriteError::NotOpen)?;

        let rows = std::mem::take(&mut self.pending);
        let started = Instant::now();
        match statement.execute_batch().await {
            Ok(_) => {
                self.stats.record_flush(rows as u64, started.elapsed());
                debug!(records = rows, "Batch flushed");
                Ok(())
            }
            Err(source) => {
                self.stats.record_flush_failure(rows as u64);
                Err(WriteError::BatchExecution { rows, source })
            }
        }
    }

    /// Flush what is pending and release the statement and the connection
    ///
    /// Never fails: problems are logged and returned in the report. Calling
    /// `close` again is a no-op.
    #[instrument(skip(self), fields(driver = %self.config.driver))]
    pub async fn close(&mut self) -> CloseReport {
        let mut report = CloseReport::default();

        if let Some(mut statement) = self.statement.take() {
            let rows = std::mem::take(&mut self.pending);
            if rows > 0 {
                let started = Instant::now();
                match statement.execute_batch().await {
                    Ok(_) => {
                        self.stats.record_flush(rows as u64, started.elapsed());
                        debug!(records = rows, "Final batch flushed");
                    }
                    Err(source) => {
                        self.stats.record_flush_failure(rows as u64);
                        warn!(error = %source, records = rows, "Final batch failed");
                        report.suppressed.push(ShutdownFailure::Flush { rows, source });
                    }
                }
            }
            if let Err(source) = statement.close().await {
                warn!(error = %source, "Failed to close statement");
                report
                    .suppressed
                    .push(ShutdownFailure::CloseStatement { source });
            }
        }
        self.pending = 0;

        if let Some(mut connection) = self.connection.take() {
            if let Err(source) = connection.close().await {
                warn!(error = %source, "Failed to close connection");
                report
                    .suppressed
                    .push(ShutdownFailure::CloseConnection { source });
            }
        }

        if self.state != WriterState::Closed {
            let stats = self.stats.snapshot();
            info!(
                records_flushed = stats.records_flushed,
                records_failed = stats.records_failed,
                batches = stats.batches_flushed,
                "Batch writer closed"
            );
        }
        self.state = WriterState::Closed;
        report
    }

    /// Records added since the last flush
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Current lifecycle state
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// The configuration this writer was built with
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Snapshot of the writer's counters
    pub fn stats(&self) -> SinkStats {
        self.stats.snapshot()
    }

    /// Live counters, for reporting from another task
    pub fn stats_handle(&self) -> Arc<AtomicSinkStats> {
        Arc::clone(&self.stats)
    }

    /// Whether a connection is currently held
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Whether a prepared statement is currently held
    pub fn has_statement(&self) -> bool {
        self.statement.is_some()
    }
}

impl fmt::Debug for BatchWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchWriter")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        if self.pending > 0 {
            warn!(
                records = self.pending,
                "Batch writer dropped without close, pending records are lost"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SinkBuilder;
    use sluice_rdbc::memory::{Fault, MemoryDriver};
    use sluice_rdbc::{Param, SqlType, Value};

    fn writer(driver: &MemoryDriver, batch_size: usize) -> BatchWriter {
        SinkBuilder::new()
            .driver("mem")
            .url("jdbc:test")
            .insert_statement("INSERT INTO t VALUES (?, ?)")
            .column_types(vec![SqlType::Integer, SqlType::Varchar])
            .batch_size(batch_size)
            .registry(DriverRegistry::new().with_driver("mem", Arc::new(driver.clone())))
            .finish()
            .unwrap()
    }

    fn record(id: i32, title: &str) -> Record {
        Record::new(vec![Value::Int32(id), Value::from(title)])
    }

    #[tokio::test]
    async fn test_flush_when_batch_full() {
        let driver = MemoryDriver::new();
        let mut writer = writer(&driver, 2);
        writer.open(0, 1).await.unwrap();

        writer.write(&record(1, "a")).await.unwrap();
        assert_eq!(writer.pending(), 1);
        writer.write(&record(2, "b")).await.unwrap();
        assert_eq!(writer.pending(), 0);
        assert_eq!(driver.journal().execute_calls(), 1);
    }

    #[tokio::test]
    async fn test_explicit_flush() {
        let driver = MemoryDriver::new();
        let mut writer = writer(&driver, 10);
        writer.open(0, 1).await.unwrap();

        writer.flush().await.unwrap();
        assert_eq!(driver.journal().execute_calls(), 0);

        writer.write(&record(1, "a")).await.unwrap();
        writer.flush().await.unwrap();
        assert_eq!(driver.journal().execute_calls(), 1);
        assert_eq!(writer.stats().records_flushed, 1);
    }

    #[tokio::test]
    async fn test_failed_flush_resets_pending() {
        let driver = MemoryDriver::new();
        let mut writer = writer(&driver, 2);
        writer.open(0, 1).await.unwrap();
        driver.fail(Fault::ExecuteBatch);

        writer.write(&record(1, "a")).await.unwrap();
        let err = writer.write(&record(2, "b")).await.unwrap_err();
        assert!(matches!(
            err,
            crate::SinkError::Write(WriteError::BatchExecution { rows: 2, .. })
        ));
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.state(), WriterState::Active);

        let stats = writer.stats();
        assert_eq!(stats.records_failed, 2);
        assert_eq!(stats.batches_failed, 1);
    }

    #[tokio::test]
    async fn test_mismatch_leaves_row_out_of_batch() {
        let driver = MemoryDriver::new();
        let mut writer = writer(&driver, 10);
        writer.open(0, 1).await.unwrap();

        let bad = Record::new(vec![Value::from("one"), Value::from("a")]);
        assert!(writer.write(&bad).await.is_err());
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.stats().records_rejected, 1);

        writer.write(&record(1, "a")).await.unwrap();
        writer.close().await;

        let batches = driver.journal().executed_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0][0][0],
            Param::Typed(SqlType::Integer, sluice_rdbc::TypedValue::Int(1))
        );
    }

    #[tokio::test]
    async fn test_close_reports_flush_failure() {
        let driver = MemoryDriver::new();
        let mut writer = writer(&driver, 10);
        writer.open(0, 1).await.unwrap();
        writer.write(&record(1, "a")).await.unwrap();

        driver.fail(Fault::ExecuteBatch);
        let report = writer.close().await;

        assert!(report.flush_failed());
        assert_eq!(report.suppressed.len(), 1);
        assert_eq!(driver.journal().statements_closed(), 1);
        assert_eq!(driver.journal().connections_closed(), 1);
    }

    #[tokio::test]
    async fn test_close_without_open() {
        let driver = MemoryDriver::new();
        let mut writer = writer(&driver, 10);

        let report = writer.close().await;
        assert!(report.is_clean());
        assert_eq!(writer.state(), WriterState::Closed);
        assert_eq!(driver.journal().connects(), 0);
    }
}

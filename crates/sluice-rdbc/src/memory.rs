//! In-memory driver
//!
//! Accepts any URL and records every call it receives in a shared
//! [`Journal`] instead of talking to a database. Individual operations can
//! be made to fail with [`Fault`]s, which makes it the driver of choice for
//! dry runs and for exercising error paths in tests.
//!
//! # Example
//!
//! ```rust
//! use sluice_rdbc::memory::{Fault, MemoryDriver};
//!
//! let driver = MemoryDriver::new();
//! let journal = driver.journal();
//! driver.fail(Fault::ExecuteBatch);
//! assert!(journal.executed_batches().is_empty());
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::connection::{Connection, ConnectionConfig, Driver, PreparedStatement};
use crate::error::{Error, Result};
use crate::types::Param;

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `Driver::connect`
    Connect,
    /// `Connection::prepare`
    Prepare,
    /// `PreparedStatement::bind`
    Bind,
    /// `PreparedStatement::add_batch`
    AddBatch,
    /// `PreparedStatement::execute_batch`
    ExecuteBatch,
    /// `PreparedStatement::close`
    CloseStatement,
    /// `Connection::close`
    CloseConnection,
}

/// A call observed by the in-memory driver
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryEvent {
    /// A connection was established
    Connect {
        /// URL as given
        url: String,
        /// Username, if credentials were supplied
        username: Option<String>,
    },
    /// A statement was prepared
    Prepare {
        /// Statement text
        sql: String,
    },
    /// A parameter was bound
    Bind {
        /// 1-based position
        position: usize,
        /// Bound parameter
        param: Param,
    },
    /// The current row was added to the batch
    AddBatch,
    /// The batch was executed
    ExecuteBatch {
        /// Number of rows executed
        rows: usize,
    },
    /// The statement was closed
    CloseStatement,
    /// The connection was closed
    CloseConnection,
}

#[derive(Debug, Default)]
struct JournalState {
    events: Vec<MemoryEvent>,
    batches: Vec<Vec<Vec<Param>>>,
}

/// Shared record of everything the in-memory driver did
#[derive(Debug, Clone, Default)]
pub struct Journal {
    state: Arc<Mutex<JournalState>>,
}

impl Journal {
    fn push(&self, event: MemoryEvent) {
        self.state.lock().events.push(event);
    }

    fn push_batch(&self, rows: Vec<Vec<Param>>) {
        let mut state = self.state.lock();
        state.events.push(MemoryEvent::ExecuteBatch { rows: rows.len() });
        state.batches.push(rows);
    }

    /// All events in call order
    pub fn events(&self) -> Vec<MemoryEvent> {
        self.state.lock().events.clone()
    }

    /// Every bind call as `(position, param)`
    pub fn binds(&self) -> Vec<(usize, Param)> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MemoryEvent::Bind { position, param } => Some((*position, param.clone())),
                _ => None,
            })
            .collect()
    }

    /// Rows of each successfully executed batch
    pub fn executed_batches(&self) -> Vec<Vec<Vec<Param>>> {
        self.state.lock().batches.clone()
    }

    /// How many times `execute_batch` was called, successful or not
    pub fn execute_calls(&self) -> usize {
        self.count(|e| matches!(e, MemoryEvent::ExecuteBatch { .. }))
    }

    /// Total rows across successfully executed batches
    pub fn rows_executed(&self) -> usize {
        self.state.lock().batches.iter().map(Vec::len).sum()
    }

    /// Number of connections established
    pub fn connects(&self) -> usize {
        self.count(|e| matches!(e, MemoryEvent::Connect { .. }))
    }

    /// Number of statements closed
    pub fn statements_closed(&self) -> usize {
        self.count(|e| matches!(e, MemoryEvent::CloseStatement))
    }

    /// Number of connections closed
    pub fn connections_closed(&self) -> usize {
        self.count(|e| matches!(e, MemoryEvent::CloseConnection))
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.events.clear();
        state.batches.clear();
    }

    fn count(&self, pred: impl Fn(&MemoryEvent) -> bool) -> usize {
        self.state.lock().events.iter().filter(|e| pred(*e)).count()
    }
}

/// Set of operations currently failing
#[derive(Debug, Clone, Default)]
struct Faults(Arc<Mutex<HashSet<Fault>>>);

impl Faults {
    fn check(&self, fault: Fault) -> Result<()> {
        if self.0.lock().contains(&fault) {
            let message = format!("injected {:?} failure", fault);
            return Err(match fault {
                Fault::Connect | Fault::CloseConnection => Error::connection(message),
                Fault::Bind => Error::type_conversion(message),
                _ => Error::query(message),
            });
        }
        Ok(())
    }
}

/// Driver that records calls in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    journal: Journal,
    faults: Faults,
}

impl MemoryDriver {
    /// Create a driver with a fresh journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the journal shared with every connection of this driver
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Make an operation fail until [`MemoryDriver::recover`] is called
    pub fn fail(&self, fault: Fault) -> &Self {
        self.faults.0.lock().insert(fault);
        self
    }

    /// Stop failing an operation
    pub fn recover(&self, fault: Fault) -> &Self {
        self.faults.0.lock().remove(&fault);
        self
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        "memory"
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        self.faults.check(Fault::Connect)?;
        self.journal.push(MemoryEvent::Connect {
            url: config.url.clone(),
            username: config.credentials.as_ref().map(|c| c.username.clone()),
        });
        Ok(Box::new(MemoryConnection {
            journal: self.journal.clone(),
            faults: self.faults.clone(),
            closed: false,
        }))
    }
}

/// Connection handed out by [`MemoryDriver`]
pub struct MemoryConnection {
    journal: Journal,
    faults: Faults,
    closed: bool,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        if self.closed {
            return Err(Error::connection("connection is closed"));
        }
        self.faults.check(Fault::Prepare)?;
        self.journal.push(MemoryEvent::Prepare {
            sql: sql.to_string(),
        });
        Ok(Box::new(MemoryStatement {
            journal: self.journal.clone(),
            faults: self.faults.clone(),
            sql: sql.to_string(),
            current: BTreeMap::new(),
            batch: Vec::new(),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.faults.check(Fault::CloseConnection)?;
        self.closed = true;
        self.journal.push(MemoryEvent::CloseConnection);
        Ok(())
    }
}

/// Statement handed out by [`MemoryConnection`]
pub struct MemoryStatement {
    journal: Journal,
    faults: Faults,
    sql: String,
    current: BTreeMap<usize, Param>,
    batch: Vec<Vec<Param>>,
}

#[async_trait]
impl PreparedStatement for MemoryStatement {
    fn bind(&mut self, position: usize, param: Param) -> Result<()> {
        if position == 0 {
            return Err(Error::query("parameter positions start at 1"));
        }
        self.faults.check(Fault::Bind)?;
        self.journal.push(MemoryEvent::Bind {
            position,
            param: param.clone(),
        });
        self.current.insert(position, param);
        Ok(())
    }

    fn add_batch(&mut self) -> Result<()> {
        self.faults.check(Fault::AddBatch)?;
        let row = std::mem::take(&mut self.current).into_values().collect();
        self.batch.push(row);
        self.journal.push(MemoryEvent::AddBatch);
        Ok(())
    }

    fn batch_len(&self) -> usize {
        self.batch.len()
    }

    async fn execute_batch(&mut self) -> Result<Vec<u64>> {
        let rows = std::mem::take(&mut self.batch);
        if let Err(e) = self.faults.check(Fault::ExecuteBatch) {
            self.journal
                .push(MemoryEvent::ExecuteBatch { rows: rows.len() });
            return Err(e);
        }
        let counts = vec![1; rows.len()];
        self.journal.push_batch(rows);
        Ok(counts)
    }

    async fn close(&mut self) -> Result<()> {
        self.faults.check(Fault::CloseStatement)?;
        self.current.clear();
        self.journal.push(MemoryEvent::CloseStatement);
        Ok(())
    }

    fn sql(&self) -> &str {
        &self.sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SqlType, TypedValue, Value};

    #[tokio::test]
    async fn test_records_binds_and_batches() {
        let driver = MemoryDriver::new();
        let journal = driver.journal();

        let mut conn = driver
            .connect(&ConnectionConfig::new("jdbc:test"))
            .await
            .unwrap();
        let mut stmt = conn.prepare("INSERT INTO t VALUES (?, ?)").await.unwrap();

        stmt.bind(1, Param::Typed(SqlType::Integer, TypedValue::Int(1)))
            .unwrap();
        stmt.bind(2, Param::Null(SqlType::Varchar)).unwrap();
        stmt.add_batch().unwrap();
        assert_eq!(stmt.batch_len(), 1);

        let counts = stmt.execute_batch().await.unwrap();
        assert_eq!(counts, vec![1]);
        assert_eq!(stmt.batch_len(), 0);

        let batches = journal.executed_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0][1], Param::Null(SqlType::Varchar));
        assert_eq!(journal.binds().len(), 2);
    }

    #[tokio::test]
    async fn test_injected_execute_failure_drains_batch() {
        let driver = MemoryDriver::new();
        driver.fail(Fault::ExecuteBatch);

        let mut conn = driver.connect(&ConnectionConfig::new("x")).await.unwrap();
        let mut stmt = conn.prepare("INSERT").await.unwrap();
        stmt.bind(1, Param::Object(Value::Int32(1))).unwrap();
        stmt.add_batch().unwrap();

        assert!(stmt.execute_batch().await.is_err());
        assert_eq!(stmt.batch_len(), 0);
        assert_eq!(driver.journal().execute_calls(), 1);
        assert_eq!(driver.journal().rows_executed(), 0);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let driver = MemoryDriver::new();
        driver.fail(Fault::Connect);
        assert!(driver.connect(&ConnectionConfig::new("x")).await.is_err());

        driver.recover(Fault::Connect);
        assert!(driver.connect(&ConnectionConfig::new("x")).await.is_ok());
        assert_eq!(driver.journal().connects(), 1);
    }
}

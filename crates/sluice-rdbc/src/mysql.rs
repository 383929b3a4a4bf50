//! MySQL backend implementation for sluice-rdbc
//!
//! Provides:
//! - Connection establishment via mysql_async, with credentials applied on
//!   top of the URL
//! - Server-side prepared statements executed row by row per batch

use async_trait::async_trait;
use chrono::{Datelike, Timelike};
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::connection::{Connection, ConnectionConfig, Driver, PreparedStatement};
use crate::error::{Error, Result};
use crate::types::{Param, Value};

fn date_time_to_sql(dt: &chrono::NaiveDateTime) -> mysql_async::Value {
    let (date, time) = (dt.date(), dt.time());
    mysql_async::Value::Date(
        date.year() as u16,
        date.month() as u8,
        date.day() as u8,
        time.hour() as u8,
        time.minute() as u8,
        time.second() as u8,
        time.nanosecond() / 1000,
    )
}

/// Convert a value to a MySQL parameter
fn value_to_sql(value: &Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(b) => mysql_async::Value::from(*b),
        Value::Int8(n) => mysql_async::Value::from(*n),
        Value::Int16(n) => mysql_async::Value::from(*n),
        Value::Int32(n) => mysql_async::Value::from(*n),
        Value::Int64(n) => mysql_async::Value::from(*n),
        Value::Float32(n) => mysql_async::Value::from(*n),
        Value::Float64(n) => mysql_async::Value::from(*n),
        // DECIMAL goes over the wire as text to keep its precision
        Value::Decimal(d) => mysql_async::Value::from(d.to_string()),
        Value::String(s) => mysql_async::Value::from(s.clone()),
        Value::Bytes(b) => mysql_async::Value::from(b.clone()),
        Value::Date(d) => {
            mysql_async::Value::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0)
        }
        Value::Time(t) => mysql_async::Value::Time(
            false,
            0,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.nanosecond() / 1000,
        ),
        Value::DateTime(dt) => date_time_to_sql(dt),
        Value::DateTimeTz(dt) => date_time_to_sql(&dt.naive_utc()),
        Value::Uuid(u) => mysql_async::Value::from(u.to_string()),
        Value::Json(j) => mysql_async::Value::from(j.to_string()),
    }
}

/// Convert a bound parameter to a MySQL parameter
///
/// MySQL infers parameter types from the values, so a typed NULL is sent as
/// a plain NULL.
fn param_to_sql(param: &Param) -> mysql_async::Value {
    match param {
        Param::Null(_) => mysql_async::Value::NULL,
        Param::Typed(_, value) => value_to_sql(&value.clone().into_value()),
        Param::Object(value) => value_to_sql(value),
    }
}

/// MySQL driver
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl MySqlDriver {
    fn opts(config: &ConnectionConfig) -> Result<OptsBuilder> {
        let opts = mysql_async::Opts::from_url(&config.url)
            .map_err(|e| Error::config(format!("Invalid MySQL URL: {}", e)))?;
        let mut builder = OptsBuilder::from_opts(opts);
        if let Some(credentials) = &config.credentials {
            builder = builder
                .user(Some(credentials.username.clone()))
                .pass(Some(credentials.password.clone()));
        }
        Ok(builder)
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    fn name(&self) -> &str {
        "mysql"
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let opts = Self::opts(config)?;
        let conn = Conn::new(opts)
            .await
            .map_err(|e| Error::connection_with_source("failed to connect", e))?;

        Ok(Box::new(MySqlConnection {
            conn: Arc::new(Mutex::new(Some(conn))),
        }))
    }
}

type SharedConn = Arc<Mutex<Option<Conn>>>;

/// MySQL connection implementation
pub struct MySqlConnection {
    conn: SharedConn,
}

#[async_trait]
impl Connection for MySqlConnection {
    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| Error::connection("connection is closed"))?;
        let statement = conn
            .prep(sql)
            .await
            .map_err(|e| Error::query_with_source(sql, e))?;

        debug!(params = statement.num_params(), "Prepared MySQL statement");

        Ok(Box::new(MySqlStatement {
            conn: Arc::clone(&self.conn),
            statement,
            sql: sql.to_string(),
            current: BTreeMap::new(),
            batch: Vec::new(),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.disconnect()
                .await
                .map_err(|e| Error::connection_with_source("failed to close connection", e))?;
        }
        Ok(())
    }
}

/// MySQL prepared statement
pub struct MySqlStatement {
    conn: SharedConn,
    statement: mysql_async::Statement,
    sql: String,
    current: BTreeMap<usize, Param>,
    batch: Vec<Vec<mysql_async::Value>>,
}

#[async_trait]
impl PreparedStatement for MySqlStatement {
    fn bind(&mut self, position: usize, param: Param) -> Result<()> {
        let expected = usize::from(self.statement.num_params());
        if position == 0 || position > expected {
            return Err(Error::query_with_sql(
                format!("parameter index {} out of range 1..={}", position, expected),
                &self.sql,
            ));
        }
        self.current.insert(position, param);
        Ok(())
    }

    fn add_batch(&mut self) -> Result<()> {
        let expected = usize::from(self.statement.num_params());
        if self.current.len() != expected {
            return Err(Error::query_with_sql(
                format!("{} of {} parameters bound", self.current.len(), expected),
                &self.sql,
            ));
        }
        let row = std::mem::take(&mut self.current)
            .values()
            .map(param_to_sql)
            .collect();
        self.batch.push(row);
        Ok(())
    }

    fn batch_len(&self) -> usize {
        self.batch.len()
    }

    async fn execute_batch(&mut self) -> Result<Vec<u64>> {
        let rows = std::mem::take(&mut self.batch);
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| Error::connection("connection is closed"))?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            conn.exec_drop(self.statement.clone(), row)
                .await
                .map_err(|e| Error::query_with_source(self.sql.as_str(), e))?;
            counts.push(conn.affected_rows());
        }
        Ok(counts)
    }

    async fn close(&mut self) -> Result<()> {
        self.current.clear();
        self.batch.clear();
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_mut() {
            conn.close(self.statement.clone())
                .await
                .map_err(|e| Error::query_with_source(self.sql.as_str(), e))?;
        }
        Ok(())
    }

    fn sql(&self) -> &str {
        &self.sql
    }
}

//! PostgreSQL backend implementation for sluice-rdbc
//!
//! Provides:
//! - Connection establishment via tokio-postgres, with credentials applied
//!   on top of the URL
//! - Prepared statements whose batches are pipelined over the connection
//! - Typed NULL binding, so a NULL passes the server's parameter type check

use async_trait::async_trait;
use bytes::BytesMut;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_postgres::types::{IsNull, ToSql, Type};
use tracing::{debug, warn};

use crate::connection::{Connection, ConnectionConfig, Driver, PreparedStatement};
use crate::error::{Error, Result};
use crate::types::{Param, SqlType, TypedValue, Value};

type BoxedParam = Box<dyn ToSql + Sync + Send>;

/// A NULL that is accepted for a parameter of any type
#[derive(Debug)]
struct UntypedNull;

impl ToSql for UntypedNull {
    fn to_sql(
        &self,
        _ty: &Type,
        _out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

/// NULL of the Rust type tokio-postgres maps the declared SQL type to
fn typed_null(sql_type: SqlType) -> BoxedParam {
    match sql_type {
        SqlType::Boolean | SqlType::Bit => Box::new(Option::<bool>::None),
        SqlType::Char
        | SqlType::NChar
        | SqlType::Varchar
        | SqlType::LongVarchar
        | SqlType::LongNVarchar => Box::new(Option::<String>::None),
        SqlType::TinyInt | SqlType::SmallInt => Box::new(Option::<i16>::None),
        SqlType::Integer => Box::new(Option::<i32>::None),
        SqlType::BigInt => Box::new(Option::<i64>::None),
        SqlType::Real => Box::new(Option::<f32>::None),
        SqlType::Float | SqlType::Double => Box::new(Option::<f64>::None),
        SqlType::Decimal | SqlType::Numeric => Box::new(Option::<rust_decimal::Decimal>::None),
        SqlType::Date => Box::new(Option::<chrono::NaiveDate>::None),
        SqlType::Time => Box::new(Option::<chrono::NaiveTime>::None),
        SqlType::Timestamp => Box::new(Option::<chrono::NaiveDateTime>::None),
        SqlType::Binary | SqlType::VarBinary | SqlType::LongVarBinary => {
            Box::new(Option::<Vec<u8>>::None)
        }
        SqlType::Null | SqlType::Other(_) => Box::new(UntypedNull),
    }
}

fn typed_to_sql(value: &TypedValue) -> BoxedParam {
    match value {
        TypedValue::Boolean(b) => Box::new(*b),
        TypedValue::String(s) => Box::new(s.clone()),
        // PostgreSQL has no one-byte integer column type
        TypedValue::Byte(n) => Box::new(i16::from(*n)),
        TypedValue::Short(n) => Box::new(*n),
        TypedValue::Int(n) => Box::new(*n),
        TypedValue::Long(n) => Box::new(*n),
        TypedValue::Float(n) => Box::new(*n),
        TypedValue::Double(n) => Box::new(*n),
        TypedValue::Decimal(d) => Box::new(*d),
        TypedValue::Date(d) => Box::new(*d),
        TypedValue::Time(t) => Box::new(*t),
        TypedValue::Timestamp(dt) => Box::new(*dt),
        TypedValue::Bytes(b) => Box::new(b.clone()),
    }
}

fn value_to_sql(value: &Value) -> BoxedParam {
    match value {
        Value::Null => Box::new(UntypedNull),
        Value::Bool(b) => Box::new(*b),
        Value::Int8(n) => Box::new(i16::from(*n)),
        Value::Int16(n) => Box::new(*n),
        Value::Int32(n) => Box::new(*n),
        Value::Int64(n) => Box::new(*n),
        Value::Float32(n) => Box::new(*n),
        Value::Float64(n) => Box::new(*n),
        Value::Decimal(d) => Box::new(*d),
        Value::String(s) => Box::new(s.clone()),
        Value::Bytes(b) => Box::new(b.clone()),
        Value::Date(d) => Box::new(*d),
        Value::Time(t) => Box::new(*t),
        Value::DateTime(dt) => Box::new(*dt),
        Value::DateTimeTz(dt) => Box::new(*dt),
        Value::Uuid(u) => Box::new(*u),
        Value::Json(j) => Box::new(j.clone()),
    }
}

/// Convert a bound parameter to a tokio-postgres parameter
fn param_to_sql(param: &Param) -> BoxedParam {
    match param {
        Param::Null(sql_type) => typed_null(*sql_type),
        Param::Typed(_, value) => typed_to_sql(value),
        Param::Object(value) => value_to_sql(value),
    }
}

/// PostgreSQL driver
#[derive(Debug, Clone, Copy, Default)]
pub struct PgDriver;

impl PgDriver {
    fn client_config(config: &ConnectionConfig) -> Result<tokio_postgres::Config> {
        let mut pg_config: tokio_postgres::Config = config
            .url
            .parse()
            .map_err(|e| Error::config(format!("Invalid PostgreSQL URL: {}", e)))?;

        if let Some(credentials) = &config.credentials {
            pg_config.user(&credentials.username);
            pg_config.password(&credentials.password);
        }
        Ok(pg_config)
    }
}

#[async_trait]
impl Driver for PgDriver {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let pg_config = Self::client_config(config)?;
        let (client, connection) = pg_config
            .connect(tokio_postgres::NoTls)
            .await
            .map_err(|e| Error::connection_with_source("failed to connect", e))?;

        // Drive the socket until the client is dropped
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "PostgreSQL connection terminated with error");
            }
        });

        Ok(Box::new(PgConnection {
            client: Some(Arc::new(client)),
        }))
    }
}

/// PostgreSQL connection implementation
pub struct PgConnection {
    client: Option<Arc<tokio_postgres::Client>>,
}

impl PgConnection {
    fn client(&self) -> Result<&Arc<tokio_postgres::Client>> {
        self.client
            .as_ref()
            .ok_or_else(|| Error::connection("connection is closed"))
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        let client = Arc::clone(self.client()?);
        let statement = client
            .prepare(sql)
            .await
            .map_err(|e| Error::query_with_source(sql, e))?;

        debug!(params = statement.params().len(), "Prepared PostgreSQL statement");

        Ok(Box::new(PgPreparedStatement {
            client,
            statement,
            sql: sql.to_string(),
            current: BTreeMap::new(),
            batch: Vec::new(),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the last client handle ends the connection task
        self.client = None;
        Ok(())
    }
}

/// PostgreSQL prepared statement
pub struct PgPreparedStatement {
    client: Arc<tokio_postgres::Client>,
    statement: tokio_postgres::Statement,
    sql: String,
    current: BTreeMap<usize, Param>,
    batch: Vec<Vec<Param>>,
}

#[async_trait]
impl PreparedStatement for PgPreparedStatement {
    fn bind(&mut self, position: usize, param: Param) -> Result<()> {
        let expected = self.statement.params().len();
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
        let expected = self.statement.params().len();
        if self.current.len() != expected {
            return Err(Error::query_with_sql(
                format!(
                    "{} of {} parameters bound",
                    self.current.len(),
                    expected
                ),
                &self.sql,
            ));
        }
        let row = std::mem::take(&mut self.current).into_values().collect();
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

        let boxed: Vec<Vec<BoxedParam>> = rows
            .iter()
            .map(|row| row.iter().map(param_to_sql).collect())
            .collect();

        let client = &self.client;
        let statement = &self.statement;
        let pending = boxed.iter().map(|params| {
            let refs: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|b| b.as_ref() as &(dyn ToSql + Sync))
                .collect();
            async move { client.execute(statement, &refs).await }
        });

        // Polled together, the executions share round trips
        futures::future::join_all(pending)
            .await
            .into_iter()
            .collect::<std::result::Result<Vec<u64>, _>>()
            .map_err(|e| Error::query_with_source(self.sql.as_str(), e))
    }

    async fn close(&mut self) -> Result<()> {
        self.current.clear();
        self.batch.clear();
        Ok(())
    }

    fn sql(&self) -> &str {
        &self.sql
    }
}

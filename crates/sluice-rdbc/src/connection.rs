//! Connection traits for sluice-rdbc
//!
//! The three primitives a batch writer needs from a database:
//! - Driver: establish a connection from a URL and optional credentials
//! - Connection: prepare a statement, close
//! - PreparedStatement: bind, add to batch, execute batch, close

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Param;

/// A database driver, the factory for connections
#[async_trait]
pub trait Driver: Send + Sync {
    /// Short name of the driver (e.g. "postgres")
    fn name(&self) -> &str;

    /// Establish a new connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>>;
}

/// A connection to a database, exclusively owned by its user
#[async_trait]
pub trait Connection: Send {
    /// Prepare a parameterized statement for repeated batched execution
    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn PreparedStatement>>;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;
}

/// A prepared statement that accumulates parameter rows into a batch
///
/// Positions are 1-based, like the placeholders they fill.
#[async_trait]
pub trait PreparedStatement: Send {
    /// Bind a parameter of the current row
    fn bind(&mut self, position: usize, param: Param) -> Result<()>;

    /// Move the current row into the batch and start a new one
    fn add_batch(&mut self) -> Result<()>;

    /// Number of rows waiting in the batch
    fn batch_len(&self) -> usize;

    /// Execute every batched row; returns the affected-row count per row
    ///
    /// The batch is emptied whether or not execution succeeds.
    async fn execute_batch(&mut self) -> Result<Vec<u64>>;

    /// Release the statement
    async fn close(&mut self) -> Result<()>;

    /// Get the SQL string
    fn sql(&self) -> &str;
}

/// Username and password presented when connecting
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// Password (may be empty)
    pub password: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Configuration for creating connections
#[derive(Clone, Default)]
pub struct ConnectionConfig {
    /// Connection URL (e.g., postgres://host:5432/db)
    pub url: String,
    /// Credentials supplied separately from the URL
    pub credentials: Option<Credentials>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &redact_url(&self.url))
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl ConnectionConfig {
    /// Create configuration with just a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// Replace the password of a URL with `***` so it can be logged.
///
/// Strings that do not parse as URLs (e.g. `jdbc:test`) are returned as-is
/// unless they contain an `@`, in which case they are fully masked.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        Ok(_) => raw.to_string(),
        Err(_) if raw.contains('@') => "***".to_string(),
        Err(_) => raw.to_string(),
    }
}

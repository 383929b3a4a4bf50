//! Sink builder
//!
//! Setters only store what they are given; everything is checked in
//! [`SinkBuilder::finish`].

use sluice_rdbc::connection::Credentials;
use sluice_rdbc::driver::DriverRegistry;
use sluice_rdbc::SqlType;
use std::sync::Arc;
use tracing::info;

use crate::config::{SinkConfig, DEFAULT_BATCH_SIZE};
use crate::error::{Result, SinkError};
use crate::settings::SinkSettings;
use crate::writer::BatchWriter;

/// Builder for [`BatchWriter`]s
#[derive(Clone, Default)]
pub struct SinkBuilder {
    driver: Option<String>,
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    insert_statement: Option<String>,
    batch_size: Option<usize>,
    column_types: Option<Vec<SqlType>>,
    registry: Option<Arc<DriverRegistry>>,
}

impl SinkBuilder {
    /// Create a builder with nothing set
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from a settings document
    pub fn from_settings(settings: &SinkSettings) -> Self {
        let mut builder = Self::new()
            .driver(settings.driver.clone())
            .url(settings.url.clone())
            .insert_statement(settings.insert_statement.clone())
            .batch_size(settings.batch_size);
        if let Some(username) = &settings.username {
            builder = builder.username(username.clone());
        }
        if let Some(password) = &settings.password {
            builder = builder.password(password.expose_secret());
        }
        if let Some(types) = &settings.column_types {
            builder = builder.column_types(types.clone());
        }
        builder
    }

    /// Driver name or alias to resolve at open time
    pub fn driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    /// Database URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Database user
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Database password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Parameterized insert statement, one placeholder per record field
    pub fn insert_statement(mut self, sql: impl Into<String>) -> Self {
        self.insert_statement = Some(sql.into());
        self
    }

    /// Records per batch (default: 5000)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// SQL type of each placeholder, in order
    pub fn column_types(mut self, types: impl Into<Vec<SqlType>>) -> Self {
        self.column_types = Some(types.into());
        self
    }

    /// Registry to resolve the driver in (default: every driver compiled in)
    pub fn registry(mut self, registry: impl Into<Arc<DriverRegistry>>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    /// Validate the settings and create an unopened writer
    ///
    /// Missing credentials are allowed; their absence is only logged.
    pub fn finish(&self) -> Result<BatchWriter> {
        let url = required(&self.url, "No database URL supplied")?;
        let insert_statement = required(&self.insert_statement, "No insert statement supplied")?;
        let driver = required(&self.driver, "No driver supplied")?;

        let batch_size = self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(SinkError::config("Batch size must be at least 1"));
        }

        if self.username.is_none() {
            info!("Username was not supplied");
        }
        if self.password.is_none() {
            info!("Password was not supplied");
        }

        let credentials = self.username.as_ref().map(|username| {
            Credentials::new(username.clone(), self.password.clone().unwrap_or_default())
        });

        let config = SinkConfig {
            driver,
            url,
            credentials,
            insert_statement,
            batch_size,
            column_types: self.column_types.clone(),
        };
        let registry = self
            .registry
            .clone()
            .unwrap_or_else(|| Arc::new(DriverRegistry::with_defaults()));

        Ok(BatchWriter::new(config, registry))
    }
}

fn required(field: &Option<String>, message: &str) -> Result<String> {
    match field.as_deref() {
        Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
        _ => Err(SinkError::config(message)),
    }
}

impl std::fmt::Debug for SinkBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkBuilder")
            .field("driver", &self.driver)
            .field("url", &self.url.as_deref().map(sluice_rdbc::connection::redact_url))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("insert_statement", &self.insert_statement)
            .field("batch_size", &self.batch_size)
            .field("column_types", &self.column_types)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WriterState;
    use tracing_test::traced_test;

    fn complete() -> SinkBuilder {
        SinkBuilder::new()
            .driver("memory")
            .url("jdbc:test")
            .insert_statement("INSERT INTO t VALUES (?, ?)")
    }

    #[test]
    fn test_defaults() {
        let writer = complete().finish().unwrap();
        assert_eq!(writer.config().batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(writer.config().credentials, None);
        assert_eq!(writer.state(), WriterState::Unopened);
    }

    #[test]
    fn test_missing_url() {
        let err = SinkBuilder::new()
            .driver("memory")
            .insert_statement("INSERT")
            .finish()
            .unwrap_err();
        assert!(err.to_string().contains("URL"));
    }

    #[test]
    fn test_missing_statement() {
        let err = SinkBuilder::new()
            .driver("memory")
            .url("jdbc:test")
            .finish()
            .unwrap_err();
        assert!(matches!(err, SinkError::Configuration { .. }));
    }

    #[test]
    fn test_missing_driver() {
        let err = SinkBuilder::new()
            .url("jdbc:test")
            .insert_statement("INSERT")
            .finish()
            .unwrap_err();
        assert!(err.to_string().contains("driver"));
    }

    #[test]
    fn test_empty_values_rejected() {
        let err = complete().url("").finish().unwrap_err();
        assert!(err.to_string().contains("URL"));

        let err = complete().driver("  ").finish().unwrap_err();
        assert!(err.to_string().contains("driver"));

        let err = complete().insert_statement("\n").finish().unwrap_err();
        assert!(err.to_string().contains("insert statement"));
    }

    #[test]
    fn test_zero_batch_size() {
        assert!(complete().batch_size(0).finish().is_err());
    }

    #[test]
    fn test_username_without_password() {
        let writer = complete().username("writer").finish().unwrap();
        assert_eq!(
            writer.config().credentials,
            Some(Credentials::new("writer", ""))
        );
    }

    #[test]
    fn test_password_without_username_is_ignored() {
        let writer = complete().password("pw").finish().unwrap();
        assert_eq!(writer.config().credentials, None);
    }

    #[traced_test]
    #[test]
    fn test_missing_credentials_logged() {
        complete().finish().unwrap();
        assert!(logs_contain("Username was not supplied"));
        assert!(logs_contain("Password was not supplied"));
    }

    #[test]
    fn test_finish_twice_gives_independent_writers() {
        let builder = complete().batch_size(10);
        let a = builder.finish().unwrap();
        let b = builder.finish().unwrap();
        assert_eq!(a.config(), b.config());
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", complete().password("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}

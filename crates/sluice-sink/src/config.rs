//! Validated sink configuration

use sluice_rdbc::connection::{redact_url, ConnectionConfig, Credentials};
use sluice_rdbc::SqlType;

/// Number of records per batch when none is configured
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Configuration of a [`BatchWriter`](crate::BatchWriter)
///
/// Produced by [`SinkBuilder::finish`](crate::SinkBuilder::finish) and never
/// changed afterwards.
#[derive(Clone, PartialEq)]
pub struct SinkConfig {
    /// Driver name resolved in the registry at open time
    pub driver: String,
    /// Database URL
    pub url: String,
    /// Present when a username was supplied
    pub credentials: Option<Credentials>,
    /// Parameterized insert statement
    pub insert_statement: String,
    /// Records per batch, at least 1
    pub batch_size: usize,
    /// One declared type per placeholder
    pub column_types: Option<Vec<SqlType>>,
}

impl SinkConfig {
    /// Connection settings handed to the driver
    pub fn connection_config(&self) -> ConnectionConfig {
        let config = ConnectionConfig::new(self.url.clone());
        match &self.credentials {
            Some(credentials) => config.with_credentials(credentials.clone()),
            None => config,
        }
    }

    /// Number of declared column types, if any were configured
    pub fn column_count(&self) -> Option<usize> {
        self.column_types.as_ref().map(Vec::len)
    }
}

impl std::fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkConfig")
            .field("driver", &self.driver)
            .field("url", &redact_url(&self.url))
            .field("credentials", &self.credentials)
            .field("insert_statement", &self.insert_statement)
            .field("batch_size", &self.batch_size)
            .field("column_types", &self.column_types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SinkConfig {
        SinkConfig {
            driver: "memory".into(),
            url: "postgres://app:hunter2@db/app".into(),
            credentials: Some(Credentials::new("writer", "s3cret")),
            insert_statement: "INSERT INTO t VALUES (?)".into(),
            batch_size: DEFAULT_BATCH_SIZE,
            column_types: Some(vec![SqlType::Integer]),
        }
    }

    #[test]
    fn test_connection_config_carries_credentials() {
        let conn = config().connection_config();
        assert_eq!(conn.url, "postgres://app:hunter2@db/app");
        assert_eq!(conn.credentials, Some(Credentials::new("writer", "s3cret")));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("writer"));
    }

    #[test]
    fn test_column_count() {
        assert_eq!(config().column_count(), Some(1));
        let untyped = SinkConfig {
            column_types: None,
            ..config()
        };
        assert_eq!(untyped.column_count(), None);
    }
}

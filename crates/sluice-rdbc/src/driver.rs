//! Driver registry
//!
//! Resolves a driver identifier, as found in sink configuration, to a
//! [`Driver`]. Identifiers are matched case-insensitively and a driver may be
//! registered under several aliases (a short name and the class name JDBC
//! users are used to, for example).

use std::collections::HashMap;
use std::sync::Arc;

use crate::connection::Driver;
use crate::error::{Error, Result};
use crate::memory::MemoryDriver;

/// Name-keyed set of available drivers
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every driver compiled into this build
    ///
    /// - `memory` (always)
    /// - `postgres`, `postgresql`, `org.postgresql.Driver` (feature `postgres`)
    /// - `mysql`, `mariadb`, `com.mysql.cj.jdbc.Driver`, `com.mysql.jdbc.Driver`
    ///   (feature `mysql`)
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("memory", Arc::new(MemoryDriver::new()));

        #[cfg(feature = "postgres")]
        registry.register_aliases(
            &["postgres", "postgresql", "org.postgresql.Driver"],
            Arc::new(crate::postgres::PgDriver),
        );

        #[cfg(feature = "mysql")]
        registry.register_aliases(
            &[
                "mysql",
                "mariadb",
                "com.mysql.cj.jdbc.Driver",
                "com.mysql.jdbc.Driver",
            ],
            Arc::new(crate::mysql::MySqlDriver),
        );

        registry
    }

    /// Register a driver under a name, replacing any previous entry
    pub fn register(&mut self, name: impl AsRef<str>, driver: Arc<dyn Driver>) -> &mut Self {
        self.drivers
            .insert(name.as_ref().to_ascii_lowercase(), driver);
        self
    }

    /// Register one driver under several names
    pub fn register_aliases(&mut self, names: &[&str], driver: Arc<dyn Driver>) -> &mut Self {
        for name in names {
            self.register(name, Arc::clone(&driver));
        }
        self
    }

    /// Builder-style registration
    pub fn with_driver(mut self, name: impl AsRef<str>, driver: Arc<dyn Driver>) -> Self {
        self.register(name, driver);
        self
    }

    /// Look up a driver by name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Driver>> {
        self.drivers
            .get(&name.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| Error::driver_not_found(name))
    }

    /// Whether a driver is registered under this name
    pub fn contains(&self, name: &str) -> bool {
        self.drivers
            .contains_key(&name.trim().to_ascii_lowercase())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}

//! Sink settings documents
//!
//! A [`SinkSettings`] document carries the same fields as the builder
//! setters and can be loaded from YAML or JSON:
//!
//! ```yaml
//! driver: org.postgresql.Driver
//! url: postgres://db.internal:5432/library
//! username: writer
//! password: ${SINK_DB_PASSWORD}
//! insert_statement: INSERT INTO books (id, title, price) VALUES ($1, $2, $3)
//! batch_size: ${SINK_BATCH_SIZE:-5000}
//! column_types: [INTEGER, VARCHAR, DECIMAL]
//! ```
//!
//! `${VAR}` and `${VAR:-default}` are replaced with environment variables
//! before parsing.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sluice_rdbc::SqlType;
use std::path::Path;
use std::sync::LazyLock;
use validator::Validate;

use crate::config::DEFAULT_BATCH_SIZE;
use crate::error::{Result, SinkError};
use crate::secret::SensitiveString;

/// Pattern: ${VAR} or ${VAR:-default}
static ENV_VAR_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("env var regex pattern is invalid - this is a bug")
});

/// Deserializable sink settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, JsonSchema)]
pub struct SinkSettings {
    /// Driver name or alias, e.g. `postgres` or `org.postgresql.Driver`
    #[validate(length(min = 1))]
    pub driver: String,

    /// Database URL
    #[validate(length(min = 1))]
    pub url: String,

    /// Database user
    #[serde(default)]
    pub username: Option<String>,

    /// Database password
    #[serde(default)]
    pub password: Option<SensitiveString>,

    /// Parameterized insert statement
    #[validate(length(min = 1))]
    pub insert_statement: String,

    /// Records per batch (default: 5000)
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1))]
    pub batch_size: usize,

    /// SQL type of each placeholder, by name (`VARCHAR`) or JDBC code (`12`)
    #[serde(default)]
    #[schemars(with = "Option<Vec<String>>")]
    pub column_types: Option<Vec<SqlType>>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl SinkSettings {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let settings: Self = serde_yaml::from_str(&expanded)
            .map_err(|e| SinkError::config(format!("Failed to parse settings: {}", e)))?;
        settings.check()?;
        Ok(settings)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let settings: Self = serde_json::from_str(&expanded)
            .map_err(|e| SinkError::config(format!("Failed to parse settings: {}", e)))?;
        settings.check()?;
        Ok(settings)
    }

    /// Load settings from a file; `.json` files are read as JSON, anything
    /// else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SinkError::config(format!(
                "Failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// JSON schema of the settings document
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SinkSettings)
    }

    fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| SinkError::config(format!("Invalid settings: {}", e)))
    }
}

/// Expand environment variables in the format ${VAR} or ${VAR:-default}
///
/// Unset variables without a default expand to the empty string.
pub fn expand_env_vars(content: &str) -> String {
    ENV_VAR_REGEX
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map(|m| m.as_str());

            std::env::var(var_name).unwrap_or_else(|_| default.unwrap_or("").to_string())
        })
        .to_string()
}

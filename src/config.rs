//! Connection configuration

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Default database: a private in-memory SQLite database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// Settings consumed by [`crate::SqliteConnection::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrmConfig {
    /// SQLite URL (`sqlite://path/to.db`, `sqlite::memory:`)
    pub database_url: String,

    /// Create the database file if it does not exist
    pub create_if_missing: bool,

    /// How long a statement waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            create_if_missing: true,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl OrmConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables, reading `.env` first
    /// when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        // Prefer the crate-specific variable, fall back to DATABASE_URL
        let database_url = lookup("UNIKORM_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .unwrap_or(defaults.database_url);

        let create_if_missing = lookup("UNIKORM_CREATE_IF_MISSING")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.create_if_missing);

        let busy_timeout = match lookup("UNIKORM_BUSY_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse()
                    .with_context(|| format!("Invalid UNIKORM_BUSY_TIMEOUT_MS '{ms}'"))?,
            ),
            None => defaults.busy_timeout,
        };

        Ok(Self {
            database_url,
            create_if_missing,
            busy_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = OrmConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, OrmConfig::default());
        assert_eq!(config.database_url, "sqlite::memory:");
    }

    #[test]
    fn test_crate_variable_wins() {
        let config = OrmConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://other.db"),
            ("UNIKORM_DATABASE_URL", "sqlite://orm_test.db"),
            ("UNIKORM_CREATE_IF_MISSING", "0"),
            ("UNIKORM_BUSY_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite://orm_test.db");
        assert!(!config.create_if_missing);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_timeout() {
        let err = OrmConfig::from_lookup(lookup(&[("UNIKORM_BUSY_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("UNIKORM_BUSY_TIMEOUT_MS"));
    }
}

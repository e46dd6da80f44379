//! CLI configuration loaded from environment variables.
//!
//! All settings come from the process environment, optionally seeded from a
//! `.env` file via `dotenvy`. Keys:
//!
//! | key | default |
//! |---|---|
//! | `DATABASE_URL` | required |
//! | `DATABASE_MAX_CONNECTIONS` | 10 |
//! | `DATABASE_CONNECT_TIMEOUT_SECS` | 5 |
//! | `LOG_FORMAT` | `json` (or `pretty`) |

use std::str::FromStr;
use std::time::Duration;

use chronicle_event_store::StoreConfig;

use crate::error::CliError;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("unknown log format {other:?} (expected json or pretty)")),
        }
    }
}

/// Top-level CLI configuration.
///
/// Loaded once at startup via [`ChronicleConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChronicleConfig {
    /// Event store connection settings.
    pub store: StoreConfig,
    /// Log output format.
    pub log_format: LogFormat,
}

impl ChronicleConfig {
    /// Loads configuration from the process environment after reading an
    /// optional `.env` file.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, CliError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| CliError::Config("DATABASE_URL must be set".to_owned()))?;

        let mut store = StoreConfig::new(database_url);
        store.max_connections =
            parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", store.max_connections)?;
        store.connect_timeout = Duration::from_secs(parse_or(
            &lookup,
            "DATABASE_CONNECT_TIMEOUT_SECS",
            store.connect_timeout.as_secs(),
        )?);

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| CliError::Config(format!("LOG_FORMAT: {e}")))?,
            None => LogFormat::default(),
        };

        Ok(Self { store, log_format })
    }
}

/// Parses `key` as `T`, returning `default` when it is unset.
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, CliError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CliError::Config(format!("{key} must be a valid number: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ChronicleConfig, CliError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ChronicleConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_only_database_url_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/chronicle")]).unwrap();

        assert_eq!(config.store.database_url, "postgres://localhost/chronicle");
        assert_eq!(config.store.max_connections, 10);
        assert_eq!(config.store.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/chronicle"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("DATABASE_CONNECT_TIMEOUT_SECS", " 30 "),
            ("LOG_FORMAT", "Pretty"),
        ])
        .unwrap();

        assert_eq!(config.store.max_connections, 25);
        assert_eq!(config.store.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_missing_database_url_is_rejected() {
        let result = load(&[("LOG_FORMAT", "json")]);

        match result {
            Err(CliError::Config(msg)) => assert_eq!(msg, "DATABASE_URL must be set"),
            other => panic!("expected Config, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_number_names_the_key() {
        let result = load(&[
            ("DATABASE_URL", "postgres://db/chronicle"),
            ("DATABASE_MAX_CONNECTIONS", "lots"),
        ]);

        match result {
            Err(CliError::Config(msg)) => assert!(msg.starts_with("DATABASE_MAX_CONNECTIONS")),
            other => panic!("expected Config, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_database_url_is_rejected() {
        let result = load(&[("DATABASE_URL", "   ")]);

        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let result = load(&[
            ("DATABASE_URL", "postgres://db/chronicle"),
            ("LOG_FORMAT", "xml"),
        ]);

        assert!(matches!(result, Err(CliError::Config(_))));
    }
}

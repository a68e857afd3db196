//! Client configuration from TOML and the environment.
//!
//! Values resolve in this order: built-in defaults, then the TOML file (if
//! any), then `DISCOVER_*` environment variables. The result is validated
//! before it is returned.
//!
//! ```toml
//! [lease]
//! ttl_ms = 10000
//! renew_interval_ms = 5000
//!
//! [directory]
//! list_max_attempts = 3
//!
//! [election]
//! poll_interval_ms = 100
//! ```

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use discover_coordination::DirectoryConfig;
use discover_coordination::DiscoverClient;
use discover_coordination::DiscoverError;
use discover_coordination::ElectionConfig;
use discover_coordination::LeaseConfig;
use discover_core::RegistryBackend;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Errors building a [`DiscoverConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment override could not be parsed.
    #[error("invalid configuration for {key}: '{value}' ({reason})")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
        /// Parse failure.
        reason: String,
    },

    /// The TOML document is malformed or has unknown types.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Source of the document.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: toml::de::Error,
    },

    /// Values parsed but do not work together.
    #[error(transparent)]
    Invalid(#[from] DiscoverError),
}

/// Full client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverConfig {
    /// Lease and backend call settings.
    #[serde(default)]
    pub lease: LeaseConfig,

    /// Discovery lookup settings.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Standby election settings.
    #[serde(default)]
    pub election: ElectionConfig,
}

impl DiscoverConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                Self::parse(&text, path)?
            }
            None => Self::default(),
        };
        config
            .apply_env(|key| std::env::var(key).ok())
            .context("failed to apply DISCOVER_* environment overrides")?;
        config.validate().context("invalid discover configuration")?;
        Ok(config)
    }

    /// Parse a TOML document. Missing tables and keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(text, Path::new("<inline>"))?;
        config.validate()?;
        Ok(config)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from environment variables looked up through `lookup`.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `DISCOVER_LEASE_TTL_MS` | `lease.ttl_ms` |
    /// | `DISCOVER_RENEW_INTERVAL_MS` | `lease.renew_interval_ms` |
    /// | `DISCOVER_RENEW_MAX_ATTEMPTS` | `lease.renew_max_attempts` |
    /// | `DISCOVER_RENEW_INITIAL_BACKOFF_MS` | `lease.renew_initial_backoff_ms` |
    /// | `DISCOVER_RENEW_MAX_BACKOFF_MS` | `lease.renew_max_backoff_ms` |
    /// | `DISCOVER_REGISTER_MAX_ATTEMPTS` | `lease.register_max_attempts` |
    /// | `DISCOVER_DELETE_MAX_ATTEMPTS` | `lease.delete_max_attempts` |
    /// | `DISCOVER_CALL_TIMEOUT_MS` | `lease.call_timeout_ms` |
    /// | `DISCOVER_LIST_MAX_ATTEMPTS` | `directory.list_max_attempts` |
    /// | `DISCOVER_ELECTION_POLL_INTERVAL_MS` | `election.poll_interval_ms` |
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where F: Fn(&str) -> Option<String> {
        override_from(&lookup, "DISCOVER_LEASE_TTL_MS", &mut self.lease.ttl_ms)?;
        override_from(&lookup, "DISCOVER_RENEW_INTERVAL_MS", &mut self.lease.renew_interval_ms)?;
        override_from(&lookup, "DISCOVER_RENEW_MAX_ATTEMPTS", &mut self.lease.renew_max_attempts)?;
        override_from(&lookup, "DISCOVER_RENEW_INITIAL_BACKOFF_MS", &mut self.lease.renew_initial_backoff_ms)?;
        override_from(&lookup, "DISCOVER_RENEW_MAX_BACKOFF_MS", &mut self.lease.renew_max_backoff_ms)?;
        override_from(&lookup, "DISCOVER_REGISTER_MAX_ATTEMPTS", &mut self.lease.register_max_attempts)?;
        override_from(&lookup, "DISCOVER_DELETE_MAX_ATTEMPTS", &mut self.lease.delete_max_attempts)?;
        override_from(&lookup, "DISCOVER_CALL_TIMEOUT_MS", &mut self.lease.call_timeout_ms)?;
        override_from(&lookup, "DISCOVER_LIST_MAX_ATTEMPTS", &mut self.directory.list_max_attempts)?;
        override_from(&lookup, "DISCOVER_ELECTION_POLL_INTERVAL_MS", &mut self.election.poll_interval_ms)?;
        Ok(())
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lease.validate()?;
        self.directory.validate()?;
        self.election.validate()?;
        Ok(())
    }

    /// Build a client against `backend` with these settings.
    pub fn connect(&self, backend: Arc<dyn RegistryBackend>) -> Result<DiscoverClient, DiscoverError> {
        DiscoverClient::with_config(backend, self.lease.clone(), self.directory.clone(), self.election.clone())
    }
}

fn override_from<F, T>(lookup: &F, key: &str, field: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = lookup(key) {
        *field = value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(DiscoverConfig::from_toml_str("").unwrap(), DiscoverConfig::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = DiscoverConfig::from_toml_str(
            r#"
            [lease]
            ttl_ms = 4000
            renew_interval_ms = 1000

            [election]
            poll_interval_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.lease.ttl_ms, 4_000);
        assert_eq!(config.lease.renew_interval_ms, 1_000);
        assert_eq!(config.lease.delete_max_attempts, LeaseConfig::default().delete_max_attempts);
        assert_eq!(config.election.poll_interval_ms, 250);
        assert_eq!(config.directory, DirectoryConfig::default());
    }

    #[test]
    fn inconsistent_values_are_rejected() {
        let err = DiscoverConfig::from_toml_str(
            r#"
            [lease]
            ttl_ms = 1000
            renew_interval_ms = 2000
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(DiscoverError::InvalidConfig { .. })));
    }

    #[test]
    fn call_timeout_longer_than_the_lease_slack_is_rejected() {
        let err = DiscoverConfig::from_toml_str(
            r#"
            [lease]
            ttl_ms = 10000
            renew_interval_ms = 5000
            call_timeout_ms = 60000
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(DiscoverError::InvalidConfig { .. })));

        let mut config = DiscoverConfig::default();
        config.apply_env(env(&[("DISCOVER_RENEW_INTERVAL_MS", "9000")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = DiscoverConfig::from_toml_str("[lease]\nttl_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = DiscoverConfig::default();
        config
            .apply_env(env(&[("DISCOVER_LEASE_TTL_MS", "20000"), ("DISCOVER_ELECTION_POLL_INTERVAL_MS", " 50 ")]))
            .unwrap();

        assert_eq!(config.lease.ttl_ms, 20_000);
        assert_eq!(config.election.poll_interval_ms, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unparsable_env_value_names_the_key() {
        let mut config = DiscoverConfig::default();
        let err = config.apply_env(env(&[("DISCOVER_RENEW_MAX_ATTEMPTS", "many")])).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "DISCOVER_RENEW_MAX_ATTEMPTS");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[directory]\nlist_max_attempts = 7").unwrap();

        let config = DiscoverConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.directory.list_max_attempts, 7);
    }

    #[test]
    fn load_of_missing_file_has_context() {
        let err = DiscoverConfig::load(Some(Path::new("/nonexistent/discover.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}

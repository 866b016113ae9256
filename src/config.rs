//! Process configuration.
//!
//! Environment variables:
//! - `STORAGE_TYPE`: `memory` or `postgres` (default: memory)
//! - `HOST`: Service host (default: 0.0.0.0)
//! - `PORT`: Service port (default: 8000)
//!
//! PostgreSQL pool settings are read separately by `PostgresConfig::from_env`.

use std::fmt;
use std::str::FromStr;

/// Error type for configuration loading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `STORAGE_TYPE` holds an unknown backend name.
    #[error("Unknown storage type: {0} (expected \"memory\" or \"postgres\")")]
    UnknownStorage(String),
    /// A numeric variable could not be parsed.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Which content store backs the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// Volatile in-process store.
    #[default]
    Memory,
    /// PostgreSQL store.
    Postgres,
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" | "in-memory" => Ok(Self::Memory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(ConfigError::UnknownStorage(other.to_string())),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// Top-level process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// Selected backend.
    pub storage: StorageKind,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::Memory,
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl KernelConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let storage = match lookup("STORAGE_TYPE") {
            Some(raw) => raw.parse::<StorageKind>()?,
            None => defaults.storage,
        };

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: raw,
            })?,
            None => defaults.port,
        };

        Ok(Self {
            storage,
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
        })
    }

    /// `host:port` string for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = KernelConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, KernelConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_storage_type_parsing() {
        let config = KernelConfig::from_lookup(lookup(&[("STORAGE_TYPE", "Postgres")])).unwrap();
        assert_eq!(config.storage, StorageKind::Postgres);

        let err = KernelConfig::from_lookup(lookup(&[("STORAGE_TYPE", "redis")])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownStorage("redis".to_string()));
    }

    #[test]
    fn test_invalid_port() {
        let err = KernelConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));
    }
}

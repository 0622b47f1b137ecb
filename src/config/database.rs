// ABOUTME: Database configuration types for SQLite and PostgreSQL connections keyed by alias
// ABOUTME: Parses connection URLs, alias lists and pool settings from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

use crate::constants::{defaults, env_vars, DEFAULT_CONNECTION_ALIAS};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// Type-safe database URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Path to `SQLite` database file
        path: PathBuf,
    },
    /// `PostgreSQL` connection
    PostgreSQL {
        /// `PostgreSQL` connection string
        connection_string: String,
    },
    /// In-memory `SQLite`
    Memory,
}

impl DatabaseUrl {
    /// Parse from string with validation
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or uses an unsupported scheme
    pub fn parse_url(s: &str) -> AppResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AppError::invalid_config("database URL is empty"));
        }
        if let Some(path_str) = s.strip_prefix("sqlite:") {
            let path_str = path_str.strip_prefix("//").unwrap_or(path_str);
            if path_str == ":memory:" || path_str.is_empty() {
                Ok(Self::Memory)
            } else {
                Ok(Self::SQLite {
                    path: PathBuf::from(path_str),
                })
            }
        } else if s.starts_with("postgresql://") || s.starts_with("postgres://") {
            Ok(Self::PostgreSQL {
                connection_string: s.to_owned(),
            })
        } else if s.contains("://") {
            Err(AppError::invalid_config(format!(
                "unsupported database URL scheme: {s}"
            )))
        } else {
            // Fallback: treat as SQLite file path
            Ok(Self::SQLite {
                path: PathBuf::from(s),
            })
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::PostgreSQL { connection_string } => connection_string.clone(),
            Self::Memory => "sqlite::memory:".into(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    /// Check if this is a `SQLite` database
    #[must_use]
    pub const fn is_sqlite(&self) -> bool {
        matches!(self, Self::SQLite { .. } | Self::Memory)
    }

    /// Check if this is a `PostgreSQL` database
    #[must_use]
    pub const fn is_postgresql(&self) -> bool {
        matches!(self, Self::PostgreSQL { .. })
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::Memory
    }
}

impl Display for DatabaseUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Connection pool settings applied to every alias
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of connections in each pool
    pub max_connections: u32,
    /// Connection acquire timeout in seconds
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::MAX_CONNECTIONS,
            acquire_timeout_secs: defaults::ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    /// Load pool configuration from environment (or defaults)
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_connections: env::var(env_vars::MAX_CONNECTIONS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::MAX_CONNECTIONS),
            acquire_timeout_secs: env::var(env_vars::ACQUIRE_TIMEOUT)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::ACQUIRE_TIMEOUT_SECS),
        }
    }
}

/// All configured connections
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabasesConfig {
    /// URL per alias; always contains the default alias
    pub connections: BTreeMap<String, DatabaseUrl>,
    /// Pool settings
    pub pool: PoolConfig,
    /// Time every statement and keep a per-connection query log
    pub debug: bool,
}

impl DatabasesConfig {
    /// Configuration with only the default alias
    #[must_use]
    pub fn single(url: DatabaseUrl) -> Self {
        let mut connections = BTreeMap::new();
        connections.insert(DEFAULT_CONNECTION_ALIAS.to_owned(), url);
        Self {
            connections,
            pool: PoolConfig::default(),
            debug: false,
        }
    }

    /// Load database configuration from environment
    ///
    /// # Errors
    ///
    /// Returns an error if a URL or the alias list is malformed
    pub fn from_env() -> AppResult<Self> {
        let default_url = DatabaseUrl::parse_url(&env_var_or(
            env_vars::DATABASE_URL,
            defaults::DATABASE_URL,
        ))?;
        let mut config = Self::single(default_url);

        if let Ok(aliases) = env::var(env_vars::DATABASES) {
            config.connections.extend(parse_aliases(&aliases)?);
        }
        config.pool = PoolConfig::from_env();
        config.debug = parse_flag(env_vars::DEBUG)?;
        Ok(config)
    }

    /// URL of the default alias
    #[must_use]
    pub fn default_url(&self) -> Option<&DatabaseUrl> {
        self.connections.get(DEFAULT_CONNECTION_ALIAS)
    }
}

/// Parse `alias=url,alias=url`
///
/// # Errors
///
/// Returns an error if an entry has no `=`, an empty alias, or an invalid URL
pub fn parse_aliases(spec: &str) -> AppResult<BTreeMap<String, DatabaseUrl>> {
    let mut connections = BTreeMap::new();
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (alias, url) = entry.split_once('=').ok_or_else(|| {
            AppError::invalid_config(format!(
                "invalid {} entry '{entry}', expected alias=url",
                env_vars::DATABASES
            ))
        })?;
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(AppError::invalid_config(format!(
                "empty alias in {} entry '{entry}'",
                env_vars::DATABASES
            )));
        }
        connections.insert(alias.to_owned(), DatabaseUrl::parse_url(url)?);
    }
    Ok(connections)
}

/// Parse a boolean flag; unset means false
pub(crate) fn parse_flag(key: &str) -> AppResult<bool> {
    match env::var(key) {
        Err(_) => Ok(false),
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(AppError::invalid_config(format!(
                "Invalid {key} value: {other}"
            ))),
        },
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sqlite_urls() {
        assert_eq!(
            DatabaseUrl::parse_url("sqlite::memory:").unwrap(),
            DatabaseUrl::Memory
        );
        assert_eq!(
            DatabaseUrl::parse_url("sqlite:./data/app.db").unwrap(),
            DatabaseUrl::SQLite {
                path: PathBuf::from("./data/app.db")
            }
        );
        assert_eq!(
            DatabaseUrl::parse_url("reports.db").unwrap(),
            DatabaseUrl::SQLite {
                path: PathBuf::from("reports.db")
            }
        );
    }

    #[test]
    fn test_parse_postgres_url() {
        let url = DatabaseUrl::parse_url("postgres://u:p@localhost/app").unwrap();
        assert!(url.is_postgresql());
        assert_eq!(url.to_connection_string(), "postgres://u:p@localhost/app");
    }

    #[test]
    fn test_rejects_unknown_scheme() {
        assert!(DatabaseUrl::parse_url("mysql://localhost/app").is_err());
        assert!(DatabaseUrl::parse_url("  ").is_err());
    }

    #[test]
    fn test_parse_aliases() {
        let aliases =
            parse_aliases("reporting=sqlite:reports.db, audit = sqlite::memory:").unwrap();
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases["audit"], DatabaseUrl::Memory);
        assert!(parse_aliases("broken").is_err());
        assert!(parse_aliases("=sqlite::memory:").is_err());
    }
}

// ABOUTME: Database connections keyed by alias, statement execution and the debug query log
// ABOUTME: Dispatches to the SQLite or PostgreSQL backend based on the configured URL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

//! # Database Management
//!
//! A [`ConnectionRegistry`] maps aliases to [`ConnectionHandle`]s. Each handle
//! owns a sqlx pool and, in debug mode, a bounded log of executed statements.

/// Row cursor and row mapping type
pub mod cursor;
/// `PostgreSQL` backend
#[cfg(feature = "postgresql")]
pub mod postgres;
/// `SQLite` backend
pub mod sqlite;
/// Named-to-positional placeholder compilation
pub mod statement;

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_stream::try_stream;
use futures_util::{StreamExt, TryStreamExt};
use serde::Serialize;
use sqlx::SqlitePool;
#[cfg(feature = "postgresql")]
use sqlx::PgPool;
use sqltemplate_core::{AppError, AppResult, Params};
use tracing::info;

use crate::config::{DatabaseUrl, DatabasesConfig, PoolConfig};
use crate::constants::{limits, DEFAULT_CONNECTION_ALIAS};
use crate::logging::QueryLogger;

pub use cursor::{Cursor, RowMap, RowStream};
pub use statement::{compile, BindValue, CompiledStatement, PlaceholderStyle};

/// Backend pool
#[derive(Debug, Clone)]
pub enum DatabasePool {
    /// `SQLite` pool
    SQLite(SqlitePool),
    /// `PostgreSQL` pool
    #[cfg(feature = "postgresql")]
    PostgreSQL(PgPool),
}

impl DatabasePool {
    /// Open a pool for `url`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is not compiled in or the connection fails
    pub async fn connect(url: &DatabaseUrl, pool: &PoolConfig) -> AppResult<Self> {
        match url {
            DatabaseUrl::SQLite { .. } | DatabaseUrl::Memory => {
                Ok(Self::SQLite(sqlite::connect(url, pool).await?))
            }
            #[cfg(feature = "postgresql")]
            DatabaseUrl::PostgreSQL { .. } => Ok(Self::PostgreSQL(postgres::connect(url, pool).await?)),
            #[cfg(not(feature = "postgresql"))]
            DatabaseUrl::PostgreSQL { .. } => Err(AppError::invalid_config(
                "PostgreSQL support not enabled. Enable the 'postgresql' feature flag.",
            )),
        }
    }

    /// Backend name for logs
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::SQLite(_) => "sqlite",
            #[cfg(feature = "postgresql")]
            Self::PostgreSQL(_) => "postgresql",
        }
    }

    /// Placeholder syntax the backend expects
    #[must_use]
    pub const fn placeholder_style(&self) -> PlaceholderStyle {
        match self {
            Self::SQLite(_) => PlaceholderStyle::QuestionMark,
            #[cfg(feature = "postgresql")]
            Self::PostgreSQL(_) => PlaceholderStyle::Numbered,
        }
    }

    fn fetch(&self, statement: CompiledStatement) -> RowStream {
        match self {
            Self::SQLite(pool) => sqlite::fetch(pool.clone(), statement),
            #[cfg(feature = "postgresql")]
            Self::PostgreSQL(pool) => postgres::fetch(pool.clone(), statement),
        }
    }

    async fn execute(&self, statement: &CompiledStatement) -> AppResult<u64> {
        match self {
            Self::SQLite(pool) => sqlite::execute(pool, statement).await,
            #[cfg(feature = "postgresql")]
            Self::PostgreSQL(pool) => postgres::execute(pool, statement).await,
        }
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        match self {
            Self::SQLite(pool) => pool.close().await,
            #[cfg(feature = "postgresql")]
            Self::PostgreSQL(pool) => pool.close().await,
        }
    }
}

/// One executed statement recorded in debug mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryLogEntry {
    /// SQL as sent, followed by its bind values
    pub sql: String,
    /// Seconds until the first row (or completion), three decimals
    pub time: String,
}

/// A named connection
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    alias: String,
    pool: DatabasePool,
    debug: bool,
    queries_log: Arc<Mutex<VecDeque<QueryLogEntry>>>,
}

impl ConnectionHandle {
    /// Wrap an open pool
    #[must_use]
    pub fn new(alias: impl Into<String>, pool: DatabasePool, debug: bool) -> Self {
        Self {
            alias: alias.into(),
            pool,
            debug,
            queries_log: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Connect `alias` to `url`
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be opened
    pub async fn connect(
        alias: impl Into<String>,
        url: &DatabaseUrl,
        pool: &PoolConfig,
        debug: bool,
    ) -> AppResult<Self> {
        let alias = alias.into();
        let pool = DatabasePool::connect(url, pool).await?;
        let is_debug = debug;
        info!(
            db.alias = %alias,
            db.backend = pool.backend_name(),
            debug = is_debug,
            "Database connection ready"
        );
        Ok(Self::new(alias, pool, debug))
    }

    /// Connection alias
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Backend pool
    #[must_use]
    pub const fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Whether statements are timed and logged
    #[must_use]
    pub const fn is_debug(&self) -> bool {
        self.debug
    }

    /// Resolve `%(name)s` markers against `params` for this backend
    ///
    /// # Errors
    ///
    /// Returns parameter errors from statement compilation
    pub fn compile(&self, sql: &str, params: &Params) -> AppResult<CompiledStatement> {
        compile(sql, params, self.pool.placeholder_style())
    }

    /// Execute a statement and return a cursor over its rows.
    ///
    /// The statement runs when the first row is fetched.
    #[must_use]
    pub fn cursor(&self, statement: CompiledStatement) -> Cursor {
        if !self.debug {
            return Cursor::new(&self.alias, self.pool.fetch(statement));
        }

        let handle = self.clone();
        let sql = statement.sql.clone();
        let params = statement.params_json();
        let mut rows = self.pool.fetch(statement);
        let timed = try_stream! {
            let started = Instant::now();
            let first = rows.try_next().await.inspect_err(|e| {
                QueryLogger::log_query_error(&handle.alias, &sql, e);
            })?;
            handle.record(&sql, &params, started.elapsed().as_secs_f64());

            if let Some(row) = first {
                yield row;
                while let Some(row) = rows.try_next().await? {
                    yield row;
                }
            }
        };
        Cursor::new(&self.alias, timed.boxed())
    }

    /// Execute a statement and return the number of affected rows
    ///
    /// # Errors
    ///
    /// Returns the driver error if execution fails
    pub async fn execute(&self, statement: &CompiledStatement) -> AppResult<u64> {
        let started = Instant::now();
        let result = self.pool.execute(statement).await;
        match &result {
            Ok(_) if self.debug => self.record(
                &statement.sql,
                &statement.params_json(),
                started.elapsed().as_secs_f64(),
            ),
            Err(e) => QueryLogger::log_query_error(&self.alias, &statement.sql, e),
            Ok(_) => {}
        }
        result
    }

    fn record(&self, sql: &str, params: &str, duration_secs: f64) {
        QueryLogger::log_query(&self.alias, sql, params, duration_secs);
        let mut log = self
            .queries_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if log.len() >= limits::QUERIES_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(QueryLogEntry {
            sql: format!("{sql}; args={params}"),
            time: format!("{duration_secs:.3}"),
        });
    }

    /// Statements recorded in debug mode, oldest first
    #[must_use]
    pub fn queries_log(&self) -> Vec<QueryLogEntry> {
        self.queries_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Forget recorded statements
    pub fn reset_queries_log(&self) {
        self.queries_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Connections by alias
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: BTreeMap<String, ConnectionHandle>,
}

impl ConnectionRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect every configured alias
    ///
    /// # Errors
    ///
    /// Returns the first connection failure
    pub async fn from_config(config: &DatabasesConfig) -> AppResult<Self> {
        let mut registry = Self::new();
        for (alias, url) in &config.connections {
            let handle = ConnectionHandle::connect(alias, url, &config.pool, config.debug).await?;
            registry.register(handle);
        }
        Ok(registry)
    }

    /// Registry holding only a default in-memory `SQLite` database
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` cannot be opened
    pub async fn in_memory(debug: bool) -> AppResult<Self> {
        let mut config = DatabasesConfig::single(DatabaseUrl::Memory);
        config.debug = debug;
        Self::from_config(&config).await
    }

    /// Add or replace a connection under its alias
    pub fn register(&mut self, handle: ConnectionHandle) {
        self.connections.insert(handle.alias.clone(), handle);
    }

    /// Connection for `alias`, or the default connection when `None`
    ///
    /// # Errors
    ///
    /// Returns `ConnectionNotFound` for unknown aliases
    pub fn get(&self, alias: Option<&str>) -> AppResult<&ConnectionHandle> {
        let alias = alias.unwrap_or(DEFAULT_CONNECTION_ALIAS);
        self.connections
            .get(alias)
            .ok_or_else(|| AppError::connection_not_found(alias))
    }

    /// Registered aliases, sorted
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    /// Close every pool
    pub async fn close_all(&self) {
        for handle in self.connections.values() {
            handle.pool.close().await;
        }
    }
}

// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides quiet logging, seeded in-memory databases and temporary template directories
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `sqltemplate`

use std::fs;
use std::path::Path;
use std::sync::{Arc, Once};

use anyhow::Result;
use sqltemplate::config::{DatabaseUrl, PoolConfig};
use sqltemplate::{
    ConnectionHandle, ConnectionRegistry, FilesystemLoader, Params, SqlTemplate, TemplateEngine,
};
use tempfile::TempDir;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Schema and rows shared by the query tests
pub const SEED_SQL: &[&str] = &[
    "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL, role TEXT NOT NULL, score REAL)",
    "INSERT INTO users (id, email, role, score) VALUES \
     (1, 'ada@example.com', 'admin', 9.5), \
     (2, 'bob@example.com', 'member', 4.0), \
     (3, 'cy@example.com', 'member', NULL), \
     (4, 'di@example.com', 'admin', 7.25)",
    "CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, total INTEGER NOT NULL)",
    "INSERT INTO orders (id, user_id, total) VALUES (10, 1, 120), (11, 2, 40), (12, 4, 75), (13, 4, 5)",
];

/// In-memory connection under `alias`, seeded with [`SEED_SQL`]
pub async fn seeded_connection(alias: &str, debug: bool) -> Result<ConnectionHandle> {
    init_test_logging();
    let handle =
        ConnectionHandle::connect(alias, &DatabaseUrl::Memory, &PoolConfig::default(), debug)
            .await?;
    for sql in SEED_SQL {
        let statement = handle.compile(sql, &Params::new())?;
        handle.execute(&statement).await?;
    }
    handle.reset_queries_log();
    Ok(handle)
}

/// Registry with a seeded `default` connection
pub async fn seeded_registry(debug: bool) -> Result<Arc<ConnectionRegistry>> {
    let mut registry = ConnectionRegistry::new();
    registry.register(seeded_connection("default", debug).await?);
    Ok(Arc::new(registry))
}

/// Write `files` (name, source) under a fresh temporary directory
pub fn template_dir(files: &[(&str, &str)]) -> Result<TempDir> {
    let dir = TempDir::new()?;
    for (name, source) in files {
        write_template(dir.path(), name, source)?;
    }
    Ok(dir)
}

/// Write one template, creating parent directories
pub fn write_template(root: &Path, name: &str, source: &str) -> Result<()> {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, source)?;
    Ok(())
}

/// Service over a seeded in-memory database and one template directory
pub async fn create_test_service(templates: &Path, debug: bool) -> Result<SqlTemplate> {
    let engine = TemplateEngine::new(vec![Box::new(FilesystemLoader::new([templates]))]);
    let connections = seeded_registry(debug).await?;
    Ok(SqlTemplate::new(Arc::new(engine), connections))
}

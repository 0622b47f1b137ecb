// ABOUTME: Main library entry point for sqltemplate, parameterized SQL from text templates
// ABOUTME: Template loading, context flattening, statement execution and result shaping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

#![deny(unsafe_code)]

//! # sqltemplate
//!
//! Renders SQL statements from named text templates, binds nested context
//! values (including other queries used as sub-queries) and returns rows as
//! value lists, column mappings, or lazy streams of either.
//!
//! ## Architecture
//!
//! - **Loaders**: find a template by name in template directories and
//!   application `sqltemplates/` directories
//! - **Template**: a small Django-style template language for SQL text
//! - **Query**: a template bound to a context and a connection alias
//! - **Database**: connections by alias, statement compilation, cursors
//! - **Results**: eager and lazy result shapes over a cursor
//!
//! ## Column values
//!
//! Rows decode into [`Value`]. Integer, float, boolean and text columns map
//! directly and `NULL` becomes [`Value::Null`]. With the `postgresql` feature,
//! `TIMESTAMPTZ` columns become RFC 3339 text in UTC, other date, time and
//! `UUID` columns become their text form, and `JSON`/`JSONB` become nested
//! values. `NUMERIC`, `INTERVAL`, arrays and other types fail on fetch; cast
//! them in the query, for example `total::float8` or `period::text`.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use sqltemplate::errors::AppResult;
//! use sqltemplate::{Context, SqlTemplate};
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let service = SqlTemplate::from_env().await?;
//!
//!     let admins = service.query_from_string(
//!         "SELECT id FROM users WHERE role = %(role)s",
//!         Context::new().with("role", "admin"),
//!     )?;
//!     let query = service.get(
//!         "reports/activity.sql",
//!         Context::new().with("admins", admins).with("since", "2025-01-01"),
//!     )?;
//!
//!     let mut rows = query.values()?;
//!     println!("{} rows", rows.len().await?);
//!     Ok(())
//! }
//! ```

/// Environment configuration
pub mod config;

/// Library-wide constants
pub mod constants;

/// Connections, statement compilation and cursors
pub mod database;

/// Error types
pub mod errors;

/// Template loaders and the caching engine
pub mod loaders;

/// Structured logging setup
pub mod logging;

/// Template queries
pub mod query;

/// Result shapes
pub mod results;

/// Service facade
pub mod service;

/// Template language
pub mod template;

/// SQL text helpers
pub mod utils;

pub use sqltemplate_core::{
    extract_subcontexts, flatten, merge_context, query_params, Context, Params, SubQuery, Value,
};

pub use database::{ConnectionHandle, ConnectionRegistry, Cursor, RowMap};
pub use loaders::{AppDirectoriesLoader, FilesystemLoader, TemplateEngine, TemplateLoader};
pub use query::TemplateQuery;
pub use results::{ValuesIterator, ValuesListIterator, ValuesListResult, ValuesResult};
pub use service::SqlTemplate;
pub use template::Template;

// ABOUTME: Library-wide constants: environment variable names, defaults and limits
// ABOUTME: Pure data constants organized by domain for the sqltemplate query library
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

//! # Constants Module
//!
//! Constants are grouped by domain. Flattening constants live in the core crate
//! and are re-exported here.

pub use sqltemplate_core::constants::{messages, DEFAULT_CONNECTION_ALIAS, PARAM_PATH_DELIMITER};

/// Service identification for structured logging
pub mod service_names {
    /// Service name used in log output
    pub const SQLTEMPLATE: &str = "sqltemplate";
}

/// Environment variable names
pub mod env_vars {
    /// URL of the `default` connection
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Extra connections as `alias=url,alias=url`
    pub const DATABASES: &str = "SQLTEMPLATE_DATABASES";
    /// Template directories, separated like `PATH`
    pub const TEMPLATE_DIRS: &str = "SQLTEMPLATE_DIRS";
    /// Application directories whose `sqltemplates/` subdirectory holds templates
    pub const APP_DIRS: &str = "SQLTEMPLATE_APP_DIRS";
    /// Enables query timing and the per-connection query log
    pub const DEBUG: &str = "SQLTEMPLATE_DEBUG";
    /// Pool size per connection
    pub const MAX_CONNECTIONS: &str = "SQLTEMPLATE_MAX_CONNECTIONS";
    /// Seconds to wait for a pooled connection
    pub const ACQUIRE_TIMEOUT: &str = "SQLTEMPLATE_ACQUIRE_TIMEOUT";
}

/// Configuration defaults
pub mod defaults {
    /// Default connection URL
    pub const DATABASE_URL: &str = "sqlite::memory:";
    /// Default pool size for file and server databases
    pub const MAX_CONNECTIONS: u32 = 5;
    /// Default acquire timeout in seconds
    pub const ACQUIRE_TIMEOUT_SECS: u64 = 30;
}

/// Template loading
pub mod templates {
    /// Subdirectory of an application directory that holds SQL templates
    pub const APP_TEMPLATE_SUBDIR: &str = "sqltemplates";
    /// Default quote character doubled by the `adapt` filter
    pub const ADAPT_QMARK: &str = "%";
}

/// Limits
pub mod limits {
    /// Entries kept in a connection's debug query log
    pub const QUERIES_LOG_CAPACITY: usize = 9000;
}

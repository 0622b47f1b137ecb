// ABOUTME: Configuration management for connections, template search paths and debug behavior
// ABOUTME: Environment-only configuration with typed defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors
//! Configuration module for sqltemplate
//!
//! - **Database**: connection URLs per alias, pool settings, debug query log
//! - **Templates**: filesystem and application template directories

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppResult;

/// Connection URLs, aliases and pool settings
pub mod database;
/// Template search paths
pub mod templates;

pub use database::{DatabaseUrl, DatabasesConfig, PoolConfig};
pub use templates::TemplateConfig;

/// Complete library configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqlTemplateConfig {
    /// Connections
    pub database: DatabasesConfig,
    /// Template search paths
    pub templates: TemplateConfig,
}

impl SqlTemplateConfig {
    /// Load the full configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if any database setting is malformed
    pub fn from_env() -> AppResult<Self> {
        let config = Self {
            database: DatabasesConfig::from_env()?,
            templates: TemplateConfig::from_env(),
        };
        debug!(
            aliases = ?config.database.connections.keys().collect::<Vec<_>>(),
            template_dirs = config.templates.dirs.len(),
            app_dirs = config.templates.app_dirs.len(),
            debug = config.database.debug,
            "Loaded sqltemplate configuration"
        );
        Ok(config)
    }
}

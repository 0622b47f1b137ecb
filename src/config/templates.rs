// ABOUTME: Template search path configuration for filesystem and application directory loaders
// ABOUTME: Reads directory lists from the environment using the platform PATH separator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

use crate::constants::env_vars;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Where templates are looked up
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Directories searched by the filesystem loader, in order
    pub dirs: Vec<PathBuf>,
    /// Application directories; their `sqltemplates/` subdirectories are searched after `dirs`
    pub app_dirs: Vec<PathBuf>,
}

impl TemplateConfig {
    /// Load template directories from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            dirs: path_list(env_vars::TEMPLATE_DIRS),
            app_dirs: path_list(env_vars::APP_DIRS),
        }
    }
}

fn path_list(key: &str) -> Vec<PathBuf> {
    env::var_os(key)
        .map(|value| {
            env::split_paths(&value)
                .filter(|path| !path.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

// ABOUTME: Application-directory template loader for templates bundled alongside application code
// ABOUTME: Searches the sqltemplates/ subdirectory of each configured application directory
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

use std::path::PathBuf;

use crate::constants::templates::APP_TEMPLATE_SUBDIR;

use super::filesystem::FilesystemLoader;
use super::TemplateLoader;

/// Loads templates from `<app_dir>/sqltemplates/`
///
/// Application directories without a `sqltemplates/` subdirectory are ignored.
#[derive(Debug, Clone, Default)]
pub struct AppDirectoriesLoader {
    inner: FilesystemLoader,
}

impl AppDirectoriesLoader {
    /// Create a loader over the template subdirectories of `app_dirs`
    #[must_use]
    pub fn new(app_dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        let dirs = app_dirs
            .into_iter()
            .map(|dir| dir.into().join(APP_TEMPLATE_SUBDIR))
            .filter(|dir| dir.is_dir());
        Self {
            inner: FilesystemLoader::new(dirs),
        }
    }

    /// Template directories found under the application directories
    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        self.inner.dirs()
    }
}

impl TemplateLoader for AppDirectoriesLoader {
    fn name(&self) -> &'static str {
        "app_directories"
    }

    fn get_template_sources(&self, template_name: &str) -> Vec<PathBuf> {
        self.inner.get_template_sources(template_name)
    }
}

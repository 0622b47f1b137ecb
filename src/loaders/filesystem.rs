// ABOUTME: Filesystem template loader searching an ordered list of directories
// ABOUTME: Joins template names lexically and skips any candidate that escapes its directory
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

use std::path::{Component, Path, PathBuf};

use tracing::trace;

use super::TemplateLoader;

/// Loads templates from a list of directories, first match wins
#[derive(Debug, Clone, Default)]
pub struct FilesystemLoader {
    dirs: Vec<PathBuf>,
}

impl FilesystemLoader {
    /// Create a loader over `dirs`, searched in order
    #[must_use]
    pub fn new(dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Directories searched by this loader
    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

impl TemplateLoader for FilesystemLoader {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn get_template_sources(&self, template_name: &str) -> Vec<PathBuf> {
        self.dirs
            .iter()
            .filter_map(|dir| {
                let joined = safe_join(dir, template_name);
                if joined.is_none() {
                    trace!(
                        template = %template_name,
                        dir = %dir.display(),
                        "Template path escapes directory, skipping"
                    );
                }
                joined
            })
            .collect()
    }
}

/// Join `name` onto `base`, returning `None` if the result would lie outside `base`.
///
/// The check is lexical: `..` segments are resolved against the joined path
/// without touching the filesystem. Absolute names and names with a root or
/// drive prefix are rejected.
#[must_use]
pub fn safe_join(base: &Path, name: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(base.join(relative))
}

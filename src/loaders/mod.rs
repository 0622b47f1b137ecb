// ABOUTME: Template resolution: loader trait, filesystem and app-directory loaders, caching engine
// ABOUTME: Resolves template names to compiled templates and caches them by name
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

//! # Template loading
//!
//! A [`TemplateEngine`] asks each [`TemplateLoader`] in order for candidate
//! paths and compiles the first file that exists. Compiled templates are
//! cached by name for the life of the engine.

/// Application-bundled `sqltemplates/` directories
pub mod app_directories;
/// Plain template directories
pub mod filesystem;

use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use sqltemplate_core::{AppError, AppResult, Context, ErrorCode};
use tracing::debug;

use crate::config::TemplateConfig;
use crate::constants::messages;
use crate::template::Template;

pub use app_directories::AppDirectoriesLoader;
pub use filesystem::{safe_join, FilesystemLoader};

/// A source of template files
pub trait TemplateLoader: Debug + Send + Sync {
    /// Loader name for diagnostics
    fn name(&self) -> &'static str;

    /// Candidate paths for `template_name`, in priority order
    fn get_template_sources(&self, template_name: &str) -> Vec<PathBuf>;

    /// Read the first candidate that exists
    ///
    /// # Errors
    ///
    /// Returns an error if a candidate exists but cannot be read
    fn load_source(&self, template_name: &str) -> AppResult<Option<(PathBuf, String)>> {
        for path in self.get_template_sources(template_name) {
            if !path.is_file() {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(source) => return Ok(Some((path, source))),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(AppError::from(e).with_details(serde_json::json!({
                        "template": template_name,
                        "path": path.display().to_string(),
                    })))
                }
            }
        }
        Ok(None)
    }
}

/// Resolves and caches compiled templates
#[derive(Debug, Default)]
pub struct TemplateEngine {
    loaders: Vec<Box<dyn TemplateLoader>>,
    cache: DashMap<String, Arc<Template>>,
}

impl TemplateEngine {
    /// Engine over an explicit loader chain
    #[must_use]
    pub fn new(loaders: Vec<Box<dyn TemplateLoader>>) -> Self {
        Self {
            loaders,
            cache: DashMap::new(),
        }
    }

    /// Filesystem directories first, then application directories
    #[must_use]
    pub fn from_config(config: &TemplateConfig) -> Self {
        let loaders: Vec<Box<dyn TemplateLoader>> = vec![
            Box::new(FilesystemLoader::new(config.dirs.iter().cloned())),
            Box::new(AppDirectoriesLoader::new(config.app_dirs.iter().cloned())),
        ];
        Self::new(loaders)
    }

    /// Load a template by name
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` if no loader has it, or a syntax error
    /// if the file does not compile
    pub fn get_template(&self, name: &str) -> AppResult<Arc<Template>> {
        if let Some(cached) = self.cache.get(name) {
            return Ok(Arc::clone(cached.value()));
        }

        for loader in &self.loaders {
            if let Some((path, source)) = loader.load_source(name)? {
                let template = Arc::new(Template::compile(name, &source)?);
                debug!(
                    template = %name,
                    loader = loader.name(),
                    path = %path.display(),
                    "Loaded SQL template"
                );
                self.cache.insert(name.to_owned(), Arc::clone(&template));
                return Ok(template);
            }
        }

        Err(AppError::template_does_not_exist(name))
    }

    /// First template in `names` that exists
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` listing every name tried, or
    /// "No template names provided" for an empty list
    pub fn select_template<S: AsRef<str>>(&self, names: &[S]) -> AppResult<Arc<Template>> {
        if names.is_empty() {
            return Err(AppError::template_does_not_exist(messages::NO_TEMPLATE_NAMES));
        }
        for name in names {
            match self.get_template(name.as_ref()) {
                Ok(template) => return Ok(template),
                Err(e) if e.is(ErrorCode::TemplateDoesNotExist) => {}
                Err(e) => return Err(e),
            }
        }
        let tried = names.iter().map(|name| name.as_ref()).collect::<Vec<&str>>();
        Err(AppError::template_does_not_exist(tried.join(", ")))
    }

    /// Load and render a template
    ///
    /// # Errors
    ///
    /// Returns loading and rendering errors
    pub fn render_to_string(&self, name: &str, context: &Context) -> AppResult<String> {
        self.get_template(name)?.render(context)
    }

    /// Compile an inline template; not cached
    ///
    /// # Errors
    ///
    /// Returns a syntax error if the source is malformed
    pub fn compile_string(&self, source: &str) -> AppResult<Arc<Template>> {
        Template::from_string(source).map(Arc::new)
    }

    /// Drop every cached template so the next lookup reads from disk
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

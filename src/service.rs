// ABOUTME: SqlTemplate service facade producing queries from template names or inline strings
// ABOUTME: Carries a default context and connection alias, with scoped derivatives
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

use std::sync::Arc;

use sqltemplate_core::{AppResult, Context};
use tracing::info;

use crate::config::SqlTemplateConfig;
use crate::database::ConnectionRegistry;
use crate::loaders::TemplateEngine;
use crate::query::TemplateQuery;
use crate::template::Template;

/// Entry point: loads templates and hands out [`TemplateQuery`] values
///
/// Cloning is cheap; clones share the template cache and connections.
#[derive(Debug, Clone)]
pub struct SqlTemplate {
    engine: Arc<TemplateEngine>,
    connections: Arc<ConnectionRegistry>,
    context: Context,
    using: Option<String>,
}

impl SqlTemplate {
    /// Service over an engine and a set of connections
    #[must_use]
    pub fn new(engine: Arc<TemplateEngine>, connections: Arc<ConnectionRegistry>) -> Self {
        Self {
            engine,
            connections,
            context: Context::new(),
            using: None,
        }
    }

    /// Build the engine and open every configured connection
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be opened
    pub async fn from_config(config: &SqlTemplateConfig) -> AppResult<Self> {
        let engine = TemplateEngine::from_config(&config.templates);
        let connections = ConnectionRegistry::from_config(&config.database).await?;
        info!(
            aliases = ?connections.aliases().collect::<Vec<_>>(),
            "sqltemplate service ready"
        );
        Ok(Self::new(Arc::new(engine), Arc::new(connections)))
    }

    /// Load configuration from the environment and build the service
    ///
    /// # Errors
    ///
    /// Returns configuration or connection errors
    pub async fn from_env() -> AppResult<Self> {
        Self::from_config(&SqlTemplateConfig::from_env()?).await
    }

    /// Template engine
    #[must_use]
    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    /// Connections
    #[must_use]
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Default context
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Default alias
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.using.as_deref()
    }

    /// Query for a named template; `context` is layered over the service context
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` or a syntax error
    pub fn get(&self, template_name: &str, context: Context) -> AppResult<TemplateQuery> {
        let template = self.engine.get_template(template_name)?;
        Ok(self.query(template, &context))
    }

    /// Query for the first template in `names` that exists
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` listing the names tried
    pub fn select<S: AsRef<str>>(&self, names: &[S], context: Context) -> AppResult<TemplateQuery> {
        let template = self.engine.select_template(names)?;
        Ok(self.query(template, &context))
    }

    /// Query for an inline template
    ///
    /// # Errors
    ///
    /// Returns a syntax error if `source` is malformed
    pub fn query_from_string(&self, source: &str, context: Context) -> AppResult<TemplateQuery> {
        let template = self.engine.compile_string(source)?;
        Ok(self.query(template, &context))
    }

    fn query(&self, template: Arc<Template>, context: &Context) -> TemplateQuery {
        TemplateQuery::new(
            template,
            self.context.merged(context),
            self.using.clone(),
            Arc::clone(&self.connections),
        )
    }

    /// Derived service with `context` layered over this one and, if given, a new alias
    #[must_use]
    pub fn scope(&self, context: Context, using: Option<&str>) -> Self {
        Self {
            context: self.context.merged(&context),
            using: using.map(str::to_owned).or_else(|| self.using.clone()),
            ..self.clone()
        }
    }

    /// Derived service with `context` layered over this one
    #[must_use]
    pub fn with_context(&self, context: Context) -> Self {
        self.scope(context, None)
    }

    /// Derived service running on `alias`
    #[must_use]
    pub fn using(&self, alias: &str) -> Self {
        self.scope(Context::new(), Some(alias))
    }
}

#[cfg(test)]
mod tests {
    use sqltemplate_core::Value;

    use super::*;

    fn service() -> SqlTemplate {
        SqlTemplate::new(
            Arc::new(TemplateEngine::default()),
            Arc::new(ConnectionRegistry::new()),
        )
    }

    #[test]
    fn test_query_context_layers_over_service_context() {
        let scoped = service().with_context(Context::new().with("tenant", 1).with("limit", 10));
        let query = scoped
            .query_from_string(
                "SELECT * FROM t WHERE tenant = %(tenant)s LIMIT {{ limit }}",
                Context::new().with("limit", 5),
            )
            .unwrap();
        assert_eq!(query.context().get("tenant"), Some(&Value::Int(1)));
        assert_eq!(query.sql().unwrap(), "SELECT * FROM t WHERE tenant = %(tenant)s LIMIT 5");
    }

    #[test]
    fn test_scope_keeps_alias_unless_overridden() {
        let reporting = service().using("reporting");
        assert_eq!(reporting.alias(), Some("reporting"));
        assert_eq!(reporting.with_context(Context::new()).alias(), Some("reporting"));
        assert_eq!(
            reporting.scope(Context::new(), Some("audit")).alias(),
            Some("audit")
        );
        let query = reporting.query_from_string("SELECT 1", Context::new()).unwrap();
        assert_eq!(query.alias(), Some("reporting"));
    }
}

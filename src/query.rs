// ABOUTME: TemplateQuery pairs a compiled template with its context and connection alias
// ABOUTME: Renders SQL lazily, flattens parameters and executes into the four result shapes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

//! # Template queries
//!
//! A [`TemplateQuery`] is an immutable value. [`TemplateQuery::bind`] and
//! [`TemplateQuery::using`] return new queries and leave the original alone.
//! A query can be placed in another query's context; the parent renders the
//! child's SQL inline and binds the child's parameters along with its own.

use std::fmt;
use std::sync::{Arc, OnceLock};

use sqltemplate_core::{query_params, AppError, AppResult, Context, Params, SubQuery, Value};
use tracing::{debug, instrument};

use crate::constants::messages;
use crate::database::{CompiledStatement, ConnectionHandle, ConnectionRegistry, Cursor};
use crate::results::{ValuesIterator, ValuesListIterator, ValuesListResult, ValuesResult};
use crate::template::Template;
use crate::utils::sql::prettify;

/// A template bound to a context and an optional connection alias
#[derive(Clone)]
pub struct TemplateQuery {
    template: Arc<Template>,
    context: Context,
    using: Option<String>,
    connections: Arc<ConnectionRegistry>,
    sql: OnceLock<String>,
}

impl fmt::Debug for TemplateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateQuery")
            .field("template", &self.template.name())
            .field("context", &self.context)
            .field("using", &self.using)
            .finish_non_exhaustive()
    }
}

impl TemplateQuery {
    /// Create a query
    #[must_use]
    pub fn new(
        template: Arc<Template>,
        context: Context,
        using: Option<String>,
        connections: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            template,
            context,
            using,
            connections,
            sql: OnceLock::new(),
        }
    }

    /// Template this query renders
    #[must_use]
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Context bound to the template
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Connection alias, `None` for the default connection
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.using.as_deref()
    }

    /// Render the template with this query's context, bypassing the cache
    ///
    /// # Errors
    ///
    /// Returns template rendering errors
    pub fn render(&self) -> AppResult<String> {
        self.template.render(&self.context)
    }

    /// Rendered SQL, rendered once per query value
    ///
    /// # Errors
    ///
    /// Returns template rendering errors
    pub fn sql(&self) -> AppResult<&str> {
        if let Some(sql) = self.sql.get() {
            return Ok(sql);
        }
        let rendered = self.render()?;
        Ok(self.sql.get_or_init(|| rendered))
    }

    /// New query with `extra` layered over the current context
    #[must_use]
    pub fn bind(&self, extra: Context) -> Self {
        Self::new(
            Arc::clone(&self.template),
            self.context.merged(&extra),
            self.using.clone(),
            Arc::clone(&self.connections),
        )
    }

    /// New query that runs on connection `alias`
    #[must_use]
    pub fn using(&self, alias: impl Into<String>) -> Self {
        Self::new(
            Arc::clone(&self.template),
            self.context.clone(),
            Some(alias.into()),
            Arc::clone(&self.connections),
        )
    }

    /// Flattened parameters: nested sub-query contexts first, this context on top
    #[must_use]
    pub fn query_params(&self) -> Params {
        query_params(&self.context)
    }

    /// `(sql, context)`
    ///
    /// # Errors
    ///
    /// Returns template rendering errors
    pub fn rawtuple(&self) -> AppResult<(&str, &Context)> {
        Ok((self.sql()?, &self.context))
    }

    /// SQL laid out one clause per line
    ///
    /// # Errors
    ///
    /// Returns template rendering errors
    pub fn pretty(&self) -> AppResult<String> {
        Ok(prettify(self.sql()?))
    }

    fn connection(&self) -> AppResult<&ConnectionHandle> {
        self.connections.get(self.alias())
    }

    /// SQL and binds as they will be sent to the connection
    ///
    /// # Errors
    ///
    /// Returns rendering, parameter or unknown-alias errors
    pub fn compile(&self) -> AppResult<CompiledStatement> {
        self.connection()?.compile(self.sql()?, &self.query_params())
    }

    /// Execute and return the raw cursor
    ///
    /// # Errors
    ///
    /// Returns rendering, parameter or unknown-alias errors. Driver errors
    /// surface when rows are fetched.
    #[instrument(skip(self), fields(template = %self.template.name(), alias = ?self.using))]
    pub fn execute(&self) -> AppResult<Cursor> {
        let connection = self.connection()?;
        let statement = connection.compile(self.sql()?, &self.query_params())?;
        debug!(binds = statement.binds.len(), "Executing template query");
        Ok(connection.cursor(statement))
    }

    /// Execute a statement that returns no rows
    ///
    /// # Errors
    ///
    /// Returns rendering, parameter, unknown-alias or driver errors
    #[instrument(skip(self), fields(template = %self.template.name(), alias = ?self.using))]
    pub async fn execute_update(&self) -> AppResult<u64> {
        let connection = self.connection()?;
        let statement = connection.compile(self.sql()?, &self.query_params())?;
        let affected = connection.execute(&statement).await?;
        debug!(affected, "Executed template statement");
        Ok(affected)
    }

    /// Rows as column mappings, fetched on first access
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::execute`]
    pub fn values(&self) -> AppResult<ValuesResult> {
        Ok(ValuesResult::new(self.execute()?))
    }

    /// Rows as value lists, fetched on first access
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::execute`]
    pub fn values_list(&self) -> AppResult<ValuesListResult> {
        Ok(ValuesListResult::new(self.execute()?))
    }

    /// Rows as value lists, one at a time
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::execute`]
    pub fn iterator(&self) -> AppResult<ValuesListIterator> {
        Ok(ValuesListIterator::new(self.execute()?))
    }

    /// Rows as column mappings, one at a time
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::execute`]
    pub fn dict_iterator(&self) -> AppResult<ValuesIterator> {
        Ok(ValuesIterator::new(self.execute()?))
    }

    /// First column of the only row
    ///
    /// # Errors
    ///
    /// Returns `ObjectDoesNotExist` for zero rows, `MultipleObjectsReturned`
    /// for more than one row, or any execution error
    pub async fn scalar(&self) -> AppResult<Value> {
        let mut result = self.values_list()?;
        let rows = result.result().await?;
        match rows {
            [] => Err(AppError::object_does_not_exist(messages::NO_ROWS)),
            [row] => Ok(row.first().cloned().unwrap_or(Value::Null)),
            _ => Err(AppError::multiple_objects_returned(messages::MULTIPLE_ROWS)),
        }
    }

    /// [`Self::values`] with `extra` bound first
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::execute`]
    pub fn values_with(&self, extra: Context) -> AppResult<ValuesResult> {
        self.bind(extra).values()
    }

    /// [`Self::values_list`] with `extra` bound first
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::execute`]
    pub fn values_list_with(&self, extra: Context) -> AppResult<ValuesListResult> {
        self.bind(extra).values_list()
    }

    /// [`Self::iterator`] with `extra` bound first
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::execute`]
    pub fn iterator_with(&self, extra: Context) -> AppResult<ValuesListIterator> {
        self.bind(extra).iterator()
    }

    /// [`Self::dict_iterator`] with `extra` bound first
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::execute`]
    pub fn dict_iterator_with(&self, extra: Context) -> AppResult<ValuesIterator> {
        self.bind(extra).dict_iterator()
    }

    /// [`Self::scalar`] with `extra` bound first
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::scalar`]
    pub async fn scalar_with(&self, extra: Context) -> AppResult<Value> {
        self.bind(extra).scalar().await
    }
}

impl fmt::Display for TemplateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sql() {
            Ok(sql) => f.write_str(sql),
            Err(e) => write!(f, "/* render error: {e} */"),
        }
    }
}

impl SubQuery for TemplateQuery {
    fn context(&self) -> &Context {
        &self.context
    }

    fn render_sql(&self) -> AppResult<String> {
        self.sql().map(str::to_owned)
    }
}

impl From<TemplateQuery> for Value {
    fn from(query: TemplateQuery) -> Self {
        Self::Query(Arc::new(query))
    }
}

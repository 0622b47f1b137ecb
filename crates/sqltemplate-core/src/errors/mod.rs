// ABOUTME: Unified error type and error codes for template loading, rendering and query execution
// ABOUTME: Wraps database driver errors as the error source so callers can inspect them unchanged
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

//! # Unified Error Handling System
//!
//! Every fallible operation in sqltemplate returns [`AppResult`]. Errors carry a
//! stable [`ErrorCode`], a human readable message, optional structured details
//! and, for database failures, the original driver error as their source.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Standard error codes used throughout the library
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // Templates (1000-1999)
    /// No loader could locate the named template
    #[serde(rename = "TEMPLATE_DOES_NOT_EXIST")]
    TemplateDoesNotExist = 1000,
    /// Template source failed to compile
    #[serde(rename = "TEMPLATE_SYNTAX_ERROR")]
    TemplateSyntax = 1001,
    /// Template failed while rendering against a context
    #[serde(rename = "TEMPLATE_RENDER_ERROR")]
    TemplateRender = 1002,

    // Parameters (2000-2999)
    /// Rendered SQL references a parameter that is not bound
    #[serde(rename = "MISSING_PARAMETER")]
    MissingParameter = 2000,
    /// A bound value cannot be used as a statement parameter
    #[serde(rename = "INVALID_PARAMETER")]
    InvalidParameter = 2001,

    // Results (3000-3999)
    /// A single-row accessor found no rows
    #[serde(rename = "OBJECT_DOES_NOT_EXIST")]
    ObjectDoesNotExist = 3000,
    /// A single-row accessor found more than one row
    #[serde(rename = "MULTIPLE_OBJECTS_RETURNED")]
    MultipleObjectsReturned = 3001,

    // Connections (4000-4999)
    /// No connection is registered under the requested alias
    #[serde(rename = "CONNECTION_NOT_FOUND")]
    ConnectionNotFound = 4000,

    // Configuration (6000-6999)
    /// Configuration error encountered
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,
    /// Configuration value could not be parsed
    #[serde(rename = "CONFIG_INVALID")]
    ConfigInvalid = 6002,

    // Internal Errors (9000-9999)
    /// Unexpected internal failure
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    /// Database driver failure
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError = 9001,
    /// Value could not be serialized or deserialized
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9003,
}

impl ErrorCode {
    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::TemplateDoesNotExist => "Template does not exist",
            Self::TemplateSyntax => "Template syntax error",
            Self::TemplateRender => "Template could not be rendered",
            Self::MissingParameter => "Query parameter is not bound",
            Self::InvalidParameter => "Query parameter is invalid",
            Self::ObjectDoesNotExist => "Object does not exist",
            Self::MultipleObjectsReturned => "Multiple objects returned",
            Self::ConnectionNotFound => "Database connection is not configured",
            Self::ConfigError => "Configuration error encountered",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::InternalError => "An internal error occurred",
            Self::DatabaseError => "Database operation failed",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }
}

/// Unified error type for the library
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional structured context
    pub details: serde_json::Value,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: serde_json::Value::Null,
            source: None,
        }
    }

    /// Add details to the error
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether this error has the given code
    #[must_use]
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Convenience functions for creating common errors
impl AppError {
    /// No loader found the template. For multi-name lookups `name` lists all tried names.
    pub fn template_does_not_exist(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(ErrorCode::TemplateDoesNotExist, name.clone())
            .with_details(serde_json::json!({ "template": name }))
    }

    /// Template failed to compile
    pub fn template_syntax(template: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TemplateSyntax,
            format!("{template}: {}", message.into()),
        )
        .with_details(serde_json::json!({ "template": template }))
    }

    /// Template failed to render
    pub fn template_render(template: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TemplateRender,
            format!("{template}: {}", message.into()),
        )
        .with_details(serde_json::json!({ "template": template }))
    }

    /// Parameter referenced by the SQL has no binding
    pub fn missing_parameter(name: &str) -> Self {
        Self::new(
            ErrorCode::MissingParameter,
            format!("no value bound for parameter '{name}'"),
        )
        .with_details(serde_json::json!({ "parameter": name }))
    }

    /// Parameter value cannot be bound
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParameter, message)
    }

    /// Single-row accessor found no rows
    pub fn object_does_not_exist(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ObjectDoesNotExist, message)
    }

    /// Single-row accessor found more than one row
    pub fn multiple_objects_returned(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MultipleObjectsReturned, message)
    }

    /// No connection registered under `alias`
    pub fn connection_not_found(alias: &str) -> Self {
        Self::new(
            ErrorCode::ConnectionNotFound,
            format!("no database connection named '{alias}'"),
        )
        .with_details(serde_json::json!({ "alias": alias }))
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Invalid configuration value
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string()).with_source(error)
    }
}

impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        Self::internal(format!("I/O error: {error}")).with_source(error)
    }
}

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::database(error.to_string()).with_source(error)
    }
}

#[cfg(feature = "database-errors")]
impl AppError {
    /// The database driver error this error was raised from, if any
    #[must_use]
    pub fn driver_error(&self) -> Option<&sqlx::Error> {
        self.source.as_deref()?.downcast_ref::<sqlx::Error>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_description_and_message() {
        let error = AppError::object_does_not_exist("Query returned no rows");
        assert_eq!(
            error.to_string(),
            "Object does not exist: Query returned no rows"
        );
        assert!(error.is(ErrorCode::ObjectDoesNotExist));
    }

    #[test]
    fn test_template_does_not_exist_details() {
        let error = AppError::template_does_not_exist("reports/daily.sql");
        assert_eq!(error.code, ErrorCode::TemplateDoesNotExist);
        assert_eq!(error.details["template"], "reports/daily.sql");
    }

    #[test]
    fn test_source_is_chained() {
        let io = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let error = AppError::from(io);
        assert!(error.source().is_some());
        assert_eq!(error.code, ErrorCode::InternalError);
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::MultipleObjectsReturned).unwrap();
        assert_eq!(json, "\"MULTIPLE_OBJECTS_RETURNED\"");
    }
}

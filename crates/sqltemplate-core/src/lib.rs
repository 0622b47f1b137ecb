// ABOUTME: Core types for the sqltemplate query library
// ABOUTME: Foundation crate with error handling, context values and parameter flattening
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

#![deny(unsafe_code)]

//! # sqltemplate core
//!
//! Foundation crate shared by the template engine and the query executor.
//! It has no database or filesystem dependencies, so the flattening rules can
//! be used and tested on their own.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **value**: `Value` and `Context`, the data bound to templates
//! - **flatten**: Sub-query context extraction and dotted-key flattening
//! - **constants**: Path delimiter, default alias and error messages

/// Unified error handling system with standard error codes
pub mod errors;

/// Shared constants
pub mod constants;

/// Template context values
pub mod value;

/// Context merging and parameter flattening
pub mod flatten;

pub use errors::{AppError, AppResult, ErrorCode};
pub use flatten::{extract_subcontexts, flatten, merge_context, query_params, Params};
pub use value::{Context, SubQuery, Value};

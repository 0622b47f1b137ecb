// ABOUTME: Shared constants for context flattening and connection lookup
// ABOUTME: Pure data constants used by both the core and the query crate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

/// Delimiter joining nested context keys into parameter names
pub const PARAM_PATH_DELIMITER: &str = ".";

/// Alias of the connection used when a query names none
pub const DEFAULT_CONNECTION_ALIAS: &str = "default";

/// Error messages raised by single-row accessors
pub mod messages {
    /// `scalar()` found zero rows
    pub const NO_ROWS: &str = "Query returned no rows";
    /// `scalar()` found more than one row
    pub const MULTIPLE_ROWS: &str = "Query returned more than one row";
    /// `select_template()` was called with an empty list
    pub const NO_TEMPLATE_NAMES: &str = "No template names provided";
}

// ABOUTME: Utility modules for common functionality across the library
// ABOUTME: Contains SQL text helpers shared by filters and query formatting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

/// SQL literal quoting and statement layout
pub mod sql;

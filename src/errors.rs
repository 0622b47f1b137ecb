// ABOUTME: Error types for template loading, rendering and query execution re-exported from sqltemplate-core
// ABOUTME: Provides domain-specific errors with codes and the original driver error as source
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

pub use sqltemplate_core::errors::*;

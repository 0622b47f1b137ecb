// ABOUTME: Cursor over a live row stream with tuple and mapping fetch helpers
// ABOUTME: RowMap keeps column order and serializes as a JSON object
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

use std::fmt;
use std::sync::Arc;

use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use serde::ser::{Serialize, SerializeMap, Serializer};
use sqltemplate_core::{AppError, AppResult, Value};

/// One result row with named columns
#[derive(Debug, Clone, PartialEq)]
pub struct RowMap {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl RowMap {
    /// Pair column names with values; both must have the same length
    #[must_use]
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Column names in select order
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in select order
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of the named column; the last one wins if names repeat
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .rposition(|name| name == column)
            .and_then(|index| self.values.get(index))
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(column, value)` pairs in select order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Drop the column names
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Serialize for RowMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Rows as produced by a backend
pub type RowStream = BoxStream<'static, AppResult<RowMap>>;

/// Driver cursor over one executed statement.
///
/// Rows are pulled from the database as they are fetched. Column names are
/// known once the first row has arrived.
pub struct Cursor {
    alias: String,
    columns: Option<Arc<[String]>>,
    rows: RowStream,
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("alias", &self.alias)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

impl Cursor {
    /// Wrap a backend row stream
    #[must_use]
    pub fn new(alias: impl Into<String>, rows: RowStream) -> Self {
        Self {
            alias: alias.into(),
            columns: None,
            rows,
        }
    }

    /// Cursor over rows already in memory
    #[must_use]
    pub fn from_rows(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let columns: Arc<[String]> = columns.iter().map(|c| (*c).to_owned()).collect();
        let rows = rows
            .into_iter()
            .map(move |values| Ok::<_, AppError>(RowMap::new(Arc::clone(&columns), values)))
            .collect::<Vec<_>>();
        Self::new("memory", stream::iter(rows).boxed())
    }

    /// Connection alias the statement ran on
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Column names, once a row has been fetched
    #[must_use]
    pub fn description(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Next row as a mapping
    ///
    /// # Errors
    ///
    /// Returns the driver error if fetching fails
    pub async fn dict_fetch_one(&mut self) -> AppResult<Option<RowMap>> {
        let row = self.rows.try_next().await?;
        if let Some(row) = &row {
            if self.columns.is_none() {
                self.columns = Some(Arc::clone(&row.columns));
            }
        }
        Ok(row)
    }

    /// Remaining rows as mappings
    ///
    /// # Errors
    ///
    /// Returns the driver error if fetching fails
    pub async fn dict_fetch_all(&mut self) -> AppResult<Vec<RowMap>> {
        let mut rows = Vec::new();
        while let Some(row) = self.dict_fetch_one().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Next row as a tuple
    ///
    /// # Errors
    ///
    /// Returns the driver error if fetching fails
    pub async fn fetch_one(&mut self) -> AppResult<Option<Vec<Value>>> {
        Ok(self.dict_fetch_one().await?.map(RowMap::into_values))
    }

    /// Remaining rows as tuples
    ///
    /// # Errors
    ///
    /// Returns the driver error if fetching fails
    pub async fn fetch_all(&mut self) -> AppResult<Vec<Vec<Value>>> {
        let rows = self.dict_fetch_all().await?;
        Ok(rows.into_iter().map(RowMap::into_values).collect())
    }

    /// Hand over the remaining rows as a stream
    #[must_use]
    pub fn into_stream(self) -> RowStream {
        self.rows
    }
}

// ABOUTME: Result shapes over a cursor: eager cached lists and lazy single-pass row streams
// ABOUTME: Tuples and Mappings select whether rows come back as value lists or column maps
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

//! # Result shapes
//!
//! | type                   | rows          | fetch                       |
//! |------------------------|---------------|-----------------------------|
//! | [`ValuesListResult`]   | `Vec<Value>`  | all rows on first access    |
//! | [`ValuesResult`]       | [`RowMap`]    | all rows on first access    |
//! | [`ValuesListIterator`] | `Vec<Value>`  | one row per `next_row`      |
//! | [`ValuesIterator`]     | [`RowMap`]    | one row per `next_row`      |

use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use futures_util::{Stream, StreamExt};
use serde::Serialize;
use sqltemplate_core::{AppError, AppResult, Value};

use crate::database::{Cursor, RowMap, RowStream};

/// How a row is presented to the caller
pub trait RowShape: Send + 'static {
    /// Row type
    type Row: Debug + Clone + Send + Serialize + 'static;

    /// Convert a fetched row
    fn shape(row: RowMap) -> Self::Row;
}

/// Rows as value lists in select order
#[derive(Debug, Clone, Copy, Default)]
pub struct Tuples;

impl RowShape for Tuples {
    type Row = Vec<Value>;

    fn shape(row: RowMap) -> Self::Row {
        row.into_values()
    }
}

/// Rows as column-name mappings
#[derive(Debug, Clone, Copy, Default)]
pub struct Mappings;

impl RowShape for Mappings {
    type Row = RowMap;

    fn shape(row: RowMap) -> Self::Row {
        row
    }
}

/// Fetches every row on first access and serves later reads from memory
#[derive(Debug)]
pub struct CachedResult<S: RowShape> {
    cursor: Option<Cursor>,
    rows: Option<Vec<S::Row>>,
    columns: Option<Vec<String>>,
}

impl<S: RowShape> CachedResult<S> {
    /// Result that will drain `cursor` on first access
    #[must_use]
    pub fn new(cursor: Cursor) -> Self {
        Self {
            cursor: Some(cursor),
            rows: None,
            columns: None,
        }
    }

    /// Whether rows have been fetched yet
    #[must_use]
    pub const fn is_fetched(&self) -> bool {
        self.rows.is_some()
    }

    /// All rows, fetching them on the first call
    ///
    /// # Errors
    ///
    /// Returns the driver error from the first fetch. A result whose fetch
    /// failed stays unusable.
    pub async fn result(&mut self) -> AppResult<&[S::Row]> {
        if self.rows.is_none() {
            let mut cursor = self
                .cursor
                .take()
                .ok_or_else(|| AppError::internal("result cursor was consumed by a failed fetch"))?;
            let rows = cursor.dict_fetch_all().await?;
            self.columns = cursor.description().map(<[String]>::to_vec);
            self.rows = Some(rows.into_iter().map(S::shape).collect());
        }
        Ok(self.rows.as_deref().unwrap_or_default())
    }

    /// Number of rows
    ///
    /// # Errors
    ///
    /// Returns the driver error if rows had to be fetched
    pub async fn len(&mut self) -> AppResult<usize> {
        Ok(self.result().await?.len())
    }

    /// Whether the query returned no rows
    ///
    /// # Errors
    ///
    /// Returns the driver error if rows had to be fetched
    pub async fn is_empty(&mut self) -> AppResult<bool> {
        Ok(self.result().await?.is_empty())
    }

    /// Row at `index`
    ///
    /// # Errors
    ///
    /// Returns the driver error if rows had to be fetched
    pub async fn get(&mut self, index: usize) -> AppResult<Option<&S::Row>> {
        Ok(self.result().await?.get(index))
    }

    /// Column names; empty when the query returned no rows
    ///
    /// # Errors
    ///
    /// Returns the driver error if rows had to be fetched
    pub async fn columns(&mut self) -> AppResult<&[String]> {
        self.result().await?;
        Ok(self.columns.as_deref().unwrap_or_default())
    }

    /// Take ownership of every row
    ///
    /// # Errors
    ///
    /// Returns the driver error if rows had to be fetched
    pub async fn into_rows(mut self) -> AppResult<Vec<S::Row>> {
        self.result().await?;
        Ok(self.rows.unwrap_or_default())
    }
}

/// Single-pass stream that fetches one row at a time
pub struct RowIterator<S: RowShape> {
    rows: RowStream,
    shape: PhantomData<fn() -> S>,
}

impl<S: RowShape> Debug for RowIterator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowIterator").finish_non_exhaustive()
    }
}

impl<S: RowShape> RowIterator<S> {
    /// Iterate the rows remaining in `cursor`
    #[must_use]
    pub fn new(cursor: Cursor) -> Self {
        Self {
            rows: cursor.into_stream(),
            shape: PhantomData,
        }
    }

    /// Next row, or `None` once the rows are exhausted
    ///
    /// # Errors
    ///
    /// Returns the driver error if fetching fails
    pub async fn next_row(&mut self) -> AppResult<Option<S::Row>> {
        self.next().await.transpose()
    }
}

impl<S: RowShape> Stream for RowIterator<S> {
    type Item = AppResult<S::Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        self.rows
            .poll_next_unpin(cx)
            .map(|row| row.map(|row| row.map(S::shape)))
    }
}

/// Eager value lists
pub type ValuesListResult = CachedResult<Tuples>;
/// Eager column mappings
pub type ValuesResult = CachedResult<Mappings>;
/// Lazy value lists
pub type ValuesListIterator = RowIterator<Tuples>;
/// Lazy column mappings
pub type ValuesIterator = RowIterator<Mappings>;

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;

    use super::*;

    fn cursor() -> Cursor {
        Cursor::from_rows(
            &["id", "email"],
            vec![
                vec![Value::Int(1), Value::from("a@example.com")],
                vec![Value::Int(2), Value::from("b@example.com")],
            ],
        )
    }

    #[tokio::test]
    async fn test_cached_result_fetches_once() {
        let mut result = ValuesListResult::new(cursor());
        assert!(!result.is_fetched());
        assert_eq!(result.len().await.unwrap(), 2);
        assert!(result.is_fetched());
        assert_eq!(
            result.get(1).await.unwrap(),
            Some(&vec![Value::Int(2), Value::from("b@example.com")])
        );
        assert_eq!(result.result().await.unwrap().len(), 2);
        assert_eq!(result.columns().await.unwrap(), &["id", "email"]);
    }

    #[tokio::test]
    async fn test_mapping_result_rows() {
        let rows = ValuesResult::new(cursor()).into_rows().await.unwrap();
        assert_eq!(rows[0].get("email"), Some(&Value::from("a@example.com")));
    }

    #[tokio::test]
    async fn test_iterator_is_single_pass() {
        let mut rows = ValuesIterator::new(cursor());
        let first = rows.next_row().await.unwrap().unwrap();
        assert_eq!(first.get("id"), Some(&Value::Int(1)));
        let rest: Vec<RowMap> = (&mut rows).try_collect().await.unwrap();
        assert_eq!(rest.len(), 1);
        assert!(rows.next_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_result_has_no_columns() {
        let mut result = ValuesListResult::new(Cursor::from_rows(&["id"], Vec::new()));
        assert!(result.is_empty().await.unwrap());
        assert!(result.columns().await.unwrap().is_empty());
    }
}

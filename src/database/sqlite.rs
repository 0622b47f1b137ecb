// ABOUTME: SQLite backend: pool construction, positional binds and dynamic row decoding
// ABOUTME: Streams rows as RowMap values decoded from each value's storage class
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use futures_util::{StreamExt, TryStreamExt};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use sqltemplate_core::{AppError, AppResult, Value};
use tracing::{debug, info};

use crate::config::{DatabaseUrl, PoolConfig};

use super::cursor::{RowMap, RowStream};
use super::statement::{BindValue, CompiledStatement};

static MEMORY_DATABASE_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Open a pool for a `SQLite` URL.
///
/// Each in-memory pool gets its own named shared-cache database, so every
/// pooled connection sees the same tables and an open cursor holds only its
/// own connection. One connection is kept alive for the life of the pool
/// because the database disappears with its last connection.
///
/// # Errors
///
/// Returns an error if the URL cannot be parsed or the database cannot be opened
pub async fn connect(url: &DatabaseUrl, pool: &PoolConfig) -> AppResult<SqlitePool> {
    let options = if url.is_memory() {
        memory_options()
    } else {
        url.to_connection_string()
            .parse::<SqliteConnectOptions>()
            .map_err(|e| AppError::invalid_config(format!("invalid SQLite URL '{url}': {e}")))?
            .create_if_missing(true)
    };

    let acquire_timeout = Duration::from_secs(pool.acquire_timeout_secs);
    let pool_options = SqlitePoolOptions::new().max_connections(pool.max_connections);
    let pool_options = if url.is_memory() {
        pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options
    };

    info!(url = %url, "Opening SQLite pool");
    let pool = pool_options
        .acquire_timeout(acquire_timeout)
        .connect_with(options)
        .await?;
    debug!(url = %url, size = pool.size(), "SQLite pool ready");
    Ok(pool)
}

fn memory_options() -> SqliteConnectOptions {
    let seq = MEMORY_DATABASE_SEQ.fetch_add(1, Ordering::Relaxed);
    SqliteConnectOptions::new()
        .filename(format!("file:sqltemplate-memory-{seq}"))
        .in_memory(true)
        .shared_cache(true)
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &BindValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        BindValue::Null => query.bind(None::<String>),
        BindValue::Bool(flag) => query.bind(*flag),
        BindValue::Int(number) => query.bind(*number),
        BindValue::Float(number) => query.bind(*number),
        BindValue::Text(text) => query.bind(text.clone()),
    }
}

/// Run a statement and stream its rows
pub fn fetch(pool: SqlitePool, statement: CompiledStatement) -> RowStream {
    try_stream! {
        let mut query = sqlx::query(&statement.sql);
        for value in &statement.binds {
            query = bind_value(query, value);
        }

        let mut rows = query.fetch(&pool);
        let mut columns: Option<Arc<[String]>> = None;
        while let Some(row) = rows.try_next().await? {
            let names = columns.get_or_insert_with(|| column_names(&row));
            yield RowMap::new(Arc::clone(names), decode_row(&row)?);
        }
    }
    .boxed()
}

/// Run a statement and return the number of affected rows
///
/// # Errors
///
/// Returns the driver error if execution fails
pub async fn execute(pool: &SqlitePool, statement: &CompiledStatement) -> AppResult<u64> {
    let mut query = sqlx::query(&statement.sql);
    for value in &statement.binds {
        query = bind_value(query, value);
    }
    Ok(query.execute(pool).await?.rows_affected())
}

fn column_names(row: &SqliteRow) -> Arc<[String]> {
    row.columns()
        .iter()
        .map(|column| column.name().to_owned())
        .collect()
}

fn decode_row(row: &SqliteRow) -> AppResult<Vec<Value>> {
    (0..row.len()).map(|index| decode_column(row, index)).collect()
}

fn decode_column(row: &SqliteRow, index: usize) -> AppResult<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_owned();

    Ok(match type_name.as_str() {
        "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" => {
            Value::Int(row.try_get_unchecked::<i64, _>(index)?)
        }
        "BOOLEAN" => Value::Bool(row.try_get_unchecked::<bool, _>(index)?),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            Value::Float(row.try_get_unchecked::<f64, _>(index)?)
        }
        "BLOB" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            Value::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::Text(row.try_get_unchecked::<String, _>(index)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        connect(&DatabaseUrl::Memory, &PoolConfig::default())
            .await
            .unwrap()
    }

    fn statement(sql: &str, binds: Vec<BindValue>) -> CompiledStatement {
        CompiledStatement {
            sql: sql.to_owned(),
            binds,
        }
    }

    #[tokio::test]
    async fn test_memory_database_persists_across_statements() {
        let pool = memory_pool().await;
        execute(&pool, &statement("CREATE TABLE t (id INTEGER, name TEXT)", vec![]))
            .await
            .unwrap();
        let inserted = execute(
            &pool,
            &statement(
                "INSERT INTO t VALUES (?, ?), (?, ?)",
                vec![
                    BindValue::Int(1),
                    BindValue::Text("ann".to_owned()),
                    BindValue::Int(2),
                    BindValue::Null,
                ],
            ),
        )
        .await
        .unwrap();
        assert_eq!(inserted, 2);

        let rows: Vec<RowMap> = fetch(pool, statement("SELECT id, name FROM t ORDER BY id", vec![]))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns(), &["id".to_owned(), "name".to_owned()]);
        assert_eq!(rows[0].values(), &[Value::Int(1), Value::from("ann")]);
        assert_eq!(rows[1].get("name"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_memory_pool_serves_statements_while_a_cursor_is_open() {
        let pool = memory_pool().await;
        execute(&pool, &statement("CREATE TABLE t (id INTEGER)", vec![]))
            .await
            .unwrap();
        execute(&pool, &statement("INSERT INTO t VALUES (1), (2), (3)", vec![]))
            .await
            .unwrap();

        let mut open = fetch(pool.clone(), statement("SELECT id FROM t ORDER BY id", vec![]));
        let first = open.try_next().await.unwrap().unwrap();
        assert_eq!(first.values(), &[Value::Int(1)]);

        let count: Vec<RowMap> = fetch(pool.clone(), statement("SELECT count(*) FROM t", vec![]))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(count[0].values(), &[Value::Int(3)]);

        let rest: Vec<RowMap> = open.try_collect().await.unwrap();
        assert_eq!(rest.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_pools_are_separate_databases() {
        let first = memory_pool().await;
        let second = memory_pool().await;
        execute(&first, &statement("CREATE TABLE only_here (id INTEGER)", vec![]))
            .await
            .unwrap();

        let err = execute(&second, &statement("SELECT * FROM only_here", vec![]))
            .await
            .unwrap_err();
        assert!(err.driver_error().is_some());
    }

    #[tokio::test]
    async fn test_decodes_storage_classes() {
        let pool = memory_pool().await;
        let rows: Vec<RowMap> = fetch(
            pool,
            statement("SELECT 1.5 AS f, X'6869' AS b, 'x' AS t, NULL AS n", vec![]),
        )
        .try_collect()
        .await
        .unwrap();
        assert_eq!(
            rows[0].values(),
            &[
                Value::Float(1.5),
                Value::from("hi"),
                Value::from("x"),
                Value::Null
            ]
        );
    }

    #[tokio::test]
    async fn test_driver_error_is_source() {
        let pool = memory_pool().await;
        let err = fetch(pool, statement("SELECT * FROM missing_table", vec![]))
            .try_collect::<Vec<_>>()
            .await
            .unwrap_err();
        assert!(err.driver_error().is_some());
    }
}

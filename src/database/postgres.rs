// ABOUTME: PostgreSQL backend: pool construction, numbered binds and dynamic row decoding
// ABOUTME: Compiled only with the postgresql feature
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use futures_util::{StreamExt, TryStreamExt};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{JsonValue, Uuid};
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo, ValueRef};
use sqltemplate_core::{AppError, AppResult, Value};
use tracing::info;

use crate::config::{DatabaseUrl, PoolConfig};

use super::cursor::{RowMap, RowStream};
use super::statement::{BindValue, CompiledStatement};

/// Open a pool for a `PostgreSQL` URL
///
/// # Errors
///
/// Returns an error if the server cannot be reached
pub async fn connect(url: &DatabaseUrl, pool: &PoolConfig) -> AppResult<PgPool> {
    info!("Opening PostgreSQL pool");
    Ok(PgPoolOptions::new()
        .max_connections(pool.max_connections)
        .acquire_timeout(Duration::from_secs(pool.acquire_timeout_secs))
        .connect(&url.to_connection_string())
        .await?)
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &BindValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        BindValue::Null => query.bind(None::<String>),
        BindValue::Bool(flag) => query.bind(*flag),
        BindValue::Int(number) => query.bind(*number),
        BindValue::Float(number) => query.bind(*number),
        BindValue::Text(text) => query.bind(text.clone()),
    }
}

/// Run a statement and stream its rows
pub fn fetch(pool: PgPool, statement: CompiledStatement) -> RowStream {
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
pub async fn execute(pool: &PgPool, statement: &CompiledStatement) -> AppResult<u64> {
    let mut query = sqlx::query(&statement.sql);
    for value in &statement.binds {
        query = bind_value(query, value);
    }
    Ok(query.execute(pool).await?.rows_affected())
}

fn column_names(row: &PgRow) -> Arc<[String]> {
    row.columns()
        .iter()
        .map(|column| column.name().to_owned())
        .collect()
}

fn decode_row(row: &PgRow) -> AppResult<Vec<Value>> {
    (0..row.len()).map(|index| decode_column(row, index)).collect()
}

/// Decode one column by its `PostgreSQL` type.
///
/// Temporal and `UUID` columns become text (`TIMESTAMPTZ` as RFC 3339 in
/// UTC), `JSON` and `JSONB` become nested values. `NUMERIC` and other types
/// without a lossless mapping are rejected with a hint to cast in the query.
fn decode_column(row: &PgRow, index: usize) -> AppResult<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_owned();

    Ok(match type_name.as_str() {
        "INT2" => Value::Int(i64::from(row.try_get::<i16, _>(index)?)),
        "INT4" => Value::Int(i64::from(row.try_get::<i32, _>(index)?)),
        "INT8" => Value::Int(row.try_get::<i64, _>(index)?),
        "FLOAT4" => Value::Float(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => Value::Float(row.try_get::<f64, _>(index)?),
        "BOOL" => Value::Bool(row.try_get::<bool, _>(index)?),
        "BYTEA" => {
            let bytes = row.try_get::<Vec<u8>, _>(index)?;
            Value::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => {
            Value::Text(row.try_get::<String, _>(index)?)
        }
        "TIMESTAMPTZ" => Value::Text(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339()),
        "TIMESTAMP" => Value::Text(row.try_get::<NaiveDateTime, _>(index)?.to_string()),
        "DATE" => Value::Text(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::Text(row.try_get::<NaiveTime, _>(index)?.to_string()),
        "UUID" => Value::Text(row.try_get::<Uuid, _>(index)?.to_string()),
        "JSON" | "JSONB" => Value::from(row.try_get::<JsonValue, _>(index)?),
        other => {
            return Err(AppError::database(format!(
                "column {index} has unsupported type {other}; cast it to text or float8 in the query"
            )))
        }
    })
}

// ABOUTME: Integration tests for PostgreSQL column decoding against a live server
// ABOUTME: Runs only with the postgresql feature and SQLTEMPLATE_TEST_POSTGRES_URL set
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

#![cfg(feature = "postgresql")]

mod common;

use std::env;
use std::sync::Arc;

use anyhow::Result;
use sqltemplate::config::{DatabaseUrl, PoolConfig};
use sqltemplate::errors::ErrorCode;
use sqltemplate::{
    ConnectionHandle, ConnectionRegistry, Context, SqlTemplate, TemplateEngine, Value,
};

const POSTGRES_URL_VAR: &str = "SQLTEMPLATE_TEST_POSTGRES_URL";

async fn postgres_service() -> Result<Option<SqlTemplate>> {
    let Ok(url) = env::var(POSTGRES_URL_VAR) else {
        return Ok(None);
    };
    common::init_test_logging();
    let handle = ConnectionHandle::connect(
        "default",
        &DatabaseUrl::parse_url(&url)?,
        &PoolConfig::default(),
        false,
    )
    .await?;
    let mut registry = ConnectionRegistry::new();
    registry.register(handle);
    Ok(Some(SqlTemplate::new(
        Arc::new(TemplateEngine::default()),
        Arc::new(registry),
    )))
}

#[tokio::test]
async fn test_temporal_uuid_and_json_columns_decode() -> Result<()> {
    let Some(service) = postgres_service().await? else {
        return Ok(());
    };
    let row = service
        .query_from_string(
            "SELECT TIMESTAMPTZ '2025-01-02 03:04:05+00' AS ts, \
                    TIMESTAMP '2025-01-02 03:04:05' AS naive, \
                    DATE '2025-01-02' AS day, \
                    TIME '03:04:05' AS at, \
                    '6f1c2a9e-4b7d-4c1a-9a55-0d3e8f2b7c41'::uuid AS id, \
                    '{\"tags\": [1, 2]}'::jsonb AS doc, \
                    %(n)s::int8 AS n",
            Context::new().with("n", 7),
        )?
        .values_list()?
        .into_rows()
        .await?;

    assert_eq!(
        row[0],
        vec![
            Value::from("2025-01-02T03:04:05+00:00"),
            Value::from("2025-01-02 03:04:05"),
            Value::from("2025-01-02"),
            Value::from("03:04:05"),
            Value::from("6f1c2a9e-4b7d-4c1a-9a55-0d3e8f2b7c41"),
            Value::from(serde_json::json!({"tags": [1, 2]})),
            Value::Int(7),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_numeric_column_asks_for_a_cast() -> Result<()> {
    let Some(service) = postgres_service().await? else {
        return Ok(());
    };
    let query = service.query_from_string("SELECT 1.5::numeric AS total", Context::new())?;
    let err = query.scalar().await.unwrap_err();
    assert!(err.is(ErrorCode::DatabaseError));
    assert!(err.to_string().contains("cast"));

    let cast = service.query_from_string("SELECT 1.5::numeric::float8 AS total", Context::new())?;
    assert_eq!(cast.scalar().await?, Value::Float(1.5));
    Ok(())
}

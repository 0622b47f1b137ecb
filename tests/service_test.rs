// ABOUTME: Integration tests for the SqlTemplate service facade over file templates
// ABOUTME: Exercises named and selected templates, scoped contexts and alias routing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

mod common;

use anyhow::Result;
use sqltemplate::errors::ErrorCode;
use sqltemplate::{Context, Value};

const ORDERS_BY_USER: &str = "\
SELECT o.id, o.total
FROM orders o
WHERE o.user_id IN ({{ users }})
{% if min_total %}AND o.total >= %(min_total)s{% endif %}
ORDER BY o.id";

const USERS_BY_ROLE: &str = "SELECT id FROM users WHERE role = %(role)s";

#[tokio::test]
async fn test_named_templates_compose_as_subqueries() -> Result<()> {
    let dir = common::template_dir(&[
        ("orders/by_user.sql", ORDERS_BY_USER),
        ("users/by_role.sql", USERS_BY_ROLE),
    ])?;
    let service = common::create_test_service(dir.path(), false).await?;

    let members = service.get("users/by_role.sql", Context::new().with("role", "member"))?;
    let orders = service.get(
        "orders/by_user.sql",
        Context::new().with("users", members).with("min_total", 1),
    )?;

    let rows = orders.values_list()?.into_rows().await?;
    assert_eq!(rows, vec![vec![Value::Int(11), Value::Int(40)]]);
    assert!(orders.pretty()?.contains("\nWHERE o.user_id IN"));
    Ok(())
}

#[tokio::test]
async fn test_service_context_is_shared_by_every_query() -> Result<()> {
    let dir = common::template_dir(&[("users/by_role.sql", USERS_BY_ROLE)])?;
    let service = common::create_test_service(dir.path(), false).await?;
    let admins_only = service.with_context(Context::new().with("role", "admin"));

    let mut admins = admins_only.get("users/by_role.sql", Context::new())?.values()?;
    assert_eq!(admins.len().await?, 2);

    let mut members = admins_only
        .get("users/by_role.sql", Context::new().with("role", "member"))?
        .values()?;
    assert_eq!(members.len().await?, 2);

    assert!(service.context().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_select_falls_back_to_later_names() -> Result<()> {
    let dir = common::template_dir(&[("users/by_role.sql", USERS_BY_ROLE)])?;
    let service = common::create_test_service(dir.path(), false).await?;

    let query = service.select(
        &["users/by_role_v2.sql", "users/by_role.sql"],
        Context::new().with("role", "admin"),
    )?;
    assert_eq!(query.template().name(), "users/by_role.sql");

    let err = service
        .select(&["users/gone.sql"], Context::new())
        .unwrap_err();
    assert!(err.is(ErrorCode::TemplateDoesNotExist));
    Ok(())
}

#[tokio::test]
async fn test_scoped_alias_routes_every_query() -> Result<()> {
    let dir = common::template_dir(&[])?;
    let service = common::create_test_service(dir.path(), false).await?;

    let err = service
        .using("archive")
        .query_from_string("SELECT 1", Context::new())?
        .execute()
        .unwrap_err();
    assert!(err.is(ErrorCode::ConnectionNotFound));

    let value = service
        .query_from_string("SELECT 1", Context::new())?
        .scalar()
        .await?;
    assert_eq!(value, Value::Int(1));
    Ok(())
}

// ABOUTME: Query parameter construction from a template context and its composed sub-queries
// ABOUTME: Merges sub-query contexts under the primary context and flattens nested maps to dotted keys
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

//! # Context flattening
//!
//! A query's parameters are built in three steps:
//!
//! 1. [`extract_subcontexts`] walks the context depth-first and collects the
//!    context of every sub-query it meets, in discovery order.
//! 2. [`merge_context`] applies those contexts to an empty accumulator (last
//!    write wins) and then applies the primary context on top, so top-level
//!    bindings always win on collision.
//! 3. [`flatten`] turns nested maps into dotted keys:
//!    `{"user": {"id": 1}}` becomes `{"user.id": 1}`.

use std::collections::BTreeMap;

use tracing::trace;

use crate::constants::PARAM_PATH_DELIMITER;
use crate::value::{Context, Value};

/// Flattened statement parameters keyed by dotted path
pub type Params = BTreeMap<String, Value>;

/// Collect the contexts of all sub-queries reachable from `values`.
///
/// A sub-query's own context is recorded before the contexts of queries
/// nested inside it. Plain maps and lists are searched for sub-queries but
/// contribute no context of their own.
#[must_use]
pub fn extract_subcontexts<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<&'a Context> {
    let mut subcontexts = Vec::new();
    for value in values {
        collect_subcontexts(value, &mut subcontexts);
    }
    subcontexts
}

fn collect_subcontexts<'a>(value: &'a Value, out: &mut Vec<&'a Context>) {
    match value {
        Value::Query(query) => {
            let context = query.context();
            out.push(context);
            for nested in context.values() {
                collect_subcontexts(nested, out);
            }
        }
        Value::Map(map) => {
            for nested in map.values() {
                collect_subcontexts(nested, out);
            }
        }
        Value::List(items) => {
            for nested in items {
                collect_subcontexts(nested, out);
            }
        }
        _ => {}
    }
}

/// Merge sub-query contexts and then the primary context into one context
#[must_use]
pub fn merge_context(primary: &Context) -> Context {
    let mut merged = Context::new();
    for subcontext in extract_subcontexts(primary.values()) {
        merged.update(subcontext);
    }
    merged.update(primary);
    merged
}

/// Flatten nested maps into dotted keys.
///
/// Sub-query values are not bindable and are left out; lists are kept whole.
#[must_use]
pub fn flatten(context: &Context) -> Params {
    let mut params = Params::new();
    flatten_into(context, None, &mut params);
    params
}

fn flatten_into(context: &Context, prefix: Option<&str>, params: &mut Params) {
    for (key, value) in context {
        let path = prefix.map_or_else(
            || key.clone(),
            |prefix| format!("{prefix}{PARAM_PATH_DELIMITER}{key}"),
        );
        match value {
            Value::Map(nested) => flatten_into(nested, Some(&path), params),
            Value::Query(_) => trace!(key = %path, "skipping sub-query in parameter flattening"),
            scalar_or_list => {
                params.insert(path, scalar_or_list.clone());
            }
        }
    }
}

/// Statement parameters for a primary context: merge, then flatten
#[must_use]
pub fn query_params(primary: &Context) -> Params {
    flatten(&merge_context(primary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppResult;
    use crate::value::SubQuery;
    use std::sync::Arc;

    #[derive(Debug)]
    struct FakeQuery {
        sql: &'static str,
        context: Context,
    }

    impl SubQuery for FakeQuery {
        fn context(&self) -> &Context {
            &self.context
        }

        fn render_sql(&self) -> AppResult<String> {
            Ok(self.sql.to_owned())
        }
    }

    fn sub(context: Context) -> Value {
        Value::Query(Arc::new(FakeQuery {
            sql: "SELECT 1",
            context,
        }))
    }

    #[test]
    fn test_flatten_nested_maps() {
        let context = Context::new().with("a", Context::new().with("b", 1));
        let params = flatten(&context);
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("a.b"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_flatten_deep_paths_and_lists() {
        let context = Context::new()
            .with(
                "filter",
                Context::new().with("range", Context::new().with("min", 1).with("max", 9)),
            )
            .with("ids", vec![1, 2]);
        let params = flatten(&context);
        assert_eq!(params.get("filter.range.min"), Some(&Value::Int(1)));
        assert_eq!(params.get("filter.range.max"), Some(&Value::Int(9)));
        assert_eq!(params.get("ids"), Some(&Value::from(vec![1, 2])));
    }

    #[test]
    fn test_flatten_drops_empty_maps_and_queries() {
        let context = Context::new()
            .with("empty", Context::new())
            .with("inner", sub(Context::new()));
        assert!(flatten(&context).is_empty());
    }

    #[test]
    fn test_primary_context_wins_over_subcontexts() {
        let primary = Context::new()
            .with("status", "active")
            .with("inner", sub(Context::new().with("status", "deleted").with("limit", 5)));

        let params = query_params(&primary);
        assert_eq!(params.get("status"), Some(&Value::from("active")));
        assert_eq!(params.get("limit"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_nested_subcontexts_apply_in_discovery_order() {
        // Pre-order: outer's context is applied before innermost's, so the
        // innermost binding of `shared` wins over outer's.
        let innermost = sub(Context::new().with("shared", "innermost"));
        let outer = sub(
            Context::new()
                .with("shared", "outer")
                .with("nested", innermost),
        );
        let primary = Context::new().with("q", outer);

        let subcontexts = extract_subcontexts(primary.values());
        assert_eq!(subcontexts.len(), 2);
        assert_eq!(subcontexts[0].get("shared"), Some(&Value::from("outer")));

        let params = query_params(&primary);
        assert_eq!(params.get("shared"), Some(&Value::from("innermost")));
    }

    #[test]
    fn test_subqueries_inside_maps_are_discovered() {
        let primary = Context::new().with(
            "parts",
            Context::new().with("where", sub(Context::new().with("min_age", 18))),
        );
        let params = query_params(&primary);
        assert_eq!(params.get("min_age"), Some(&Value::Int(18)));
    }

    #[test]
    fn test_subcontext_maps_flatten_too() {
        let primary = Context::new().with(
            "inner",
            sub(Context::new().with("user", Context::new().with("id", 3))),
        );
        let params = query_params(&primary);
        assert_eq!(params.get("user.id"), Some(&Value::Int(3)));
    }
}

// ABOUTME: Compiles rendered SQL with pyformat %(name)s markers into positional driver placeholders
// ABOUTME: Resolves each marker against flattened parameters and produces the ordered bind list
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

use std::fmt::Write as _;

use serde::Serialize;
use sqltemplate_core::{AppError, AppResult, Params, Value};

/// Positional placeholder syntax of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (`SQLite`)
    QuestionMark,
    /// `$1`, `$2`, ... (`PostgreSQL`)
    Numbered,
}

/// A value bound to a single positional placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BindValue {
    /// SQL `NULL`
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Text
    Text(String),
}

impl BindValue {
    fn from_scalar(name: &str, value: &Value) -> AppResult<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(flag) => Ok(Self::Bool(*flag)),
            Value::Int(number) => Ok(Self::Int(*number)),
            Value::Float(number) => Ok(Self::Float(*number)),
            Value::Text(text) => Ok(Self::Text(text.clone())),
            other => Err(AppError::invalid_parameter(format!(
                "parameter '{name}' holds a {} and cannot be bound",
                other.kind()
            ))
            .with_details(serde_json::json!({ "parameter": name, "kind": other.kind() }))),
        }
    }
}

/// SQL ready for the driver plus its positional binds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledStatement {
    /// SQL with positional placeholders
    pub sql: String,
    /// Bind values in placeholder order
    pub binds: Vec<BindValue>,
}

impl CompiledStatement {
    /// Binds as JSON for logs
    #[must_use]
    pub fn params_json(&self) -> String {
        serde_json::to_string(&self.binds).unwrap_or_else(|_| "[]".to_owned())
    }
}

/// Replace every `%(name)s` marker in `sql` with positional placeholders.
///
/// - `%%` is a literal `%`; a `%` not followed by `(` or `%` is kept as is
/// - list values expand to one placeholder per item, for `IN (...)` clauses
///
/// # Errors
///
/// Returns `MissingParameter` for a marker with no value, and
/// `InvalidParameter` for empty lists, nested lists, mappings, sub-queries
/// or an unterminated marker
pub fn compile(sql: &str, params: &Params, style: PlaceholderStyle) -> AppResult<CompiledStatement> {
    let mut output = String::with_capacity(sql.len());
    let mut binds = Vec::new();
    let mut rest = sql;

    while let Some(index) = rest.find('%') {
        output.push_str(&rest[..index]);
        let tail = &rest[index..];

        if tail.starts_with("%%") {
            output.push('%');
            rest = &tail[2..];
        } else if let Some(marker) = tail.strip_prefix("%(") {
            let close = marker.find(")s").ok_or_else(|| {
                AppError::invalid_parameter(format!(
                    "unterminated parameter marker near '{}'",
                    truncate(tail, 32)
                ))
            })?;
            let name = &marker[..close];
            let value = params
                .get(name)
                .ok_or_else(|| AppError::missing_parameter(name))?;
            push_value(name, value, style, &mut output, &mut binds)?;
            rest = &marker[close + 2..];
        } else {
            output.push('%');
            rest = &tail[1..];
        }
    }
    output.push_str(rest);

    Ok(CompiledStatement {
        sql: output,
        binds,
    })
}

fn push_value(
    name: &str,
    value: &Value,
    style: PlaceholderStyle,
    output: &mut String,
    binds: &mut Vec<BindValue>,
) -> AppResult<()> {
    let Value::List(items) = value else {
        binds.push(BindValue::from_scalar(name, value)?);
        push_placeholder(style, binds.len(), output);
        return Ok(());
    };

    if items.is_empty() {
        return Err(AppError::invalid_parameter(format!(
            "parameter '{name}' is an empty list"
        )));
    }
    for (position, item) in items.iter().enumerate() {
        if position > 0 {
            output.push_str(", ");
        }
        binds.push(BindValue::from_scalar(name, item)?);
        push_placeholder(style, binds.len(), output);
    }
    Ok(())
}

fn push_placeholder(style: PlaceholderStyle, position: usize, output: &mut String) {
    match style {
        PlaceholderStyle::QuestionMark => output.push('?'),
        PlaceholderStyle::Numbered => {
            let _ = write!(output, "${position}");
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(index, _)| &text[..index])
}

#[cfg(test)]
mod tests {
    use sqltemplate_core::{ErrorCode, Params};

    use super::*;

    fn params(entries: &[(&str, Value)]) -> Params {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn test_named_markers_become_question_marks() {
        let p = params(&[("user.id", Value::Int(7)), ("name", Value::from("ann"))]);
        let compiled = compile(
            "SELECT * FROM t WHERE id = %(user.id)s AND name = %(name)s OR owner = %(user.id)s",
            &p,
            PlaceholderStyle::QuestionMark,
        )
        .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT * FROM t WHERE id = ? AND name = ? OR owner = ?"
        );
        assert_eq!(
            compiled.binds,
            vec![
                BindValue::Int(7),
                BindValue::Text("ann".to_owned()),
                BindValue::Int(7)
            ]
        );
    }

    #[test]
    fn test_numbered_style_counts_list_items() {
        let p = params(&[
            ("ids", Value::from(vec![1, 2, 3])),
            ("active", Value::Bool(true)),
        ]);
        let compiled = compile(
            "SELECT * FROM t WHERE id IN (%(ids)s) AND active = %(active)s",
            &p,
            PlaceholderStyle::Numbered,
        )
        .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT * FROM t WHERE id IN ($1, $2, $3) AND active = $4"
        );
        assert_eq!(compiled.binds.len(), 4);
    }

    #[test]
    fn test_percent_escapes() {
        let compiled = compile(
            "SELECT '100%%', 5 % 2",
            &Params::new(),
            PlaceholderStyle::QuestionMark,
        )
        .unwrap();
        assert_eq!(compiled.sql, "SELECT '100%', 5 % 2");
        assert!(compiled.binds.is_empty());
    }

    #[test]
    fn test_missing_parameter() {
        let err = compile("SELECT %(nope)s", &Params::new(), PlaceholderStyle::QuestionMark)
            .unwrap_err();
        assert!(err.is(ErrorCode::MissingParameter));
    }

    #[test]
    fn test_unbindable_values() {
        let p = params(&[
            ("empty", Value::List(Vec::new())),
            ("nested", Value::from(vec![Value::from(vec![1])])),
        ]);
        for sql in ["SELECT %(empty)s", "SELECT %(nested)s", "SELECT %(broken"] {
            let err = compile(sql, &p, PlaceholderStyle::QuestionMark).unwrap_err();
            assert!(err.is(ErrorCode::InvalidParameter), "{sql}: {err}");
        }
    }
}

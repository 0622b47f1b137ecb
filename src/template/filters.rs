// ABOUTME: Built-in template filters applied with the `value|filter:arg` syntax
// ABOUTME: Includes the `adapt` literal-quoting filter for inlining values into pyformat SQL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

use sqltemplate_core::{AppError, Value};
use thiserror::Error;

use crate::constants::templates::ADAPT_QMARK;
use crate::utils::sql::quote_literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Filter {
    /// Quote as a SQL string literal, doubling the paramstyle mark
    Adapt,
    Default,
    Upper,
    Lower,
    Join,
    Length,
}

#[derive(Debug, Error)]
pub(crate) enum FilterError {
    #[error("filter '{filter}' requires an argument")]
    MissingArgument { filter: &'static str },
    #[error("filter '{filter}' cannot be applied to {kind}")]
    Unsupported {
        filter: &'static str,
        kind: &'static str,
    },
    #[error(transparent)]
    Value(#[from] AppError),
}

impl Filter {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        match name {
            "adapt" => Some(Self::Adapt),
            "default" => Some(Self::Default),
            "upper" => Some(Self::Upper),
            "lower" => Some(Self::Lower),
            "join" => Some(Self::Join),
            "length" => Some(Self::Length),
            _ => None,
        }
    }

    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Adapt => "adapt",
            Self::Default => "default",
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Join => "join",
            Self::Length => "length",
        }
    }

    pub(crate) fn apply(self, value: Value, arg: Option<Value>) -> Result<Value, FilterError> {
        match self {
            Self::Adapt => {
                let qmark = match arg {
                    Some(mark) => mark.to_text()?,
                    None => ADAPT_QMARK.to_owned(),
                };
                let text = value.to_text()?;
                let escaped = if qmark.is_empty() {
                    text
                } else {
                    text.replace(&qmark, &qmark.repeat(2))
                };
                Ok(Value::Text(quote_literal(&escaped)))
            }
            Self::Default => {
                let fallback = arg.ok_or(FilterError::MissingArgument {
                    filter: self.name(),
                })?;
                Ok(if value.is_truthy() { value } else { fallback })
            }
            Self::Upper => Ok(Value::Text(value.to_text()?.to_uppercase())),
            Self::Lower => Ok(Value::Text(value.to_text()?.to_lowercase())),
            Self::Join => {
                let separator = arg
                    .ok_or(FilterError::MissingArgument {
                        filter: self.name(),
                    })?
                    .to_text()?;
                let Value::List(items) = value else {
                    return Err(FilterError::Unsupported {
                        filter: self.name(),
                        kind: value.kind(),
                    });
                };
                let parts = items
                    .iter()
                    .map(Value::to_text)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Text(parts.join(&separator)))
            }
            Self::Length => {
                let length = match &value {
                    Value::Null => 0,
                    Value::Text(text) => text.chars().count(),
                    Value::List(items) => items.len(),
                    Value::Map(map) => map.len(),
                    other => {
                        return Err(FilterError::Unsupported {
                            filter: self.name(),
                            kind: other.kind(),
                        })
                    }
                };
                Ok(Value::Int(i64::try_from(length).unwrap_or(i64::MAX)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapt_quotes_and_escapes_mark() {
        let adapted = Filter::Adapt
            .apply(Value::from("it's 50%"), None)
            .unwrap();
        assert_eq!(adapted, Value::from("'it''s 50%%'"));
    }

    #[test]
    fn test_adapt_custom_mark() {
        let adapted = Filter::Adapt
            .apply(Value::from("a?b"), Some(Value::from("?")))
            .unwrap();
        assert_eq!(adapted, Value::from("'a??b'"));
    }

    #[test]
    fn test_default_only_for_falsy() {
        let fallback = Some(Value::from("n/a"));
        assert_eq!(
            Filter::Default.apply(Value::Null, fallback.clone()).unwrap(),
            Value::from("n/a")
        );
        assert_eq!(
            Filter::Default.apply(Value::Int(3), fallback).unwrap(),
            Value::Int(3)
        );
        assert!(matches!(
            Filter::Default.apply(Value::Null, None),
            Err(FilterError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_join_and_length() {
        let list = Value::from(vec!["a", "b", "c"]);
        assert_eq!(
            Filter::Join
                .apply(list.clone(), Some(Value::from(", ")))
                .unwrap(),
            Value::from("a, b, c")
        );
        assert_eq!(Filter::Length.apply(list, None).unwrap(), Value::Int(3));
        assert!(Filter::Join
            .apply(Value::Int(1), Some(Value::from(",")))
            .is_err());
    }

    #[test]
    fn test_case_filters() {
        assert_eq!(
            Filter::Upper.apply(Value::from("asc"), None).unwrap(),
            Value::from("ASC")
        );
        assert_eq!(
            Filter::Lower.apply(Value::from("DESC"), None).unwrap(),
            Value::from("desc")
        );
    }
}

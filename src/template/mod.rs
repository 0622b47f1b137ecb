// ABOUTME: Compiled SQL templates and the renderer that turns a context into statement text
// ABOUTME: Supports variables with filters, if/elif/else, for/empty loops and comments
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

//! # SQL templates
//!
//! The template language is a small subset of the Django template language:
//!
//! - `{{ user.id }}` outputs a value; dotted segments look into mappings,
//!   list indexes, and the `sql` and `context` attributes of sub-queries
//! - `{{ name|adapt }}`, `{{ cols|join:", " }}` apply filters
//! - `{% if a and not b %}...{% elif c == "x" %}...{% else %}...{% endif %}`
//! - `{% for col in columns %}...{% empty %}...{% endfor %}` with `forloop.counter`,
//!   `forloop.counter0`, `forloop.first`, `forloop.last` and `forloop.length`
//! - `{# comment #}` and `{% comment %}...{% endcomment %}`
//!
//! Output is not escaped. Values meant for the database belong in `%(name)s`
//! bind markers, which pass through rendering untouched.

mod filters;
mod parser;

use std::borrow::Cow;

use sqltemplate_core::{AppError, AppResult, Context, Value};

use filters::FilterError;
use parser::{CompareOp, Condition, Expr, Node, Operand};

/// Name given to templates compiled from inline strings
pub const INLINE_TEMPLATE_NAME: &str = "<string>";

/// A parsed template, ready to render any number of times
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse template source
    ///
    /// # Errors
    ///
    /// Returns a `TemplateSyntax` error naming the template on malformed tags,
    /// unknown filters or unclosed blocks
    pub fn compile(name: impl Into<String>, source: &str) -> AppResult<Self> {
        let name = name.into();
        let nodes = parser::parse(source).map_err(|e| AppError::template_syntax(&name, e))?;
        Ok(Self { name, nodes })
    }

    /// Compile an inline template
    ///
    /// # Errors
    ///
    /// Returns a `TemplateSyntax` error if the source is malformed
    pub fn from_string(source: &str) -> AppResult<Self> {
        Self::compile(INLINE_TEMPLATE_NAME, source)
    }

    /// Template name used in error messages
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render with a context
    ///
    /// # Errors
    ///
    /// Returns an error if a filter is misused, a loop target is not iterable,
    /// or an embedded sub-query fails to render
    pub fn render(&self, context: &Context) -> AppResult<String> {
        let mut scope = Scope {
            context,
            frames: Vec::new(),
        };
        let mut output = String::new();
        self.render_nodes(&self.nodes, &mut scope, &mut output)?;
        Ok(output)
    }

    fn render_nodes(&self, nodes: &[Node], scope: &mut Scope<'_>, out: &mut String) -> AppResult<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output(expr) => {
                    let value = self.evaluate(expr, scope)?;
                    out.push_str(&value.to_text()?);
                }
                Node::If {
                    branches,
                    otherwise,
                } => {
                    let mut chosen = otherwise;
                    for (condition, body) in branches {
                        if self.test(condition, scope)? {
                            chosen = body;
                            break;
                        }
                    }
                    self.render_nodes(chosen, scope, out)?;
                }
                Node::For {
                    target,
                    iterable,
                    body,
                    empty,
                } => {
                    let items = self.iterate(iterable, scope)?;
                    if items.is_empty() {
                        self.render_nodes(empty, scope, out)?;
                        continue;
                    }
                    let length = items.len();
                    for (index, item) in items.into_iter().enumerate() {
                        scope.frames.push((target.clone(), item));
                        scope
                            .frames
                            .push(("forloop".to_owned(), forloop(index, length)));
                        let rendered = self.render_nodes(body, scope, out);
                        scope.frames.truncate(scope.frames.len() - 2);
                        rendered?;
                    }
                }
            }
        }
        Ok(())
    }

    fn iterate(&self, iterable: &Expr, scope: &Scope<'_>) -> AppResult<Vec<Value>> {
        match self.evaluate(iterable, scope)?.into_owned() {
            Value::Null => Ok(Vec::new()),
            Value::List(items) => Ok(items),
            Value::Map(map) => Ok(map.into_iter().map(|(key, _)| Value::Text(key)).collect()),
            other => Err(AppError::template_render(
                &self.name,
                format!("cannot iterate over {}", other.kind()),
            )),
        }
    }

    fn test(&self, condition: &Condition, scope: &Scope<'_>) -> AppResult<bool> {
        Ok(match condition {
            Condition::Test(expr) => self.evaluate(expr, scope)?.is_truthy(),
            Condition::Compare(left, op, right) => {
                let equal = *self.evaluate(left, scope)? == *self.evaluate(right, scope)?;
                match op {
                    CompareOp::Eq => equal,
                    CompareOp::Ne => !equal,
                }
            }
            Condition::Not(inner) => !self.test(inner, scope)?,
            Condition::And(left, right) => self.test(left, scope)? && self.test(right, scope)?,
            Condition::Or(left, right) => self.test(left, scope)? || self.test(right, scope)?,
        })
    }

    fn evaluate<'s>(&self, expr: &Expr, scope: &'s Scope<'_>) -> AppResult<Cow<'s, Value>> {
        let value = resolve(&expr.operand, scope)?;
        if expr.filters.is_empty() {
            return Ok(value);
        }

        let mut current = value.into_owned();
        for call in &expr.filters {
            let arg = call
                .arg
                .as_ref()
                .map(|operand| resolve(operand, scope).map(Cow::into_owned))
                .transpose()?;
            current = call.filter.apply(current, arg).map_err(|e| match e {
                FilterError::Value(inner) => inner,
                other => AppError::template_render(&self.name, other.to_string()),
            })?;
        }
        Ok(Cow::Owned(current))
    }
}

/// Variables visible while rendering: loop frames shadow the context
struct Scope<'c> {
    context: &'c Context,
    frames: Vec<(String, Value)>,
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find(|(frame_name, _)| frame_name == name)
            .map(|(_, value)| value)
            .or_else(|| self.context.get(name))
    }
}

/// Resolve an operand; missing names and attributes resolve to `Null`
fn resolve<'s>(operand: &Operand, scope: &'s Scope<'_>) -> AppResult<Cow<'s, Value>> {
    let path = match operand {
        Operand::Literal(value) => return Ok(Cow::Owned(value.clone())),
        Operand::Path(path) => path,
    };
    let Some((first, rest)) = path.split_first() else {
        return Ok(Cow::Owned(Value::Null));
    };
    let Some(mut current) = scope.lookup(first).map(Cow::Borrowed) else {
        return Ok(Cow::Owned(Value::Null));
    };

    for segment in rest {
        let next = match current {
            Cow::Borrowed(value) => attribute(value, segment)?,
            Cow::Owned(value) => attribute(&value, segment)?.map(|child| Cow::Owned(child.into_owned())),
        };
        match next {
            Some(value) => current = value,
            None => return Ok(Cow::Owned(Value::Null)),
        }
    }
    Ok(current)
}

fn attribute<'v>(value: &'v Value, name: &str) -> AppResult<Option<Cow<'v, Value>>> {
    Ok(match value {
        Value::Map(map) => map.get(name).map(Cow::Borrowed),
        Value::List(items) => name
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index))
            .map(Cow::Borrowed),
        Value::Query(query) => match name {
            "sql" => Some(Cow::Owned(Value::Text(query.render_sql()?))),
            "context" => Some(Cow::Owned(Value::Map(query.context().clone()))),
            _ => None,
        },
        _ => None,
    })
}

fn forloop(index: usize, length: usize) -> Value {
    let counter0 = i64::try_from(index).unwrap_or(i64::MAX);
    Value::Map(
        Context::new()
            .with("counter0", counter0)
            .with("counter", counter0.saturating_add(1))
            .with("first", index == 0)
            .with("last", index + 1 == length)
            .with("length", i64::try_from(length).unwrap_or(i64::MAX)),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sqltemplate_core::{ErrorCode, SubQuery};

    use super::*;

    #[derive(Debug)]
    struct StaticQuery {
        sql: &'static str,
        context: Context,
    }

    impl SubQuery for StaticQuery {
        fn context(&self) -> &Context {
            &self.context
        }

        fn render_sql(&self) -> AppResult<String> {
            Ok(self.sql.to_owned())
        }
    }

    fn render(source: &str, context: &Context) -> String {
        Template::from_string(source)
            .unwrap()
            .render(context)
            .unwrap()
    }

    #[test]
    fn test_variables_and_nested_lookup() {
        let context = Context::new()
            .with("table", "users")
            .with("user", Context::new().with("id", 7));
        assert_eq!(
            render("SELECT * FROM {{ table }} WHERE id = {{ user.id }}", &context),
            "SELECT * FROM users WHERE id = 7"
        );
    }

    #[test]
    fn test_missing_variables_render_empty() {
        assert_eq!(render("[{{ nope }}][{{ nope.deeper }}]", &Context::new()), "[][]");
    }

    #[test]
    fn test_bind_markers_pass_through() {
        let sql = "SELECT * FROM t WHERE a = %(a)s AND b LIKE '10%%'";
        assert_eq!(render(sql, &Context::new().with("a", 1)), sql);
    }

    #[test]
    fn test_if_elif_else() {
        let source = "{% if order == \"desc\" %}DESC{% elif order %}ASC{% else %}NONE{% endif %}";
        assert_eq!(render(source, &Context::new().with("order", "desc")), "DESC");
        assert_eq!(render(source, &Context::new().with("order", "x")), "ASC");
        assert_eq!(render(source, &Context::new()), "NONE");
    }

    #[test]
    fn test_boolean_operators() {
        let source = "{% if a and not b or c %}yes{% else %}no{% endif %}";
        let context = Context::new().with("a", true).with("b", false);
        assert_eq!(render(source, &context), "yes");
        let context = Context::new().with("a", true).with("b", true);
        assert_eq!(render(source, &context), "no");
    }

    #[test]
    fn test_for_loop_with_forloop_vars() {
        let source = "SELECT {% for c in cols %}{{ c }}{% if not forloop.last %}, {% endif %}{% endfor %} FROM t";
        let context = Context::new().with("cols", vec!["id", "name", "email"]);
        assert_eq!(render(source, &context), "SELECT id, name, email FROM t");
    }

    #[test]
    fn test_for_empty_branch() {
        let source = "{% for c in cols %}{{ c }}{% empty %}*{% endfor %}";
        assert_eq!(render(source, &Context::new().with("cols", Vec::<String>::new())), "*");
    }

    #[test]
    fn test_loop_variable_shadows_context() {
        let source = "{% for id in ids %}{{ id }}{% endfor %}{{ id }}";
        let context = Context::new().with("id", "outer").with("ids", vec![1, 2]);
        assert_eq!(render(source, &context), "12outer");
    }

    #[test]
    fn test_subquery_renders_inline() {
        let inner = StaticQuery {
            sql: "SELECT id FROM admins WHERE level > %(level)s",
            context: Context::new().with("level", 3),
        };
        let context = Context::new().with("admins", Value::Query(Arc::new(inner)));
        assert_eq!(
            render("SELECT * FROM users WHERE id IN ({{ admins }})", &context),
            "SELECT * FROM users WHERE id IN (SELECT id FROM admins WHERE level > %(level)s)"
        );
        assert_eq!(render("{{ admins.context.level }}", &context), "3");
    }

    #[test]
    fn test_comments_are_dropped() {
        let source = "SELECT 1{# inline #}{% comment %} block {{ x }} {% endcomment %}";
        assert_eq!(render(source, &Context::new()), "SELECT 1");
    }

    #[test]
    fn test_syntax_error_names_template() {
        let err = Template::compile("reports/broken.sql", "{% if x %}").unwrap_err();
        assert!(err.is(ErrorCode::TemplateSyntax));
        assert!(err.to_string().contains("reports/broken.sql"));
    }

    #[test]
    fn test_filter_misuse_is_render_error() {
        let template = Template::from_string("{{ n|join:\",\" }}").unwrap();
        let err = template.render(&Context::new().with("n", 1)).unwrap_err();
        assert!(err.is(ErrorCode::TemplateRender));
    }
}

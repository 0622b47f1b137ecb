// ABOUTME: Tokenizer and recursive-descent parser for SQL template source text
// ABOUTME: Produces the node tree for variables, filters, if/elif/else and for/empty blocks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

use std::mem;

use sqltemplate_core::Value;

use super::filters::Filter;

/// Compiled template node
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Text(String),
    Output(Expr),
    If {
        branches: Vec<(Condition, Vec<Node>)>,
        otherwise: Vec<Node>,
    },
    For {
        target: String,
        iterable: Expr,
        body: Vec<Node>,
        empty: Vec<Node>,
    },
}

/// Operand followed by a filter chain
#[derive(Debug, Clone)]
pub(crate) struct Expr {
    pub operand: Operand,
    pub filters: Vec<FilterCall>,
}

#[derive(Debug, Clone)]
pub(crate) enum Operand {
    Path(Vec<String>),
    Literal(Value),
}

#[derive(Debug, Clone)]
pub(crate) struct FilterCall {
    pub filter: Filter,
    pub arg: Option<Operand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
}

#[derive(Debug, Clone)]
pub(crate) enum Condition {
    Test(Expr),
    Compare(Expr, CompareOp, Expr),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Var(&'a str),
    Block(&'a str),
}

/// Parse template source into nodes. Errors are plain messages; the caller
/// attaches the template name.
pub(crate) fn parse(source: &str) -> Result<Vec<Node>, String> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let (nodes, terminator) = parser.parse_until(&[])?;
    match terminator {
        None => Ok(nodes),
        Some(tag) => Err(format!("unexpected '{{% {tag} %}}'")),
    }
}

fn tokenize(source: &str) -> Result<Vec<Token<'_>>, String> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while let Some(start) = find_tag_start(rest) {
        let (text, tail) = rest.split_at(start);
        if !text.is_empty() {
            tokens.push(Token::Text(text));
        }
        let opener = &tail[..2];
        let closer = match opener {
            "{{" => "}}",
            "{%" => "%}",
            _ => "#}",
        };
        let end = tail[2..]
            .find(closer)
            .ok_or_else(|| format!("unclosed tag '{opener}'"))?;
        let inner = tail[2..2 + end].trim();
        match opener {
            "{{" => tokens.push(Token::Var(inner)),
            "{%" => tokens.push(Token::Block(inner)),
            _ => {}
        }
        rest = &tail[2 + end + 2..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

fn find_tag_start(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    text.match_indices('{')
        .map(|(index, _)| index)
        .find(|&index| matches!(bytes.get(index + 1), Some(b'{' | b'%' | b'#')))
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl Parser<'_> {
    /// Parse nodes until a block tag whose keyword is in `terminators`.
    /// Returns the terminating tag's full content.
    fn parse_until(&mut self, terminators: &[&str]) -> Result<(Vec<Node>, Option<String>), String> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.get(self.pos).copied() {
            self.pos += 1;
            match token {
                Token::Text(text) => nodes.push(Node::Text(text.to_owned())),
                Token::Var(content) => {
                    if content.is_empty() {
                        return Err("empty variable tag".to_owned());
                    }
                    nodes.push(Node::Output(parse_expr(content)?));
                }
                Token::Block(content) => {
                    let keyword = content.split_whitespace().next().unwrap_or_default();
                    if terminators.contains(&keyword) {
                        return Ok((nodes, Some(content.to_owned())));
                    }
                    nodes.push(self.parse_block(keyword, content)?);
                }
            }
        }

        if terminators.is_empty() {
            Ok((nodes, None))
        } else {
            Err(format!(
                "unclosed block, expected one of: {}",
                terminators.join(", ")
            ))
        }
    }

    fn parse_block(&mut self, keyword: &str, content: &str) -> Result<Node, String> {
        let arguments = content[keyword.len()..].trim();
        match keyword {
            "if" => self.parse_if(arguments),
            "for" => self.parse_for(arguments),
            "comment" => {
                self.skip_comment()?;
                Ok(Node::Text(String::new()))
            }
            "" => Err("empty block tag".to_owned()),
            other => Err(format!("unknown tag '{other}'")),
        }
    }

    /// Skip raw tokens through the matching `endcomment` without parsing them
    fn skip_comment(&mut self) -> Result<(), String> {
        while let Some(token) = self.tokens.get(self.pos).copied() {
            self.pos += 1;
            if let Token::Block(content) = token {
                if content.split_whitespace().next() == Some("endcomment") {
                    return Ok(());
                }
            }
        }
        Err("unclosed block, expected one of: endcomment".to_owned())
    }

    fn parse_if(&mut self, first_condition: &str) -> Result<Node, String> {
        let mut branches = Vec::new();
        let mut condition = parse_condition(&split_words(first_condition))?;

        loop {
            let (body, terminator) = self.parse_until(&["elif", "else", "endif"])?;
            branches.push((condition, body));
            let terminator = terminator.unwrap_or_default();
            let keyword = terminator.split_whitespace().next().unwrap_or_default();

            if keyword == "elif" {
                condition = parse_condition(&split_words(&terminator[keyword.len()..]))?;
                continue;
            }
            if keyword == "else" {
                let (otherwise, _) = self.parse_until(&["endif"])?;
                return Ok(Node::If {
                    branches,
                    otherwise,
                });
            }
            return Ok(Node::If {
                branches,
                otherwise: Vec::new(),
            });
        }
    }

    fn parse_for(&mut self, arguments: &str) -> Result<Node, String> {
        let words = split_words(arguments);
        let [target, keyword, iterable] = words.as_slice() else {
            return Err(format!("malformed for tag '{arguments}', expected 'x in items'"));
        };
        if keyword != "in" {
            return Err(format!("malformed for tag '{arguments}', expected 'in'"));
        }
        validate_identifier(target)?;
        let iterable = parse_expr(iterable)?;

        let (body, terminator) = self.parse_until(&["empty", "endfor"])?;
        let empty = if terminator.as_deref() == Some("empty") {
            self.parse_until(&["endfor"])?.0
        } else {
            Vec::new()
        };

        Ok(Node::For {
            target: target.clone(),
            iterable,
            body,
            empty,
        })
    }
}

fn parse_condition(words: &[String]) -> Result<Condition, String> {
    if words.is_empty() {
        return Err("empty condition".to_owned());
    }
    if let Some(index) = words.iter().position(|w| w == "or") {
        return Ok(Condition::Or(
            Box::new(parse_condition(&words[..index])?),
            Box::new(parse_condition(&words[index + 1..])?),
        ));
    }
    if let Some(index) = words.iter().position(|w| w == "and") {
        return Ok(Condition::And(
            Box::new(parse_condition(&words[..index])?),
            Box::new(parse_condition(&words[index + 1..])?),
        ));
    }
    if words[0] == "not" {
        return Ok(Condition::Not(Box::new(parse_condition(&words[1..])?)));
    }
    match words {
        [single] => Ok(Condition::Test(parse_expr(single)?)),
        [left, op, right] => {
            let op = match op.as_str() {
                "==" => CompareOp::Eq,
                "!=" => CompareOp::Ne,
                other => return Err(format!("unsupported operator '{other}'")),
            };
            Ok(Condition::Compare(parse_expr(left)?, op, parse_expr(right)?))
        }
        _ => Err(format!("malformed condition '{}'", words.join(" "))),
    }
}

fn parse_expr(text: &str) -> Result<Expr, String> {
    let mut parts = split_outside_quotes(text, '|').into_iter();
    let operand = parse_operand(parts.next().unwrap_or_default().trim())?;

    let filters = parts
        .map(|part| {
            let part = part.trim();
            let (name, arg) = match part.split_once(':') {
                Some((name, arg)) => (name.trim(), Some(parse_operand(arg.trim())?)),
                None => (part, None),
            };
            let filter = Filter::parse(name).ok_or_else(|| format!("unknown filter '{name}'"))?;
            Ok(FilterCall { filter, arg })
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(Expr { operand, filters })
}

fn parse_operand(text: &str) -> Result<Operand, String> {
    if text.is_empty() {
        return Err("empty expression".to_owned());
    }
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return Ok(Operand::Literal(Value::Text(text[1..text.len() - 1].to_owned())));
        }
    }
    if text.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') {
        if let Ok(number) = text.parse::<i64>() {
            return Ok(Operand::Literal(Value::Int(number)));
        }
        if let Ok(number) = text.parse::<f64>() {
            return Ok(Operand::Literal(Value::Float(number)));
        }
    }
    match text {
        "True" | "true" => return Ok(Operand::Literal(Value::Bool(true))),
        "False" | "false" => return Ok(Operand::Literal(Value::Bool(false))),
        "None" | "null" => return Ok(Operand::Literal(Value::Null)),
        _ => {}
    }

    let path = text.split('.').map(str::to_owned).collect::<Vec<_>>();
    for segment in &path {
        validate_identifier(segment)?;
    }
    Ok(Operand::Path(path))
}

fn validate_identifier(segment: &str) -> Result<(), String> {
    if !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(format!("invalid variable name '{segment}'"))
    }
}

/// Split on `separator` outside single or double quotes
fn split_outside_quotes(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == separator => {
                parts.push(&text[start..index]);
                start = index + c.len_utf8();
            }
            None => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Split on whitespace outside quotes
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote = None;
    for c in text.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => {
                current.push(c);
                quote = Some(c);
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_mixed_source() {
        let tokens = tokenize("SELECT {{ col }} {# note #}FROM t{% if x %}!{% endif %}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Text("SELECT "),
                Token::Var("col"),
                Token::Text(" "),
                Token::Text("FROM t"),
                Token::Block("if x"),
                Token::Text("!"),
                Token::Block("endif"),
            ]
        );
    }

    #[test]
    fn test_single_braces_are_text() {
        let tokens = tokenize("SELECT '{a}' FROM t").unwrap();
        assert_eq!(tokens, vec![Token::Text("SELECT '{a}' FROM t")]);
    }

    #[test]
    fn test_unclosed_tag() {
        assert!(tokenize("SELECT {{ col").is_err());
    }

    #[test]
    fn test_filter_argument_with_separator_in_quotes() {
        let expr = parse_expr(r#"names|join:" | ""#).unwrap();
        assert_eq!(expr.filters.len(), 1);
        assert!(matches!(
            &expr.filters[0].arg,
            Some(Operand::Literal(Value::Text(sep))) if sep == " | "
        ));
    }

    #[test]
    fn test_unknown_filter_and_tag() {
        assert!(parse("{{ a|shout }}").is_err());
        assert!(parse("{% include 'x' %}").is_err());
        assert!(parse("{% endif %}").is_err());
        assert!(parse("{% if a %}open").is_err());
    }

    #[test]
    fn test_comment_body_is_not_parsed() {
        let source = "SELECT 1{% comment %}{% include 'x' %}{{ a|shout }}{% endif %}{% endcomment %}";
        let nodes = parse(source).unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(parse("{% comment %}{% if a %}").is_err());
    }

    #[test]
    fn test_condition_precedence() {
        let words = split_words("a and not b or c");
        let condition = parse_condition(&words).unwrap();
        assert!(matches!(condition, Condition::Or(_, _)));
    }

    #[test]
    fn test_invalid_variable_name() {
        assert!(parse("{{ user..id }}").is_err());
        assert!(parse("{{ user-id }}").is_err());
    }
}

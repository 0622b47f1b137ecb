// ABOUTME: SQL text helpers for literal quoting and human-readable statement layout
// ABOUTME: Used by the adapt filter and by TemplateQuery::pretty
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 sqltemplate contributors

use std::sync::LazyLock;

use regex::Regex;

/// Quote text as a SQL string literal.
///
/// Single quotes are doubled and nothing else is escaped, which is the
/// standard literal form read by `SQLite` and by `PostgreSQL` with
/// `standard_conforming_strings` on.
#[must_use]
pub fn quote_literal(input: &str) -> String {
    format!("'{}'", input.replace('\'', "''"))
}

/// Major clause keywords that start a new line in pretty output
static CLAUSE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+\b(SELECT|FROM|WHERE|GROUP BY|ORDER BY|HAVING|LIMIT|OFFSET|UNION ALL|UNION|(?:LEFT |RIGHT |INNER |FULL |CROSS )?(?:OUTER )?JOIN|VALUES|SET|RETURNING)\b",
    )
    .ok()
});

static WHITESPACE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Lay a statement out one clause per line.
///
/// Whitespace runs collapse to single spaces and each major clause keyword
/// starts a new line. Quoted literals are not inspected, so keywords inside
/// strings are broken too; the output is for reading, not executing.
#[must_use]
pub fn prettify(sql: &str) -> String {
    let mut output = sql.trim().to_owned();
    if let Some(pattern) = WHITESPACE_PATTERN.as_ref() {
        output = pattern.replace_all(&output, " ").into_owned();
    }
    if let Some(pattern) = CLAUSE_PATTERN.as_ref() {
        output = pattern.replace_all(&output, "\n$1").into_owned();
    }
    output.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(quote_literal(r"C:\tmp"), r"'C:\tmp'");
        assert_eq!(quote_literal(r"a\'b"), r"'a\''b'");
    }

    #[test]
    fn test_prettify_breaks_clauses() {
        let sql = "SELECT id,\n   name FROM users   WHERE id = ? ORDER BY name";
        assert_eq!(
            prettify(sql),
            "SELECT id, name\nFROM users\nWHERE id = ?\nORDER BY name"
        );
    }

    #[test]
    fn test_prettify_joins() {
        let sql = "select * from a left join b on a.id = b.a_id";
        assert_eq!(prettify(sql), "select *\nfrom a\nleft join b on a.id = b.a_id");
    }
}

//! Generated SQL statements.

use std::fmt;

use serde::Serialize;

/// One executable SQL statement, without a trailing delimiter.
///
/// Order within a generated sequence is significant; callers execute
/// statements exactly in the order they were produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Statement {
    sql: String,
}

impl Statement {
    /// Creates a statement from SQL text.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Consumes the statement, returning the SQL text.
    #[must_use]
    pub fn into_sql(self) -> String {
        self.sql
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Self { sql }
    }
}

impl PartialEq<&str> for Statement {
    fn eq(&self, other: &&str) -> bool {
        self.sql == *other
    }
}

/// Splits a SQL script on `delimiter`, ignoring delimiters inside quoted
/// strings, quoted identifiers and comments. Empty pieces are dropped.
#[must_use]
pub fn split_script(script: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() {
        let trimmed = script.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut line_comment = false;
    let mut block_comment = false;
    let mut rest = script;

    while let Some(c) = rest.chars().next() {
        if line_comment {
            if c == '\n' {
                line_comment = false;
            }
        } else if block_comment {
            if rest.starts_with("*/") {
                block_comment = false;
                current.push_str("*/");
                rest = &rest[2..];
                continue;
            }
        } else if let Some(q) = quote {
            if c == q {
                quote = None;
            }
        } else if c == '\'' || c == '"' || c == '`' {
            quote = Some(c);
        } else if rest.starts_with("--") {
            line_comment = true;
        } else if rest.starts_with("/*") {
            block_comment = true;
        } else if rest.starts_with(delimiter) {
            push_piece(&mut pieces, &current);
            current.clear();
            rest = &rest[delimiter.len()..];
            continue;
        }
        current.push(c);
        rest = &rest[c.len_utf8()..];
    }
    push_piece(&mut pieces, &current);
    pieces
}

fn push_piece(pieces: &mut Vec<String>, piece: &str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        pieces.push(trimmed.to_string());
    }
}

/// Removes `--` line comments and `/* */` block comments outside quotes.
#[must_use]
pub fn strip_comments(script: &str) -> String {
    let mut out = String::with_capacity(script.len());
    let mut quote: Option<char> = None;
    let mut rest = script;

    while let Some(c) = rest.chars().next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
        } else if c == '\'' || c == '"' || c == '`' {
            quote = Some(c);
        } else if rest.starts_with("--") {
            let end = rest.find('\n').unwrap_or(rest.len());
            rest = &rest[end..];
            continue;
        } else if rest.starts_with("/*") {
            let end = rest.find("*/").map_or(rest.len(), |i| i + 2);
            rest = &rest[end..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_respects_quotes() {
        let pieces = split_script(
            "INSERT INTO t VALUES ('a;b');\nUPDATE t SET x = 1;\n\n",
            ";",
        );
        assert_eq!(
            pieces,
            vec!["INSERT INTO t VALUES ('a;b')", "UPDATE t SET x = 1"]
        );
    }

    #[test]
    fn test_split_ignores_comment_delimiters() {
        let pieces = split_script("SELECT 1; -- not; here\nSELECT 2", ";");
        assert_eq!(pieces, vec!["SELECT 1", "-- not; here\nSELECT 2"]);
    }

    #[test]
    fn test_split_custom_delimiter() {
        let pieces = split_script("CREATE PROCEDURE p() BEGIN SELECT 1; END\nGO\nSELECT 2", "\nGO");
        assert_eq!(pieces.len(), 2);
        assert!(pieces[0].ends_with("END"));
    }

    #[test]
    fn test_strip_comments() {
        let stripped = strip_comments("SELECT '--x' -- trailing\n/* block */SELECT 2");
        assert_eq!(stripped, "SELECT '--x' \nSELECT 2");
    }

    #[test]
    fn test_statement_display() {
        let stmt = Statement::new("DROP TABLE t");
        assert_eq!(stmt.to_string(), "DROP TABLE t");
        assert_eq!(stmt, "DROP TABLE t");
    }
}

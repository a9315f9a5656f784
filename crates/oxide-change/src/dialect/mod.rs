//! Database dialect capability queries.
//!
//! A dialect answers whether it supports a change kind and supplies the
//! SQL fragments that differ between engines: identifier quoting, type
//! names, literals, and the handful of DDL forms that have no common syntax.
//! Change implementations assemble statements from these fragments and never
//! talk to a database.

mod mysql;
mod postgres;
mod sqlite;

use std::fmt;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::types::{ColumnDef, DataType, DefaultValue};
use crate::value::FieldValue;

/// Words that must always be quoted when used as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "all", "alter", "and", "as", "asc", "by", "case", "check", "column", "constraint", "create",
    "default", "delete", "desc", "distinct", "drop", "else", "end", "from", "group", "having",
    "in", "index", "insert", "into", "is", "join", "key", "limit", "not", "null", "offset", "on",
    "or", "order", "primary", "references", "select", "set", "table", "then", "to", "union",
    "unique", "update", "user", "values", "when", "where", "with",
];

/// Trait for dialect-specific capability answers and SQL fragments.
///
/// Fragment methods receive identifiers that are already quoted and
/// qualified; they only decide the shape of the statement.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns whether this dialect can express the given change kind.
    fn supports(&self, kind: &str) -> bool {
        let _ = kind;
        true
    }

    /// Returns the dialect's spelling of a type, or `None` if the type does
    /// not exist in this dialect.
    fn map_type(&self, data_type: &DataType) -> Option<String>;

    /// Returns the identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Returns whether unquoted identifiers may contain upper case letters
    /// without changing meaning.
    fn preserves_unquoted_case(&self) -> bool {
        true
    }

    /// Quotes an identifier when it is not a plain identifier or is reserved.
    fn quote_identifier(&self, name: &str) -> String {
        let plain = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| {
                c == '_'
                    || c.is_ascii_digit()
                    || c.is_ascii_lowercase()
                    || (self.preserves_unquoted_case() && c.is_ascii_uppercase())
            })
            && !RESERVED_WORDS.contains(&name.to_ascii_lowercase().as_str());
        if plain {
            name.to_string()
        } else {
            let q = self.quote_char();
            let escaped = name.replace(q, &format!("{q}{q}"));
            format!("{q}{escaped}{q}")
        }
    }

    /// Returns whether objects can be qualified with a schema name.
    fn supports_schemas(&self) -> bool {
        true
    }

    /// Quotes and, where supported, schema-qualifies an object name.
    fn qualify(&self, schema: Option<&str>, name: &str) -> String {
        match schema {
            Some(schema) if self.supports_schemas() => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(name)
            ),
            _ => self.quote_identifier(name),
        }
    }

    /// Returns the boolean literal.
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "TRUE" } else { "FALSE" }
    }

    /// Renders a scalar value as a SQL literal.
    fn render_literal(&self, value: &FieldValue) -> String {
        match value {
            FieldValue::Null => "NULL".to_string(),
            FieldValue::Bool(b) => self.boolean_literal(*b).to_string(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Text(s) => quote_string(s),
            other => quote_string(&other.to_string()),
        }
    }

    /// Renders a column default.
    fn render_default(&self, default: &DefaultValue) -> String {
        match default {
            DefaultValue::Literal(value) => self.render_literal(value),
            DefaultValue::Computed(expr) => expr.clone(),
        }
    }

    /// Keyword appended to auto-incrementing columns, if the dialect uses one.
    fn auto_increment_keyword(&self) -> Option<&'static str>;

    /// Checks dialect-specific rules for a column definition.
    fn check_column(&self, column: &ColumnDef) -> Result<(), String> {
        if column.auto_increment && !column.data_type.as_ref().is_some_and(is_integer) {
            return Err(format!(
                "auto-increment column '{}' must have an integer type",
                column.name
            ));
        }
        Ok(())
    }

    /// Generates a column definition.
    fn column_definition(&self, column: &ColumnDef, type_sql: &str) -> String {
        let mut sql = format!("{} {}", self.quote_identifier(&column.name), type_sql);

        if column.primary_key {
            sql.push_str(" PRIMARY KEY");
        } else {
            if !column.nullable {
                sql.push_str(" NOT NULL");
            }
            if column.unique {
                sql.push_str(" UNIQUE");
            }
        }

        if column.auto_increment {
            if let Some(keyword) = self.auto_increment_keyword() {
                sql.push(' ');
                sql.push_str(keyword);
            }
        }

        if let Some(ref default) = column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.render_default(default));
        }

        sql
    }

    /// Returns whether `DROP TABLE ... CASCADE` is accepted.
    fn supports_drop_cascade(&self) -> bool {
        true
    }

    /// Returns whether constraints may be declared DEFERRABLE.
    fn supports_deferrable_constraints(&self) -> bool {
        false
    }

    /// Returns whether changing nullability needs the column's type.
    fn nullability_change_requires_type(&self) -> bool {
        false
    }

    /// Returns whether `DROP INDEX` needs the owning table.
    fn drop_index_requires_table(&self) -> bool {
        false
    }

    /// Generates SQL for renaming a column.
    fn rename_column(&self, table: &str, old_name: &str, new_name: &str) -> String {
        format!("ALTER TABLE {table} RENAME COLUMN {old_name} TO {new_name}")
    }

    /// Generates SQL for changing a column's type.
    fn modify_data_type(&self, table: &str, column: &str, type_sql: &str) -> String {
        format!("ALTER TABLE {table} ALTER COLUMN {column} TYPE {type_sql}")
    }

    /// Generates SQL for adding or dropping a NOT NULL constraint.
    fn set_nullability(
        &self,
        table: &str,
        column: &str,
        type_sql: Option<&str>,
        nullable: bool,
    ) -> String {
        let _ = type_sql;
        let action = if nullable { "DROP" } else { "SET" };
        format!("ALTER TABLE {table} ALTER COLUMN {column} {action} NOT NULL")
    }

    /// Generates SQL for dropping an index.
    ///
    /// Unlike the other fragments, `schema` and `index` arrive unquoted since
    /// dialects disagree on whether an index name can be schema-qualified.
    fn drop_index(&self, schema: Option<&str>, index: &str, table: Option<&str>) -> String {
        let _ = table;
        format!("DROP INDEX {}", self.qualify(schema, index))
    }

    /// Generates SQL for dropping a foreign key constraint.
    fn drop_foreign_key(&self, table: &str, constraint: &str) -> String {
        format!("ALTER TABLE {table} DROP CONSTRAINT {constraint}")
    }

    /// Generates SQL for dropping a unique constraint.
    fn drop_unique_constraint(&self, table: &str, constraint: &str) -> String {
        format!("ALTER TABLE {table} DROP CONSTRAINT {constraint}")
    }
}

/// Quotes a string literal, doubling embedded single quotes.
#[must_use]
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Returns true for the integer family of types.
#[must_use]
pub fn is_integer(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt
    )
}

/// Returns true if a custom type name looks like a type and nothing else.
#[must_use]
pub fn is_plain_type_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '(' | ')' | ',' | '[' | ']'))
}

/// Looks up a built-in dialect by name or common alias.
#[must_use]
pub fn by_name(name: &str) -> Option<Box<dyn Dialect>> {
    match name.to_ascii_lowercase().as_str() {
        "postgresql" | "postgres" | "pg" => Some(Box::new(PostgresDialect::new())),
        "sqlite" | "sqlite3" => Some(Box::new(SqliteDialect::new())),
        "mysql" | "mariadb" => Some(Box::new(MySqlDialect::new())),
        _ => None,
    }
}

/// Names of the built-in dialects.
pub const BUILTIN_DIALECTS: &[&str] = &["postgresql", "sqlite", "mysql"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_only_when_needed() {
        let pg = PostgresDialect::new();
        assert_eq!(pg.quote_identifier("users"), "users");
        assert_eq!(pg.quote_identifier("user"), "\"user\"");
        assert_eq!(pg.quote_identifier("UserName"), "\"UserName\"");
        assert_eq!(pg.quote_identifier("a\"b"), "\"a\"\"b\"");

        let mysql = MySqlDialect::new();
        assert_eq!(mysql.quote_identifier("UserName"), "UserName");
        assert_eq!(mysql.quote_identifier("order"), "`order`");
    }

    #[test]
    fn test_qualify_respects_schema_support() {
        assert_eq!(
            PostgresDialect::new().qualify(Some("app"), "users"),
            "app.users"
        );
        assert_eq!(SqliteDialect::new().qualify(Some("app"), "users"), "users");
    }

    #[test]
    fn test_render_literal() {
        let pg = PostgresDialect::new();
        assert_eq!(pg.render_literal(&FieldValue::from("it's")), "'it''s'");
        assert_eq!(pg.render_literal(&FieldValue::Bool(true)), "TRUE");
        assert_eq!(SqliteDialect::new().render_literal(&FieldValue::Bool(true)), "1");
        assert_eq!(pg.render_literal(&FieldValue::Null), "NULL");
    }

    #[test]
    fn test_by_name_aliases() {
        assert_eq!(by_name("Postgres").map(|d| d.name()), Some("postgresql"));
        assert_eq!(by_name("mariadb").map(|d| d.name()), Some("mysql"));
        assert!(by_name("oracle").is_none());
    }

    #[test]
    fn test_plain_type_name() {
        assert!(is_plain_type_name("geometry(Point, 4326)"));
        assert!(!is_plain_type_name("int; DROP TABLE users"));
    }
}

//! Affected database objects.
//!
//! The execution engine uses these to order independent changesets and to
//! report what a change will touch before running it. The sets are
//! over-approximations: listing too much is acceptable, missing an object is
//! not.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::dialect::Dialect;
use crate::types::split_names;
use crate::value::FieldValue;

/// A possibly schema-qualified object name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct QualifiedName {
    /// Schema, when qualified.
    pub schema: Option<String>,
    /// Object name.
    pub name: String,
}

impl QualifiedName {
    /// Creates a qualified name, dropping the schema on dialects without
    /// schemas.
    #[must_use]
    pub fn new(dialect: &dyn Dialect, schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema
                .filter(|_| dialect.supports_schemas())
                .map(str::to_string),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.schema {
            Some(ref schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A schema object a change reads or writes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatabaseObject {
    /// A schema.
    Schema {
        /// Schema name.
        name: String,
    },
    /// A table.
    Table {
        /// Table name.
        table: QualifiedName,
    },
    /// A column of a table.
    Column {
        /// Owning table.
        table: QualifiedName,
        /// Column name.
        name: String,
    },
    /// An index.
    Index {
        /// Indexed table, when known.
        table: Option<QualifiedName>,
        /// Index name.
        name: String,
    },
    /// A foreign key constraint.
    ForeignKey {
        /// Constrained table.
        table: QualifiedName,
        /// Constraint name.
        name: String,
    },
    /// A unique constraint.
    UniqueConstraint {
        /// Constrained table.
        table: QualifiedName,
        /// Constraint name.
        name: String,
    },
    /// Whatever references a table, such as foreign keys declared on other
    /// tables. Reported when the dependents are not known by name.
    Dependents {
        /// Referenced table.
        table: QualifiedName,
    },
}

impl fmt::Display for DatabaseObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema { name } => write!(f, "schema {name}"),
            Self::Table { table } => write!(f, "table {table}"),
            Self::Column { table, name } => write!(f, "column {table}.{name}"),
            Self::Index {
                table: Some(table),
                name,
            } => write!(f, "index {name} on {table}"),
            Self::Index { table: None, name } => write!(f, "index {name}"),
            Self::ForeignKey { table, name } => write!(f, "foreign key {name} on {table}"),
            Self::UniqueConstraint { table, name } => {
                write!(f, "unique constraint {name} on {table}")
            }
            Self::Dependents { table } => write!(f, "objects depending on {table}"),
        }
    }
}

fn text<'a>(fields: &'a [(&'static str, FieldValue)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(field, _)| *field == name)
        .and_then(|(_, value)| value.as_text())
}

fn nested_names<'a>(
    fields: &'a [(&'static str, FieldValue)],
    name: &'a str,
) -> impl Iterator<Item = &'a str> {
    fields
        .iter()
        .filter(move |(field, _)| *field == name)
        .filter_map(|(_, value)| match value {
            FieldValue::List(items) => Some(items),
            _ => None,
        })
        .flatten()
        .filter_map(|item| match item {
            FieldValue::Map(entries) => entries.get("name").and_then(FieldValue::as_text),
            _ => None,
        })
}

fn add_table(
    objects: &mut BTreeSet<DatabaseObject>,
    dialect: &dyn Dialect,
    schema: Option<&str>,
    table: &str,
    columns: &[&str],
) {
    let table = QualifiedName::new(dialect, schema, table);
    for column in columns {
        objects.insert(DatabaseObject::Column {
            table: table.clone(),
            name: (*column).to_string(),
        });
    }
    objects.insert(DatabaseObject::Table { table });
}

/// Derives the objects named directly by a change's declared fields.
///
/// Recognised fields: `schema_name`, `table_name`, `column_name`,
/// `columns` (nested column records), `column_names`, `index_name`,
/// `old_table_name`/`new_table_name`, `old_column_name`/`new_column_name`,
/// `base_table_schema_name`/`base_table_name`/`base_column_names` and
/// `referenced_table_schema_name`/`referenced_table_name`/
/// `referenced_column_names`.
#[must_use]
pub fn declared_objects(
    dialect: &dyn Dialect,
    fields: &[(&'static str, FieldValue)],
) -> BTreeSet<DatabaseObject> {
    let mut objects = BTreeSet::new();
    let schema = text(fields, "schema_name");

    if let Some(schema) = schema.filter(|_| dialect.supports_schemas()) {
        objects.insert(DatabaseObject::Schema {
            name: schema.to_string(),
        });
    }

    if let Some(table) = text(fields, "table_name") {
        let mut columns: Vec<&str> = nested_names(fields, "columns").collect();
        for field in ["column_name", "old_column_name", "new_column_name"] {
            columns.extend(text(fields, field));
        }
        let listed = text(fields, "column_names").map(split_names).unwrap_or_default();
        columns.extend(listed.iter().map(String::as_str));
        add_table(&mut objects, dialect, schema, table, &columns);

        if let Some(index) = text(fields, "index_name") {
            objects.insert(DatabaseObject::Index {
                table: Some(QualifiedName::new(dialect, schema, table)),
                name: index.to_string(),
            });
        }
    } else if let Some(index) = text(fields, "index_name") {
        objects.insert(DatabaseObject::Index {
            table: None,
            name: index.to_string(),
        });
    }

    for field in ["old_table_name", "new_table_name"] {
        if let Some(table) = text(fields, field) {
            add_table(&mut objects, dialect, schema, table, &[]);
        }
    }

    for (schema_field, table_field, columns_field) in [
        ("base_table_schema_name", "base_table_name", "base_column_names"),
        (
            "referenced_table_schema_name",
            "referenced_table_name",
            "referenced_column_names",
        ),
    ] {
        if let Some(table) = text(fields, table_field) {
            let columns = text(fields, columns_field).map(split_names).unwrap_or_default();
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            add_table(
                &mut objects,
                dialect,
                text(fields, schema_field),
                table,
                &columns,
            );
        }
    }

    objects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqliteDialect};

    #[test]
    fn test_table_and_nested_columns() {
        let fields = vec![
            ("schema_name", FieldValue::from("app")),
            ("table_name", FieldValue::from("users")),
            (
                "columns",
                FieldValue::List(vec![FieldValue::record([("name", "email")])]),
            ),
        ];
        let objects = declared_objects(&PostgresDialect::new(), &fields);
        let users = QualifiedName {
            schema: Some("app".to_string()),
            name: "users".to_string(),
        };
        assert!(objects.contains(&DatabaseObject::Schema {
            name: "app".to_string()
        }));
        assert!(objects.contains(&DatabaseObject::Table {
            table: users.clone()
        }));
        assert!(objects.contains(&DatabaseObject::Column {
            table: users,
            name: "email".to_string()
        }));
        assert_eq!(objects.len(), 3);
    }

    #[test]
    fn test_schema_dropped_without_schema_support() {
        let fields = vec![
            ("schema_name", FieldValue::from("app")),
            ("table_name", FieldValue::from("users")),
        ];
        let objects = declared_objects(&SqliteDialect::new(), &fields);
        assert_eq!(objects.len(), 1);
        assert_eq!(
            objects.iter().next().map(ToString::to_string).as_deref(),
            Some("table users")
        );
    }

    #[test]
    fn test_foreign_key_tables() {
        let fields = vec![
            ("base_table_name", FieldValue::from("orders")),
            ("base_column_names", FieldValue::from("user_id")),
            ("referenced_table_name", FieldValue::from("users")),
            ("referenced_column_names", FieldValue::from("id")),
        ];
        let objects = declared_objects(&PostgresDialect::new(), &fields);
        let rendered: Vec<String> = objects.iter().map(ToString::to_string).collect();
        assert!(rendered.contains(&"table orders".to_string()));
        assert!(rendered.contains(&"column orders.user_id".to_string()));
        assert!(rendered.contains(&"table users".to_string()));
        assert!(rendered.contains(&"column users.id".to_string()));
    }
}

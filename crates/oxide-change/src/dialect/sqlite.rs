//! SQLite dialect.
//!
//! SQLite has limited ALTER TABLE support: constraints can only be declared
//! at table creation and column types cannot be changed in place, so those
//! change kinds are reported as unsupported instead of being emulated with
//! table recreation.

use super::{is_integer, is_plain_type_name, Dialect};
use crate::types::{ColumnDef, DataType};

/// Change kinds SQLite cannot express with ALTER TABLE.
const UNSUPPORTED_KINDS: &[&str] = &[
    "modify-data-type",
    "add-not-null-constraint",
    "drop-not-null-constraint",
    "add-foreign-key-constraint",
    "drop-foreign-key-constraint",
    "add-unique-constraint",
    "drop-unique-constraint",
];

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn supports(&self, kind: &str) -> bool {
        !UNSUPPORTED_KINDS.contains(&kind)
    }

    fn map_type(&self, data_type: &DataType) -> Option<String> {
        // SQLite only has storage classes; map to the matching affinity.
        let mapped = match data_type {
            DataType::TinyInt
            | DataType::SmallInt
            | DataType::Integer
            | DataType::BigInt
            | DataType::Boolean => "INTEGER",
            DataType::Real | DataType::Double => "REAL",
            DataType::Decimal(..) => "NUMERIC",
            DataType::Char(_)
            | DataType::Varchar(_)
            | DataType::Text
            | DataType::Date
            | DataType::Time
            | DataType::Timestamp
            | DataType::TimestampTz
            | DataType::Uuid
            | DataType::Json
            | DataType::Interval => "TEXT",
            DataType::Blob => "BLOB",
            DataType::Custom(name) if is_plain_type_name(name) => return Some(name.clone()),
            DataType::Custom(_) => return None,
        };
        Some(mapped.to_string())
    }

    fn supports_schemas(&self) -> bool {
        false
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("AUTOINCREMENT")
    }

    fn check_column(&self, column: &ColumnDef) -> Result<(), String> {
        if column.auto_increment
            && !(column.primary_key && column.data_type.as_ref().is_some_and(is_integer))
        {
            return Err(format!(
                "AUTOINCREMENT is only allowed on an INTEGER PRIMARY KEY, not on '{}'",
                column.name
            ));
        }
        Ok(())
    }

    fn supports_drop_cascade(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnConfig;

    #[test]
    fn test_unsupported_kinds() {
        let sqlite = SqliteDialect::new();
        assert!(sqlite.supports("add-column"));
        assert!(!sqlite.supports("modify-data-type"));
        assert!(!sqlite.supports("add-foreign-key-constraint"));
    }

    #[test]
    fn test_affinity_mapping() {
        let sqlite = SqliteDialect::new();
        assert_eq!(sqlite.map_type(&DataType::BigInt).as_deref(), Some("INTEGER"));
        assert_eq!(sqlite.map_type(&DataType::Uuid).as_deref(), Some("TEXT"));
        assert_eq!(sqlite.map_type(&DataType::Decimal(None, None)).as_deref(), Some("NUMERIC"));
    }

    #[test]
    fn test_autoincrement_column() {
        let sqlite = SqliteDialect::new();
        let id = ColumnConfig {
            primary_key: Some(true),
            auto_increment: Some(true),
            ..ColumnConfig::new("id", "integer")
        }
        .freeze(true)
        .unwrap();
        assert!(sqlite.check_column(&id).is_ok());
        assert_eq!(
            sqlite.column_definition(&id, "INTEGER"),
            "id INTEGER PRIMARY KEY AUTOINCREMENT"
        );

        let not_pk = ColumnConfig {
            auto_increment: Some(true),
            ..ColumnConfig::new("n", "integer")
        }
        .freeze(true)
        .unwrap();
        assert!(sqlite.check_column(&not_pk).is_err());
    }
}

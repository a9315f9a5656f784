//! MySQL dialect.

use super::{is_plain_type_name, Dialect};
use crate::types::DataType;

/// MySQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn map_type(&self, data_type: &DataType) -> Option<String> {
        let mapped = match data_type {
            DataType::TinyInt => "TINYINT".to_string(),
            DataType::SmallInt => "SMALLINT".to_string(),
            DataType::Integer => "INT".to_string(),
            DataType::BigInt => "BIGINT".to_string(),
            DataType::Real => "FLOAT".to_string(),
            DataType::Double => "DOUBLE".to_string(),
            DataType::Decimal(precision, scale) => match (precision, scale) {
                (Some(p), Some(s)) => format!("DECIMAL({p}, {s})"),
                (Some(p), None) => format!("DECIMAL({p})"),
                _ => "DECIMAL".to_string(),
            },
            DataType::Char(len) => format!("CHAR({})", len.unwrap_or(1)),
            // VARCHAR needs an explicit length in MySQL.
            DataType::Varchar(len) => format!("VARCHAR({})", (*len)?),
            DataType::Text => "TEXT".to_string(),
            DataType::Blob => "LONGBLOB".to_string(),
            DataType::Boolean => "BOOLEAN".to_string(),
            DataType::Date => "DATE".to_string(),
            DataType::Time => "TIME".to_string(),
            DataType::Timestamp => "DATETIME".to_string(),
            DataType::TimestampTz => "TIMESTAMP".to_string(),
            DataType::Uuid => "CHAR(36)".to_string(),
            DataType::Json => "JSON".to_string(),
            DataType::Interval => return None,
            DataType::Custom(name) if is_plain_type_name(name) => name.clone(),
            DataType::Custom(_) => return None,
        };
        Some(mapped)
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("AUTO_INCREMENT")
    }

    fn nullability_change_requires_type(&self) -> bool {
        true
    }

    fn drop_index_requires_table(&self) -> bool {
        true
    }

    fn modify_data_type(&self, table: &str, column: &str, type_sql: &str) -> String {
        format!("ALTER TABLE {table} MODIFY {column} {type_sql}")
    }

    fn set_nullability(
        &self,
        table: &str,
        column: &str,
        type_sql: Option<&str>,
        nullable: bool,
    ) -> String {
        let null = if nullable { "NULL" } else { "NOT NULL" };
        match type_sql {
            Some(type_sql) => format!("ALTER TABLE {table} MODIFY {column} {type_sql} {null}"),
            None => format!("ALTER TABLE {table} MODIFY {column} {null}"),
        }
    }

    fn drop_index(&self, _schema: Option<&str>, index: &str, table: Option<&str>) -> String {
        let index = self.quote_identifier(index);
        match table {
            Some(table) => format!("DROP INDEX {index} ON {table}"),
            None => format!("DROP INDEX {index}"),
        }
    }

    fn drop_foreign_key(&self, table: &str, constraint: &str) -> String {
        format!("ALTER TABLE {table} DROP FOREIGN KEY {constraint}")
    }

    fn drop_unique_constraint(&self, table: &str, constraint: &str) -> String {
        format!("ALTER TABLE {table} DROP INDEX {constraint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varchar_requires_length() {
        let mysql = MySqlDialect::new();
        assert_eq!(
            mysql.map_type(&DataType::Varchar(Some(64))).as_deref(),
            Some("VARCHAR(64)")
        );
        assert_eq!(mysql.map_type(&DataType::Varchar(None)), None);
        assert_eq!(mysql.map_type(&DataType::Interval), None);
    }

    #[test]
    fn test_dialect_specific_fragments() {
        let mysql = MySqlDialect::new();
        assert_eq!(
            mysql.drop_index(Some("app"), "idx_email", Some("app.users")),
            "DROP INDEX idx_email ON app.users"
        );
        assert_eq!(
            mysql.drop_foreign_key("orders", "fk_user"),
            "ALTER TABLE orders DROP FOREIGN KEY fk_user"
        );
        assert_eq!(
            mysql.set_nullability("users", "email", Some("VARCHAR(255)"), false),
            "ALTER TABLE users MODIFY email VARCHAR(255) NOT NULL"
        );
    }
}

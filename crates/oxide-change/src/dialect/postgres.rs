//! PostgreSQL dialect.

use super::{is_integer, is_plain_type_name, Dialect};
use crate::types::{ColumnDef, DataType};

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn map_type(&self, data_type: &DataType) -> Option<String> {
        let mapped = match data_type {
            DataType::TinyInt | DataType::SmallInt => "SMALLINT".to_string(),
            DataType::Integer => "INTEGER".to_string(),
            DataType::BigInt => "BIGINT".to_string(),
            DataType::Real => "REAL".to_string(),
            DataType::Double => "DOUBLE PRECISION".to_string(),
            DataType::Decimal(precision, scale) => match (precision, scale) {
                (Some(p), Some(s)) => format!("DECIMAL({p}, {s})"),
                (Some(p), None) => format!("DECIMAL({p})"),
                _ => "DECIMAL".to_string(),
            },
            DataType::Char(len) => len.map_or_else(|| "CHAR".to_string(), |n| format!("CHAR({n})")),
            DataType::Varchar(len) => {
                len.map_or_else(|| "VARCHAR".to_string(), |n| format!("VARCHAR({n})"))
            }
            DataType::Text => "TEXT".to_string(),
            DataType::Blob => "BYTEA".to_string(),
            DataType::Boolean => "BOOLEAN".to_string(),
            DataType::Date => "DATE".to_string(),
            DataType::Time => "TIME".to_string(),
            DataType::Timestamp => "TIMESTAMP".to_string(),
            DataType::TimestampTz => "TIMESTAMP WITH TIME ZONE".to_string(),
            DataType::Uuid => "UUID".to_string(),
            DataType::Json => "JSONB".to_string(),
            DataType::Interval => "INTERVAL".to_string(),
            DataType::Custom(name) if is_plain_type_name(name) => name.clone(),
            DataType::Custom(_) => return None,
        };
        Some(mapped)
    }

    fn preserves_unquoted_case(&self) -> bool {
        false
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        None
    }

    fn column_definition(&self, column: &ColumnDef, type_sql: &str) -> String {
        // Auto-increment is spelled as a SERIAL type.
        let serial = match column.data_type {
            Some(DataType::TinyInt | DataType::SmallInt) if column.auto_increment => "SMALLSERIAL",
            Some(DataType::Integer) if column.auto_increment => "SERIAL",
            Some(DataType::BigInt) if column.auto_increment => "BIGSERIAL",
            _ => type_sql,
        };

        let mut sql = format!("{} {}", self.quote_identifier(&column.name), serial);
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
        if let Some(ref default) = column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.render_default(default));
        }
        sql
    }

    fn check_column(&self, column: &ColumnDef) -> Result<(), String> {
        if column.auto_increment {
            if column.default.is_some() {
                return Err(format!(
                    "auto-increment column '{}' cannot declare a default",
                    column.name
                ));
            }
            if !column.data_type.as_ref().is_some_and(is_integer) {
                return Err(format!(
                    "auto-increment column '{}' must have an integer type",
                    column.name
                ));
            }
        }
        Ok(())
    }

    fn supports_deferrable_constraints(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnConfig;

    fn column(config: ColumnConfig) -> ColumnDef {
        config.freeze(true).unwrap()
    }

    #[test]
    fn test_type_mapping() {
        let pg = PostgresDialect::new();
        assert_eq!(pg.map_type(&DataType::Text).as_deref(), Some("TEXT"));
        assert_eq!(pg.map_type(&DataType::Blob).as_deref(), Some("BYTEA"));
        assert_eq!(
            pg.map_type(&DataType::Decimal(Some(10), Some(2))).as_deref(),
            Some("DECIMAL(10, 2)")
        );
        assert_eq!(
            pg.map_type(&DataType::Custom("citext".to_string())).as_deref(),
            Some("citext")
        );
        assert_eq!(pg.map_type(&DataType::Custom("x;y".to_string())), None);
    }

    #[test]
    fn test_serial_column() {
        let pg = PostgresDialect::new();
        let id = column(ColumnConfig {
            primary_key: Some(true),
            auto_increment: Some(true),
            ..ColumnConfig::new("id", "bigint")
        });
        assert_eq!(pg.column_definition(&id, "BIGINT"), "id BIGSERIAL PRIMARY KEY");
    }

    #[test]
    fn test_nullability_fragments() {
        let pg = PostgresDialect::new();
        assert_eq!(
            pg.set_nullability("users", "email", None, false),
            "ALTER TABLE users ALTER COLUMN email SET NOT NULL"
        );
        assert_eq!(
            pg.set_nullability("users", "email", None, true),
            "ALTER TABLE users ALTER COLUMN email DROP NOT NULL"
        );
    }

    #[test]
    fn test_check_column_rejects_text_serial() {
        let pg = PostgresDialect::new();
        let bad = column(ColumnConfig {
            auto_increment: Some(true),
            ..ColumnConfig::new("code", "text")
        });
        assert!(pg.check_column(&bad).is_err());
    }
}

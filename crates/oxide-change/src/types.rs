//! Column and type declarations shared by the change catalog.
//!
//! Column declarations arrive as nested records (`name`, `type`, `nullable`,
//! ...) and are kept verbatim in [`ColumnConfig`] so the portable form can
//! reproduce them. [`ColumnConfig::freeze`] turns them into a checked
//! [`ColumnDef`] during setup.

use std::collections::BTreeMap;
use std::fmt;

use crate::value::FieldValue;

/// SQL data types understood by the dialects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Small integer (16-bit).
    SmallInt,
    /// Integer (32-bit).
    Integer,
    /// Big integer (64-bit).
    BigInt,
    /// Tiny integer (8-bit).
    TinyInt,
    /// Floating point (single precision).
    Real,
    /// Floating point (double precision).
    Double,
    /// Exact numeric with optional precision and scale.
    Decimal(Option<u32>, Option<u32>),
    /// Fixed-length character string.
    Char(Option<u32>),
    /// Variable-length character string.
    Varchar(Option<u32>),
    /// Unbounded text.
    Text,
    /// Binary large object.
    Blob,
    /// Boolean.
    Boolean,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Timestamp without time zone.
    Timestamp,
    /// Timestamp with time zone.
    TimestampTz,
    /// UUID.
    Uuid,
    /// JSON document.
    Json,
    /// Time interval.
    Interval,
    /// Any other type name, passed through as declared.
    Custom(String),
}

impl DataType {
    /// Parses a declared type name such as `varchar(255)` or `DECIMAL(10, 2)`.
    ///
    /// Unknown names become [`DataType::Custom`]. Malformed size arguments
    /// are rejected.
    pub fn parse(declared: &str) -> Result<Self, String> {
        let declared = declared.trim();
        if declared.is_empty() {
            return Err("type name is empty".to_string());
        }

        let (base, args) = match declared.find('(') {
            Some(open) => {
                let Some(inner) = declared[open + 1..].strip_suffix(')') else {
                    return Err(format!("unbalanced parentheses in type '{declared}'"));
                };
                let args = inner
                    .split(',')
                    .map(|a| {
                        a.trim()
                            .parse::<u32>()
                            .map_err(|_| format!("invalid size '{}' in type '{declared}'", a.trim()))
                    })
                    .collect::<Result<Vec<u32>, String>>()?;
                (declared[..open].trim(), args)
            }
            None => (declared, Vec::new()),
        };

        let first = args.first().copied();
        let second = args.get(1).copied();
        let parsed = match base.to_ascii_lowercase().as_str() {
            "smallint" | "int2" => Self::SmallInt,
            "int" | "integer" | "int4" => Self::Integer,
            "bigint" | "int8" => Self::BigInt,
            "tinyint" => Self::TinyInt,
            "real" | "float4" | "float" => Self::Real,
            "double" | "double precision" | "float8" => Self::Double,
            "decimal" | "numeric" | "number" => Self::Decimal(first, second),
            "char" | "character" | "nchar" => Self::Char(first),
            "varchar" | "character varying" | "nvarchar" | "varchar2" => Self::Varchar(first),
            "text" | "clob" => Self::Text,
            "blob" | "bytea" | "binary" | "varbinary" => Self::Blob,
            "boolean" | "bool" => Self::Boolean,
            "date" => Self::Date,
            "time" => Self::Time,
            "timestamp" | "datetime" => Self::Timestamp,
            "timestamptz" | "timestamp with time zone" => Self::TimestampTz,
            "uuid" => Self::Uuid,
            "json" | "jsonb" => Self::Json,
            "interval" => Self::Interval,
            _ => Self::Custom(declared.to_string()),
        };
        Ok(parsed)
    }
}

fn sized(f: &mut fmt::Formatter<'_>, base: &str, len: Option<u32>) -> fmt::Result {
    match len {
        Some(len) => write!(f, "{base}({len})"),
        None => f.write_str(base),
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SmallInt => f.write_str("smallint"),
            Self::Integer => f.write_str("integer"),
            Self::BigInt => f.write_str("bigint"),
            Self::TinyInt => f.write_str("tinyint"),
            Self::Real => f.write_str("real"),
            Self::Double => f.write_str("double"),
            Self::Decimal(Some(precision), Some(scale)) => {
                write!(f, "decimal({precision}, {scale})")
            }
            Self::Decimal(precision, _) => sized(f, "decimal", *precision),
            Self::Char(len) => sized(f, "char", *len),
            Self::Varchar(len) => sized(f, "varchar", *len),
            Self::Text => f.write_str("text"),
            Self::Blob => f.write_str("blob"),
            Self::Boolean => f.write_str("boolean"),
            Self::Date => f.write_str("date"),
            Self::Time => f.write_str("time"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::TimestampTz => f.write_str("timestamptz"),
            Self::Uuid => f.write_str("uuid"),
            Self::Json => f.write_str("json"),
            Self::Interval => f.write_str("interval"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Default value of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Literal value (text, number, boolean or null).
    Literal(FieldValue),
    /// SQL expression (e.g. `CURRENT_TIMESTAMP`), emitted as is.
    Computed(String),
}

/// Referential action for ON DELETE / ON UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForeignKeyAction {
    /// No action.
    NoAction,
    /// Restrict.
    Restrict,
    /// Cascade.
    Cascade,
    /// Set the referencing columns to NULL.
    SetNull,
    /// Set the referencing columns to their default.
    SetDefault,
}

impl ForeignKeyAction {
    /// Parses a declared action (`CASCADE`, `set null`, ...).
    #[must_use]
    pub fn parse(declared: &str) -> Option<Self> {
        let normalized = declared
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        match normalized.as_str() {
            "NO ACTION" => Some(Self::NoAction),
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }

    /// Returns the SQL keyword(s).
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

const COLUMN_KEYS: &str =
    "name, type, nullable, primary_key, unique, auto_increment, default_value, default_value_computed";

/// A column declaration as configured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnConfig {
    /// Column name.
    pub name: Option<String>,
    /// Declared type name.
    pub type_name: Option<String>,
    /// Declared nullability.
    pub nullable: Option<bool>,
    /// Whether the column is (part of) the primary key.
    pub primary_key: Option<bool>,
    /// Whether the column has a UNIQUE constraint.
    pub unique: Option<bool>,
    /// Whether the column auto-increments.
    pub auto_increment: Option<bool>,
    /// Literal default.
    pub default_value: Option<FieldValue>,
    /// Computed default expression.
    pub default_value_computed: Option<String>,
}

impl ColumnConfig {
    /// Creates a column declaration with a name and type.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// Creates a column reference carrying only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Reads a declaration from a nested record.
    pub fn from_value(value: &FieldValue) -> Result<Self, String> {
        let FieldValue::Map(entries) = value else {
            return Err(format!("a column record ({COLUMN_KEYS})"));
        };

        let mut column = Self::default();
        for (key, value) in entries {
            let expected = || format!("'{key}' of a column record to be {}", expected_shape(key));
            match key.as_str() {
                "name" => column.name = Some(value.as_text().ok_or_else(expected)?.to_string()),
                "type" => {
                    column.type_name = Some(value.as_text().ok_or_else(expected)?.to_string());
                }
                "nullable" => column.nullable = Some(value.to_bool().ok_or_else(expected)?),
                "primary_key" => column.primary_key = Some(value.to_bool().ok_or_else(expected)?),
                "unique" => column.unique = Some(value.to_bool().ok_or_else(expected)?),
                "auto_increment" => {
                    column.auto_increment = Some(value.to_bool().ok_or_else(expected)?);
                }
                "default_value" => {
                    if !value.is_scalar() {
                        return Err(expected());
                    }
                    column.default_value = Some(value.clone());
                }
                "default_value_computed" => {
                    column.default_value_computed =
                        Some(value.as_text().ok_or_else(expected)?.to_string());
                }
                other => return Err(format!("a column record ({COLUMN_KEYS}), found key '{other}'")),
            }
        }
        Ok(column)
    }

    /// Encodes the declaration as a nested record with only the set keys.
    #[must_use]
    pub fn to_value(&self) -> FieldValue {
        let mut entries = BTreeMap::new();
        if let Some(ref name) = self.name {
            entries.insert("name".to_string(), FieldValue::from(name.as_str()));
        }
        if let Some(ref type_name) = self.type_name {
            entries.insert("type".to_string(), FieldValue::from(type_name.as_str()));
        }
        for (key, flag) in [
            ("nullable", self.nullable),
            ("primary_key", self.primary_key),
            ("unique", self.unique),
            ("auto_increment", self.auto_increment),
        ] {
            if let Some(flag) = flag {
                entries.insert(key.to_string(), FieldValue::Bool(flag));
            }
        }
        if let Some(ref value) = self.default_value {
            entries.insert("default_value".to_string(), value.clone());
        }
        if let Some(ref expr) = self.default_value_computed {
            entries.insert(
                "default_value_computed".to_string(),
                FieldValue::from(expr.as_str()),
            );
        }
        FieldValue::Map(entries)
    }

    /// Checks the declaration and derives the column definition.
    ///
    /// When `require_type` is set, a missing type is an error.
    pub fn freeze(&self, require_type: bool) -> Result<ColumnDef, String> {
        let name = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err("column declaration is missing 'name'".to_string()),
        };

        let data_type = match self.type_name {
            Some(ref declared) => Some(
                DataType::parse(declared).map_err(|reason| format!("column '{name}': {reason}"))?,
            ),
            None if require_type => {
                return Err(format!("column '{name}' is missing 'type'"));
            }
            None => None,
        };

        let default = match (&self.default_value, &self.default_value_computed) {
            (Some(_), Some(_)) => {
                return Err(format!(
                    "column '{name}' declares both 'default_value' and 'default_value_computed'"
                ));
            }
            (Some(value), None) => Some(DefaultValue::Literal(value.clone())),
            (None, Some(expr)) => Some(DefaultValue::Computed(expr.clone())),
            (None, None) => None,
        };

        let primary_key = self.primary_key.unwrap_or(false);
        if primary_key && self.nullable == Some(true) {
            return Err(format!("primary key column '{name}' cannot be nullable"));
        }

        Ok(ColumnDef {
            name,
            data_type,
            nullable: !primary_key && self.nullable.unwrap_or(true),
            primary_key,
            unique: self.unique.unwrap_or(false),
            auto_increment: self.auto_increment.unwrap_or(false),
            default,
        })
    }
}

fn expected_shape(key: &str) -> &'static str {
    match key {
        "nullable" | "primary_key" | "unique" | "auto_increment" => "a boolean",
        "default_value" => "a scalar",
        _ => "text",
    }
}

/// A checked column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Parsed type, if declared.
    pub data_type: Option<DataType>,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Whether the column is (part of) the primary key.
    pub primary_key: bool,
    /// Whether the column has a UNIQUE constraint.
    pub unique: bool,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
    /// Default value.
    pub default: Option<DefaultValue>,
}

/// Splits a comma separated list of names, trimming blanks.
#[must_use]
pub fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

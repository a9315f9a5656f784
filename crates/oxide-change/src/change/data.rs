//! Data changes: inserting and deleting rows.

use std::collections::{BTreeMap, HashSet};

use super::fields::{self, FieldList};
use super::{Change, ChangeBuilder, ChangeMetadata, FieldSpec, SPECIALIZATION_LEVEL_DEFAULT};
use crate::dialect::Dialect;
use crate::error::{ChangeError, Result};
use crate::resource::ResourceResolver;
use crate::rollback::Rollback;
use crate::statement::Statement;
use crate::value::FieldValue;

pub(crate) static INSERT: ChangeMetadata = ChangeMetadata {
    kind: "insert",
    description: "Insert a row",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the table"),
        FieldSpec::scalar("table_name", "Target table").required(),
        FieldSpec::nested("columns", "column", "Column values (name, value or value_computed)")
            .required(),
    ],
};

pub(crate) static DELETE: ChangeMetadata = ChangeMetadata {
    kind: "delete",
    description: "Delete rows",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the table"),
        FieldSpec::scalar("table_name", "Target table").required(),
        FieldSpec::scalar("where_clause", "Condition selecting the rows; all rows when absent"),
    ],
};

/// One column of an inserted row.
#[derive(Debug, Clone, Default, PartialEq)]
struct ColumnValue {
    name: Option<String>,
    value: Option<FieldValue>,
    value_computed: Option<String>,
}

impl ColumnValue {
    fn from_value(value: &FieldValue) -> std::result::Result<Self, String> {
        const EXPECTED: &str = "a column value record (name, value, value_computed)";
        let FieldValue::Map(entries) = value else {
            return Err(EXPECTED.to_string());
        };
        let mut column = Self::default();
        for (key, value) in entries {
            match key.as_str() {
                "name" => {
                    column.name = Some(value.as_text().ok_or(EXPECTED)?.to_string());
                }
                "value" => {
                    if !value.is_scalar() {
                        return Err(format!("{EXPECTED} with a scalar 'value'"));
                    }
                    column.value = Some(value.clone());
                }
                "value_computed" => {
                    column.value_computed = Some(value.as_text().ok_or(EXPECTED)?.to_string());
                }
                other => return Err(format!("{EXPECTED}, found key '{other}'")),
            }
        }
        Ok(column)
    }

    fn to_value(&self) -> FieldValue {
        let mut entries = BTreeMap::new();
        if let Some(ref name) = self.name {
            entries.insert("name".to_string(), FieldValue::from(name.as_str()));
        }
        if let Some(ref value) = self.value {
            entries.insert("value".to_string(), value.clone());
        }
        if let Some(ref expr) = self.value_computed {
            entries.insert("value_computed".to_string(), FieldValue::from(expr.as_str()));
        }
        FieldValue::Map(entries)
    }
}

#[derive(Debug, Default)]
pub(crate) struct InsertBuilder {
    schema_name: Option<String>,
    table_name: Option<String>,
    columns: Vec<ColumnValue>,
}

impl InsertBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for InsertBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &INSERT
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &INSERT;
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "columns" => {
                let FieldValue::List(items) = value else {
                    return Err(ChangeError::InvalidFieldValue {
                        kind: meta.kind.to_string(),
                        field: field.to_string(),
                        expected: format!("a list of column value records, found {}", value.shape()),
                    });
                };
                self.columns = items
                    .iter()
                    .map(|item| {
                        ColumnValue::from_value(item).map_err(|expected| {
                            ChangeError::InvalidFieldValue {
                                kind: meta.kind.to_string(),
                                field: field.to_string(),
                                expected,
                            }
                        })
                    })
                    .collect::<Result<_>>()?;
            }
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        let table_name = fields::require(this.table_name, "table_name")?;
        if this.columns.is_empty() {
            return Err(ChangeError::setup("'columns' must declare at least one value"));
        }

        let mut seen = HashSet::new();
        let mut values = Vec::with_capacity(this.columns.len());
        for column in &this.columns {
            let name = fields::require(column.name.clone(), "name")?;
            if !seen.insert(name.clone()) {
                return Err(ChangeError::setup(format!(
                    "column '{name}' is given more than once"
                )));
            }
            let value = match (&column.value, &column.value_computed) {
                (Some(value), None) => InsertedValue::Literal(value.clone()),
                (None, Some(expr)) => InsertedValue::Computed(expr.clone()),
                (None, None) => InsertedValue::Literal(FieldValue::Null),
                (Some(_), Some(_)) => {
                    return Err(ChangeError::setup(format!(
                        "column '{name}' declares both 'value' and 'value_computed'"
                    )));
                }
            };
            values.push((name, value));
        }

        Ok(Box::new(Insert {
            schema_name: this.schema_name,
            table_name,
            columns: this.columns,
            values,
        }))
    }
}

#[derive(Debug, Clone)]
enum InsertedValue {
    Literal(FieldValue),
    Computed(String),
}

/// Inserts a single row.
///
/// The rollback deletes the row again by matching every inserted literal,
/// which is only possible when no value is computed by the database.
#[derive(Debug, Clone)]
pub struct Insert {
    schema_name: Option<String>,
    table_name: String,
    columns: Vec<ColumnValue>,
    values: Vec<(String, InsertedValue)>,
}

impl Change for Insert {
    fn metadata(&self) -> &'static ChangeMetadata {
        &INSERT
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.schema_name.as_ref())
            .text("table_name", &self.table_name)
            .records("columns", self.columns.iter().map(ColumnValue::to_value).collect())
            .into_vec()
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let names: Vec<String> = self
            .values
            .iter()
            .map(|(name, _)| dialect.quote_identifier(name))
            .collect();
        let values: Vec<String> = self
            .values
            .iter()
            .map(|(_, value)| match value {
                InsertedValue::Literal(value) => dialect.render_literal(value),
                InsertedValue::Computed(expr) => expr.clone(),
            })
            .collect();
        Ok(vec![Statement::new(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            dialect.qualify(self.schema_name.as_deref(), &self.table_name),
            names.join(", "),
            values.join(", ")
        ))])
    }

    fn rollback(&self) -> Rollback {
        if self
            .values
            .iter()
            .any(|(_, value)| matches!(value, InsertedValue::Computed(_)))
        {
            Rollback::impossible("rows with computed values cannot be matched for deletion")
        } else {
            Rollback::Explicit
        }
    }

    fn build_rollback_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let mut conditions = Vec::with_capacity(self.values.len());
        for (name, value) in &self.values {
            let column = dialect.quote_identifier(name);
            match value {
                InsertedValue::Literal(FieldValue::Null) => {
                    conditions.push(format!("{column} IS NULL"));
                }
                InsertedValue::Literal(value) => {
                    conditions.push(format!("{column} = {}", dialect.render_literal(value)));
                }
                InsertedValue::Computed(_) => {
                    return Err(ChangeError::rollback_impossible(format!(
                        "column '{name}' is computed"
                    )));
                }
            }
        }
        Ok(vec![Statement::new(format!(
            "DELETE FROM {} WHERE {}",
            dialect.qualify(self.schema_name.as_deref(), &self.table_name),
            conditions.join(" AND ")
        ))])
    }

    fn confirmation_message(&self) -> String {
        format!("New row inserted into {}", self.table_name)
    }
}

#[derive(Debug, Default)]
pub(crate) struct DeleteBuilder {
    schema_name: Option<String>,
    table_name: Option<String>,
    where_clause: Option<String>,
}

impl DeleteBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for DeleteBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DELETE
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &DELETE;
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "where_clause" => self.where_clause = Some(fields::text(meta, field, value)?),
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        Ok(Box::new(Delete {
            schema_name: this.schema_name,
            table_name: fields::require(this.table_name, "table_name")?,
            where_clause: this.where_clause,
        }))
    }
}

/// Deletes rows matching a condition.
#[derive(Debug, Clone)]
pub struct Delete {
    schema_name: Option<String>,
    table_name: String,
    where_clause: Option<String>,
}

impl Change for Delete {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DELETE
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.schema_name.as_ref())
            .text("table_name", &self.table_name)
            .opt_text("where_clause", self.where_clause.as_ref())
            .into_vec()
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let table = dialect.qualify(self.schema_name.as_deref(), &self.table_name);
        let sql = match self.where_clause.as_deref().map(str::trim) {
            Some(condition) if !condition.is_empty() => {
                format!("DELETE FROM {table} WHERE {condition}")
            }
            _ => format!("DELETE FROM {table}"),
        };
        Ok(vec![Statement::new(sql)])
    }

    fn rollback(&self) -> Rollback {
        Rollback::impossible("deleted rows are not part of the declaration")
    }

    fn confirmation_message(&self) -> String {
        format!("Data deleted from {}", self.table_name)
    }
}

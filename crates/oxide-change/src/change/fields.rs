//! Typed field setters and frozen-field emission shared by the catalog.

use std::collections::HashSet;

use super::ChangeMetadata;
use crate::error::{ChangeError, Result};
use crate::types::{ColumnConfig, ColumnDef, DataType};
use crate::value::FieldValue;

pub(crate) fn unknown_field(metadata: &ChangeMetadata, field: &str) -> ChangeError {
    ChangeError::UnknownField {
        kind: metadata.kind.to_string(),
        field: field.to_string(),
    }
}

fn invalid_value(metadata: &ChangeMetadata, field: &str, expected: &str, found: &FieldValue) -> ChangeError {
    ChangeError::InvalidFieldValue {
        kind: metadata.kind.to_string(),
        field: field.to_string(),
        expected: format!("{expected}, found {}", found.shape()),
    }
}

/// Reads a text field. Numbers are accepted and kept in their text form.
pub(crate) fn text(metadata: &ChangeMetadata, field: &str, value: FieldValue) -> Result<String> {
    match value {
        FieldValue::Text(text) => Ok(text),
        FieldValue::Integer(i) => Ok(i.to_string()),
        other => Err(invalid_value(metadata, field, "text", &other)),
    }
}

pub(crate) fn flag(metadata: &ChangeMetadata, field: &str, value: FieldValue) -> Result<bool> {
    value
        .to_bool()
        .ok_or_else(|| invalid_value(metadata, field, "a boolean", &value))
}

pub(crate) fn scalar(metadata: &ChangeMetadata, field: &str, value: FieldValue) -> Result<FieldValue> {
    if value.is_scalar() {
        Ok(value)
    } else {
        Err(invalid_value(metadata, field, "a scalar", &value))
    }
}

/// Reads a list of nested column records.
pub(crate) fn columns(
    metadata: &ChangeMetadata,
    field: &str,
    value: FieldValue,
) -> Result<Vec<ColumnConfig>> {
    let FieldValue::List(items) = value else {
        return Err(invalid_value(metadata, field, "a list of column records", &value));
    };
    items
        .iter()
        .map(|item| {
            ColumnConfig::from_value(item).map_err(|expected| ChangeError::InvalidFieldValue {
                kind: metadata.kind.to_string(),
                field: field.to_string(),
                expected,
            })
        })
        .collect()
}

/// Takes a required text field, rejecting blanks.
pub(crate) fn require(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(ChangeError::setup(format!("'{field}' must not be blank"))),
        None => Err(ChangeError::setup(format!("'{field}' is required"))),
    }
}

/// Takes a required comma separated name list.
pub(crate) fn require_names(value: Option<&String>, field: &str) -> Result<Vec<String>> {
    let names = value.map(|v| crate::types::split_names(v)).unwrap_or_default();
    if names.is_empty() {
        return Err(ChangeError::setup(format!("'{field}' must name at least one column")));
    }
    Ok(names)
}

pub(crate) fn parse_type(declared: Option<&String>, field: &str) -> Result<Option<DataType>> {
    declared
        .map(|declared| {
            DataType::parse(declared).map_err(|reason| ChangeError::setup(format!("'{field}': {reason}")))
        })
        .transpose()
}

/// Freezes column declarations, rejecting empty lists and duplicate names.
pub(crate) fn freeze_columns(
    columns: &[ColumnConfig],
    field: &str,
    require_type: bool,
) -> Result<Vec<ColumnDef>> {
    if columns.is_empty() {
        return Err(ChangeError::setup(format!("'{field}' must declare at least one column")));
    }
    let defs = columns
        .iter()
        .map(|column| column.freeze(require_type).map_err(ChangeError::setup))
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    for def in &defs {
        if !seen.insert(def.name.as_str()) {
            return Err(ChangeError::setup(format!(
                "column '{}' is declared more than once",
                def.name
            )));
        }
    }
    Ok(defs)
}

/// Collects the set fields of a frozen change in declaration order.
#[derive(Debug, Default)]
pub(crate) struct FieldList(Vec<(&'static str, FieldValue)>);

impl FieldList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn text(mut self, name: &'static str, value: &str) -> Self {
        self.0.push((name, FieldValue::from(value)));
        self
    }

    pub(crate) fn opt_text(self, name: &'static str, value: Option<&String>) -> Self {
        match value {
            Some(value) => self.text(name, value),
            None => self,
        }
    }

    pub(crate) fn opt_flag(mut self, name: &'static str, value: Option<bool>) -> Self {
        if let Some(value) = value {
            self.0.push((name, FieldValue::Bool(value)));
        }
        self
    }

    pub(crate) fn opt_value(mut self, name: &'static str, value: Option<&FieldValue>) -> Self {
        if let Some(value) = value {
            self.0.push((name, value.clone()));
        }
        self
    }

    pub(crate) fn records(mut self, name: &'static str, records: Vec<FieldValue>) -> Self {
        if !records.is_empty() {
            self.0.push((name, FieldValue::List(records)));
        }
        self
    }

    pub(crate) fn columns(self, name: &'static str, columns: &[ColumnConfig]) -> Self {
        self.records(name, columns.iter().map(ColumnConfig::to_value).collect())
    }

    pub(crate) fn into_vec(self) -> Vec<(&'static str, FieldValue)> {
        self.0
    }
}

//! Index changes.

use super::fields::{self, FieldList};
use super::{Change, ChangeBuilder, ChangeMetadata, FieldSpec, SPECIALIZATION_LEVEL_DEFAULT};
use crate::dialect::Dialect;
use crate::error::{ChangeError, Result};
use crate::resource::ResourceResolver;
use crate::rollback::Rollback;
use crate::statement::Statement;
use crate::types::ColumnConfig;
use crate::value::FieldValue;

pub(crate) static CREATE_INDEX: ChangeMetadata = ChangeMetadata {
    kind: "create-index",
    description: "Create an index",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the table"),
        FieldSpec::scalar("table_name", "Indexed table").required(),
        FieldSpec::scalar("index_name", "Index name").required(),
        FieldSpec::scalar("unique", "Whether the index is unique"),
        FieldSpec::nested("columns", "column", "Indexed columns, in order").required(),
    ],
};

pub(crate) static DROP_INDEX: ChangeMetadata = ChangeMetadata {
    kind: "drop-index",
    description: "Drop an index",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the index"),
        FieldSpec::scalar("table_name", "Indexed table, for databases that need it"),
        FieldSpec::scalar("index_name", "Index to drop").required(),
    ],
};

#[derive(Debug, Default)]
pub(crate) struct CreateIndexBuilder {
    schema_name: Option<String>,
    table_name: Option<String>,
    index_name: Option<String>,
    unique: Option<bool>,
    columns: Vec<ColumnConfig>,
}

impl CreateIndexBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for CreateIndexBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &CREATE_INDEX
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &CREATE_INDEX;
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "index_name" => self.index_name = Some(fields::text(meta, field, value)?),
            "unique" => self.unique = Some(fields::flag(meta, field, value)?),
            "columns" => self.columns = fields::columns(meta, field, value)?,
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        let column_names = fields::freeze_columns(&this.columns, "columns", false)?
            .into_iter()
            .map(|def| def.name)
            .collect();
        Ok(Box::new(CreateIndex {
            schema_name: this.schema_name,
            table_name: fields::require(this.table_name, "table_name")?,
            index_name: fields::require(this.index_name, "index_name")?,
            unique: this.unique,
            columns: this.columns,
            column_names,
        }))
    }
}

/// Creates an index over one or more columns.
#[derive(Debug, Clone)]
pub struct CreateIndex {
    schema_name: Option<String>,
    table_name: String,
    index_name: String,
    unique: Option<bool>,
    columns: Vec<ColumnConfig>,
    column_names: Vec<String>,
}

impl Change for CreateIndex {
    fn metadata(&self) -> &'static ChangeMetadata {
        &CREATE_INDEX
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.schema_name.as_ref())
            .text("table_name", &self.table_name)
            .text("index_name", &self.index_name)
            .opt_flag("unique", self.unique)
            .columns("columns", &self.columns)
            .into_vec()
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let columns: Vec<String> = self
            .column_names
            .iter()
            .map(|name| dialect.quote_identifier(name))
            .collect();
        let unique = if self.unique == Some(true) { "UNIQUE " } else { "" };
        Ok(vec![Statement::new(format!(
            "CREATE {unique}INDEX {} ON {} ({})",
            dialect.quote_identifier(&self.index_name),
            dialect.qualify(self.schema_name.as_deref(), &self.table_name),
            columns.join(", ")
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::inverse(DropIndex {
            schema_name: self.schema_name.clone(),
            table_name: Some(self.table_name.clone()),
            index_name: self.index_name.clone(),
        })
    }

    fn confirmation_message(&self) -> String {
        format!(
            "Index {} created on {}({})",
            self.index_name,
            self.table_name,
            self.column_names.join(", ")
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct DropIndexBuilder {
    schema_name: Option<String>,
    table_name: Option<String>,
    index_name: Option<String>,
}

impl DropIndexBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for DropIndexBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DROP_INDEX
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &DROP_INDEX;
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "index_name" => self.index_name = Some(fields::text(meta, field, value)?),
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        Ok(Box::new(DropIndex {
            schema_name: this.schema_name,
            table_name: this.table_name,
            index_name: fields::require(this.index_name, "index_name")?,
        }))
    }
}

/// Drops an index.
#[derive(Debug, Clone)]
pub struct DropIndex {
    schema_name: Option<String>,
    table_name: Option<String>,
    index_name: String,
}

impl Change for DropIndex {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DROP_INDEX
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.schema_name.as_ref())
            .opt_text("table_name", self.table_name.as_ref())
            .text("index_name", &self.index_name)
            .into_vec()
    }

    fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        if self.table_name.is_none() && dialect.drop_index_requires_table() {
            return Err(ChangeError::invalid(
                dialect.name(),
                "'table_name' is required to drop an index",
            ));
        }
        Ok(())
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let schema = self.schema_name.as_deref();
        let table = self
            .table_name
            .as_deref()
            .map(|table| dialect.qualify(schema, table));
        Ok(vec![Statement::new(dialect.drop_index(
            schema,
            &self.index_name,
            table.as_deref(),
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::impossible("the dropped index's columns are not part of the declaration")
    }

    fn confirmation_message(&self) -> String {
        format!("Index {} dropped", self.index_name)
    }
}

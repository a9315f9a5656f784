//! Column changes: add, drop, rename and retype.

use super::fields::{self, FieldList};
use super::{
    check_columns, column_sql, sql_type, Change, ChangeBuilder, ChangeMetadata, FieldSpec,
    SPECIALIZATION_LEVEL_DEFAULT,
};
use crate::dialect::Dialect;
use crate::error::{ChangeError, Result};
use crate::resource::ResourceResolver;
use crate::rollback::Rollback;
use crate::statement::Statement;
use crate::types::{ColumnConfig, ColumnDef, DataType};
use crate::value::FieldValue;

pub(crate) static ADD_COLUMN: ChangeMetadata = ChangeMetadata {
    kind: "add-column",
    description: "Add columns to an existing table",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the table"),
        FieldSpec::scalar("table_name", "Table to add columns to").required(),
        FieldSpec::nested("columns", "column", "Columns to add").required(),
    ],
};

pub(crate) static DROP_COLUMN: ChangeMetadata = ChangeMetadata {
    kind: "drop-column",
    description: "Drop a column",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the table"),
        FieldSpec::scalar("table_name", "Table owning the column").required(),
        FieldSpec::scalar("column_name", "Column to drop").required(),
    ],
};

pub(crate) const RENAME_COLUMN_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("schema_name", "Schema of the table"),
    FieldSpec::scalar("table_name", "Table owning the column").required(),
    FieldSpec::scalar("old_column_name", "Current column name").required(),
    FieldSpec::scalar("new_column_name", "New column name").required(),
    FieldSpec::scalar("column_data_type", "Column type, for databases that need it"),
];

pub(crate) static RENAME_COLUMN: ChangeMetadata = ChangeMetadata {
    kind: "rename-column",
    description: "Rename a column",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: RENAME_COLUMN_FIELDS,
};

pub(crate) static MODIFY_DATA_TYPE: ChangeMetadata = ChangeMetadata {
    kind: "modify-data-type",
    description: "Change the type of a column",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the table"),
        FieldSpec::scalar("table_name", "Table owning the column").required(),
        FieldSpec::scalar("column_name", "Column to change").required(),
        FieldSpec::scalar("new_data_type", "New column type").required(),
    ],
};

// add-column

#[derive(Debug, Default)]
pub(crate) struct AddColumnBuilder {
    schema_name: Option<String>,
    table_name: Option<String>,
    columns: Vec<ColumnConfig>,
}

impl AddColumnBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for AddColumnBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &ADD_COLUMN
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &ADD_COLUMN;
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "columns" => self.columns = fields::columns(meta, field, value)?,
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        let table_name = fields::require(this.table_name, "table_name")?;
        let defs = fields::freeze_columns(&this.columns, "columns", true)?;
        Ok(Box::new(AddColumn {
            schema_name: this.schema_name,
            table_name,
            columns: this.columns,
            defs,
        }))
    }
}

/// Adds one or more columns to a table.
#[derive(Debug, Clone)]
pub struct AddColumn {
    schema_name: Option<String>,
    table_name: String,
    columns: Vec<ColumnConfig>,
    defs: Vec<ColumnDef>,
}

impl Change for AddColumn {
    fn metadata(&self) -> &'static ChangeMetadata {
        &ADD_COLUMN
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.schema_name.as_ref())
            .text("table_name", &self.table_name)
            .columns("columns", &self.columns)
            .into_vec()
    }

    fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        check_columns(dialect, &self.defs)
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let table = dialect.qualify(self.schema_name.as_deref(), &self.table_name);
        self.defs
            .iter()
            .map(|def| {
                Ok(Statement::new(format!(
                    "ALTER TABLE {table} ADD COLUMN {}",
                    column_sql(dialect, def)?
                )))
            })
            .collect()
    }

    fn rollback(&self) -> Rollback {
        // Drop in reverse order of addition.
        Rollback::Inverse(
            self.defs
                .iter()
                .rev()
                .map(|def| {
                    Box::new(DropColumn {
                        schema_name: self.schema_name.clone(),
                        table_name: self.table_name.clone(),
                        column_name: def.name.clone(),
                    }) as Box<dyn Change>
                })
                .collect(),
        )
    }

    fn confirmation_message(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                format!(
                    "{}({})",
                    c.name.as_deref().unwrap_or_default(),
                    c.type_name.as_deref().unwrap_or_default()
                )
            })
            .collect();
        format!("Columns {} added to {}", columns.join(","), self.table_name)
    }
}

// drop-column

#[derive(Debug, Default)]
pub(crate) struct DropColumnBuilder {
    schema_name: Option<String>,
    table_name: Option<String>,
    column_name: Option<String>,
}

impl DropColumnBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for DropColumnBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DROP_COLUMN
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &DROP_COLUMN;
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "column_name" => self.column_name = Some(fields::text(meta, field, value)?),
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        Ok(Box::new(DropColumn {
            schema_name: this.schema_name,
            table_name: fields::require(this.table_name, "table_name")?,
            column_name: fields::require(this.column_name, "column_name")?,
        }))
    }
}

/// Drops a column.
#[derive(Debug, Clone)]
pub struct DropColumn {
    schema_name: Option<String>,
    table_name: String,
    column_name: String,
}

impl Change for DropColumn {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DROP_COLUMN
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.schema_name.as_ref())
            .text("table_name", &self.table_name)
            .text("column_name", &self.column_name)
            .into_vec()
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            dialect.qualify(self.schema_name.as_deref(), &self.table_name),
            dialect.quote_identifier(&self.column_name)
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::impossible("the dropped column's definition is not part of the declaration")
    }

    fn confirmation_message(&self) -> String {
        format!("Column {}.{} dropped", self.table_name, self.column_name)
    }
}

// rename-column

#[derive(Debug, Default)]
pub(crate) struct RenameColumnBuilder {
    schema_name: Option<String>,
    table_name: Option<String>,
    old_column_name: Option<String>,
    new_column_name: Option<String>,
    column_data_type: Option<String>,
}

impl RenameColumnBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }

    pub(crate) fn set_field(
        &mut self,
        meta: &'static ChangeMetadata,
        field: &str,
        value: FieldValue,
    ) -> Result<()> {
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "old_column_name" => self.old_column_name = Some(fields::text(meta, field, value)?),
            "new_column_name" => self.new_column_name = Some(fields::text(meta, field, value)?),
            "column_data_type" => self.column_data_type = Some(fields::text(meta, field, value)?),
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    pub(crate) fn freeze(self) -> Result<RenameColumn> {
        let table_name = fields::require(self.table_name, "table_name")?;
        let old_column_name = fields::require(self.old_column_name, "old_column_name")?;
        let new_column_name = fields::require(self.new_column_name, "new_column_name")?;
        if old_column_name == new_column_name {
            return Err(ChangeError::setup(format!(
                "column '{old_column_name}' cannot be renamed to itself"
            )));
        }
        let data_type = fields::parse_type(self.column_data_type.as_ref(), "column_data_type")?;
        Ok(RenameColumn {
            schema_name: self.schema_name,
            table_name,
            old_column_name,
            new_column_name,
            column_data_type: self.column_data_type,
            data_type,
        })
    }
}

impl ChangeBuilder for RenameColumnBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &RENAME_COLUMN
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        self.set_field(&RENAME_COLUMN, field, value)
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        Ok(Box::new((*self).freeze()?))
    }
}

/// Renames a column.
#[derive(Debug, Clone)]
pub struct RenameColumn {
    pub(crate) schema_name: Option<String>,
    pub(crate) table_name: String,
    pub(crate) old_column_name: String,
    pub(crate) new_column_name: String,
    pub(crate) column_data_type: Option<String>,
    pub(crate) data_type: Option<DataType>,
}

impl RenameColumn {
    /// The same rename in the other direction.
    pub(crate) fn reversed(&self) -> Self {
        Self {
            old_column_name: self.new_column_name.clone(),
            new_column_name: self.old_column_name.clone(),
            ..self.clone()
        }
    }

    pub(crate) fn check_type(&self, dialect: &dyn Dialect) -> Result<Option<String>> {
        self.data_type
            .as_ref()
            .map(|data_type| sql_type(dialect, data_type))
            .transpose()
    }
}

impl Change for RenameColumn {
    fn metadata(&self) -> &'static ChangeMetadata {
        &RENAME_COLUMN
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.schema_name.as_ref())
            .text("table_name", &self.table_name)
            .text("old_column_name", &self.old_column_name)
            .text("new_column_name", &self.new_column_name)
            .opt_text("column_data_type", self.column_data_type.as_ref())
            .into_vec()
    }

    fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        self.check_type(dialect).map(|_| ())
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(dialect.rename_column(
            &dialect.qualify(self.schema_name.as_deref(), &self.table_name),
            &dialect.quote_identifier(&self.old_column_name),
            &dialect.quote_identifier(&self.new_column_name),
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::inverse(self.reversed())
    }

    fn confirmation_message(&self) -> String {
        format!(
            "Column {}.{} renamed to {}",
            self.table_name, self.old_column_name, self.new_column_name
        )
    }
}

// modify-data-type

#[derive(Debug, Default)]
pub(crate) struct ModifyDataTypeBuilder {
    schema_name: Option<String>,
    table_name: Option<String>,
    column_name: Option<String>,
    new_data_type: Option<String>,
}

impl ModifyDataTypeBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for ModifyDataTypeBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &MODIFY_DATA_TYPE
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &MODIFY_DATA_TYPE;
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "column_name" => self.column_name = Some(fields::text(meta, field, value)?),
            "new_data_type" => self.new_data_type = Some(fields::text(meta, field, value)?),
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        let new_data_type = fields::require(this.new_data_type, "new_data_type")?;
        let data_type = DataType::parse(&new_data_type)
            .map_err(|reason| ChangeError::setup(format!("'new_data_type': {reason}")))?;
        Ok(Box::new(ModifyDataType {
            schema_name: this.schema_name,
            table_name: fields::require(this.table_name, "table_name")?,
            column_name: fields::require(this.column_name, "column_name")?,
            new_data_type,
            data_type,
        }))
    }
}

/// Changes the type of a column.
#[derive(Debug, Clone)]
pub struct ModifyDataType {
    schema_name: Option<String>,
    table_name: String,
    column_name: String,
    new_data_type: String,
    data_type: DataType,
}

impl Change for ModifyDataType {
    fn metadata(&self) -> &'static ChangeMetadata {
        &MODIFY_DATA_TYPE
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.schema_name.as_ref())
            .text("table_name", &self.table_name)
            .text("column_name", &self.column_name)
            .text("new_data_type", &self.new_data_type)
            .into_vec()
    }

    fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        sql_type(dialect, &self.data_type).map(|_| ())
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(dialect.modify_data_type(
            &dialect.qualify(self.schema_name.as_deref(), &self.table_name),
            &dialect.quote_identifier(&self.column_name),
            &sql_type(dialect, &self.data_type)?,
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::impossible("the previous column type is not part of the declaration")
    }

    fn confirmation_message(&self) -> String {
        format!(
            "{}.{} datatype was changed to {}",
            self.table_name, self.column_name, self.new_data_type
        )
    }
}

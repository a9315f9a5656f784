//! MySQL-specific implementations that outrank the portable ones.

use super::column::{RenameColumn, RenameColumnBuilder, RENAME_COLUMN_FIELDS};
use super::table::{RenameTable, RenameTableBuilder, RENAME_TABLE_FIELDS};
use super::{Change, ChangeBuilder, ChangeMetadata, SPECIALIZATION_LEVEL_DATABASE_SPECIFIC};
use crate::dialect::Dialect;
use crate::error::{ChangeError, Result};
use crate::resource::ResourceResolver;
use crate::rollback::Rollback;
use crate::statement::Statement;
use crate::value::FieldValue;

/// Dialects the implementations in this module are written for.
pub(crate) const MYSQL_DIALECTS: &[&str] = &["mysql"];

fn targets(kind: &str, dialect: &dyn Dialect) -> bool {
    MYSQL_DIALECTS.contains(&dialect.name()) && dialect.supports(kind)
}

pub(crate) static MYSQL_RENAME_TABLE: ChangeMetadata = ChangeMetadata {
    kind: "rename-table",
    description: "Rename a table with RENAME TABLE",
    specialization_level: SPECIALIZATION_LEVEL_DATABASE_SPECIFIC,
    fields: RENAME_TABLE_FIELDS,
};

pub(crate) static MYSQL_RENAME_COLUMN: ChangeMetadata = ChangeMetadata {
    kind: "rename-column",
    description: "Rename a column with CHANGE, keeping its type",
    specialization_level: SPECIALIZATION_LEVEL_DATABASE_SPECIFIC,
    fields: RENAME_COLUMN_FIELDS,
};

#[derive(Debug, Default)]
pub(crate) struct MySqlRenameTableBuilder(RenameTableBuilder);

impl MySqlRenameTableBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for MySqlRenameTableBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &MYSQL_RENAME_TABLE
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        self.0.set_field(&MYSQL_RENAME_TABLE, field, value)
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        Ok(Box::new(MySqlRenameTable((*self).0.freeze()?)))
    }
}

/// Renames a table with MySQL's `RENAME TABLE`.
#[derive(Debug, Clone)]
pub struct MySqlRenameTable(RenameTable);

impl Change for MySqlRenameTable {
    fn metadata(&self) -> &'static ChangeMetadata {
        &MYSQL_RENAME_TABLE
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        self.0.declared_fields()
    }

    fn supports(&self, dialect: &dyn Dialect) -> bool {
        targets(MYSQL_RENAME_TABLE.kind, dialect)
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let schema = self.0.schema_name.as_deref();
        Ok(vec![Statement::new(format!(
            "RENAME TABLE {} TO {}",
            dialect.qualify(schema, &self.0.old_table_name),
            dialect.qualify(schema, &self.0.new_table_name)
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::inverse(Self(self.0.reversed()))
    }

    fn confirmation_message(&self) -> String {
        self.0.confirmation_message()
    }
}

#[derive(Debug, Default)]
pub(crate) struct MySqlRenameColumnBuilder(RenameColumnBuilder);

impl MySqlRenameColumnBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for MySqlRenameColumnBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &MYSQL_RENAME_COLUMN
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        self.0.set_field(&MYSQL_RENAME_COLUMN, field, value)
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        Ok(Box::new(MySqlRenameColumn((*self).0.freeze()?)))
    }
}

/// Renames a column with `ALTER TABLE ... CHANGE`, which restates the type.
#[derive(Debug, Clone)]
pub struct MySqlRenameColumn(RenameColumn);

impl MySqlRenameColumn {
    // CHANGE cannot be written without the column type.
    fn type_sql(&self, dialect: &dyn Dialect) -> Result<String> {
        self.0.check_type(dialect)?.ok_or_else(|| {
            ChangeError::invalid(
                dialect.name(),
                "'column_data_type' is required to rename a column",
            )
        })
    }
}

impl Change for MySqlRenameColumn {
    fn metadata(&self) -> &'static ChangeMetadata {
        &MYSQL_RENAME_COLUMN
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        self.0.declared_fields()
    }

    fn supports(&self, dialect: &dyn Dialect) -> bool {
        targets(MYSQL_RENAME_COLUMN.kind, dialect)
    }

    fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        self.type_sql(dialect).map(|_| ())
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let type_sql = self.type_sql(dialect)?;
        Ok(vec![Statement::new(format!(
            "ALTER TABLE {} CHANGE {} {} {type_sql}",
            dialect.qualify(self.0.schema_name.as_deref(), &self.0.table_name),
            dialect.quote_identifier(&self.0.old_column_name),
            dialect.quote_identifier(&self.0.new_column_name),
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::inverse(Self(self.0.reversed()))
    }

    fn confirmation_message(&self) -> String {
        self.0.confirmation_message()
    }
}

//! The change contract and the built-in change catalog.
//!
//! A change kind is implemented as two types:
//!
//! - a builder ([`ChangeBuilder`]) that receives declared fields one by one
//!   through a typed setter keyed by the kind's field schema, and
//! - a frozen change ([`Change`]) that the builder's `setup` produces.
//!
//! `setup` consumes the builder, so a configured change can no longer be
//! mutated once it exists. Everything after setup is a pure read of the
//! frozen configuration and may run concurrently.

mod column;
mod constraint;
mod data;
pub(crate) mod fields;
mod index;
mod mysql;
mod sql;
mod table;

use std::collections::BTreeSet;
use std::fmt;

pub use column::{AddColumn, DropColumn, ModifyDataType, RenameColumn};
pub use constraint::{
    AddForeignKeyConstraint, AddNotNullConstraint, AddUniqueConstraint,
    DropForeignKeyConstraint, DropNotNullConstraint, DropUniqueConstraint,
};
pub use data::{Delete, Insert};
pub use index::{CreateIndex, DropIndex};
pub use mysql::{MySqlRenameColumn, MySqlRenameTable};
pub use sql::{RawSql, SqlFile};
pub use table::{CreateTable, DropTable, RenameTable};

use crate::dialect::Dialect;
use crate::error::{ChangeError, Result};
use crate::objects::{self, DatabaseObject};
use crate::registry::ChangeDescriptor;
use crate::resource::ResourceResolver;
use crate::rollback::Rollback;
use crate::statement::Statement;
use crate::types::{ColumnDef, DataType};
use crate::value::FieldValue;

/// Specialization level of portable implementations.
pub const SPECIALIZATION_LEVEL_DEFAULT: u32 = 1;

/// Specialization level of implementations written for one database.
pub const SPECIALIZATION_LEVEL_DATABASE_SPECIFIC: u32 = 5;

/// How a declared field is encoded in the portable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// A scalar value, encoded as an attribute.
    Scalar,
    /// A list of records, encoded as child nodes with the given tag.
    Nested {
        /// Tag of each child node.
        element: &'static str,
    },
}

/// One entry of a change kind's field schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name.
    pub name: &'static str,
    /// Encoding shape.
    pub shape: FieldShape,
    /// Whether setup fails without it.
    pub required: bool,
    /// Human-readable description.
    pub description: &'static str,
}

impl FieldSpec {
    /// Declares an optional scalar field.
    #[must_use]
    pub const fn scalar(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            shape: FieldShape::Scalar,
            required: false,
            description,
        }
    }

    /// Declares an optional list of nested records.
    #[must_use]
    pub const fn nested(
        name: &'static str,
        element: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            shape: FieldShape::Nested { element },
            required: false,
            description,
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Static description of a change implementation.
#[derive(Debug)]
pub struct ChangeMetadata {
    /// Kind name used for lookup (e.g. `add-column`).
    pub kind: &'static str,
    /// Short description.
    pub description: &'static str,
    /// Priority among implementations of the same kind.
    pub specialization_level: u32,
    /// Declared field schema, in declaration order.
    pub fields: &'static [FieldSpec],
}

impl ChangeMetadata {
    /// Looks up a declared field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }
}

/// A frozen, fully configured change.
///
/// Implementations provide forward generation, the rollback descriptor and
/// their declared fields; the lifecycle checks (dialect support, rollback
/// resolution, identity on errors) live in [`generate_statements`],
/// [`crate::rollback::generate_rollback_statements`] and
/// [`crate::unit::ChangeUnit`].
pub trait Change: fmt::Debug + Send + Sync {
    /// Returns the implementation's metadata.
    fn metadata(&self) -> &'static ChangeMetadata;

    /// Returns the configured fields in declaration order, omitting unset
    /// optional fields.
    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)>;

    /// Values derived during setup that affect generated SQL but are not
    /// declared fields (e.g. the contents of a referenced file).
    fn derived_fields(&self) -> Vec<(&'static str, FieldValue)> {
        Vec::new()
    }

    /// Returns whether the dialect can run this change.
    fn supports(&self, dialect: &dyn Dialect) -> bool {
        dialect.supports(self.metadata().kind)
    }

    /// Checks that the configuration is legal for the dialect.
    fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        let _ = dialect;
        Ok(())
    }

    /// Generates the forward statements. Only called when `supports` holds.
    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>>;

    /// Returns the rollback descriptor for this configuration.
    fn rollback(&self) -> Rollback;

    /// Generates rollback statements for [`Rollback::Explicit`] changes.
    fn build_rollback_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let _ = dialect;
        Err(ChangeError::rollback_impossible(format!(
            "'{}' declares no explicit rollback statements",
            self.metadata().kind
        )))
    }

    /// Returns the objects this change touches.
    fn affected_objects(&self, dialect: &dyn Dialect) -> BTreeSet<DatabaseObject> {
        objects::declared_objects(dialect, &self.declared_fields())
    }

    /// Returns a message describing the effect of the change.
    fn confirmation_message(&self) -> String;
}

/// Receives declared fields and produces a frozen [`Change`].
pub trait ChangeBuilder: fmt::Debug + Send {
    /// Returns the implementation's metadata.
    fn metadata(&self) -> &'static ChangeMetadata;

    /// Sets one declared field.
    ///
    /// Unknown names fail with [`ChangeError::UnknownField`], values of the
    /// wrong shape with [`ChangeError::InvalidFieldValue`].
    fn set(&mut self, field: &str, value: FieldValue) -> Result<()>;

    /// Derives the frozen change, consuming the builder.
    ///
    /// Missing or inconsistent configuration fails with
    /// [`ChangeError::Setup`].
    fn setup(self: Box<Self>, resources: &dyn ResourceResolver) -> Result<Box<dyn Change>>;
}

/// Generates the forward statements of a change.
///
/// Fails with [`ChangeError::Unsupported`] when the dialect cannot run the
/// change.
pub fn generate_statements(change: &dyn Change, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
    if !change.supports(dialect) {
        return Err(ChangeError::unsupported(
            change.metadata().kind,
            dialect.name(),
        ));
    }
    change.build_statements(dialect)
}

/// Maps a type for the dialect or reports it as invalid there.
pub(crate) fn sql_type(dialect: &dyn Dialect, data_type: &DataType) -> Result<String> {
    dialect.map_type(data_type).ok_or_else(|| {
        ChangeError::invalid(
            dialect.name(),
            format!("type '{data_type}' does not exist in {}", dialect.name()),
        )
    })
}

/// Checks column types and dialect column rules.
pub(crate) fn check_columns(dialect: &dyn Dialect, columns: &[ColumnDef]) -> Result<()> {
    for column in columns {
        if let Some(ref data_type) = column.data_type {
            sql_type(dialect, data_type)?;
        }
        dialect
            .check_column(column)
            .map_err(|reason| ChangeError::invalid(dialect.name(), reason))?;
    }
    Ok(())
}

/// Renders a full column definition.
pub(crate) fn column_sql(dialect: &dyn Dialect, column: &ColumnDef) -> Result<String> {
    let Some(ref data_type) = column.data_type else {
        return Err(ChangeError::invalid(
            dialect.name(),
            format!("column '{}' has no type", column.name),
        ));
    };
    let type_sql = sql_type(dialect, data_type)?;
    Ok(dialect.column_definition(column, &type_sql))
}

/// Descriptors of every built-in change implementation.
#[must_use]
pub fn builtin_descriptors() -> Vec<ChangeDescriptor> {
    vec![
        ChangeDescriptor::portable(&table::CREATE_TABLE, table::CreateTableBuilder::boxed),
        ChangeDescriptor::portable(&table::DROP_TABLE, table::DropTableBuilder::boxed),
        ChangeDescriptor::portable(&table::RENAME_TABLE, table::RenameTableBuilder::boxed),
        ChangeDescriptor::portable(&column::ADD_COLUMN, column::AddColumnBuilder::boxed),
        ChangeDescriptor::portable(&column::DROP_COLUMN, column::DropColumnBuilder::boxed),
        ChangeDescriptor::portable(&column::RENAME_COLUMN, column::RenameColumnBuilder::boxed),
        ChangeDescriptor::portable(
            &column::MODIFY_DATA_TYPE,
            column::ModifyDataTypeBuilder::boxed,
        ),
        ChangeDescriptor::portable(
            &constraint::ADD_NOT_NULL_CONSTRAINT,
            constraint::NotNullBuilder::add,
        ),
        ChangeDescriptor::portable(
            &constraint::DROP_NOT_NULL_CONSTRAINT,
            constraint::NotNullBuilder::drop,
        ),
        ChangeDescriptor::portable(
            &constraint::ADD_FOREIGN_KEY_CONSTRAINT,
            constraint::AddForeignKeyBuilder::boxed,
        ),
        ChangeDescriptor::portable(
            &constraint::DROP_FOREIGN_KEY_CONSTRAINT,
            constraint::DropForeignKeyBuilder::boxed,
        ),
        ChangeDescriptor::portable(
            &constraint::ADD_UNIQUE_CONSTRAINT,
            constraint::AddUniqueBuilder::boxed,
        ),
        ChangeDescriptor::portable(
            &constraint::DROP_UNIQUE_CONSTRAINT,
            constraint::DropUniqueBuilder::boxed,
        ),
        ChangeDescriptor::portable(&index::CREATE_INDEX, index::CreateIndexBuilder::boxed),
        ChangeDescriptor::portable(&index::DROP_INDEX, index::DropIndexBuilder::boxed),
        ChangeDescriptor::portable(&data::INSERT, data::InsertBuilder::boxed),
        ChangeDescriptor::portable(&data::DELETE, data::DeleteBuilder::boxed),
        ChangeDescriptor::portable(&sql::SQL, sql::RawSqlBuilder::boxed),
        ChangeDescriptor::portable(&sql::SQL_FILE, sql::SqlFileBuilder::boxed),
        ChangeDescriptor::for_dialects(
            &mysql::MYSQL_RENAME_TABLE,
            mysql::MYSQL_DIALECTS,
            mysql::MySqlRenameTableBuilder::boxed,
        ),
        ChangeDescriptor::for_dialects(
            &mysql::MYSQL_RENAME_COLUMN,
            mysql::MYSQL_DIALECTS,
            mysql::MySqlRenameColumnBuilder::boxed,
        ),
    ]
}

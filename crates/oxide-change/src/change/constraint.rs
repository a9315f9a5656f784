//! Constraint changes: NOT NULL, foreign keys and unique constraints.

use std::collections::BTreeSet;

use super::fields::{self, FieldList};
use super::{
    sql_type, Change, ChangeBuilder, ChangeMetadata, FieldSpec, SPECIALIZATION_LEVEL_DEFAULT,
};
use crate::dialect::Dialect;
use crate::error::{ChangeError, Result};
use crate::objects::{self, DatabaseObject, QualifiedName};
use crate::resource::ResourceResolver;
use crate::rollback::Rollback;
use crate::statement::Statement;
use crate::types::{DataType, ForeignKeyAction};
use crate::value::FieldValue;

pub(crate) static ADD_NOT_NULL_CONSTRAINT: ChangeMetadata = ChangeMetadata {
    kind: "add-not-null-constraint",
    description: "Make a column NOT NULL",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the table"),
        FieldSpec::scalar("table_name", "Table owning the column").required(),
        FieldSpec::scalar("column_name", "Column to constrain").required(),
        FieldSpec::scalar("column_data_type", "Column type, for databases that need it"),
        FieldSpec::scalar("default_null_value", "Value written into existing NULL rows first"),
    ],
};

pub(crate) static DROP_NOT_NULL_CONSTRAINT: ChangeMetadata = ChangeMetadata {
    kind: "drop-not-null-constraint",
    description: "Make a column nullable",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the table"),
        FieldSpec::scalar("table_name", "Table owning the column").required(),
        FieldSpec::scalar("column_name", "Column to relax").required(),
        FieldSpec::scalar("column_data_type", "Column type, for databases that need it"),
    ],
};

pub(crate) static ADD_FOREIGN_KEY_CONSTRAINT: ChangeMetadata = ChangeMetadata {
    kind: "add-foreign-key-constraint",
    description: "Add a foreign key constraint",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("base_table_schema_name", "Schema of the referencing table"),
        FieldSpec::scalar("base_table_name", "Referencing table").required(),
        FieldSpec::scalar("base_column_names", "Comma separated referencing columns").required(),
        FieldSpec::scalar("constraint_name", "Constraint name").required(),
        FieldSpec::scalar("referenced_table_schema_name", "Schema of the referenced table"),
        FieldSpec::scalar("referenced_table_name", "Referenced table").required(),
        FieldSpec::scalar("referenced_column_names", "Comma separated referenced columns")
            .required(),
        FieldSpec::scalar("on_delete", "ON DELETE action"),
        FieldSpec::scalar("on_update", "ON UPDATE action"),
        FieldSpec::scalar("deferrable", "Whether the constraint is deferrable"),
        FieldSpec::scalar("initially_deferred", "Whether checking is deferred by default"),
    ],
};

pub(crate) static DROP_FOREIGN_KEY_CONSTRAINT: ChangeMetadata = ChangeMetadata {
    kind: "drop-foreign-key-constraint",
    description: "Drop a foreign key constraint",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("base_table_schema_name", "Schema of the referencing table"),
        FieldSpec::scalar("base_table_name", "Referencing table").required(),
        FieldSpec::scalar("constraint_name", "Constraint to drop").required(),
    ],
};

pub(crate) static ADD_UNIQUE_CONSTRAINT: ChangeMetadata = ChangeMetadata {
    kind: "add-unique-constraint",
    description: "Add a unique constraint",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the table"),
        FieldSpec::scalar("table_name", "Constrained table").required(),
        FieldSpec::scalar("column_names", "Comma separated columns").required(),
        FieldSpec::scalar("constraint_name", "Constraint name").required(),
    ],
};

pub(crate) static DROP_UNIQUE_CONSTRAINT: ChangeMetadata = ChangeMetadata {
    kind: "drop-unique-constraint",
    description: "Drop a unique constraint",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the table"),
        FieldSpec::scalar("table_name", "Constrained table").required(),
        FieldSpec::scalar("constraint_name", "Constraint to drop").required(),
    ],
};

// add-not-null-constraint / drop-not-null-constraint

/// Builder shared by both nullability kinds.
#[derive(Debug)]
pub(crate) struct NotNullBuilder {
    meta: &'static ChangeMetadata,
    schema_name: Option<String>,
    table_name: Option<String>,
    column_name: Option<String>,
    column_data_type: Option<String>,
    default_null_value: Option<FieldValue>,
}

impl NotNullBuilder {
    fn new(meta: &'static ChangeMetadata) -> Self {
        Self {
            meta,
            schema_name: None,
            table_name: None,
            column_name: None,
            column_data_type: None,
            default_null_value: None,
        }
    }

    pub(crate) fn add() -> Box<dyn ChangeBuilder> {
        Box::new(Self::new(&ADD_NOT_NULL_CONSTRAINT))
    }

    pub(crate) fn drop() -> Box<dyn ChangeBuilder> {
        Box::new(Self::new(&DROP_NOT_NULL_CONSTRAINT))
    }
}

impl ChangeBuilder for NotNullBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        self.meta
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = self.meta;
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "column_name" => self.column_name = Some(fields::text(meta, field, value)?),
            "column_data_type" => self.column_data_type = Some(fields::text(meta, field, value)?),
            "default_null_value" if meta.field(field).is_some() => {
                self.default_null_value = Some(fields::scalar(meta, field, value)?);
            }
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        let target = NullabilityTarget {
            data_type: fields::parse_type(this.column_data_type.as_ref(), "column_data_type")?,
            schema_name: this.schema_name,
            table_name: fields::require(this.table_name, "table_name")?,
            column_name: fields::require(this.column_name, "column_name")?,
            column_data_type: this.column_data_type,
        };
        if this.meta.kind == ADD_NOT_NULL_CONSTRAINT.kind {
            Ok(Box::new(AddNotNullConstraint {
                target,
                default_null_value: this.default_null_value,
            }))
        } else {
            Ok(Box::new(DropNotNullConstraint { target }))
        }
    }
}

/// The column whose nullability changes.
#[derive(Debug, Clone)]
struct NullabilityTarget {
    schema_name: Option<String>,
    table_name: String,
    column_name: String,
    column_data_type: Option<String>,
    data_type: Option<DataType>,
}

impl NullabilityTarget {
    fn fields(&self) -> FieldList {
        FieldList::new()
            .opt_text("schema_name", self.schema_name.as_ref())
            .text("table_name", &self.table_name)
            .text("column_name", &self.column_name)
            .opt_text("column_data_type", self.column_data_type.as_ref())
    }

    fn type_sql(&self, dialect: &dyn Dialect) -> Result<Option<String>> {
        match self.data_type {
            Some(ref data_type) => sql_type(dialect, data_type).map(Some),
            None if dialect.nullability_change_requires_type() => Err(ChangeError::invalid(
                dialect.name(),
                "'column_data_type' is required to change nullability",
            )),
            None => Ok(None),
        }
    }

    fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        self.type_sql(dialect).map(|_| ())
    }

    fn statement(&self, dialect: &dyn Dialect, nullable: bool) -> Result<Statement> {
        let type_sql = self.type_sql(dialect)?;
        Ok(Statement::new(dialect.set_nullability(
            &dialect.qualify(self.schema_name.as_deref(), &self.table_name),
            &dialect.quote_identifier(&self.column_name),
            type_sql.as_deref(),
            nullable,
        )))
    }
}

/// Adds a NOT NULL constraint to a column.
#[derive(Debug, Clone)]
pub struct AddNotNullConstraint {
    target: NullabilityTarget,
    default_null_value: Option<FieldValue>,
}

impl Change for AddNotNullConstraint {
    fn metadata(&self) -> &'static ChangeMetadata {
        &ADD_NOT_NULL_CONSTRAINT
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        self.target
            .fields()
            .opt_value("default_null_value", self.default_null_value.as_ref())
            .into_vec()
    }

    fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        self.target.validate(dialect)
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let mut statements = Vec::with_capacity(2);
        if let Some(ref value) = self.default_null_value {
            let column = dialect.quote_identifier(&self.target.column_name);
            statements.push(Statement::new(format!(
                "UPDATE {} SET {column} = {} WHERE {column} IS NULL",
                dialect.qualify(self.target.schema_name.as_deref(), &self.target.table_name),
                dialect.render_literal(value)
            )));
        }
        statements.push(self.target.statement(dialect, false)?);
        Ok(statements)
    }

    fn rollback(&self) -> Rollback {
        Rollback::inverse(DropNotNullConstraint {
            target: self.target.clone(),
        })
    }

    fn confirmation_message(&self) -> String {
        format!(
            "Null constraint has been added to {}.{}",
            self.target.table_name, self.target.column_name
        )
    }
}

/// Drops the NOT NULL constraint of a column.
#[derive(Debug, Clone)]
pub struct DropNotNullConstraint {
    target: NullabilityTarget,
}

impl Change for DropNotNullConstraint {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DROP_NOT_NULL_CONSTRAINT
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        self.target.fields().into_vec()
    }

    fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        self.target.validate(dialect)
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        Ok(vec![self.target.statement(dialect, true)?])
    }

    fn rollback(&self) -> Rollback {
        Rollback::inverse(AddNotNullConstraint {
            target: self.target.clone(),
            default_null_value: None,
        })
    }

    fn confirmation_message(&self) -> String {
        format!(
            "Null constraint dropped from {}.{}",
            self.target.table_name, self.target.column_name
        )
    }
}

// add-foreign-key-constraint

#[derive(Debug, Default)]
pub(crate) struct AddForeignKeyBuilder {
    base_table_schema_name: Option<String>,
    base_table_name: Option<String>,
    base_column_names: Option<String>,
    constraint_name: Option<String>,
    referenced_table_schema_name: Option<String>,
    referenced_table_name: Option<String>,
    referenced_column_names: Option<String>,
    on_delete: Option<String>,
    on_update: Option<String>,
    deferrable: Option<bool>,
    initially_deferred: Option<bool>,
}

impl AddForeignKeyBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

fn parse_action(declared: Option<&String>, field: &str) -> Result<Option<ForeignKeyAction>> {
    declared
        .map(|declared| {
            ForeignKeyAction::parse(declared).ok_or_else(|| {
                ChangeError::setup(format!("'{field}': unknown referential action '{declared}'"))
            })
        })
        .transpose()
}

impl ChangeBuilder for AddForeignKeyBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &ADD_FOREIGN_KEY_CONSTRAINT
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &ADD_FOREIGN_KEY_CONSTRAINT;
        let slot = match field {
            "base_table_schema_name" => &mut self.base_table_schema_name,
            "base_table_name" => &mut self.base_table_name,
            "base_column_names" => &mut self.base_column_names,
            "constraint_name" => &mut self.constraint_name,
            "referenced_table_schema_name" => &mut self.referenced_table_schema_name,
            "referenced_table_name" => &mut self.referenced_table_name,
            "referenced_column_names" => &mut self.referenced_column_names,
            "on_delete" => &mut self.on_delete,
            "on_update" => &mut self.on_update,
            "deferrable" => {
                self.deferrable = Some(fields::flag(meta, field, value)?);
                return Ok(());
            }
            "initially_deferred" => {
                self.initially_deferred = Some(fields::flag(meta, field, value)?);
                return Ok(());
            }
            _ => return Err(fields::unknown_field(meta, field)),
        };
        *slot = Some(fields::text(meta, field, value)?);
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        let base_columns = fields::require_names(this.base_column_names.as_ref(), "base_column_names")?;
        let referenced_columns =
            fields::require_names(this.referenced_column_names.as_ref(), "referenced_column_names")?;
        if base_columns.len() != referenced_columns.len() {
            return Err(ChangeError::setup(format!(
                "{} base columns cannot reference {} columns",
                base_columns.len(),
                referenced_columns.len()
            )));
        }
        if this.initially_deferred == Some(true) && this.deferrable != Some(true) {
            return Err(ChangeError::setup(
                "'initially_deferred' requires the constraint to be deferrable",
            ));
        }
        Ok(Box::new(AddForeignKeyConstraint {
            on_delete_action: parse_action(this.on_delete.as_ref(), "on_delete")?,
            on_update_action: parse_action(this.on_update.as_ref(), "on_update")?,
            base_table_schema_name: this.base_table_schema_name,
            base_table_name: fields::require(this.base_table_name, "base_table_name")?,
            base_column_names: this.base_column_names.unwrap_or_default(),
            constraint_name: fields::require(this.constraint_name, "constraint_name")?,
            referenced_table_schema_name: this.referenced_table_schema_name,
            referenced_table_name: fields::require(
                this.referenced_table_name,
                "referenced_table_name",
            )?,
            referenced_column_names: this.referenced_column_names.unwrap_or_default(),
            on_delete: this.on_delete,
            on_update: this.on_update,
            deferrable: this.deferrable,
            initially_deferred: this.initially_deferred,
            base_columns,
            referenced_columns,
        }))
    }
}

/// Adds a foreign key constraint.
#[derive(Debug, Clone)]
pub struct AddForeignKeyConstraint {
    base_table_schema_name: Option<String>,
    base_table_name: String,
    base_column_names: String,
    constraint_name: String,
    referenced_table_schema_name: Option<String>,
    referenced_table_name: String,
    referenced_column_names: String,
    on_delete: Option<String>,
    on_update: Option<String>,
    deferrable: Option<bool>,
    initially_deferred: Option<bool>,
    on_delete_action: Option<ForeignKeyAction>,
    on_update_action: Option<ForeignKeyAction>,
    base_columns: Vec<String>,
    referenced_columns: Vec<String>,
}

fn quote_all(dialect: &dyn Dialect, names: &[String]) -> String {
    names
        .iter()
        .map(|name| dialect.quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Change for AddForeignKeyConstraint {
    fn metadata(&self) -> &'static ChangeMetadata {
        &ADD_FOREIGN_KEY_CONSTRAINT
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("base_table_schema_name", self.base_table_schema_name.as_ref())
            .text("base_table_name", &self.base_table_name)
            .text("base_column_names", &self.base_column_names)
            .text("constraint_name", &self.constraint_name)
            .opt_text(
                "referenced_table_schema_name",
                self.referenced_table_schema_name.as_ref(),
            )
            .text("referenced_table_name", &self.referenced_table_name)
            .text("referenced_column_names", &self.referenced_column_names)
            .opt_text("on_delete", self.on_delete.as_ref())
            .opt_text("on_update", self.on_update.as_ref())
            .opt_flag("deferrable", self.deferrable)
            .opt_flag("initially_deferred", self.initially_deferred)
            .into_vec()
    }

    fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        if self.deferrable == Some(true) && !dialect.supports_deferrable_constraints() {
            return Err(ChangeError::invalid(
                dialect.name(),
                "deferrable constraints are not supported",
            ));
        }
        Ok(())
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            dialect.qualify(self.base_table_schema_name.as_deref(), &self.base_table_name),
            dialect.quote_identifier(&self.constraint_name),
            quote_all(dialect, &self.base_columns),
            dialect.qualify(
                self.referenced_table_schema_name.as_deref(),
                &self.referenced_table_name
            ),
            quote_all(dialect, &self.referenced_columns),
        );
        if let Some(action) = self.on_delete_action {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.as_sql());
        }
        if let Some(action) = self.on_update_action {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action.as_sql());
        }
        if self.deferrable == Some(true) {
            sql.push_str(" DEFERRABLE");
            if self.initially_deferred == Some(true) {
                sql.push_str(" INITIALLY DEFERRED");
            }
        }
        Ok(vec![Statement::new(sql)])
    }

    fn rollback(&self) -> Rollback {
        Rollback::inverse(DropForeignKeyConstraint {
            base_table_schema_name: self.base_table_schema_name.clone(),
            base_table_name: self.base_table_name.clone(),
            constraint_name: self.constraint_name.clone(),
        })
    }

    fn affected_objects(&self, dialect: &dyn Dialect) -> BTreeSet<DatabaseObject> {
        let mut affected = objects::declared_objects(dialect, &self.declared_fields());
        affected.insert(DatabaseObject::ForeignKey {
            table: QualifiedName::new(
                dialect,
                self.base_table_schema_name.as_deref(),
                &self.base_table_name,
            ),
            name: self.constraint_name.clone(),
        });
        affected
    }

    fn confirmation_message(&self) -> String {
        format!(
            "Foreign key constraint added to {} ({})",
            self.base_table_name, self.base_column_names
        )
    }
}

// drop-foreign-key-constraint

#[derive(Debug, Default)]
pub(crate) struct DropForeignKeyBuilder {
    base_table_schema_name: Option<String>,
    base_table_name: Option<String>,
    constraint_name: Option<String>,
}

impl DropForeignKeyBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for DropForeignKeyBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DROP_FOREIGN_KEY_CONSTRAINT
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &DROP_FOREIGN_KEY_CONSTRAINT;
        match field {
            "base_table_schema_name" => {
                self.base_table_schema_name = Some(fields::text(meta, field, value)?);
            }
            "base_table_name" => self.base_table_name = Some(fields::text(meta, field, value)?),
            "constraint_name" => self.constraint_name = Some(fields::text(meta, field, value)?),
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        Ok(Box::new(DropForeignKeyConstraint {
            base_table_schema_name: this.base_table_schema_name,
            base_table_name: fields::require(this.base_table_name, "base_table_name")?,
            constraint_name: fields::require(this.constraint_name, "constraint_name")?,
        }))
    }
}

/// Drops a foreign key constraint.
#[derive(Debug, Clone)]
pub struct DropForeignKeyConstraint {
    base_table_schema_name: Option<String>,
    base_table_name: String,
    constraint_name: String,
}

impl Change for DropForeignKeyConstraint {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DROP_FOREIGN_KEY_CONSTRAINT
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("base_table_schema_name", self.base_table_schema_name.as_ref())
            .text("base_table_name", &self.base_table_name)
            .text("constraint_name", &self.constraint_name)
            .into_vec()
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(dialect.drop_foreign_key(
            &dialect.qualify(self.base_table_schema_name.as_deref(), &self.base_table_name),
            &dialect.quote_identifier(&self.constraint_name),
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::impossible("the dropped constraint's columns are not part of the declaration")
    }

    fn affected_objects(&self, dialect: &dyn Dialect) -> BTreeSet<DatabaseObject> {
        let mut affected = objects::declared_objects(dialect, &self.declared_fields());
        affected.insert(DatabaseObject::ForeignKey {
            table: QualifiedName::new(
                dialect,
                self.base_table_schema_name.as_deref(),
                &self.base_table_name,
            ),
            name: self.constraint_name.clone(),
        });
        affected
    }

    fn confirmation_message(&self) -> String {
        format!(
            "Foreign key {} dropped from {}",
            self.constraint_name, self.base_table_name
        )
    }
}

// add-unique-constraint / drop-unique-constraint

#[derive(Debug, Default)]
pub(crate) struct AddUniqueBuilder {
    schema_name: Option<String>,
    table_name: Option<String>,
    column_names: Option<String>,
    constraint_name: Option<String>,
}

impl AddUniqueBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for AddUniqueBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &ADD_UNIQUE_CONSTRAINT
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &ADD_UNIQUE_CONSTRAINT;
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "column_names" => self.column_names = Some(fields::text(meta, field, value)?),
            "constraint_name" => self.constraint_name = Some(fields::text(meta, field, value)?),
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        let columns = fields::require_names(this.column_names.as_ref(), "column_names")?;
        Ok(Box::new(AddUniqueConstraint {
            constraint: UniqueTarget {
                schema_name: this.schema_name,
                table_name: fields::require(this.table_name, "table_name")?,
                constraint_name: fields::require(this.constraint_name, "constraint_name")?,
            },
            column_names: this.column_names.unwrap_or_default(),
            columns,
        }))
    }
}

#[derive(Debug, Default)]
pub(crate) struct DropUniqueBuilder {
    schema_name: Option<String>,
    table_name: Option<String>,
    constraint_name: Option<String>,
}

impl DropUniqueBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for DropUniqueBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DROP_UNIQUE_CONSTRAINT
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &DROP_UNIQUE_CONSTRAINT;
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "constraint_name" => self.constraint_name = Some(fields::text(meta, field, value)?),
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        Ok(Box::new(DropUniqueConstraint {
            constraint: UniqueTarget {
                schema_name: this.schema_name,
                table_name: fields::require(this.table_name, "table_name")?,
                constraint_name: fields::require(this.constraint_name, "constraint_name")?,
            },
        }))
    }
}

#[derive(Debug, Clone)]
struct UniqueTarget {
    schema_name: Option<String>,
    table_name: String,
    constraint_name: String,
}

impl UniqueTarget {
    fn table(&self, dialect: &dyn Dialect) -> String {
        dialect.qualify(self.schema_name.as_deref(), &self.table_name)
    }

    fn objects(&self, dialect: &dyn Dialect, fields: &[(&'static str, FieldValue)]) -> BTreeSet<DatabaseObject> {
        let mut affected = objects::declared_objects(dialect, fields);
        affected.insert(DatabaseObject::UniqueConstraint {
            table: QualifiedName::new(dialect, self.schema_name.as_deref(), &self.table_name),
            name: self.constraint_name.clone(),
        });
        affected
    }
}

/// Adds a unique constraint over one or more columns.
#[derive(Debug, Clone)]
pub struct AddUniqueConstraint {
    constraint: UniqueTarget,
    column_names: String,
    columns: Vec<String>,
}

impl Change for AddUniqueConstraint {
    fn metadata(&self) -> &'static ChangeMetadata {
        &ADD_UNIQUE_CONSTRAINT
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.constraint.schema_name.as_ref())
            .text("table_name", &self.constraint.table_name)
            .text("column_names", &self.column_names)
            .text("constraint_name", &self.constraint.constraint_name)
            .into_vec()
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            self.constraint.table(dialect),
            dialect.quote_identifier(&self.constraint.constraint_name),
            quote_all(dialect, &self.columns)
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::inverse(DropUniqueConstraint {
            constraint: self.constraint.clone(),
        })
    }

    fn affected_objects(&self, dialect: &dyn Dialect) -> BTreeSet<DatabaseObject> {
        self.constraint.objects(dialect, &self.declared_fields())
    }

    fn confirmation_message(&self) -> String {
        format!(
            "Unique constraint added to {}({})",
            self.constraint.table_name, self.column_names
        )
    }
}

/// Drops a unique constraint.
#[derive(Debug, Clone)]
pub struct DropUniqueConstraint {
    constraint: UniqueTarget,
}

impl Change for DropUniqueConstraint {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DROP_UNIQUE_CONSTRAINT
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.constraint.schema_name.as_ref())
            .text("table_name", &self.constraint.table_name)
            .text("constraint_name", &self.constraint.constraint_name)
            .into_vec()
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(dialect.drop_unique_constraint(
            &self.constraint.table(dialect),
            &dialect.quote_identifier(&self.constraint.constraint_name),
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::impossible("the constrained columns are not part of the declaration")
    }

    fn affected_objects(&self, dialect: &dyn Dialect) -> BTreeSet<DatabaseObject> {
        self.constraint.objects(dialect, &self.declared_fields())
    }

    fn confirmation_message(&self) -> String {
        format!(
            "Unique constraint {} dropped from {}",
            self.constraint.constraint_name, self.constraint.table_name
        )
    }
}

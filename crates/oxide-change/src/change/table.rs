//! Table changes: create, drop and rename.

use std::collections::BTreeSet;

use super::fields::{self, FieldList};
use super::{
    check_columns, column_sql, Change, ChangeBuilder, ChangeMetadata, FieldSpec,
    SPECIALIZATION_LEVEL_DEFAULT,
};
use crate::dialect::Dialect;
use crate::error::{ChangeError, Result};
use crate::objects::{self, DatabaseObject, QualifiedName};
use crate::resource::ResourceResolver;
use crate::rollback::Rollback;
use crate::statement::Statement;
use crate::types::{ColumnConfig, ColumnDef};
use crate::value::FieldValue;

pub(crate) static CREATE_TABLE: ChangeMetadata = ChangeMetadata {
    kind: "create-table",
    description: "Create a table",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the new table"),
        FieldSpec::scalar("table_name", "Name of the new table").required(),
        FieldSpec::scalar("if_not_exists", "Skip creation when the table exists"),
        FieldSpec::nested("columns", "column", "Column definitions").required(),
    ],
};

pub(crate) static DROP_TABLE: ChangeMetadata = ChangeMetadata {
    kind: "drop-table",
    description: "Drop a table",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("schema_name", "Schema of the table"),
        FieldSpec::scalar("table_name", "Name of the table to drop").required(),
        FieldSpec::scalar("if_exists", "Do nothing when the table does not exist"),
        FieldSpec::scalar("cascade_constraints", "Also drop dependent constraints"),
    ],
};

pub(crate) const RENAME_TABLE_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("schema_name", "Schema of the table"),
    FieldSpec::scalar("old_table_name", "Current table name").required(),
    FieldSpec::scalar("new_table_name", "New table name").required(),
];

pub(crate) static RENAME_TABLE: ChangeMetadata = ChangeMetadata {
    kind: "rename-table",
    description: "Rename a table",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: RENAME_TABLE_FIELDS,
};

// create-table

#[derive(Debug, Default)]
pub(crate) struct CreateTableBuilder {
    schema_name: Option<String>,
    table_name: Option<String>,
    if_not_exists: Option<bool>,
    columns: Vec<ColumnConfig>,
}

impl CreateTableBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for CreateTableBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &CREATE_TABLE
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &CREATE_TABLE;
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "if_not_exists" => self.if_not_exists = Some(fields::flag(meta, field, value)?),
            "columns" => self.columns = fields::columns(meta, field, value)?,
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        let table_name = fields::require(this.table_name, "table_name")?;
        let defs = fields::freeze_columns(&this.columns, "columns", true)?;
        Ok(Box::new(CreateTable {
            schema_name: this.schema_name,
            table_name,
            if_not_exists: this.if_not_exists,
            columns: this.columns,
            defs,
        }))
    }
}

/// Creates a table with its columns.
#[derive(Debug, Clone)]
pub struct CreateTable {
    schema_name: Option<String>,
    table_name: String,
    if_not_exists: Option<bool>,
    columns: Vec<ColumnConfig>,
    defs: Vec<ColumnDef>,
}

impl Change for CreateTable {
    fn metadata(&self) -> &'static ChangeMetadata {
        &CREATE_TABLE
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.schema_name.as_ref())
            .text("table_name", &self.table_name)
            .opt_flag("if_not_exists", self.if_not_exists)
            .columns("columns", &self.columns)
            .into_vec()
    }

    fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        check_columns(dialect, &self.defs)
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let primary_key: Vec<&ColumnDef> = self.defs.iter().filter(|c| c.primary_key).collect();
        let composite = primary_key.len() > 1;

        let mut parts = Vec::with_capacity(self.defs.len() + 1);
        for def in &self.defs {
            if composite && def.primary_key {
                // Composite keys are declared as a table constraint below.
                let member = ColumnDef {
                    primary_key: false,
                    nullable: false,
                    ..def.clone()
                };
                parts.push(column_sql(dialect, &member)?);
            } else {
                parts.push(column_sql(dialect, def)?);
            }
        }
        if composite {
            let names: Vec<String> = primary_key
                .iter()
                .map(|c| dialect.quote_identifier(&c.name))
                .collect();
            parts.push(format!("PRIMARY KEY ({})", names.join(", ")));
        }

        let if_not_exists = if self.if_not_exists == Some(true) {
            "IF NOT EXISTS "
        } else {
            ""
        };
        Ok(vec![Statement::new(format!(
            "CREATE TABLE {if_not_exists}{} ({})",
            dialect.qualify(self.schema_name.as_deref(), &self.table_name),
            parts.join(", ")
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::inverse(DropTable::new(
            self.schema_name.clone(),
            self.table_name.clone(),
        ))
    }

    fn confirmation_message(&self) -> String {
        format!("Table {} created", self.table_name)
    }
}

// drop-table

#[derive(Debug, Default)]
pub(crate) struct DropTableBuilder {
    schema_name: Option<String>,
    table_name: Option<String>,
    if_exists: Option<bool>,
    cascade_constraints: Option<bool>,
}

impl DropTableBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for DropTableBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DROP_TABLE
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let meta = &DROP_TABLE;
        match field {
            "schema_name" => self.schema_name = Some(fields::text(meta, field, value)?),
            "table_name" => self.table_name = Some(fields::text(meta, field, value)?),
            "if_exists" => self.if_exists = Some(fields::flag(meta, field, value)?),
            "cascade_constraints" => {
                self.cascade_constraints = Some(fields::flag(meta, field, value)?);
            }
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        Ok(Box::new(DropTable {
            schema_name: this.schema_name,
            table_name: fields::require(this.table_name, "table_name")?,
            if_exists: this.if_exists,
            cascade_constraints: this.cascade_constraints,
        }))
    }
}

/// Drops a table.
#[derive(Debug, Clone)]
pub struct DropTable {
    schema_name: Option<String>,
    table_name: String,
    if_exists: Option<bool>,
    cascade_constraints: Option<bool>,
}

impl DropTable {
    pub(crate) fn new(schema_name: Option<String>, table_name: String) -> Self {
        Self {
            schema_name,
            table_name,
            if_exists: None,
            cascade_constraints: None,
        }
    }
}

impl Change for DropTable {
    fn metadata(&self) -> &'static ChangeMetadata {
        &DROP_TABLE
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.schema_name.as_ref())
            .text("table_name", &self.table_name)
            .opt_flag("if_exists", self.if_exists)
            .opt_flag("cascade_constraints", self.cascade_constraints)
            .into_vec()
    }

    fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        if self.cascade_constraints == Some(true) && !dialect.supports_drop_cascade() {
            return Err(ChangeError::invalid(
                dialect.name(),
                "'cascade_constraints' is not supported",
            ));
        }
        Ok(())
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let mut sql = String::from("DROP TABLE ");
        if self.if_exists == Some(true) {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&dialect.qualify(self.schema_name.as_deref(), &self.table_name));
        if self.cascade_constraints == Some(true) {
            sql.push_str(" CASCADE");
        }
        Ok(vec![Statement::new(sql)])
    }

    fn rollback(&self) -> Rollback {
        Rollback::impossible("the dropped table's definition is not part of the declaration")
    }

    fn affected_objects(&self, dialect: &dyn Dialect) -> BTreeSet<DatabaseObject> {
        let mut affected = objects::declared_objects(dialect, &self.declared_fields());
        if self.cascade_constraints == Some(true) {
            affected.insert(DatabaseObject::Dependents {
                table: QualifiedName::new(
                    dialect,
                    self.schema_name.as_deref(),
                    &self.table_name,
                ),
            });
        }
        affected
    }

    fn confirmation_message(&self) -> String {
        format!("Table {} dropped", self.table_name)
    }
}

// rename-table

#[derive(Debug, Default)]
pub(crate) struct RenameTableBuilder {
    schema_name: Option<String>,
    old_table_name: Option<String>,
    new_table_name: Option<String>,
}

impl RenameTableBuilder {
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
            "old_table_name" => self.old_table_name = Some(fields::text(meta, field, value)?),
            "new_table_name" => self.new_table_name = Some(fields::text(meta, field, value)?),
            _ => return Err(fields::unknown_field(meta, field)),
        }
        Ok(())
    }

    pub(crate) fn freeze(self) -> Result<RenameTable> {
        let old_table_name = fields::require(self.old_table_name, "old_table_name")?;
        let new_table_name = fields::require(self.new_table_name, "new_table_name")?;
        if old_table_name == new_table_name {
            return Err(ChangeError::setup(format!(
                "table '{old_table_name}' cannot be renamed to itself"
            )));
        }
        Ok(RenameTable {
            schema_name: self.schema_name,
            old_table_name,
            new_table_name,
        })
    }
}

impl ChangeBuilder for RenameTableBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &RENAME_TABLE
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        self.set_field(&RENAME_TABLE, field, value)
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        Ok(Box::new((*self).freeze()?))
    }
}

/// Renames a table.
#[derive(Debug, Clone)]
pub struct RenameTable {
    pub(crate) schema_name: Option<String>,
    pub(crate) old_table_name: String,
    pub(crate) new_table_name: String,
}

impl RenameTable {
    /// The same rename in the other direction.
    pub(crate) fn reversed(&self) -> Self {
        Self {
            schema_name: self.schema_name.clone(),
            old_table_name: self.new_table_name.clone(),
            new_table_name: self.old_table_name.clone(),
        }
    }
}

impl Change for RenameTable {
    fn metadata(&self) -> &'static ChangeMetadata {
        &RENAME_TABLE
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        FieldList::new()
            .opt_text("schema_name", self.schema_name.as_ref())
            .text("old_table_name", &self.old_table_name)
            .text("new_table_name", &self.new_table_name)
            .into_vec()
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(format!(
            "ALTER TABLE {} RENAME TO {}",
            dialect.qualify(self.schema_name.as_deref(), &self.old_table_name),
            dialect.quote_identifier(&self.new_table_name)
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::inverse(self.reversed())
    }

    fn confirmation_message(&self) -> String {
        format!(
            "Table {} renamed to {}",
            self.old_table_name, self.new_table_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect, SqliteDialect};
    use crate::resource::NoResources;
    use crate::rollback::generate_rollback_statements;

    fn create_users() -> Box<dyn Change> {
        let mut builder = CreateTableBuilder::boxed();
        builder.set("table_name", "users".into()).unwrap();
        builder
            .set(
                "columns",
                FieldValue::List(vec![
                    ColumnConfig {
                        primary_key: Some(true),
                        auto_increment: Some(true),
                        ..ColumnConfig::new("id", "bigint")
                    }
                    .to_value(),
                    ColumnConfig {
                        nullable: Some(false),
                        ..ColumnConfig::new("email", "varchar(255)")
                    }
                    .to_value(),
                ]),
            )
            .unwrap();
        builder.setup(&NoResources).unwrap()
    }

    #[test]
    fn test_create_table_per_dialect() {
        let change = create_users();
        assert_eq!(
            change.build_statements(&PostgresDialect::new()).unwrap(),
            vec![Statement::new(
                "CREATE TABLE users (id BIGSERIAL PRIMARY KEY, email VARCHAR(255) NOT NULL)"
            )]
        );
        assert_eq!(
            change.build_statements(&MySqlDialect::new()).unwrap(),
            vec![Statement::new(
                "CREATE TABLE users (id BIGINT PRIMARY KEY AUTO_INCREMENT, email VARCHAR(255) NOT NULL)"
            )]
        );
    }

    #[test]
    fn test_create_table_requires_columns() {
        let mut builder = CreateTableBuilder::boxed();
        builder.set("table_name", "users".into()).unwrap();
        let err = builder.setup(&NoResources).unwrap_err();
        assert!(matches!(err, ChangeError::Setup { .. }));
    }

    #[test]
    fn test_composite_primary_key() {
        let mut builder = CreateTableBuilder::boxed();
        builder.set("table_name", "memberships".into()).unwrap();
        let key = |name: &str| {
            ColumnConfig {
                primary_key: Some(true),
                ..ColumnConfig::new(name, "int")
            }
            .to_value()
        };
        builder
            .set("columns", FieldValue::List(vec![key("user_id"), key("group_id")]))
            .unwrap();
        let change = builder.setup(&NoResources).unwrap();
        assert_eq!(
            change.build_statements(&SqliteDialect::new()).unwrap(),
            vec![Statement::new(
                "CREATE TABLE memberships (user_id INTEGER NOT NULL, group_id INTEGER NOT NULL, PRIMARY KEY (user_id, group_id))"
            )]
        );
    }

    #[test]
    fn test_create_table_rollback_drops() {
        let change = create_users();
        assert_eq!(
            generate_rollback_statements(change.as_ref(), &PostgresDialect::new()).unwrap(),
            vec![Statement::new("DROP TABLE users")]
        );
    }

    #[test]
    fn test_drop_table_cascade_on_sqlite_is_invalid() {
        let mut builder = DropTableBuilder::boxed();
        builder.set("table_name", "users".into()).unwrap();
        builder.set("cascade_constraints", true.into()).unwrap();
        let change = builder.setup(&NoResources).unwrap();
        assert!(change.validate(&SqliteDialect::new()).is_err());
        assert_eq!(
            change.build_statements(&PostgresDialect::new()).unwrap(),
            vec![Statement::new("DROP TABLE users CASCADE")]
        );
        assert!(!change.rollback().is_supported());
    }

    #[test]
    fn test_drop_table_cascade_reports_dependents() {
        let pg = PostgresDialect::new();
        let users = QualifiedName::new(&pg, Some("app"), "users");
        let dependents = DatabaseObject::Dependents {
            table: users.clone(),
        };

        let mut builder = DropTableBuilder::boxed();
        builder.set("schema_name", "app".into()).unwrap();
        builder.set("table_name", "users".into()).unwrap();
        let plain = builder.setup(&NoResources).unwrap();
        let affected = plain.affected_objects(&pg);
        assert!(affected.contains(&DatabaseObject::Table {
            table: users.clone()
        }));
        assert!(!affected.contains(&dependents));

        let mut builder = DropTableBuilder::boxed();
        builder.set("schema_name", "app".into()).unwrap();
        builder.set("table_name", "users".into()).unwrap();
        builder.set("cascade_constraints", true.into()).unwrap();
        let cascade = builder.setup(&NoResources).unwrap();
        let affected = cascade.affected_objects(&pg);
        assert!(affected.contains(&DatabaseObject::Table { table: users }));
        assert!(affected.contains(&dependents));
        assert_eq!(dependents.to_string(), "objects depending on app.users");
    }

    #[test]
    fn test_rename_table_round_trips() {
        let mut builder = RenameTableBuilder::boxed();
        builder.set("schema_name", "app".into()).unwrap();
        builder.set("old_table_name", "users".into()).unwrap();
        builder.set("new_table_name", "accounts".into()).unwrap();
        let change = builder.setup(&NoResources).unwrap();
        let pg = PostgresDialect::new();
        assert_eq!(
            change.build_statements(&pg).unwrap(),
            vec![Statement::new("ALTER TABLE app.users RENAME TO accounts")]
        );
        assert_eq!(
            generate_rollback_statements(change.as_ref(), &pg).unwrap(),
            vec![Statement::new("ALTER TABLE app.accounts RENAME TO users")]
        );
    }

    #[test]
    fn test_rename_to_same_name_fails_setup() {
        let mut builder = RenameTableBuilder::boxed();
        builder.set("old_table_name", "users".into()).unwrap();
        builder.set("new_table_name", "users".into()).unwrap();
        assert!(builder.setup(&NoResources).is_err());
    }
}

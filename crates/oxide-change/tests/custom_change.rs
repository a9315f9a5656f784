//! Integration tests for implementations registered from outside the crate.

use oxide_change::change::builtin_descriptors;
use oxide_change::prelude::*;

static PG_ADD_COLUMN: ChangeMetadata = ChangeMetadata {
    kind: "add-column",
    description: "Add a column, skipping it when it exists",
    specialization_level: 5,
    fields: &[
        FieldSpec::scalar("table_name", "Table to add the column to").required(),
        FieldSpec::scalar("column_name", "Column to add").required(),
        FieldSpec::scalar("column_type", "Column type").required(),
    ],
};

#[derive(Debug, Default)]
struct PgAddColumnBuilder {
    table_name: Option<String>,
    column_name: Option<String>,
    column_type: Option<String>,
}

fn boxed() -> Box<dyn ChangeBuilder> {
    Box::<PgAddColumnBuilder>::default()
}

impl ChangeBuilder for PgAddColumnBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &PG_ADD_COLUMN
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let text = value
            .as_text()
            .ok_or_else(|| ChangeError::InvalidFieldValue {
                kind: PG_ADD_COLUMN.kind.to_string(),
                field: field.to_string(),
                expected: "text".to_string(),
            })?
            .to_string();
        match field {
            "table_name" => self.table_name = Some(text),
            "column_name" => self.column_name = Some(text),
            "column_type" => self.column_type = Some(text),
            _ => {
                return Err(ChangeError::UnknownField {
                    kind: PG_ADD_COLUMN.kind.to_string(),
                    field: field.to_string(),
                })
            }
        }
        Ok(())
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        let required = |value: Option<String>, name: &str| {
            value.ok_or_else(|| ChangeError::setup(format!("'{name}' is required")))
        };
        Ok(Box::new(PgAddColumn {
            table_name: required(this.table_name, "table_name")?,
            column_name: required(this.column_name, "column_name")?,
            column_type: required(this.column_type, "column_type")?,
        }))
    }
}

#[derive(Debug)]
struct PgAddColumn {
    table_name: String,
    column_name: String,
    column_type: String,
}

impl Change for PgAddColumn {
    fn metadata(&self) -> &'static ChangeMetadata {
        &PG_ADD_COLUMN
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("table_name", self.table_name.as_str().into()),
            ("column_name", self.column_name.as_str().into()),
            ("column_type", self.column_type.as_str().into()),
        ]
    }

    fn build_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        Ok(vec![Statement::new(format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
            dialect.quote_identifier(&self.table_name),
            dialect.quote_identifier(&self.column_name),
            self.column_type.to_uppercase()
        ))])
    }

    fn rollback(&self) -> Rollback {
        Rollback::impossible("the column may have existed before")
    }

    fn confirmation_message(&self) -> String {
        format!("Column {} ensured on {}", self.column_name, self.table_name)
    }
}

fn registry() -> ChangeRegistry {
    let registry = ChangeRegistry::new();
    for descriptor in builtin_descriptors() {
        registry.register(descriptor).unwrap();
    }
    registry
        .register(ChangeDescriptor::for_dialects(
            &PG_ADD_COLUMN,
            &["postgresql"],
            boxed,
        ))
        .unwrap();
    registry
}

#[test]
fn test_specialized_implementation_wins_on_its_dialect() {
    let registry = registry();
    let pg = PostgresDialect::new();
    let unit = registry
        .create("add-column", &pg)
        .unwrap()
        .with("table_name", "users")
        .unwrap()
        .with("column_name", "email")
        .unwrap()
        .with("column_type", "text")
        .unwrap()
        .setup(&NoResources)
        .unwrap();

    assert_eq!(unit.metadata().specialization_level, 5);
    assert_eq!(
        unit.generate_statements(&pg).unwrap(),
        vec![Statement::new(
            "ALTER TABLE users ADD COLUMN IF NOT EXISTS email TEXT"
        )]
    );
    assert!(!unit.supports_rollback());
    assert_eq!(unit.confirmation_message(), "Column email ensured on users");
}

#[test]
fn test_portable_implementation_elsewhere() {
    let registry = registry();
    let pending = registry.create("add-column", &SqliteDialect::new()).unwrap();
    assert_eq!(pending.metadata().specialization_level, 1);
    assert!(matches!(
        pending.with("column_type", "text"),
        Err(ChangeError::UnknownField { .. })
    ));
}

#[test]
fn test_same_level_same_dialect_is_rejected() {
    let registry = registry();
    assert!(matches!(
        registry.register(ChangeDescriptor::for_dialects(
            &PG_ADD_COLUMN,
            &["postgresql", "mysql"],
            boxed,
        )),
        Err(ChangeError::DuplicateRegistration { .. })
    ));
}

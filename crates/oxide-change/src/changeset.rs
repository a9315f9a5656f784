//! Changesets: ordered groups of change units applied together.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dialect::Dialect;
use crate::error::{ChangeError, Result};
use crate::fingerprint;
use crate::objects::DatabaseObject;
use crate::portable::ChangeSetDocument;
use crate::resource::ResourceResolver;
use crate::statement::Statement;
use crate::unit::{ChangeUnit, PendingChange};

/// Identity of a changeset, referenced by its units for error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeSetRef {
    /// Changeset id, unique within its origin.
    pub id: String,
    /// Author.
    pub author: String,
    /// Path of the declaring document.
    pub origin: String,
}

impl ChangeSetRef {
    /// Creates a changeset reference.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            origin: origin.into(),
        }
    }
}

impl fmt::Display for ChangeSetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.origin, self.id, self.author)
    }
}

/// Collects pending changes for a changeset.
#[derive(Debug)]
pub struct ChangeSetBuilder {
    reference: Arc<ChangeSetRef>,
    pending: Vec<PendingChange>,
}

impl ChangeSetBuilder {
    /// Starts a changeset.
    #[must_use]
    pub fn new(reference: ChangeSetRef) -> Self {
        Self {
            reference: Arc::new(reference),
            pending: Vec::new(),
        }
    }

    /// Appends a change.
    pub fn add(&mut self, change: PendingChange) {
        self.pending.push(change.owned_by(Arc::clone(&self.reference)));
    }

    /// Appends a change, builder style.
    #[must_use]
    pub fn change(mut self, change: PendingChange) -> Self {
        self.add(change);
        self
    }

    /// Sets up every change in order. The first setup failure aborts the
    /// whole changeset.
    pub fn build(self, resources: &dyn ResourceResolver) -> Result<ChangeSet> {
        let units = self
            .pending
            .into_iter()
            .map(|pending| pending.setup(resources))
            .collect::<Result<Vec<_>>>()?;
        info!(
            change_set = %self.reference,
            changes = units.len(),
            "Changeset built"
        );
        Ok(ChangeSet {
            reference: self.reference,
            units,
        })
    }
}

/// An ordered group of set-up change units.
#[derive(Debug)]
pub struct ChangeSet {
    reference: Arc<ChangeSetRef>,
    units: Vec<ChangeUnit>,
}

impl ChangeSet {
    /// Returns the changeset identity.
    #[must_use]
    pub fn reference(&self) -> &ChangeSetRef {
        &self.reference
    }

    /// Returns the units in declaration order.
    #[must_use]
    pub fn units(&self) -> &[ChangeUnit] {
        &self.units
    }

    /// Returns the number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if the changeset has no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Validates every unit against every dialect and returns all errors.
    ///
    /// A unit a dialect cannot run is reported as unsupported and not
    /// validated further on that dialect.
    #[must_use]
    pub fn validate(&self, dialects: &[&dyn Dialect]) -> Vec<ChangeError> {
        let mut errors = Vec::new();
        for dialect in dialects {
            for unit in &self.units {
                if !unit.supports(*dialect) {
                    errors.push(
                        ChangeError::unsupported(unit.kind(), dialect.name())
                            .with_identity(&unit.identity()),
                    );
                } else if let Err(e) = unit.validate(*dialect) {
                    errors.push(e);
                }
            }
        }
        debug!(
            change_set = %self.reference,
            errors = errors.len(),
            "Validated changeset"
        );
        errors
    }

    /// Generates the forward statements of every unit, in order.
    pub fn generate_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        for unit in &self.units {
            statements.extend(unit.generate_statements(dialect)?);
        }
        Ok(statements)
    }

    /// Generates the rollback of every unit, last unit first.
    pub fn generate_rollback_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        for unit in self.units.iter().rev() {
            statements.extend(unit.generate_rollback_statements(dialect)?);
        }
        Ok(statements)
    }

    /// Returns whether every unit can be rolled back.
    #[must_use]
    pub fn supports_rollback(&self) -> bool {
        self.units.iter().all(ChangeUnit::supports_rollback)
    }

    /// Returns the combined fingerprint of the units, in order.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        fingerprint::combine(self.units.iter().map(ChangeUnit::fingerprint))
    }

    /// Returns the union of the units' affected objects.
    #[must_use]
    pub fn affected_objects(&self, dialect: &dyn Dialect) -> BTreeSet<DatabaseObject> {
        self.units
            .iter()
            .flat_map(|unit| unit.affected_objects(dialect).iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Encodes the changeset as a portable document.
    #[must_use]
    pub fn to_document(&self) -> ChangeSetDocument {
        ChangeSetDocument {
            id: self.reference.id.clone(),
            author: self.reference.author.clone(),
            changes: self.units.iter().map(ChangeUnit::to_portable).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect, SqliteDialect};
    use crate::registry::ChangeRegistry;
    use crate::resource::NoResources;
    use crate::value::FieldValue;

    fn users_changeset() -> ChangeSet {
        let pg = PostgresDialect::new();
        let registry = ChangeRegistry::global();
        ChangeSetBuilder::new(ChangeSetRef::new("1", "alice", "changelog.json"))
            .change(
                registry
                    .create("create-table", &pg)
                    .unwrap()
                    .with("table_name", "users")
                    .unwrap()
                    .with(
                        "columns",
                        FieldValue::List(vec![FieldValue::record([
                            ("name", FieldValue::from("id")),
                            ("type", FieldValue::from("int")),
                            ("primary_key", FieldValue::Bool(true)),
                        ])]),
                    )
                    .unwrap(),
            )
            .change(
                registry
                    .create("add-column", &pg)
                    .unwrap()
                    .with("table_name", "users")
                    .unwrap()
                    .with(
                        "columns",
                        FieldValue::List(vec![FieldValue::record([
                            ("name", "email"),
                            ("type", "text"),
                        ])]),
                    )
                    .unwrap(),
            )
            .build(&NoResources)
            .unwrap()
    }

    #[test]
    fn test_rollback_runs_in_reverse() {
        let changeset = users_changeset();
        let pg = PostgresDialect::new();
        assert_eq!(
            changeset.generate_statements(&pg).unwrap(),
            vec![
                Statement::new("CREATE TABLE users (id INTEGER PRIMARY KEY)"),
                Statement::new("ALTER TABLE users ADD COLUMN email TEXT"),
            ]
        );
        assert_eq!(
            changeset.generate_rollback_statements(&pg).unwrap(),
            vec![
                Statement::new("ALTER TABLE users DROP COLUMN email"),
                Statement::new("DROP TABLE users"),
            ]
        );
        assert!(changeset.supports_rollback());
    }

    #[test]
    fn test_validate_collects_across_dialects() {
        let pg = PostgresDialect::new();
        let registry = ChangeRegistry::global();
        let changeset = ChangeSetBuilder::new(ChangeSetRef::new("2", "bob", "changelog.json"))
            .change(
                registry
                    .create("drop-not-null-constraint", &pg)
                    .unwrap()
                    .with("table_name", "users")
                    .unwrap()
                    .with("column_name", "email")
                    .unwrap(),
            )
            .build(&NoResources)
            .unwrap();
        let errors = changeset.validate(&[&pg, &MySqlDialect::new(), &SqliteDialect::new()]);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ChangeError::InvalidDefinition { .. }));
        assert!(matches!(errors[1], ChangeError::Unsupported { .. }));
        assert!(errors
            .iter()
            .all(|e| e.identity().and_then(|id| id.change_set.as_deref())
                == Some("changelog.json::2::bob")));
    }

    #[test]
    fn test_setup_failure_aborts_build() {
        let pg = PostgresDialect::new();
        let result = ChangeSetBuilder::new(ChangeSetRef::new("3", "carol", "changelog.json"))
            .change(ChangeRegistry::global().create("drop-table", &pg).unwrap())
            .build(&NoResources);
        assert!(matches!(result, Err(ChangeError::Setup { .. })));
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let changeset = users_changeset();
        let units: Vec<&str> = changeset.units().iter().map(ChangeUnit::fingerprint).collect();
        assert_eq!(changeset.fingerprint(), fingerprint::combine(units.iter().copied()));
        assert_ne!(
            changeset.fingerprint(),
            fingerprint::combine(units.iter().rev().copied())
        );
    }
}

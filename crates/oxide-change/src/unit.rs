//! Change units: configured changes with identity and caches.
//!
//! A [`PendingChange`] wraps a builder while the loader populates fields.
//! Setting it up consumes it and yields a [`ChangeUnit`], which is immutable
//! and can be shared between threads.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::change::{self, Change, ChangeBuilder, ChangeMetadata};
use crate::changeset::ChangeSetRef;
use crate::dialect::Dialect;
use crate::error::{ChangeError, ChangeIdentity, Result};
use crate::fingerprint;
use crate::objects::DatabaseObject;
use crate::portable::{self, PortableNode};
use crate::resource::ResourceResolver;
use crate::rollback;
use crate::statement::Statement;
use crate::value::FieldValue;

/// A change being configured.
#[derive(Debug)]
pub struct PendingChange {
    builder: Box<dyn ChangeBuilder>,
    assigned: Vec<(String, FieldValue)>,
    owner: Option<Arc<ChangeSetRef>>,
}

impl PendingChange {
    /// Wraps a fresh builder.
    #[must_use]
    pub fn new(builder: Box<dyn ChangeBuilder>) -> Self {
        Self {
            builder,
            assigned: Vec::new(),
            owner: None,
        }
    }

    /// Returns the implementation's metadata.
    #[must_use]
    pub fn metadata(&self) -> &'static ChangeMetadata {
        self.builder.metadata()
    }

    /// Sets a declared field. A later value for the same field replaces the
    /// earlier one.
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        self.builder.set(field, value.clone())?;
        match self.assigned.iter_mut().find(|(name, _)| name == field) {
            Some(slot) => slot.1 = value,
            None => self.assigned.push((field.to_string(), value)),
        }
        Ok(())
    }

    /// Sets a declared field, builder style.
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Result<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Records the owning changeset.
    #[must_use]
    pub fn owned_by(mut self, owner: Arc<ChangeSetRef>) -> Self {
        self.owner = Some(owner);
        self
    }

    fn identity(&self) -> ChangeIdentity {
        ChangeIdentity {
            kind: self.metadata().kind.to_string(),
            change_set: self.owner.as_ref().map(ToString::to_string),
            fields: self
                .assigned
                .iter()
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect(),
        }
    }

    /// Runs setup, producing the immutable unit.
    pub fn setup(self, resources: &dyn ResourceResolver) -> Result<ChangeUnit> {
        let identity = self.identity();
        let change = self
            .builder
            .setup(resources)
            .map_err(|e| e.with_identity(&identity))?;
        debug!(kind = %identity.kind, "Change set up");
        Ok(ChangeUnit::new(change, self.owner))
    }
}

/// A frozen change with its owner and derived caches.
#[derive(Debug)]
pub struct ChangeUnit {
    change: Box<dyn Change>,
    owner: Option<Arc<ChangeSetRef>>,
    fingerprint: OnceLock<String>,
    affected: RwLock<HashMap<&'static str, Arc<BTreeSet<DatabaseObject>>>>,
}

impl ChangeUnit {
    /// Wraps a frozen change.
    #[must_use]
    pub fn new(change: Box<dyn Change>, owner: Option<Arc<ChangeSetRef>>) -> Self {
        Self {
            change,
            owner,
            fingerprint: OnceLock::new(),
            affected: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the wrapped change.
    #[must_use]
    pub fn change(&self) -> &dyn Change {
        self.change.as_ref()
    }

    /// Returns the implementation's metadata.
    #[must_use]
    pub fn metadata(&self) -> &'static ChangeMetadata {
        self.change.metadata()
    }

    /// Returns the change kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.metadata().kind
    }

    /// Returns the owning changeset, if any.
    #[must_use]
    pub fn owner(&self) -> Option<&ChangeSetRef> {
        self.owner.as_deref()
    }

    /// Returns the configured fields in declaration order.
    #[must_use]
    pub fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        self.change.declared_fields()
    }

    /// Returns the identity attached to errors from this unit.
    #[must_use]
    pub fn identity(&self) -> ChangeIdentity {
        ChangeIdentity {
            kind: self.kind().to_string(),
            change_set: self.owner.as_ref().map(ToString::to_string),
            fields: self
                .declared_fields()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    fn attach(&self, error: ChangeError) -> ChangeError {
        error.with_identity(&self.identity())
    }

    /// Returns whether the dialect can run this change.
    #[must_use]
    pub fn supports(&self, dialect: &dyn Dialect) -> bool {
        self.change.supports(dialect)
    }

    /// Checks the configuration against a dialect.
    pub fn validate(&self, dialect: &dyn Dialect) -> Result<()> {
        self.change.validate(dialect).map_err(|e| self.attach(e))
    }

    /// Generates the forward statements.
    pub fn generate_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let statements =
            change::generate_statements(self.change(), dialect).map_err(|e| self.attach(e))?;
        debug!(
            kind = self.kind(),
            dialect = dialect.name(),
            statements = statements.len(),
            "Generated statements"
        );
        Ok(statements)
    }

    /// Generates the statements that undo this change.
    pub fn generate_rollback_statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        let statements = rollback::generate_rollback_statements(self.change(), dialect)
            .map_err(|e| self.attach(e))?;
        debug!(
            kind = self.kind(),
            dialect = dialect.name(),
            statements = statements.len(),
            "Generated rollback statements"
        );
        Ok(statements)
    }

    /// Returns whether a rollback exists, without generating it.
    #[must_use]
    pub fn supports_rollback(&self) -> bool {
        self.change.rollback().is_supported()
    }

    /// Returns the configuration fingerprint, computed once.
    pub fn fingerprint(&self) -> &str {
        self.fingerprint.get_or_init(|| {
            let mut fields = self.change.declared_fields();
            fields.extend(self.change.derived_fields());
            fingerprint::fingerprint(self.kind(), &fields)
        })
    }

    /// Returns the objects this change touches on a dialect, computed once
    /// per dialect.
    pub fn affected_objects(&self, dialect: &dyn Dialect) -> Arc<BTreeSet<DatabaseObject>> {
        if let Some(cached) = self.affected.read().get(dialect.name()) {
            return Arc::clone(cached);
        }
        let computed = Arc::new(self.change.affected_objects(dialect));
        Arc::clone(
            self.affected
                .write()
                .entry(dialect.name())
                .or_insert(computed),
        )
    }

    /// Returns a message describing the effect of the change.
    #[must_use]
    pub fn confirmation_message(&self) -> String {
        self.change.confirmation_message()
    }

    /// Encodes the configuration in portable form.
    #[must_use]
    pub fn to_portable(&self) -> PortableNode {
        portable::encode(self.metadata(), &self.declared_fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqliteDialect};
    use crate::registry::ChangeRegistry;
    use crate::resource::NoResources;

    fn owner() -> Arc<ChangeSetRef> {
        Arc::new(ChangeSetRef::new("1", "alice", "db/changelog.json"))
    }

    #[test]
    fn test_setup_error_carries_identity() {
        let pg = PostgresDialect::new();
        let err = ChangeRegistry::global()
            .create("add-column", &pg)
            .unwrap()
            .with("table_name", "users")
            .unwrap()
            .owned_by(owner())
            .setup(&NoResources)
            .unwrap_err();
        let identity = err.identity().unwrap();
        assert_eq!(identity.kind, "add-column");
        assert_eq!(identity.change_set.as_deref(), Some("db/changelog.json::1::alice"));
        assert_eq!(identity.fields, vec![("table_name".to_string(), "users".to_string())]);
    }

    #[test]
    fn test_unsupported_carries_identity() {
        let pg = PostgresDialect::new();
        let unit = ChangeRegistry::global()
            .create("modify-data-type", &pg)
            .unwrap()
            .with("table_name", "users")
            .unwrap()
            .with("column_name", "age")
            .unwrap()
            .with("new_data_type", "bigint")
            .unwrap()
            .setup(&NoResources)
            .unwrap();
        let err = unit.generate_statements(&SqliteDialect::new()).unwrap_err();
        assert!(matches!(err, ChangeError::Unsupported { .. }));
        assert_eq!(err.identity().map(|id| id.kind.as_str()), Some("modify-data-type"));
    }

    #[test]
    fn test_fingerprint_and_objects_are_cached() {
        let pg = PostgresDialect::new();
        let unit = ChangeRegistry::global()
            .create("drop-table", &pg)
            .unwrap()
            .with("table_name", "users")
            .unwrap()
            .setup(&NoResources)
            .unwrap();
        let first = unit.fingerprint().to_string();
        assert_eq!(unit.fingerprint(), first);
        let objects = unit.affected_objects(&pg);
        assert!(Arc::ptr_eq(&objects, &unit.affected_objects(&pg)));
    }

    #[test]
    fn test_later_set_replaces_earlier() {
        let pg = PostgresDialect::new();
        let unit = ChangeRegistry::global()
            .create("drop-table", &pg)
            .unwrap()
            .with("table_name", "users")
            .unwrap()
            .with("table_name", "accounts")
            .unwrap()
            .setup(&NoResources)
            .unwrap();
        assert_eq!(
            unit.declared_fields(),
            vec![("table_name", FieldValue::from("accounts"))]
        );
    }
}

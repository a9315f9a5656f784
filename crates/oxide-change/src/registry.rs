//! Change registry and factory.
//!
//! The registry maps a change kind to the implementations registered for
//! it. Resolution for a dialect keeps the implementations whose static
//! capability declaration targets that dialect and picks the one with the
//! highest specialization level.
//!
//! Registration is append-only. Writers are serialized and publish a new
//! immutable snapshot; readers clone the current snapshot and resolve
//! without holding a lock.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::change::{builtin_descriptors, ChangeBuilder, ChangeMetadata};
use crate::dialect::Dialect;
use crate::error::{ChangeError, Result};
use crate::portable::{self, PortableNode};
use crate::unit::PendingChange;

/// Creates a fresh builder for one change implementation.
pub type BuilderFactory = fn() -> Box<dyn ChangeBuilder>;

/// Registration record of a change implementation.
#[derive(Debug, Clone, Copy)]
pub struct ChangeDescriptor {
    /// Kind, level and field schema.
    pub metadata: &'static ChangeMetadata,
    /// Dialects the implementation is written for; `None` means any dialect
    /// that supports the kind.
    pub dialects: Option<&'static [&'static str]>,
    /// Builder factory.
    pub factory: BuilderFactory,
}

impl ChangeDescriptor {
    /// Describes an implementation usable on every dialect.
    #[must_use]
    pub const fn portable(metadata: &'static ChangeMetadata, factory: BuilderFactory) -> Self {
        Self {
            metadata,
            dialects: None,
            factory,
        }
    }

    /// Describes an implementation written for specific dialects.
    #[must_use]
    pub const fn for_dialects(
        metadata: &'static ChangeMetadata,
        dialects: &'static [&'static str],
        factory: BuilderFactory,
    ) -> Self {
        Self {
            metadata,
            dialects: Some(dialects),
            factory,
        }
    }

    /// Returns whether this implementation can serve the dialect.
    #[must_use]
    pub fn targets(&self, dialect: &dyn Dialect) -> bool {
        dialect.supports(self.metadata.kind)
            && self
                .dialects
                .map_or(true, |names| names.contains(&dialect.name()))
    }

    fn overlaps(&self, other: &Self) -> bool {
        match (self.dialects, other.dialects) {
            (Some(mine), Some(theirs)) => mine.iter().any(|name| theirs.contains(name)),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    by_kind: BTreeMap<&'static str, Vec<ChangeDescriptor>>,
}

/// Registry of change implementations.
#[derive(Debug, Default)]
pub struct ChangeRegistry {
    writer: Mutex<()>,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl ChangeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in catalog.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for descriptor in builtin_descriptors() {
            if let Err(e) = registry.register(descriptor) {
                warn!(error = %e, "Skipping built-in change");
            }
        }
        registry
    }

    /// Returns the process-wide registry, populated with the built-in
    /// catalog on first use.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<ChangeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::with_builtins)
    }

    /// Registers an implementation.
    ///
    /// Fails with [`ChangeError::DuplicateRegistration`] when an
    /// implementation of the same kind and level already targets one of the
    /// same dialects.
    pub fn register(&self, descriptor: ChangeDescriptor) -> Result<()> {
        let _writer = self.writer.lock();
        let current = self.current();

        let kind = descriptor.metadata.kind;
        let level = descriptor.metadata.specialization_level;
        let clash = current.by_kind.get(kind).is_some_and(|existing| {
            existing
                .iter()
                .any(|d| d.metadata.specialization_level == level && d.overlaps(&descriptor))
        });
        if clash {
            return Err(ChangeError::DuplicateRegistration {
                kind: kind.to_string(),
                level,
            });
        }

        let mut next = Snapshot::clone(&current);
        next.by_kind.entry(kind).or_default().push(descriptor);
        *self.snapshot.write() = Arc::new(next);

        debug!(kind = kind, level = level, "Registered change implementation");
        Ok(())
    }

    fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Resolves the implementation to use for a kind on a dialect.
    ///
    /// Fails with [`ChangeError::UnknownKind`] when nothing is registered
    /// under the kind and with [`ChangeError::Unsupported`] when no
    /// registered implementation targets the dialect.
    pub fn resolve(&self, kind: &str, dialect: &dyn Dialect) -> Result<ChangeDescriptor> {
        let snapshot = self.current();
        let candidates = snapshot
            .by_kind
            .get(kind)
            .ok_or_else(|| ChangeError::UnknownKind(kind.to_string()))?;
        candidates
            .iter()
            .filter(|d| d.targets(dialect))
            .max_by_key(|d| d.metadata.specialization_level)
            .copied()
            .ok_or_else(|| ChangeError::unsupported(kind, dialect.name()))
    }

    /// Creates an unconfigured change of the given kind for a dialect.
    pub fn create(&self, kind: &str, dialect: &dyn Dialect) -> Result<PendingChange> {
        let descriptor = self.resolve(kind, dialect)?;
        debug!(
            kind = kind,
            dialect = dialect.name(),
            level = descriptor.metadata.specialization_level,
            "Creating change"
        );
        Ok(PendingChange::new((descriptor.factory)()))
    }

    /// Returns the registered kinds, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.current().by_kind.keys().copied().collect()
    }

    /// Returns every registered implementation, sorted by kind then level.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ChangeDescriptor> {
        let snapshot = self.current();
        let mut all: Vec<ChangeDescriptor> = snapshot.by_kind.values().flatten().copied().collect();
        all.sort_by_key(|d| (d.metadata.kind, d.metadata.specialization_level));
        all
    }

    /// Rebuilds a configured change from its portable form.
    ///
    /// The result still has to be set up, so an owner and a resource
    /// resolver can be attached by the caller.
    pub fn reconstruct(&self, node: &PortableNode, dialect: &dyn Dialect) -> Result<PendingChange> {
        let mut pending = self.create(&node.tag, dialect)?;
        for (field, value) in portable::decode(pending.metadata(), node)? {
            pending.set(&field, value)?;
        }
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{FieldSpec, SPECIALIZATION_LEVEL_DATABASE_SPECIFIC};
    use crate::dialect::{MySqlDialect, PostgresDialect, SqliteDialect};

    static PG_ADD_COLUMN: ChangeMetadata = ChangeMetadata {
        kind: "add-column",
        description: "Postgres add-column",
        specialization_level: SPECIALIZATION_LEVEL_DATABASE_SPECIFIC,
        fields: &[FieldSpec::scalar("table_name", "Table").required()],
    };

    fn pg_factory() -> Box<dyn ChangeBuilder> {
        let mut descriptors = builtin_descriptors();
        descriptors.retain(|d| d.metadata.kind == "add-column");
        (descriptors[0].factory)()
    }

    #[test]
    fn test_builtins_register_without_conflicts() {
        let registry = ChangeRegistry::new();
        for descriptor in builtin_descriptors() {
            registry.register(descriptor).unwrap();
        }
        assert!(registry.kinds().contains(&"add-column"));
        assert!(registry.kinds().contains(&"sql-file"));
    }

    #[test]
    fn test_highest_level_wins() {
        let registry = ChangeRegistry::with_builtins();
        let pg = PostgresDialect::new();
        assert_eq!(
            registry.resolve("add-column", &pg).unwrap().metadata.specialization_level,
            1
        );

        registry
            .register(ChangeDescriptor::for_dialects(
                &PG_ADD_COLUMN,
                &["postgresql"],
                pg_factory,
            ))
            .unwrap();
        assert_eq!(
            registry.resolve("add-column", &pg).unwrap().metadata.specialization_level,
            5
        );
        // Other dialects keep the portable implementation.
        assert_eq!(
            registry
                .resolve("add-column", &MySqlDialect::new())
                .unwrap()
                .metadata
                .specialization_level,
            1
        );
    }

    #[test]
    fn test_mysql_specializations() {
        let registry = ChangeRegistry::with_builtins();
        let mysql = MySqlDialect::new();
        let pg = PostgresDialect::new();
        for kind in ["rename-table", "rename-column"] {
            assert_eq!(registry.resolve(kind, &mysql).unwrap().metadata.specialization_level, 5);
            assert_eq!(registry.resolve(kind, &pg).unwrap().metadata.specialization_level, 1);
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = ChangeRegistry::with_builtins();
        let descriptor = ChangeDescriptor::for_dialects(&PG_ADD_COLUMN, &["postgresql"], pg_factory);
        registry.register(descriptor).unwrap();
        assert!(matches!(
            registry.register(descriptor),
            Err(ChangeError::DuplicateRegistration { level: 5, .. })
        ));
        // Same level for a disjoint dialect is fine.
        registry
            .register(ChangeDescriptor::for_dialects(&PG_ADD_COLUMN, &["sqlite"], pg_factory))
            .unwrap();
    }

    #[test]
    fn test_unknown_and_unsupported() {
        let registry = ChangeRegistry::with_builtins();
        assert!(matches!(
            registry.resolve("frobnicate", &PostgresDialect::new()),
            Err(ChangeError::UnknownKind(_))
        ));
        assert!(matches!(
            registry.resolve("modify-data-type", &SqliteDialect::new()),
            Err(ChangeError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_concurrent_lookups_during_registration() {
        let registry = Arc::new(ChangeRegistry::with_builtins());
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let descriptor = registry
                            .resolve("add-column", &PostgresDialect::new())
                            .unwrap();
                        assert_eq!(descriptor.metadata.kind, "add-column");
                    }
                })
            })
            .collect();
        registry
            .register(ChangeDescriptor::for_dialects(
                &PG_ADD_COLUMN,
                &["postgresql"],
                pg_factory,
            ))
            .unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(
            registry
                .resolve("add-column", &PostgresDialect::new())
                .unwrap()
                .metadata
                .specialization_level,
            5
        );
    }
}

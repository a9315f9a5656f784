//! Rollback strategy resolution.
//!
//! A change declares how it is undone with a [`Rollback`] descriptor. Most
//! schema changes are undone by another change (`add-column` by
//! `drop-column`), so they return [`Rollback::Inverse`] and the inverse
//! changes generate the rollback SQL themselves. Kinds whose rollback cannot
//! be expressed as another change write the statements directly and return
//! [`Rollback::Explicit`].

use tracing::debug;

use crate::change::{generate_statements, Change};
use crate::dialect::Dialect;
use crate::error::{ChangeError, Result};
use crate::statement::Statement;

/// How a change is rolled back.
#[derive(Debug)]
pub enum Rollback {
    /// No rollback exists for this configuration.
    Impossible(String),
    /// The change generates its own rollback statements.
    Explicit,
    /// The rollback is the concatenated forward statements of these changes,
    /// in order.
    Inverse(Vec<Box<dyn Change>>),
}

impl Rollback {
    /// Creates an impossible rollback with a reason.
    pub fn impossible(reason: impl Into<String>) -> Self {
        Self::Impossible(reason.into())
    }

    /// Creates an inverse rollback from a single change.
    pub fn inverse(change: impl Change + 'static) -> Self {
        Self::Inverse(vec![Box::new(change)])
    }

    /// Returns whether a rollback exists.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Impossible(_))
    }
}

/// Generates the statements that undo a change.
///
/// For inverse rollbacks every child is validated and generated against the
/// same dialect; the first failure is returned unchanged.
pub fn generate_rollback_statements(
    change: &dyn Change,
    dialect: &dyn Dialect,
) -> Result<Vec<Statement>> {
    if !change.supports(dialect) {
        return Err(ChangeError::unsupported(
            change.metadata().kind,
            dialect.name(),
        ));
    }

    match change.rollback() {
        Rollback::Impossible(reason) => Err(ChangeError::rollback_impossible(reason)),
        Rollback::Explicit => change.build_rollback_statements(dialect),
        Rollback::Inverse(inverses) => {
            let mut statements = Vec::new();
            for inverse in &inverses {
                debug!(
                    kind = change.metadata().kind,
                    inverse = inverse.metadata().kind,
                    "Generating inverse"
                );
                inverse.validate(dialect)?;
                statements.extend(generate_statements(inverse.as_ref(), dialect)?);
            }
            Ok(statements)
        }
    }
}

//! Error types for the change core.

use std::fmt;

/// Identity of the change unit an error originated from.
///
/// Attached to lifecycle errors so a report can point at the exact
/// declaration: its kind, the changeset that owns it, and the fields it was
/// configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeIdentity {
    /// Change kind (e.g. `add-column`).
    pub kind: String,
    /// Owning changeset, rendered as `origin::id::author`.
    pub change_set: Option<String>,
    /// Declared fields, rendered as text.
    pub fields: Vec<(String, String)>,
}

impl fmt::Display for ChangeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.kind)?;
        if let Some(ref change_set) = self.change_set {
            write!(f, " in changeset '{change_set}'")?;
        }
        if !self.fields.is_empty() {
            let fields: Vec<String> = self
                .fields
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            write!(f, " ({})", fields.join(", "))?;
        }
        Ok(())
    }
}

fn origin(identity: &Option<Box<ChangeIdentity>>) -> String {
    identity
        .as_ref()
        .map(|id| format!(" for change {id}"))
        .unwrap_or_default()
}

/// Errors that can occur while building, validating or generating changes.
#[derive(Debug, thiserror::Error)]
pub enum ChangeError {
    /// Configuration is missing or internally inconsistent. Fatal to the
    /// owning changeset.
    #[error("Setup failed{}: {reason}", origin(.identity))]
    Setup {
        /// What is wrong with the configuration.
        reason: String,
        /// Originating change.
        identity: Option<Box<ChangeIdentity>>,
    },

    /// The configuration is not legal for a particular dialect.
    #[error("Invalid definition on '{dialect}'{}: {reason}", origin(.identity))]
    InvalidDefinition {
        /// Dialect the check ran against.
        dialect: String,
        /// Human-readable reason.
        reason: String,
        /// Originating change.
        identity: Option<Box<ChangeIdentity>>,
    },

    /// The dialect cannot express this change kind.
    #[error("Change '{kind}' is not supported on '{dialect}'{}", origin(.identity))]
    Unsupported {
        /// Change kind.
        kind: String,
        /// Dialect name.
        dialect: String,
        /// Originating change.
        identity: Option<Box<ChangeIdentity>>,
    },

    /// The change can never be rolled back with its current configuration.
    #[error("Rollback is impossible{}: {reason}", origin(.identity))]
    RollbackImpossible {
        /// Why no inverse exists.
        reason: String,
        /// Originating change.
        identity: Option<Box<ChangeIdentity>>,
    },

    /// No implementation is registered under this kind.
    #[error("Unknown change kind '{0}'")]
    UnknownKind(String),

    /// The kind does not declare this field.
    #[error("Change '{kind}' has no field '{field}'")]
    UnknownField {
        /// Change kind.
        kind: String,
        /// Offending field name.
        field: String,
    },

    /// A field was given a value of the wrong shape.
    #[error("Invalid value for field '{field}' of change '{kind}': expected {expected}")]
    InvalidFieldValue {
        /// Change kind.
        kind: String,
        /// Field name.
        field: String,
        /// Description of the accepted values.
        expected: String,
    },

    /// Two implementations claim the same kind and level for overlapping
    /// dialects.
    #[error("Change '{kind}' is already registered at specialization level {level}")]
    DuplicateRegistration {
        /// Change kind.
        kind: String,
        /// Specialization level.
        level: u32,
    },

    /// IO error (reading auxiliary files or changeset documents).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChangeError {
    /// Creates a setup error.
    pub fn setup(reason: impl Into<String>) -> Self {
        Self::Setup {
            reason: reason.into(),
            identity: None,
        }
    }

    /// Creates an invalid definition error for a dialect.
    pub fn invalid(dialect: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            dialect: dialect.into(),
            reason: reason.into(),
            identity: None,
        }
    }

    /// Creates an unsupported error.
    pub fn unsupported(kind: impl Into<String>, dialect: impl Into<String>) -> Self {
        Self::Unsupported {
            kind: kind.into(),
            dialect: dialect.into(),
            identity: None,
        }
    }

    /// Creates a rollback impossible error.
    pub fn rollback_impossible(reason: impl Into<String>) -> Self {
        Self::RollbackImpossible {
            reason: reason.into(),
            identity: None,
        }
    }

    /// Returns the originating change, if attached.
    #[must_use]
    pub fn identity(&self) -> Option<&ChangeIdentity> {
        match self {
            Self::Setup { identity, .. }
            | Self::InvalidDefinition { identity, .. }
            | Self::Unsupported { identity, .. }
            | Self::RollbackImpossible { identity, .. } => identity.as_deref(),
            _ => None,
        }
    }

    /// Attaches the originating change unless one is already attached.
    ///
    /// Errors raised by inverse children keep the identity of the child.
    #[must_use]
    pub fn with_identity(mut self, change: &ChangeIdentity) -> Self {
        match &mut self {
            Self::Setup { identity, .. }
            | Self::InvalidDefinition { identity, .. }
            | Self::Unsupported { identity, .. }
            | Self::RollbackImpossible { identity, .. } => {
                if identity.is_none() {
                    *identity = Some(Box::new(change.clone()));
                }
            }
            _ => {}
        }
        self
    }
}

/// Result type for change operations.
pub type Result<T> = std::result::Result<T, ChangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ChangeIdentity {
        ChangeIdentity {
            kind: "add-column".to_string(),
            change_set: Some("db/changelog.json::1::alice".to_string()),
            fields: vec![("table_name".to_string(), "users".to_string())],
        }
    }

    #[test]
    fn test_identity_is_rendered_in_message() {
        let err = ChangeError::setup("missing 'columns'").with_identity(&identity());
        let message = err.to_string();
        assert!(message.contains("'add-column'"));
        assert!(message.contains("db/changelog.json::1::alice"));
        assert!(message.contains("table_name=users"));
        assert!(message.ends_with("missing 'columns'"));
    }

    #[test]
    fn test_with_identity_keeps_first() {
        let child = ChangeIdentity {
            kind: "drop-column".to_string(),
            change_set: None,
            fields: Vec::new(),
        };
        let err = ChangeError::unsupported("drop-column", "sqlite")
            .with_identity(&child)
            .with_identity(&identity());
        assert_eq!(err.identity().map(|id| id.kind.as_str()), Some("drop-column"));
    }

    #[test]
    fn test_loader_errors_have_no_identity() {
        let err = ChangeError::UnknownKind("frobnicate".to_string()).with_identity(&identity());
        assert!(err.identity().is_none());
        assert_eq!(err.to_string(), "Unknown change kind 'frobnicate'");
    }
}

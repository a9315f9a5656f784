//! Dialect-aware, reversible schema change units.
//!
//! `oxide-change` is the change core of a migration engine. A change unit is
//! one declared schema or data modification (add a column, create an index,
//! run a SQL script, ...) that:
//!
//! - is configured through a typed builder and frozen by `setup`,
//! - validates itself against a target dialect,
//! - generates forward SQL and, where possible, the SQL that undoes it,
//! - has a stable fingerprint of its configuration,
//! - reports the database objects it touches, and
//! - round-trips through a portable, serializable form.
//!
//! # Architecture
//!
//! - **Change catalog** - Built-in kinds like `create-table`, `add-column`,
//!   `sql-file` ([`change`]).
//! - **Registry** - Resolves a kind to the most specialized implementation
//!   for a dialect ([`registry`]).
//! - **Units and changesets** - Configured changes with identity and caches
//!   ([`unit`], [`changeset`]).
//! - **Rollback** - Explicit, inverse or impossible ([`rollback`]).
//! - **Dialect** - Database-specific SQL fragments ([`dialect`]).
//!
//! # Example
//!
//! ```rust
//! use oxide_change::prelude::*;
//!
//! let pg = PostgresDialect::new();
//! let unit = ChangeRegistry::global()
//!     .create("add-column", &pg)?
//!     .with("table_name", "users")?
//!     .with(
//!         "columns",
//!         FieldValue::List(vec![FieldValue::record([
//!             ("name", "email"),
//!             ("type", "text"),
//!         ])]),
//!     )?
//!     .setup(&NoResources)?;
//!
//! let forward = unit.generate_statements(&pg)?;
//! assert_eq!(forward[0].sql(), "ALTER TABLE users ADD COLUMN email TEXT");
//!
//! let rollback = unit.generate_rollback_statements(&pg)?;
//! assert_eq!(rollback[0].sql(), "ALTER TABLE users DROP COLUMN email");
//! # Ok::<(), oxide_change::error::ChangeError>(())
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the SQL of a changeset file
//! oxide-change --dialect postgresql sql changeset.json
//!
//! # Print its rollback
//! oxide-change sql changeset.json --rollback
//!
//! # Check it against several databases
//! oxide-change validate changeset.json --target postgresql --target sqlite
//! ```

pub mod change;
pub mod changeset;
pub mod dialect;
pub mod error;
pub mod fingerprint;
pub mod objects;
pub mod portable;
pub mod registry;
pub mod resource;
pub mod rollback;
pub mod statement;
pub mod types;
pub mod unit;
pub mod value;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::change::{Change, ChangeBuilder, ChangeMetadata, FieldShape, FieldSpec};
    pub use crate::changeset::{ChangeSet, ChangeSetBuilder, ChangeSetRef};
    pub use crate::dialect::{Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
    pub use crate::error::{ChangeError, ChangeIdentity, Result};
    pub use crate::objects::{DatabaseObject, QualifiedName};
    pub use crate::portable::{ChangeSetDocument, PortableNode};
    pub use crate::registry::{ChangeDescriptor, ChangeRegistry};
    pub use crate::resource::{FsResourceResolver, NoResources, ResourceResolver};
    pub use crate::rollback::Rollback;
    pub use crate::statement::Statement;
    pub use crate::types::{ColumnConfig, DataType};
    pub use crate::unit::{ChangeUnit, PendingChange};
    pub use crate::value::FieldValue;
}

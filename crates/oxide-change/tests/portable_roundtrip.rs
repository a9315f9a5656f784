//! Integration tests for the portable form: every registered
//! implementation must survive encode, serialize and reconstruct.

mod common;

use std::fs;

use common::{configure, sample_fields};
use oxide_change::dialect;
use oxide_change::prelude::*;
use tempfile::TempDir;

fn resources() -> (TempDir, FsResourceResolver) {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("up.sql"),
        "-- audit trail\nCREATE TABLE audit (id INTEGER);\nINSERT INTO audit VALUES (1);\n",
    )
    .unwrap();
    let resolver = FsResourceResolver::new(dir.path());
    (dir, resolver)
}

fn dialect_for(descriptor: &ChangeDescriptor) -> Box<dyn Dialect> {
    let name = descriptor
        .dialects
        .and_then(|names| names.first().copied())
        .unwrap_or("postgresql");
    dialect::by_name(name).unwrap()
}

#[test]
fn test_every_kind_round_trips() {
    let (_dir, resources) = resources();
    let registry = ChangeRegistry::global();

    for descriptor in registry.descriptors() {
        let kind = descriptor.metadata.kind;
        let dialect = dialect_for(&descriptor);
        let original = configure(
            PendingChange::new((descriptor.factory)()),
            &sample_fields(kind),
        )
        .setup(&resources)
        .unwrap_or_else(|e| panic!("{kind}: {e}"));

        let node = original.to_portable();
        assert_eq!(node.tag, kind);
        let json = serde_json::to_string(&node).unwrap();
        let decoded: PortableNode = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, node, "{kind}");

        let rebuilt = registry
            .reconstruct(&decoded, dialect.as_ref())
            .and_then(|pending| pending.setup(&resources))
            .unwrap_or_else(|e| panic!("{kind}: {e}"));

        assert_eq!(
            rebuilt.metadata().specialization_level,
            descriptor.metadata.specialization_level,
            "{kind}"
        );
        assert_eq!(rebuilt.declared_fields(), original.declared_fields(), "{kind}");
        assert_eq!(rebuilt.fingerprint(), original.fingerprint(), "{kind}");
    }
}

#[test]
fn test_nested_columns_become_children() {
    let pg = PostgresDialect::new();
    let unit = common::unit("create-table", &pg, &sample_fields("create-table"));
    let node = unit.to_portable();
    assert_eq!(node.children.len(), 2);
    assert!(node.children.iter().all(|child| child.tag == "column"));
    assert_eq!(node.attributes.get("table_name"), Some(&FieldValue::from("users")));
    assert!(!node.attributes.contains_key("columns"));
    assert!(node.to_markup().starts_with("<create-table "));
}

#[test]
fn test_reconstruct_rejects_malformed_nodes() {
    let pg = PostgresDialect::new();
    let registry = ChangeRegistry::global();

    let unknown_kind = PortableNode::new("rename-universe");
    assert!(matches!(
        registry.reconstruct(&unknown_kind, &pg),
        Err(ChangeError::UnknownKind(_))
    ));

    let bad_shape = PortableNode::new("drop-table")
        .attribute("table_name", "users")
        .attribute("cascade_constraints", "sometimes");
    assert!(matches!(
        registry.reconstruct(&bad_shape, &pg),
        Err(ChangeError::InvalidFieldValue { .. })
    ));
}

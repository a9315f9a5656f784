//! Portable form of configured changes.
//!
//! A change is encoded as a tree of nodes: the root tag is the change kind,
//! scalar fields become attributes and nested declarations become child
//! nodes. The encoding is driven by the kind's field schema, so it is
//! lossless for every registered kind.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::change::{ChangeMetadata, FieldShape};
use crate::changeset::{ChangeSet, ChangeSetBuilder, ChangeSetRef};
use crate::dialect::Dialect;
use crate::error::{ChangeError, Result};
use crate::registry::ChangeRegistry;
use crate::resource::ResourceResolver;
use crate::value::FieldValue;

/// Attribute used for nested items that are not records.
const VALUE_ATTRIBUTE: &str = "value";

/// A node of the portable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableNode {
    /// Change kind for a root node, element tag for a child.
    pub tag: String,
    /// Scalar fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, FieldValue>,
    /// Nested declarations, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PortableNode>,
}

impl PortableNode {
    /// Creates an empty node.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Adds an attribute, builder style.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Adds a child node, builder style.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Renders the node as markup, one element per node.
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out, 0);
        out
    }

    fn write_markup(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}<{}", self.tag);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {name}=\"{}\"", escape_attribute(&value.to_string()));
        }
        if self.children.is_empty() {
            out.push_str("/>\n");
            return;
        }
        out.push_str(">\n");
        for child in &self.children {
            child.write_markup(out, depth + 1);
        }
        let _ = writeln!(out, "{indent}</{}>", self.tag);
    }
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Encodes declared fields as a portable node rooted at the kind.
#[must_use]
pub fn encode(metadata: &ChangeMetadata, fields: &[(&'static str, FieldValue)]) -> PortableNode {
    let mut node = PortableNode::new(metadata.kind);
    for (name, value) in fields {
        let element = match metadata.field(name).map(|spec| spec.shape) {
            Some(FieldShape::Nested { element }) => element,
            _ => {
                node.attributes.insert((*name).to_string(), value.clone());
                continue;
            }
        };
        let FieldValue::List(items) = value else {
            node.attributes.insert((*name).to_string(), value.clone());
            continue;
        };
        for item in items {
            let mut child = PortableNode::new(element);
            match item {
                FieldValue::Map(entries) => child.attributes = entries.clone(),
                other => {
                    child.attributes.insert(VALUE_ATTRIBUTE.to_string(), other.clone());
                }
            }
            node.children.push(child);
        }
    }
    node
}

/// Decodes a portable node into declared fields, following the field schema
/// of `metadata`.
///
/// Fields come back in schema order. The node's tag is not checked; the
/// caller resolved `metadata` from it.
pub fn decode(metadata: &ChangeMetadata, node: &PortableNode) -> Result<Vec<(String, FieldValue)>> {
    let unknown = |field: &str| ChangeError::UnknownField {
        kind: metadata.kind.to_string(),
        field: field.to_string(),
    };

    for name in node.attributes.keys() {
        match metadata.field(name) {
            None => return Err(unknown(name)),
            Some(spec) if spec.shape != FieldShape::Scalar => {
                return Err(ChangeError::InvalidFieldValue {
                    kind: metadata.kind.to_string(),
                    field: name.clone(),
                    expected: "child nodes, not an attribute".to_string(),
                });
            }
            Some(_) => {}
        }
    }

    let mut nested: BTreeMap<&'static str, Vec<FieldValue>> = BTreeMap::new();
    for child in &node.children {
        let spec = metadata
            .fields
            .iter()
            .find(|spec| matches!(spec.shape, FieldShape::Nested { element } if element == child.tag))
            .ok_or_else(|| unknown(&child.tag))?;
        if !child.children.is_empty() {
            return Err(ChangeError::InvalidFieldValue {
                kind: metadata.kind.to_string(),
                field: spec.name.to_string(),
                expected: format!("'{}' nodes without children", child.tag),
            });
        }
        nested
            .entry(spec.name)
            .or_default()
            .push(FieldValue::Map(child.attributes.clone()));
    }

    let mut fields = Vec::new();
    for spec in metadata.fields {
        if let Some(value) = node.attributes.get(spec.name) {
            fields.push((spec.name.to_string(), value.clone()));
        } else if let Some(items) = nested.remove(spec.name) {
            fields.push((spec.name.to_string(), FieldValue::List(items)));
        }
    }
    Ok(fields)
}

/// A changeset in portable form, as stored in changeset files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSetDocument {
    /// Changeset id.
    pub id: String,
    /// Author.
    pub author: String,
    /// Changes, in order.
    #[serde(default)]
    pub changes: Vec<PortableNode>,
}

impl ChangeSetDocument {
    /// Parses a document from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the document as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a document from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let document = Self::from_json(&json)?;
        debug!(
            path = %path.display(),
            id = %document.id,
            changes = document.changes.len(),
            "Loaded changeset document"
        );
        Ok(document)
    }

    /// Reconstructs and sets up every change for `dialect`.
    ///
    /// `origin` names the declaring file in error reports and changeset
    /// identities.
    pub fn build(
        &self,
        registry: &ChangeRegistry,
        dialect: &dyn Dialect,
        origin: &str,
        resources: &dyn ResourceResolver,
    ) -> Result<ChangeSet> {
        let mut builder =
            ChangeSetBuilder::new(ChangeSetRef::new(&self.id, &self.author, origin));
        for node in &self.changes {
            builder.add(registry.reconstruct(node, dialect)?);
        }
        builder.build(resources)
    }
}

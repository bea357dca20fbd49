//! Concept: the discrete, attributed input fact.
//!
//! A concept carries string attributes (encoded), typed relationships to
//! other concepts (encoded), and opaque metadata (carried for audit, never
//! encoded). Immutable once constructed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A typed link from one concept to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship type, matched against role names during encoding.
    pub rel_type: String,
    /// Name of the target concept.
    pub target: String,
}

/// A discrete, attributed fact to be encoded into a glyph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Concept {
    name: String,
    attributes: BTreeMap<String, String>,
    relationships: Vec<Relationship>,
    metadata: BTreeMap<String, String>,
}

impl Concept {
    /// Create a concept with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            relationships: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Add a relationship. Relationships keep their declaration order.
    pub fn with_relationship(
        mut self,
        rel_type: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.relationships.push(Relationship {
            rel_type: rel_type.into(),
            target: target.into(),
        });
        self
    }

    /// Attach audit metadata. Metadata is never encoded.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Resolve the value a role encodes for this concept.
    ///
    /// Attributes take precedence; otherwise relationships whose type equals
    /// the role name contribute their targets in declaration order. Metadata
    /// is never consulted.
    pub(crate) fn value_for_role(&self, role_name: &str) -> Option<String> {
        if let Some(value) = self.attributes.get(role_name) {
            return Some(value.clone());
        }

        let targets: Vec<&str> = self
            .relationships
            .iter()
            .filter(|r| r.rel_type == role_name)
            .map(|r| r.target.as_str())
            .collect();

        if targets.is_empty() {
            None
        } else {
            Some(targets.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup() {
        let c = Concept::new("red car")
            .with_attribute("type", "car")
            .with_attribute("color", "red");

        assert_eq!(c.value_for_role("color").as_deref(), Some("red"));
        assert_eq!(c.value_for_role("weight"), None);
    }

    #[test]
    fn test_relationship_lookup() {
        let c = Concept::new("neural network")
            .with_relationship("part_of", "deep learning")
            .with_relationship("part_of", "machine learning");

        assert_eq!(
            c.value_for_role("part_of").as_deref(),
            Some("deep learning machine learning")
        );
    }

    #[test]
    fn test_attribute_shadows_relationship() {
        let c = Concept::new("x")
            .with_attribute("kind", "attr")
            .with_relationship("kind", "rel");

        assert_eq!(c.value_for_role("kind").as_deref(), Some("attr"));
    }

    #[test]
    fn test_metadata_not_a_role_source() {
        let c = Concept::new("x").with_metadata("source", "Policy Manual v2");
        assert_eq!(c.value_for_role("source"), None);
    }
}

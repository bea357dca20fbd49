//! Fact trees: hierarchical explanations of a similarity score.
//!
//! A fact tree mirrors the encoder schema and records, per level, the
//! sub-score, the weight it carried in the parent aggregate, and, for
//! contributing roles, the citation recorded on the matched concept.
//! Nodes below a level that failed the visibility threshold carry no
//! citation detail.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provenance of an approved fact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    pub approved_by: Option<String>,
    pub approved_date: Option<String>,
}

impl Citation {
    /// Lift a citation from concept audit metadata.
    ///
    /// Requires a `source` entry; `approved_by` / `approved_date` are
    /// optional.
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Option<Self> {
        let source = metadata.get("source")?.clone();
        Some(Self {
            source,
            approved_by: metadata.get("approved_by").cloned(),
            approved_date: metadata.get("approved_date").cloned(),
        })
    }
}

/// Which level of the glyph hierarchy a fact node explains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactLevel {
    Cortex,
    Layer,
    Segment,
    Role,
}

/// One node of a fact tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FactNode {
    pub level: FactLevel,
    pub name: String,
    /// Similarity sub-score at this level.
    pub score: f64,
    /// Renormalized weight this node carried in its parent's aggregate.
    pub weight: f64,
    /// Whether this node cleared the visibility threshold.
    pub visible: bool,
    pub citation: Option<Citation>,
    pub children: Vec<FactNode>,
}

impl FactNode {
    /// Depth-first count of nodes in this subtree, including self.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(FactNode::node_count).sum::<usize>()
    }
}

/// A complete explanation tree rooted at the cortex comparison.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FactTree {
    root: FactNode,
}

impl FactTree {
    pub fn new(root: FactNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &FactNode {
        &self.root
    }

    /// Find a node by name anywhere in the tree.
    pub fn find(&self, name: &str) -> Option<&FactNode> {
        fn walk<'a>(node: &'a FactNode, name: &str) -> Option<&'a FactNode> {
            if node.name == name {
                return Some(node);
            }
            node.children.iter().find_map(|c| walk(c, name))
        }
        walk(&self.root, name)
    }

    /// All citations attached anywhere in the tree, in depth-first order.
    pub fn citations(&self) -> Vec<&Citation> {
        fn walk<'a>(node: &'a FactNode, out: &mut Vec<&'a Citation>) {
            if let Some(citation) = &node.citation {
                out.push(citation);
            }
            for child in &node.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.root, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_from_metadata() {
        let mut meta = BTreeMap::new();
        meta.insert("source".to_string(), "Policy Manual v2.3".to_string());
        meta.insert("approved_by".to_string(), "Legal Team".to_string());

        let citation = Citation::from_metadata(&meta).unwrap();
        assert_eq!(citation.source, "Policy Manual v2.3");
        assert_eq!(citation.approved_by.as_deref(), Some("Legal Team"));
        assert_eq!(citation.approved_date, None);
    }

    #[test]
    fn test_citation_requires_source() {
        let mut meta = BTreeMap::new();
        meta.insert("approved_by".to_string(), "Legal Team".to_string());
        assert!(Citation::from_metadata(&meta).is_none());
    }

    #[test]
    fn test_find_and_count() {
        let tree = FactTree::new(FactNode {
            level: FactLevel::Cortex,
            name: "cortex".to_string(),
            score: 0.8,
            weight: 1.0,
            visible: true,
            citation: None,
            children: vec![FactNode {
                level: FactLevel::Layer,
                name: "content".to_string(),
                score: 0.8,
                weight: 1.0,
                visible: true,
                citation: None,
                children: vec![],
            }],
        });

        assert_eq!(tree.root().node_count(), 2);
        assert!(tree.find("content").is_some());
        assert!(tree.find("missing").is_none());
    }
}

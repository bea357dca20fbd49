//! Glyph: the encoded multi-level vector record of a concept.
//!
//! A glyph stores one vector per schema level (roles, segments, layers,
//! and the fully bundled cortex) so hierarchical similarity can be
//! computed without re-encoding. Glyphs are immutable once produced;
//! re-encoding a concept yields a new glyph with a new identifier.
//!
//! Absent roles are simply omitted: a missing non-primary attribute
//! contributes no vector, never a zero vector.

use crate::fact_tree::Citation;
use crate::vector::Vector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A role's encoded role⊗value vector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoleGlyph {
    pub name: String,
    pub vector: Vector,
}

/// A segment's bundled vector plus its present role vectors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentGlyph {
    pub name: String,
    pub vector: Vector,
    pub roles: Vec<RoleGlyph>,
}

impl SegmentGlyph {
    pub fn role(&self, name: &str) -> Option<&RoleGlyph> {
        self.roles.iter().find(|r| r.name == name)
    }
}

/// A layer's bundled vector plus its present segments.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayerGlyph {
    pub name: String,
    pub vector: Vector,
    pub segments: Vec<SegmentGlyph>,
}

impl LayerGlyph {
    pub fn segment(&self, name: &str) -> Option<&SegmentGlyph> {
        self.segments.iter().find(|s| s.name == name)
    }
}

/// Which level of a glyph an operation addresses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HierarchyLevel {
    /// The fully bundled top-level vector.
    Cortex,
    /// A named layer's vector.
    Layer(String),
    /// A named segment's vector within a layer.
    Segment { layer: String, segment: String },
}

/// The encoded high-dimensional representation of a concept.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Glyph {
    id: Uuid,
    name: String,
    space_id: String,
    created_at: DateTime<Utc>,
    encoded_with_weights: bool,
    cortex: Vector,
    layers: Vec<LayerGlyph>,
    citation: Option<Citation>,
}

impl Glyph {
    /// Assemble a glyph from encoded per-level vectors.
    ///
    /// Stamps a fresh time-ordered identifier and creation timestamp.
    /// Normally called by [`Encoder::encode`](crate::Encoder::encode);
    /// public for callers composing custom structures from the algebra
    /// primitives.
    pub fn new(
        name: impl Into<String>,
        space_id: impl Into<String>,
        encoded_with_weights: bool,
        cortex: Vector,
        layers: Vec<LayerGlyph>,
        citation: Option<Citation>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            space_id: space_id.into(),
            created_at: Utc::now(),
            encoded_with_weights,
            cortex,
            layers,
            citation,
        }
    }

    /// Globally unique, creation-time-ordered identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifies the (schema, seed) vector space this glyph belongs to.
    /// Glyphs from different spaces are not comparable.
    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether similarity weights were baked into bundling at encode time.
    pub fn encoded_with_weights(&self) -> bool {
        self.encoded_with_weights
    }

    /// The top-level fully bundled vector.
    pub fn cortex(&self) -> &Vector {
        &self.cortex
    }

    pub fn layers(&self) -> &[LayerGlyph] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&LayerGlyph> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Audit citation lifted from the source concept's metadata.
    pub fn citation(&self) -> Option<&Citation> {
        self.citation.as_ref()
    }

    /// The vector stored at a hierarchy level, if present on this glyph.
    pub fn vector_at(&self, level: &HierarchyLevel) -> Option<&Vector> {
        match level {
            HierarchyLevel::Cortex => Some(&self.cortex),
            HierarchyLevel::Layer(name) => self.layer(name).map(|l| &l.vector),
            HierarchyLevel::Segment { layer, segment } => self
                .layer(layer)
                .and_then(|l| l.segment(segment))
                .map(|s| &s.vector),
        }
    }

    pub(crate) fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }
}

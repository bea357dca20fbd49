//! Encoder: concepts to glyphs under a hierarchical schema.
//!
//! # Role–value binding
//!
//! Each role's value is bound with the role's own symbol before bundling,
//! so the same value under different roles encodes differently:
//! `bind(role["src_port"], value["53"])` is unrelated to
//! `bind(role["dst_port"], value["53"])`.
//!
//! A role vector is the bundle of the bound pair with the bare role
//! symbol as a structure marker. Two concepts that fill the same role
//! with different values therefore share measurable structure while
//! sharing no values: partial overlap instead of noise, at every level
//! of the hierarchy.

use crate::algebra;
use crate::concept::Concept;
use crate::config::EncoderConfig;
use crate::error::{GlyphError, Result};
use crate::fact_tree::Citation;
use crate::glyph::{Glyph, LayerGlyph, RoleGlyph, SegmentGlyph};
use crate::symbol::{SymbolCache, SymbolGenerator};
use crate::vector::Vector;
use std::sync::Arc;
use tracing::debug;

/// Encodes [`Concept`]s into [`Glyph`]s under one immutable [`EncoderConfig`].
#[derive(Clone)]
pub struct Encoder {
    config: Arc<EncoderConfig>,
    space_id: String,
    symbols: SymbolGenerator,
}

impl Encoder {
    /// Build an encoder with its own symbol cache.
    ///
    /// Fails with `Configuration` if the schema is invalid or empty.
    pub fn new(config: Arc<EncoderConfig>) -> Result<Self> {
        Self::with_cache(config, SymbolCache::new())
    }

    /// Build an encoder backed by an existing (possibly shared) symbol cache.
    pub fn with_cache(config: Arc<EncoderConfig>, cache: SymbolCache) -> Result<Self> {
        config.validate_for_encoding()?;
        let symbols = SymbolGenerator::with_cache(config.dimension, config.seed, cache);
        let space_id = config.space_id();
        Ok(Self {
            config,
            space_id,
            symbols,
        })
    }

    pub fn config(&self) -> &Arc<EncoderConfig> {
        &self.config
    }

    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Deterministic symbol for an arbitrary key (vocabulary access for
    /// advanced callers and the intent matcher).
    pub fn symbol(&self, key: &str) -> Vector {
        self.symbols.symbol(key)
    }

    /// Symbol for a role name.
    pub fn role_symbol(&self, role: &str) -> Vector {
        self.symbols.symbol(&format!("role:{role}"))
    }

    /// Symbol for an attribute value.
    pub fn value_symbol(&self, value: &str) -> Vector {
        self.symbols.symbol(&format!("value:{value}"))
    }

    /// Discard memoized symbols. Determinism is unaffected.
    pub fn clear_cache(&self) {
        self.symbols.clear_cache()
    }

    /// Number of memoized symbols. Diagnostic only.
    pub fn cache_size(&self) -> usize {
        self.symbols.cache_size()
    }

    /// Encode a concept into a glyph.
    ///
    /// Identical concept + identical config (same seed) produce
    /// bit-identical vectors at every level; only the identifier and
    /// creation timestamp differ.
    pub fn encode(&self, concept: &Concept) -> Result<Glyph> {
        let bake = self.config.apply_weights_during_encoding;
        let mut layer_glyphs: Vec<LayerGlyph> = Vec::new();
        let mut layer_parts: Vec<(Vector, f64)> = Vec::new();

        for layer_cfg in &self.config.layers {
            let mut segment_glyphs: Vec<SegmentGlyph> = Vec::new();
            let mut segment_parts: Vec<(Vector, f64)> = Vec::new();

            for segment_cfg in &layer_cfg.segments {
                let mut role_glyphs: Vec<RoleGlyph> = Vec::new();
                let mut role_parts: Vec<(Vector, f64)> = Vec::new();

                for role_cfg in &segment_cfg.roles {
                    match concept.value_for_role(&role_cfg.name) {
                        Some(value) => {
                            let role_sym = self.role_symbol(&role_cfg.name);
                            let value_sym = self.value_symbol(&value);
                            let bound = algebra::bind(&role_sym, &value_sym)?;
                            let role_vector = algebra::bundle(&[&bound, &role_sym])?;

                            role_parts.push((role_vector.clone(), role_cfg.similarity_weight));
                            role_glyphs.push(RoleGlyph {
                                name: role_cfg.name.clone(),
                                vector: role_vector,
                            });
                        }
                        None if role_cfg.primary_id => {
                            return Err(GlyphError::MissingAttribute {
                                concept: concept.name().to_string(),
                                role: role_cfg.name.clone(),
                            });
                        }
                        None => {}
                    }
                }

                if role_glyphs.is_empty() {
                    continue;
                }

                let segment_vector = self.bundle_parts(&role_parts, bake)?;
                segment_parts.push((segment_vector.clone(), segment_cfg.similarity_weight));
                segment_glyphs.push(SegmentGlyph {
                    name: segment_cfg.name.clone(),
                    vector: segment_vector,
                    roles: role_glyphs,
                });
            }

            if segment_glyphs.is_empty() {
                continue;
            }

            let layer_vector = self.bundle_parts(&segment_parts, bake)?;
            layer_parts.push((layer_vector.clone(), layer_cfg.similarity_weight));
            layer_glyphs.push(LayerGlyph {
                name: layer_cfg.name.clone(),
                vector: layer_vector,
                segments: segment_glyphs,
            });
        }

        if layer_glyphs.is_empty() {
            return Err(GlyphError::EmptyInput(format!(
                "concept '{}' matched no roles in the schema",
                concept.name()
            )));
        }

        let cortex = self.bundle_parts(&layer_parts, bake)?;
        let citation = Citation::from_metadata(concept.metadata());

        debug!(
            concept = concept.name(),
            layers = layer_glyphs.len(),
            "encoded concept"
        );

        Ok(Glyph::new(
            concept.name(),
            self.space_id.clone(),
            bake,
            cortex,
            layer_glyphs,
            citation,
        ))
    }

    fn bundle_parts(&self, parts: &[(Vector, f64)], bake: bool) -> Result<Vector> {
        if bake {
            let pairs: Vec<(&Vector, f64)> = parts.iter().map(|(v, w)| (v, *w)).collect();
            algebra::weighted_bundle(&pairs)
        } else {
            let refs: Vec<&Vector> = parts.iter().map(|(v, _)| v).collect();
            algebra::bundle(&refs)
        }
    }
}

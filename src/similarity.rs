//! Similarity: vector metrics and the hierarchical glyph calculator.
//!
//! Scores roll up the schema bottom-up: role scores aggregate into
//! segment scores, segments into layers, layers into the cortex, as the
//! weighted mean of child scores with weights renormalized among the
//! children actually counted (see [`SCORE_AGGREGATION`]). A parallel
//! security axis rolls up `security_weight`s the same way and gates the
//! result's visibility.
//!
//! When compiled with the `simd` feature, cosine uses SIMD-accelerated
//! i8 dot products on supported hardware.

use crate::config::EncoderConfig;
use crate::error::{GlyphError, Result};
use crate::fact_tree::{FactLevel, FactNode, FactTree};
use crate::glyph::{Glyph, LayerGlyph, SegmentGlyph};
use crate::vector::Vector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Available similarity metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Cosine similarity in [-1, 1] (default).
    #[default]
    Cosine,
    /// Hamming similarity in [0, 1]: fraction of agreeing components.
    Hamming,
}

/// Cosine similarity: dot(a, b) / (||a|| * ||b||).
///
/// Returns a value in [-1, 1]; 1 means identical, 0 unrelated, -1 opposite.
#[cfg(feature = "simd")]
pub fn cosine(a: &Vector, b: &Vector) -> f64 {
    use simsimd::SpatialSimilarity;
    let dot_ab = i8::dot(a.data(), b.data()).unwrap_or(0.0);
    let dot_aa = i8::dot(a.data(), a.data()).unwrap_or(0.0);
    let dot_bb = i8::dot(b.data(), b.data()).unwrap_or(0.0);

    let norm_product = (dot_aa * dot_bb).sqrt();
    if norm_product < 1e-10 {
        return 0.0;
    }

    dot_ab / norm_product
}

#[cfg(not(feature = "simd"))]
pub fn cosine(a: &Vector, b: &Vector) -> f64 {
    let dot = dot_raw(a, b);
    let norm_a = a.norm();
    let norm_b = b.norm();

    if norm_a < 1e-10 || norm_b < 1e-10 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[allow(dead_code)]
fn dot_raw(a: &Vector, b: &Vector) -> f64 {
    assert_eq!(a.dimension(), b.dimension(), "dimension mismatch in dot");

    a.data()
        .iter()
        .zip(b.data().iter())
        .map(|(&x, &y)| (x as i64) * (y as i64))
        .sum::<i64>() as f64
}

/// Hamming similarity: fraction of positions that agree, in [0, 1].
pub fn hamming(a: &Vector, b: &Vector) -> f64 {
    assert_eq!(a.dimension(), b.dimension(), "dimension mismatch in hamming");

    let matching = a
        .data()
        .iter()
        .zip(b.data().iter())
        .filter(|(&x, &y)| x == y)
        .count();

    matching as f64 / a.dimension() as f64
}

/// Compute similarity under a metric, with dimension checking.
pub fn measure(a: &Vector, b: &Vector, metric: Metric) -> Result<f64> {
    if a.dimension() != b.dimension() {
        return Err(GlyphError::DimensionMismatch {
            expected: a.dimension(),
            got: b.dimension(),
        });
    }
    Ok(match metric {
        Metric::Cosine => cosine(a, b),
        Metric::Hamming => hamming(a, b),
    })
}

/// Rule used to fold child scores into a parent score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreAggregation {
    /// Weighted arithmetic mean of child scores, weights renormalized to
    /// sum to 1 among counted children.
    WeightedMean,
}

/// The aggregation rule this crate implements. Part of the contract:
/// callers can rely on parent scores being weighted means of child scores,
/// not bundle-then-compare results.
pub const SCORE_AGGREGATION: ScoreAggregation = ScoreAggregation::WeightedMean;

/// Query-time parameters for a similarity computation.
///
/// These are pass-through values, never baked into glyphs, so they can be
/// hot-updated between queries without re-encoding.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimilarityOptions {
    pub metric: Metric,
    /// Minimum aggregated security score for a result to be visible.
    pub visibility_threshold: f64,
    /// Build a [`FactTree`] explaining the score.
    pub generate_fact_tree: bool,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            metric: Metric::Cosine,
            visibility_threshold: 0.5,
            generate_fact_tree: false,
        }
    }
}

/// Result of a hierarchical similarity computation.
///
/// `score` is always computed, visible or not; suppressing scores for
/// invisible results is the caller's policy decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarityReport {
    pub score: f64,
    pub visible: bool,
    pub metric: Metric,
    pub fact_tree: Option<FactTree>,
}

/// One counted child during aggregation.
struct Branch {
    score: f64,
    sim_weight: f64,
    security: f64,
    sec_weight: f64,
    node: Option<FactNode>,
}

/// Hierarchical similarity over glyphs of one vector space.
pub struct SimilarityCalculator {
    config: Arc<EncoderConfig>,
    space_id: String,
    options: SimilarityOptions,
}

impl SimilarityCalculator {
    /// Build a calculator with default options.
    pub fn new(config: Arc<EncoderConfig>) -> Result<Self> {
        Self::with_options(config, SimilarityOptions::default())
    }

    pub fn with_options(config: Arc<EncoderConfig>, options: SimilarityOptions) -> Result<Self> {
        config.validate()?;
        let space_id = config.space_id();
        Ok(Self {
            config,
            space_id,
            options,
        })
    }

    pub fn options(&self) -> &SimilarityOptions {
        &self.options
    }

    /// Replace the query-time options. Already-encoded glyphs stay valid.
    pub fn set_options(&mut self, options: SimilarityOptions) {
        self.options = options;
    }

    /// Compute hierarchical similarity between two glyphs.
    pub fn compute(&self, a: &Glyph, b: &Glyph) -> Result<SimilarityReport> {
        if a.space_id() != b.space_id() {
            return Err(GlyphError::IncompatibleSpace {
                left: a.space_id().to_string(),
                right: b.space_id().to_string(),
            });
        }
        if a.space_id() != self.space_id {
            return Err(GlyphError::IncompatibleSpace {
                left: self.space_id.clone(),
                right: a.space_id().to_string(),
            });
        }
        if a.encoded_with_weights() != b.encoded_with_weights() {
            return Err(GlyphError::SchemaMismatch(
                "glyphs disagree on weight baking".to_string(),
            ));
        }

        // Weights baked at encode time are not re-applied at query time.
        let baked = a.encoded_with_weights();
        let want_tree = self.options.generate_fact_tree;

        let mut layer_branches: Vec<Branch> = Vec::new();
        for layer_cfg in &self.config.layers {
            let la = a.layer(&layer_cfg.name);
            let lb = b.layer(&layer_cfg.name);
            if la.is_none() && lb.is_none() {
                continue;
            }

            let branch = self.layer_branch(layer_cfg, la, lb, b, baked, want_tree)?;
            layer_branches.push(branch);
        }

        let (score, security) = fold(&mut layer_branches);
        let security = security * self.config.security_weight;
        let visible = security >= self.options.visibility_threshold;

        let fact_tree = if want_tree {
            let children = if visible {
                layer_branches.into_iter().filter_map(|c| c.node).collect()
            } else {
                Vec::new()
            };
            Some(FactTree::new(FactNode {
                level: FactLevel::Cortex,
                name: "cortex".to_string(),
                score,
                weight: 1.0,
                visible,
                citation: None,
                children,
            }))
        } else {
            None
        };

        trace!(score, visible, "similarity computed");

        Ok(SimilarityReport {
            score,
            visible,
            metric: self.options.metric,
            fact_tree,
        })
    }

    fn layer_branch(
        &self,
        layer_cfg: &crate::config::LayerConfig,
        la: Option<&LayerGlyph>,
        lb: Option<&LayerGlyph>,
        b_glyph: &Glyph,
        baked: bool,
        want_tree: bool,
    ) -> Result<Branch> {
        let mut segment_branches: Vec<Branch> = Vec::new();
        for segment_cfg in &layer_cfg.segments {
            let sa = la.and_then(|l| l.segment(&segment_cfg.name));
            let sb = lb.and_then(|l| l.segment(&segment_cfg.name));
            if sa.is_none() && sb.is_none() {
                continue;
            }

            let branch = self.segment_branch(segment_cfg, sa, sb, b_glyph, baked, want_tree)?;
            segment_branches.push(branch);
        }

        let (score, security) = fold(&mut segment_branches);
        let security = security * layer_cfg.security_weight;
        let visible = security >= self.options.visibility_threshold;

        let node = want_tree.then(|| FactNode {
            level: FactLevel::Layer,
            name: layer_cfg.name.clone(),
            score,
            weight: 0.0,
            visible,
            citation: None,
            children: if visible {
                segment_branches.into_iter().filter_map(|c| c.node).collect()
            } else {
                Vec::new()
            },
        });

        Ok(Branch {
            score,
            sim_weight: if baked { 1.0 } else { layer_cfg.similarity_weight },
            security,
            sec_weight: layer_cfg.security_weight,
            node,
        })
    }

    fn segment_branch(
        &self,
        segment_cfg: &crate::config::SegmentConfig,
        sa: Option<&SegmentGlyph>,
        sb: Option<&SegmentGlyph>,
        b_glyph: &Glyph,
        baked: bool,
        want_tree: bool,
    ) -> Result<Branch> {
        let mut role_branches: Vec<Branch> = Vec::new();
        for role_cfg in &segment_cfg.roles {
            let ra = sa.and_then(|s| s.role(&role_cfg.name));
            let rb = sb.and_then(|s| s.role(&role_cfg.name));

            let score = match (ra, rb) {
                (None, None) => continue,
                (Some(x), Some(y)) => measure(&x.vector, &y.vector, self.options.metric)?,
                // Present on one side only: contributes exactly zero.
                _ => 0.0,
            };

            let security = role_cfg.security_weight;
            let visible = security >= self.options.visibility_threshold;
            let node = want_tree.then(|| FactNode {
                level: FactLevel::Role,
                name: role_cfg.name.clone(),
                score,
                weight: 0.0,
                visible,
                citation: if visible {
                    b_glyph.citation().cloned()
                } else {
                    None
                },
                children: Vec::new(),
            });

            role_branches.push(Branch {
                score,
                sim_weight: if baked { 1.0 } else { role_cfg.similarity_weight },
                security,
                sec_weight: role_cfg.security_weight,
                node,
            });
        }

        let (score, security) = fold(&mut role_branches);
        let security = security * segment_cfg.security_weight;
        let visible = security >= self.options.visibility_threshold;

        let node = want_tree.then(|| FactNode {
            level: FactLevel::Segment,
            name: segment_cfg.name.clone(),
            score,
            weight: 0.0,
            visible,
            citation: None,
            children: if visible {
                role_branches.into_iter().filter_map(|c| c.node).collect()
            } else {
                Vec::new()
            },
        });

        Ok(Branch {
            score,
            sim_weight: if baked { 1.0 } else { segment_cfg.similarity_weight },
            security,
            sec_weight: segment_cfg.security_weight,
            node,
        })
    }
}

/// Weighted-mean fold of counted children; also stamps each child node's
/// renormalized weight. Children with all-zero weights fall back to a
/// uniform mean. An empty branch folds to (0, 0).
fn fold(children: &mut [Branch]) -> (f64, f64) {
    if children.is_empty() {
        return (0.0, 0.0);
    }

    let n = children.len() as f64;

    let sim_total: f64 = children.iter().map(|c| c.sim_weight.max(0.0)).sum();
    let score = if sim_total > 0.0 {
        children
            .iter()
            .map(|c| c.score * c.sim_weight.max(0.0) / sim_total)
            .sum()
    } else {
        children.iter().map(|c| c.score).sum::<f64>() / n
    };

    for child in children.iter_mut() {
        let weight = if sim_total > 0.0 {
            child.sim_weight.max(0.0) / sim_total
        } else {
            1.0 / n
        };
        if let Some(node) = &mut child.node {
            node.weight = weight;
        }
    }

    let sec_total: f64 = children.iter().map(|c| c.sec_weight.max(0.0)).sum();
    let security = if sec_total > 0.0 {
        children
            .iter()
            .map(|c| c.security * c.sec_weight.max(0.0) / sec_total)
            .sum()
    } else {
        children.iter().map(|c| c.security).sum::<f64>() / n
    };

    (score, security)
}

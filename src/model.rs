//! Convenience wrapper that owns an [`Encoder`], a [`SimilarityCalculator`],
//! an [`IntentEncoder`], and an in-memory glyph store.
//!
//! `GlyphModel` is ergonomics, not a storage engine: persistence layers
//! supply `(config, glyphs)` bundles and call the same components directly.

use crate::concept::Concept;
use crate::config::EncoderConfig;
use crate::edges::{EdgeGenerator, SpatialEdge};
use crate::encoder::Encoder;
use crate::error::{GlyphError, Result};
use crate::fact_tree::FactTree;
use crate::glyph::{Glyph, HierarchyLevel};
use crate::intent::{IntentEncoder, IntentMatch, IntentPattern};
use crate::predict::{BeamSearchPredictor, Prediction};
use crate::similarity::{SimilarityCalculator, SimilarityOptions, SimilarityReport};
use crate::vector::Vector;
use crate::{algebra, similarity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One ranked hit from a similarity search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    pub score: f64,
    pub visible: bool,
}

/// In-memory model: an encoder plus the glyphs encoded through it.
pub struct GlyphModel {
    config: Arc<EncoderConfig>,
    encoder: Encoder,
    calculator: SimilarityCalculator,
    intent: IntentEncoder,
    glyphs: Vec<Glyph>,
}

impl GlyphModel {
    /// Build a model from a config. Default intent patterns are loaded.
    pub fn new(config: EncoderConfig) -> Result<Self> {
        let config = Arc::new(config);
        let encoder = Encoder::new(config.clone())?;
        let calculator = SimilarityCalculator::new(config.clone())?;
        let mut intent = IntentEncoder::new(&config);
        intent.add_defaults();

        Ok(Self {
            config,
            encoder,
            calculator,
            intent,
            glyphs: Vec::new(),
        })
    }

    /// Rebuild a model from a previously packaged `(config, glyphs)` pair.
    pub fn from_parts(config: EncoderConfig, glyphs: Vec<Glyph>) -> Result<Self> {
        let mut model = Self::new(config)?;
        let space_id = model.encoder.space_id().to_string();
        for glyph in &glyphs {
            if glyph.space_id() != space_id {
                return Err(GlyphError::IncompatibleSpace {
                    left: space_id.clone(),
                    right: glyph.space_id().to_string(),
                });
            }
        }
        model.glyphs = glyphs;
        Ok(model)
    }

    pub fn config(&self) -> &Arc<EncoderConfig> {
        &self.config
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Look up a stored glyph by concept name (latest wins on re-encode).
    pub fn get(&self, name: &str) -> Option<&Glyph> {
        self.glyphs.iter().rev().find(|g| g.name() == name)
    }

    /// Current query-time similarity options.
    pub fn similarity_options(&self) -> &SimilarityOptions {
        self.calculator.options()
    }

    /// Hot-update query-time options. Stored glyphs stay valid.
    pub fn set_similarity_options(&mut self, options: SimilarityOptions) {
        self.calculator.set_options(options);
    }

    /// Encode a concept and keep its glyph in the store.
    pub fn encode(&mut self, concept: &Concept) -> Result<Glyph> {
        let glyph = self.encoder.encode(concept)?;
        self.glyphs.push(glyph.clone());
        Ok(glyph)
    }

    /// Rank stored glyphs against a free-text query.
    ///
    /// The query is projected across the role schema: each token's value
    /// symbol is bound with every role symbol, and the bundle is compared
    /// against stored cortex vectors.
    pub fn similarity_search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let probe = self.probe_vector(query)?;

        let mut results: Vec<SearchResult> = self
            .glyphs
            .iter()
            .map(|glyph| {
                similarity::measure(&probe, glyph.cortex(), self.calculator.options().metric).map(
                    |score| SearchResult {
                        name: glyph.name().to_string(),
                        score,
                        visible: true,
                    },
                )
            })
            .collect::<Result<_>>()?;

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        results.truncate(top_k);
        Ok(results)
    }

    /// Rank stored glyphs against an encoded concept, hierarchically.
    pub fn find_similar(&self, concept: &Concept, top_k: usize) -> Result<Vec<SearchResult>> {
        let probe = self.encoder.encode(concept)?;

        let mut results: Vec<SearchResult> = Vec::with_capacity(self.glyphs.len());
        for glyph in &self.glyphs {
            let report = self.calculator.compute(&probe, glyph)?;
            results.push(SearchResult {
                name: glyph.name().to_string(),
                score: report.score,
                visible: report.visible,
            });
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        results.truncate(top_k);
        Ok(results)
    }

    /// Compare two stored glyphs by name.
    pub fn compare(&self, name_a: &str, name_b: &str) -> Result<SimilarityReport> {
        let a = self
            .get(name_a)
            .ok_or_else(|| GlyphError::UnknownConcept(name_a.to_string()))?;
        let b = self
            .get(name_b)
            .ok_or_else(|| GlyphError::UnknownConcept(name_b.to_string()))?;
        self.calculator.compute(a, b)
    }

    /// Verify a probe concept against the store.
    ///
    /// Returns the best match with its fact tree, or `None` when nothing
    /// clears `min_score`: the explicit signal that no approved fact
    /// backs this probe.
    pub fn verify(
        &self,
        concept: &Concept,
        min_score: f64,
    ) -> Result<Option<(SearchResult, FactTree)>> {
        let probe = self.encoder.encode(concept)?;
        let explainer = SimilarityCalculator::with_options(
            self.config.clone(),
            SimilarityOptions {
                generate_fact_tree: true,
                ..*self.calculator.options()
            },
        )?;

        let mut best: Option<(SearchResult, FactTree)> = None;
        for glyph in &self.glyphs {
            let report = explainer.compute(&probe, glyph)?;
            let better = match &best {
                None => true,
                Some((current, _)) => report.score > current.score,
            };
            if better {
                let tree = report
                    .fact_tree
                    .expect("fact tree requested in explainer options");
                best = Some((
                    SearchResult {
                        name: glyph.name().to_string(),
                        score: report.score,
                        visible: report.visible,
                    },
                    tree,
                ));
            }
        }

        Ok(best.filter(|(result, _)| result.score >= min_score))
    }

    /// Beam-search prediction over stored glyphs, oldest first.
    pub fn predict(
        &self,
        history_names: &[&str],
        time_intervals: usize,
        beam_width: usize,
        drift_reduction: bool,
    ) -> Result<Vec<Prediction>> {
        let history: Vec<Glyph> = history_names
            .iter()
            .map(|name| {
                self.get(name)
                    .cloned()
                    .ok_or_else(|| GlyphError::UnknownConcept(name.to_string()))
            })
            .collect::<Result<_>>()?;

        let predictor = BeamSearchPredictor::new(beam_width, drift_reduction)?;
        predictor.predict(&history, time_intervals, &HierarchyLevel::Cortex)
    }

    /// Match free text against the registered intent patterns.
    pub fn match_intent(&self, text: &str) -> Option<IntentMatch> {
        self.intent.match_intent(text)
    }

    /// Register a custom intent pattern.
    pub fn add_intent_pattern(&mut self, pattern: IntentPattern) {
        self.intent.add_pattern(pattern);
    }

    /// Spatial explanation edges over the whole store.
    pub fn spatial_edges(&self, min_score: f64) -> Result<Vec<SpatialEdge>> {
        EdgeGenerator::new().spatial_edges(&self.glyphs, &self.calculator, min_score)
    }

    fn probe_vector(&self, query: &str) -> Result<Vector> {
        let tokens: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(GlyphError::EmptyInput("query has no tokens".to_string()));
        }

        let mut parts: Vec<Vector> = Vec::new();
        for layer in &self.config.layers {
            for segment in &layer.segments {
                for role in &segment.roles {
                    let role_sym = self.encoder.role_symbol(&role.name);
                    for token in &tokens {
                        let value_sym = self.encoder.value_symbol(token);
                        parts.push(algebra::bind(&role_sym, &value_sym)?);
                    }
                }
            }
        }

        let refs: Vec<&Vector> = parts.iter().collect();
        algebra::bundle(&refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayerConfig, Role, SegmentConfig};

    fn vehicle_model() -> GlyphModel {
        let config = EncoderConfig::new(4096, 42).with_layers(vec![LayerConfig::new(
            "content",
            vec![SegmentConfig::new(
                "identity",
                vec![Role::new("type"), Role::new("color")],
            )],
        )]);
        let mut model = GlyphModel::new(config).unwrap();

        model
            .encode(
                &Concept::new("red car")
                    .with_attribute("type", "car")
                    .with_attribute("color", "red")
                    .with_metadata("source", "Fleet Catalog v3"),
            )
            .unwrap();
        model
            .encode(
                &Concept::new("blue truck")
                    .with_attribute("type", "truck")
                    .with_attribute("color", "blue"),
            )
            .unwrap();
        model
            .encode(
                &Concept::new("red wagon")
                    .with_attribute("type", "wagon")
                    .with_attribute("color", "red"),
            )
            .unwrap();
        model
    }

    #[test]
    fn test_text_search_ranks_matching_values() {
        let model = vehicle_model();
        let results = model.similarity_search("red", 3).unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].score >= results[1].score);
        let top_two: Vec<&str> = results[..2].iter().map(|r| r.name.as_str()).collect();
        assert!(top_two.contains(&"red car"));
        assert!(top_two.contains(&"red wagon"));
    }

    #[test]
    fn test_find_similar_concept() {
        let model = vehicle_model();
        let results = model
            .find_similar(
                &Concept::new("probe")
                    .with_attribute("type", "car")
                    .with_attribute("color", "red"),
                2,
            )
            .unwrap();

        assert_eq!(results[0].name, "red car");
        assert!((results[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_and_unknown_name() {
        let model = vehicle_model();

        let report = model.compare("red car", "red wagon").unwrap();
        assert!(report.score > 0.3);

        assert!(matches!(
            model.compare("red car", "ghost"),
            Err(GlyphError::UnknownConcept(_))
        ));
    }

    #[test]
    fn test_verify_returns_citation_bearing_tree() {
        let model = vehicle_model();

        let verified = model
            .verify(
                &Concept::new("probe")
                    .with_attribute("type", "car")
                    .with_attribute("color", "red"),
                0.8,
            )
            .unwrap();

        let (result, tree) = verified.unwrap();
        assert_eq!(result.name, "red car");
        let citations = tree.citations();
        assert!(!citations.is_empty());
        assert_eq!(citations[0].source, "Fleet Catalog v3");
    }

    #[test]
    fn test_verify_rejects_below_floor() {
        let model = vehicle_model();

        let verified = model
            .verify(
                &Concept::new("probe")
                    .with_attribute("type", "boat")
                    .with_attribute("color", "teal"),
                0.9,
            )
            .unwrap();
        assert!(verified.is_none());
    }

    #[test]
    fn test_predict_over_store() {
        let mut model = vehicle_model();
        for (i, color) in ["green", "yellow"].iter().enumerate() {
            model
                .encode(
                    &Concept::new(format!("car_v{i}"))
                        .with_attribute("type", "car")
                        .with_attribute("color", *color),
                )
                .unwrap();
        }

        let predictions = model
            .predict(&["red car", "car_v0", "car_v1"], 2, 3, true)
            .unwrap();
        assert!(!predictions.is_empty());
        assert!(predictions.len() <= 3);

        assert!(matches!(
            model.predict(&["red car", "ghost"], 1, 3, false),
            Err(GlyphError::UnknownConcept(_))
        ));
    }

    #[test]
    fn test_intent_end_to_end() {
        let model = vehicle_model();

        let matched = model.match_intent("find similar to red car").unwrap();
        assert_eq!(matched.intent_type, "similarity_search");
        assert!((matched.confidence - 1.0).abs() < 1e-12);

        let target = matched.extracted_values.get("target").unwrap();
        assert_eq!(target, "red car");

        let results = model.similarity_search(target, 2).unwrap();
        assert!(!results.is_empty());
    }

    #[test]
    fn test_from_parts_round_trip() {
        let model = vehicle_model();
        let config = (**model.config()).clone();
        let glyphs = model.glyphs().to_vec();

        let rebuilt = GlyphModel::from_parts(config, glyphs).unwrap();
        assert_eq!(rebuilt.len(), 3);
        assert!((rebuilt.compare("red car", "red car").unwrap().score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_parts_rejects_foreign_glyphs() {
        let model = vehicle_model();
        let foreign_config = EncoderConfig::new(4096, 7).with_layers((**model.config()).clone().layers);
        let glyphs = model.glyphs().to_vec();

        assert!(matches!(
            GlyphModel::from_parts(foreign_config, glyphs),
            Err(GlyphError::IncompatibleSpace { .. })
        ));
    }

    #[test]
    fn test_hot_update_options() {
        let mut model = vehicle_model();
        let before = model.compare("red car", "red wagon").unwrap();
        assert_eq!(before.metric, crate::similarity::Metric::Cosine);

        model.set_similarity_options(SimilarityOptions {
            metric: crate::similarity::Metric::Hamming,
            ..SimilarityOptions::default()
        });
        let after = model.compare("red car", "red wagon").unwrap();
        assert_eq!(after.metric, crate::similarity::Metric::Hamming);
    }
}

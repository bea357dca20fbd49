//! Intent encoding: rules-first natural-language query matching.
//!
//! The matcher never calls an external model. A confident match routes the
//! query into the structured pipeline; `None` (no match, or confidence
//! below the floor) is the explicit signal for the caller to fall back to
//! a generative model. Never silently guess.

use crate::algebra;
use crate::config::EncoderConfig;
use crate::error::Result;
use crate::symbol::SymbolGenerator;
use crate::vector::Vector;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9']+").unwrap());

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A recognized query template.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntentPattern {
    pub intent_type: String,
    /// Phrases that open a query of this intent. Matching is longest-first
    /// within a pattern.
    pub example_phrases: Vec<String>,
    /// Structured call template for the serving layer.
    pub query_template: serde_json::Value,
}

impl IntentPattern {
    pub fn new(intent_type: impl Into<String>, example_phrases: &[&str]) -> Self {
        Self {
            intent_type: intent_type.into(),
            example_phrases: example_phrases.iter().map(|p| p.to_string()).collect(),
            query_template: serde_json::Value::Null,
        }
    }

    pub fn with_template(mut self, template: serde_json::Value) -> Self {
        self.query_template = template;
        self
    }
}

/// A successful intent match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntentMatch {
    pub intent_type: String,
    /// 1.0 for an exact phrase match, proportionally lower for partial
    /// token overlap.
    pub confidence: f64,
    /// Slot values extracted from the query (the phrase remainder lands in
    /// `target`).
    pub extracted_values: BTreeMap<String, String>,
}

impl IntentMatch {
    pub fn is_high_confidence(&self) -> bool {
        self.confidence >= 0.8
    }
}

/// Rules-based natural-language pattern matcher.
///
/// Patterns are tried in registration order; on equal confidence the
/// earlier pattern wins, so matching is deterministic.
pub struct IntentEncoder {
    patterns: Vec<IntentPattern>,
    min_confidence: f64,
    symbols: SymbolGenerator,
}

/// Confidence cap for partial (non-exact) matches.
const PARTIAL_MATCH_CAP: f64 = 0.9;

impl IntentEncoder {
    /// Create an empty matcher sharing the encoder's vocabulary space.
    pub fn new(config: &EncoderConfig) -> Self {
        Self {
            patterns: Vec::new(),
            min_confidence: 0.4,
            symbols: SymbolGenerator::new(config.dimension, config.seed),
        }
    }

    /// Adjust the floor below which matches are discarded.
    pub fn with_min_confidence(mut self, floor: f64) -> Self {
        self.min_confidence = floor;
        self
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn add_pattern(&mut self, pattern: IntentPattern) {
        self.patterns.push(pattern);
    }

    pub fn patterns(&self) -> &[IntentPattern] {
        &self.patterns
    }

    /// Register the baseline pattern library.
    pub fn add_defaults(&mut self) {
        self.add_pattern(
            IntentPattern::new(
                "similarity_search",
                &[
                    "find similar to",
                    "similar to",
                    "find concepts like",
                    "find matches for",
                    "search for",
                    "look up",
                ],
            )
            .with_template(json!({"operation": "similarity_search", "top_k": 5})),
        );
        self.add_pattern(
            IntentPattern::new(
                "fact_tree",
                &[
                    "what is the policy for",
                    "tell me about",
                    "what is",
                    "explain",
                    "describe",
                ],
            )
            .with_template(json!({"operation": "fact_tree", "max_depth": 2})),
        );
        self.add_pattern(
            IntentPattern::new(
                "predict",
                &[
                    "predict what comes after",
                    "what comes after",
                    "what comes next for",
                    "predict",
                    "forecast",
                ],
            )
            .with_template(json!({"operation": "predict", "time_intervals": 1})),
        );
        self.add_pattern(
            IntentPattern::new("count_concepts", &["how many", "count"])
                .with_template(json!({"operation": "count_concepts"})),
        );
    }

    /// Vocabulary vector for a free-text phrase, bundling the value symbols
    /// of its tokens. Shares the symbol space of the encoder configured
    /// with the same dimension and seed.
    pub fn phrase_vector(&self, text: &str) -> Result<Vector> {
        let tokens = tokenize(text);
        let vectors: Vec<Vector> = tokens
            .iter()
            .map(|t| self.symbols.symbol(&format!("value:{t}")))
            .collect();
        let refs: Vec<&Vector> = vectors.iter().collect();
        algebra::bundle(&refs)
    }

    /// Match free text against the registered patterns.
    ///
    /// Returns `None` when nothing clears the confidence floor: the
    /// caller's cue to fall back to a generative model.
    pub fn match_intent(&self, text: &str) -> Option<IntentMatch> {
        let text_tokens = tokenize(text);
        if text_tokens.is_empty() {
            return None;
        }

        let mut best: Option<(f64, usize, usize, BTreeMap<String, String>)> = None;

        for (pattern_idx, pattern) in self.patterns.iter().enumerate() {
            for phrase in &pattern.example_phrases {
                let phrase_tokens = tokenize(phrase);
                if phrase_tokens.is_empty() {
                    continue;
                }

                let (confidence, remainder) = score_phrase(&phrase_tokens, &text_tokens);
                if confidence < self.min_confidence {
                    continue;
                }

                let mut extracted = BTreeMap::new();
                if !remainder.is_empty() {
                    extracted.insert("target".to_string(), remainder.join(" "));
                }

                let better = match &best {
                    None => true,
                    // Earlier patterns win ties; within a pattern, prefer
                    // the longer (more specific) phrase.
                    Some((best_conf, best_idx, best_len, _)) => {
                        confidence > *best_conf
                            || (confidence == *best_conf
                                && pattern_idx == *best_idx
                                && phrase_tokens.len() > *best_len)
                    }
                };
                if better {
                    best = Some((confidence, pattern_idx, phrase_tokens.len(), extracted));
                }
            }
        }

        best.map(|(confidence, pattern_idx, _, extracted_values)| IntentMatch {
            intent_type: self.patterns[pattern_idx].intent_type.clone(),
            confidence,
            extracted_values,
        })
    }
}

/// Score one phrase against the query tokens.
///
/// Exact prefix match yields confidence 1.0 and the remainder as the slot
/// value; otherwise the fraction of phrase tokens present in the query,
/// capped below 1.0.
fn score_phrase(phrase_tokens: &[String], text_tokens: &[String]) -> (f64, Vec<String>) {
    if text_tokens.len() >= phrase_tokens.len()
        && text_tokens[..phrase_tokens.len()] == *phrase_tokens
    {
        return (1.0, text_tokens[phrase_tokens.len()..].to_vec());
    }

    let overlap = phrase_tokens
        .iter()
        .filter(|t| text_tokens.contains(t))
        .count();
    let confidence = (overlap as f64 / phrase_tokens.len() as f64) * PARTIAL_MATCH_CAP;

    let remainder: Vec<String> = text_tokens
        .iter()
        .filter(|t| !phrase_tokens.contains(t))
        .cloned()
        .collect();

    (confidence, remainder)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_encoder() -> IntentEncoder {
        let config = EncoderConfig::new(2048, 42);
        let mut encoder = IntentEncoder::new(&config);
        encoder.add_defaults();
        encoder
    }

    #[test]
    fn test_exact_similarity_search() {
        let encoder = default_encoder();
        let matched = encoder.match_intent("find similar to red car").unwrap();

        assert_eq!(matched.intent_type, "similarity_search");
        assert!((matched.confidence - 1.0).abs() < 1e-12);
        assert_eq!(
            matched.extracted_values.get("target").map(String::as_str),
            Some("red car")
        );
        assert!(matched.is_high_confidence());
    }

    #[test]
    fn test_longest_phrase_wins_extraction() {
        let encoder = default_encoder();
        let matched = encoder
            .match_intent("what is the policy for returns")
            .unwrap();

        assert_eq!(matched.intent_type, "fact_tree");
        assert!((matched.confidence - 1.0).abs() < 1e-12);
        // The longer phrase strips the whole opener, not just "what is".
        assert_eq!(
            matched.extracted_values.get("target").map(String::as_str),
            Some("returns")
        );
    }

    #[test]
    fn test_predict_intent() {
        let encoder = default_encoder();
        let matched = encoder
            .match_intent("predict what comes after data preprocessing")
            .unwrap();

        assert_eq!(matched.intent_type, "predict");
        assert_eq!(
            matched.extracted_values.get("target").map(String::as_str),
            Some("data preprocessing")
        );
    }

    #[test]
    fn test_no_match_below_floor() {
        let encoder = default_encoder();
        assert!(encoder.match_intent("purple monkey dishwasher").is_none());
        assert!(encoder.match_intent("").is_none());
    }

    #[test]
    fn test_partial_match_below_exact() {
        let encoder = default_encoder();
        // "similar" and "to" appear, but not as the opening phrase.
        let matched = encoder.match_intent("is anything similar to this").unwrap();

        assert_eq!(matched.intent_type, "similarity_search");
        assert!(matched.confidence < 1.0);
        assert!(matched.confidence >= encoder.min_confidence());
    }

    #[test]
    fn test_registration_order_breaks_ties() {
        let config = EncoderConfig::new(2048, 42);
        let mut encoder = IntentEncoder::new(&config);
        encoder.add_pattern(IntentPattern::new("first", &["run the numbers"]));
        encoder.add_pattern(IntentPattern::new("second", &["run the numbers"]));

        let matched = encoder.match_intent("run the numbers").unwrap();
        assert_eq!(matched.intent_type, "first");
    }

    #[test]
    fn test_custom_pattern_with_template() {
        let config = EncoderConfig::new(2048, 42);
        let mut encoder = IntentEncoder::new(&config);
        encoder.add_pattern(
            IntentPattern::new("find_technique", &["find technique for"])
                .with_template(json!({"operation": "similarity_search", "filters": {"type": "technique"}})),
        );

        let matched = encoder.match_intent("find technique for image recognition").unwrap();
        assert_eq!(matched.intent_type, "find_technique");
        assert_eq!(
            encoder.patterns()[0].query_template["filters"]["type"],
            "technique"
        );
    }

    #[test]
    fn test_phrase_vector_deterministic() {
        let config = EncoderConfig::new(2048, 42);
        let a = IntentEncoder::new(&config);
        let b = IntentEncoder::new(&config);

        assert_eq!(
            a.phrase_vector("red car").unwrap(),
            b.phrase_vector("red car").unwrap()
        );
    }
}

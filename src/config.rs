//! Encoder configuration: the hierarchical layer → segment → role schema.
//!
//! Configs are immutable once an [`Encoder`](crate::Encoder) is built from
//! them. All weights live in [0, 1] and default to 1.0; validation is
//! fail-fast at construction, never at query time.

use crate::error::{GlyphError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

fn default_weight() -> f64 {
    1.0
}

/// A named slot within a segment, mapped to a concept attribute or
/// relationship of the same name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default = "default_weight")]
    pub similarity_weight: f64,
    #[serde(default = "default_weight")]
    pub security_weight: f64,
    /// A primary-id role must be present on every concept encoded under
    /// this schema. At most one per segment.
    #[serde(default)]
    pub primary_id: bool,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            similarity_weight: 1.0,
            security_weight: 1.0,
            primary_id: false,
        }
    }

    pub fn with_similarity_weight(mut self, weight: f64) -> Self {
        self.similarity_weight = weight;
        self
    }

    pub fn with_security_weight(mut self, weight: f64) -> Self {
        self.security_weight = weight;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary_id = true;
        self
    }
}

/// An ordered group of roles bundled into one segment vector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub name: String,
    #[serde(default = "default_weight")]
    pub similarity_weight: f64,
    #[serde(default = "default_weight")]
    pub security_weight: f64,
    pub roles: Vec<Role>,
}

impl SegmentConfig {
    pub fn new(name: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            name: name.into(),
            similarity_weight: 1.0,
            security_weight: 1.0,
            roles,
        }
    }

    pub fn with_similarity_weight(mut self, weight: f64) -> Self {
        self.similarity_weight = weight;
        self
    }

    pub fn with_security_weight(mut self, weight: f64) -> Self {
        self.security_weight = weight;
        self
    }
}

/// An ordered group of segments bundled into one layer vector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    #[serde(default = "default_weight")]
    pub similarity_weight: f64,
    #[serde(default = "default_weight")]
    pub security_weight: f64,
    pub segments: Vec<SegmentConfig>,
}

impl LayerConfig {
    pub fn new(name: impl Into<String>, segments: Vec<SegmentConfig>) -> Self {
        Self {
            name: name.into(),
            similarity_weight: 1.0,
            security_weight: 1.0,
            segments,
        }
    }

    pub fn with_similarity_weight(mut self, weight: f64) -> Self {
        self.similarity_weight = weight;
        self
    }

    pub fn with_security_weight(mut self, weight: f64) -> Self {
        self.security_weight = weight;
        self
    }
}

/// Top-level encoder schema: dimension, seed, and the layer hierarchy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Vector width. Recommended: 4096–10000.
    pub dimension: usize,
    /// Reproducibility key. Two configs with the same seed, dimension, and
    /// schema describe the same vector space.
    pub seed: u64,
    #[serde(default = "default_weight")]
    pub similarity_weight: f64,
    #[serde(default = "default_weight")]
    pub security_weight: f64,
    /// Bake similarity weights into bundling at encode time instead of
    /// applying them at query time. Baked glyphs are compared without
    /// re-weighting to avoid double counting.
    #[serde(default)]
    pub apply_weights_during_encoding: bool,
    pub layers: Vec<LayerConfig>,
}

impl EncoderConfig {
    pub fn new(dimension: usize, seed: u64) -> Self {
        Self {
            dimension,
            seed,
            similarity_weight: 1.0,
            security_weight: 1.0,
            apply_weights_during_encoding: false,
            layers: Vec::new(),
        }
    }

    pub fn with_layers(mut self, layers: Vec<LayerConfig>) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_baked_weights(mut self, bake: bool) -> Self {
        self.apply_weights_during_encoding = bake;
        self
    }

    /// Validate dimension, weight ranges, and name uniqueness.
    ///
    /// Emptiness of the hierarchy is checked separately when the config is
    /// used for encoding (see [`Encoder::new`](crate::Encoder::new)).
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(GlyphError::Configuration(
                "dimension must be positive".to_string(),
            ));
        }
        check_weight("cortex similarity_weight", self.similarity_weight)?;
        check_weight("cortex security_weight", self.security_weight)?;

        let mut layer_names = HashSet::new();
        for layer in &self.layers {
            if !layer_names.insert(layer.name.as_str()) {
                return Err(GlyphError::Configuration(format!(
                    "duplicate layer name '{}'",
                    layer.name
                )));
            }
            check_weight(&format!("layer '{}'", layer.name), layer.similarity_weight)?;
            check_weight(&format!("layer '{}'", layer.name), layer.security_weight)?;

            let mut segment_names = HashSet::new();
            for segment in &layer.segments {
                if !segment_names.insert(segment.name.as_str()) {
                    return Err(GlyphError::Configuration(format!(
                        "duplicate segment name '{}' in layer '{}'",
                        segment.name, layer.name
                    )));
                }
                check_weight(
                    &format!("segment '{}'", segment.name),
                    segment.similarity_weight,
                )?;
                check_weight(
                    &format!("segment '{}'", segment.name),
                    segment.security_weight,
                )?;

                let mut role_names = HashSet::new();
                let mut primary_count = 0usize;
                for role in &segment.roles {
                    if !role_names.insert(role.name.as_str()) {
                        return Err(GlyphError::Configuration(format!(
                            "duplicate role name '{}' in segment '{}'",
                            role.name, segment.name
                        )));
                    }
                    check_weight(&format!("role '{}'", role.name), role.similarity_weight)?;
                    check_weight(&format!("role '{}'", role.name), role.security_weight)?;
                    if role.primary_id {
                        primary_count += 1;
                    }
                }
                if primary_count > 1 {
                    return Err(GlyphError::Configuration(format!(
                        "segment '{}' has {} primary_id roles (at most 1 allowed)",
                        segment.name, primary_count
                    )));
                }
            }
        }

        Ok(())
    }

    /// Ensure the hierarchy is non-empty end to end, as required for encoding.
    pub(crate) fn validate_for_encoding(&self) -> Result<()> {
        self.validate()?;
        if self.layers.is_empty() {
            return Err(GlyphError::Configuration(
                "encoding requires at least one layer".to_string(),
            ));
        }
        for layer in &self.layers {
            if layer.segments.is_empty() {
                return Err(GlyphError::Configuration(format!(
                    "layer '{}' has no segments",
                    layer.name
                )));
            }
            for segment in &layer.segments {
                if segment.roles.is_empty() {
                    return Err(GlyphError::Configuration(format!(
                        "segment '{}' has no roles",
                        segment.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Fingerprint of the vector space this config describes.
    ///
    /// Covers dimension, seed, and the schema outline (names, order, and
    /// primary-id flags). Weights are deliberately excluded: they are
    /// query-time parameters, and adjusting them must not invalidate
    /// already-encoded glyphs.
    pub fn space_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.dimension.to_le_bytes());
        hasher.update(self.seed.to_le_bytes());
        for layer in &self.layers {
            hasher.update(b"L");
            hasher.update(layer.name.as_bytes());
            for segment in &layer.segments {
                hasher.update(b"S");
                hasher.update(segment.name.as_bytes());
                for role in &segment.roles {
                    hasher.update(b"R");
                    hasher.update(role.name.as_bytes());
                    hasher.update([role.primary_id as u8]);
                }
            }
        }
        let hash = hasher.finalize();
        hex::encode(&hash[..8])
    }
}

fn check_weight(what: &str, weight: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&weight) || weight.is_nan() {
        return Err(GlyphError::Configuration(format!(
            "{what} weight {weight} out of range [0, 1]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_role_config() -> EncoderConfig {
        EncoderConfig::new(1024, 42).with_layers(vec![LayerConfig::new(
            "content",
            vec![SegmentConfig::new(
                "identity",
                vec![Role::new("type"), Role::new("color")],
            )],
        )])
    }

    #[test]
    fn test_valid_config() {
        assert!(two_role_config().validate_for_encoding().is_ok());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let config = EncoderConfig::new(0, 42);
        assert!(matches!(
            config.validate(),
            Err(GlyphError::Configuration(_))
        ));
    }

    #[test]
    fn test_out_of_range_weight_rejected() {
        let mut config = two_role_config();
        config.layers[0].segments[0].roles[0].similarity_weight = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let mut config = two_role_config();
        config.layers[0].segments[0].roles[1].name = "type".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_two_primary_ids_rejected() {
        let mut config = two_role_config();
        config.layers[0].segments[0].roles[0].primary_id = true;
        config.layers[0].segments[0].roles[1].primary_id = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_layers_rejected_for_encoding() {
        let config = EncoderConfig::new(1024, 42);
        assert!(config.validate().is_ok());
        assert!(config.validate_for_encoding().is_err());
    }

    #[test]
    fn test_space_id_ignores_weights() {
        let base = two_role_config();
        let mut reweighted = base.clone();
        reweighted.layers[0].segments[0].roles[0].similarity_weight = 0.3;

        assert_eq!(base.space_id(), reweighted.space_id());
    }

    #[test]
    fn test_space_id_tracks_seed_and_schema() {
        let base = two_role_config();

        let mut other_seed = base.clone();
        other_seed.seed = 43;
        assert_ne!(base.space_id(), other_seed.space_id());

        let mut other_schema = base.clone();
        other_schema.layers[0].segments[0].roles[0].name = "kind".to_string();
        assert_ne!(base.space_id(), other_schema.space_id());
    }
}

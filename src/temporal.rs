//! Temporal encoding: change vectors between glyphs of one schema.
//!
//! A [`TemporalDelta`] captures, per hierarchy level, the direction of
//! change between two glyphs as a sign-product vector. Components where
//! the earlier glyph is zero use +1 as the multiplicative identity, so
//! applying a delta back onto its source reproduces the target
//! bit-identically: `apply_delta(v1, compute_delta(v1, v2)) == v2`.

use crate::error::{GlyphError, Result};
use crate::glyph::{Glyph, LayerGlyph, RoleGlyph, SegmentGlyph};
use crate::vector::Vector;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Sign of `x` with zero lifted to the multiplicative identity.
#[inline]
fn lift(x: i8) -> i8 {
    if x == 0 {
        1
    } else {
        x
    }
}

/// Change vector between two level vectors.
pub(crate) fn delta_between(v1: &Vector, v2: &Vector) -> Result<Vector> {
    if v1.dimension() != v2.dimension() {
        return Err(GlyphError::DimensionMismatch {
            expected: v1.dimension(),
            got: v2.dimension(),
        });
    }

    let data: Vec<i8> = v1
        .data()
        .iter()
        .zip(v2.data().iter())
        .map(|(&x, &y)| lift(x) * y)
        .collect();

    Ok(Vector::from_data(data))
}

/// Apply a change vector onto a level vector.
pub(crate) fn apply_change(v: &Vector, delta: &Vector) -> Result<Vector> {
    if v.dimension() != delta.dimension() {
        return Err(GlyphError::DimensionMismatch {
            expected: v.dimension(),
            got: delta.dimension(),
        });
    }

    let data: Vec<i8> = v
        .data()
        .iter()
        .zip(delta.data().iter())
        .map(|(&x, &d)| lift(x) * d)
        .collect();

    Ok(Vector::from_data(data))
}

/// Vector-valued diff between two glyphs of the same space and schema,
/// tagged with the time interval it represents. Immutable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemporalDelta {
    space_id: String,
    interval_seconds: i64,
    cortex: Vector,
    layers: Vec<LayerGlyph>,
}

impl TemporalDelta {
    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    /// The time interval between the two source glyphs.
    pub fn interval(&self) -> Duration {
        Duration::seconds(self.interval_seconds)
    }

    /// Cortex-level change vector.
    pub fn cortex(&self) -> &Vector {
        &self.cortex
    }

    pub fn layers(&self) -> &[LayerGlyph] {
        &self.layers
    }
}

/// Computes and applies deltas between glyphs over time.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemporalEncoder;

impl TemporalEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Compute the change vector from `v1` to `v2` at every level.
    ///
    /// Both glyphs must share a space and an aligned hierarchy: the same
    /// layers, segments, and present roles.
    pub fn compute_delta(&self, v1: &Glyph, v2: &Glyph) -> Result<TemporalDelta> {
        if v1.space_id() != v2.space_id() {
            return Err(GlyphError::IncompatibleSpace {
                left: v1.space_id().to_string(),
                right: v2.space_id().to_string(),
            });
        }
        if v1.layers().len() != v2.layers().len() {
            return Err(GlyphError::SchemaMismatch(format!(
                "glyph '{}' has {} layers, glyph '{}' has {}",
                v1.name(),
                v1.layers().len(),
                v2.name(),
                v2.layers().len()
            )));
        }

        let mut layers = Vec::with_capacity(v1.layers().len());
        for (l1, l2) in v1.layers().iter().zip(v2.layers()) {
            layers.push(Self::layer_delta(l1, l2)?);
        }

        let interval_seconds = (v2.created_at() - v1.created_at()).num_seconds();

        Ok(TemporalDelta {
            space_id: v1.space_id().to_string(),
            interval_seconds,
            cortex: delta_between(v1.cortex(), v2.cortex())?,
            layers,
        })
    }

    fn layer_delta(l1: &LayerGlyph, l2: &LayerGlyph) -> Result<LayerGlyph> {
        if l1.name != l2.name || l1.segments.len() != l2.segments.len() {
            return Err(GlyphError::SchemaMismatch(format!(
                "layer '{}' does not align with layer '{}'",
                l1.name, l2.name
            )));
        }

        let mut segments = Vec::with_capacity(l1.segments.len());
        for (s1, s2) in l1.segments.iter().zip(&l2.segments) {
            if s1.name != s2.name || s1.roles.len() != s2.roles.len() {
                return Err(GlyphError::SchemaMismatch(format!(
                    "segment '{}' does not align with segment '{}'",
                    s1.name, s2.name
                )));
            }

            let mut roles = Vec::with_capacity(s1.roles.len());
            for (r1, r2) in s1.roles.iter().zip(&s2.roles) {
                if r1.name != r2.name {
                    return Err(GlyphError::SchemaMismatch(format!(
                        "role '{}' does not align with role '{}'",
                        r1.name, r2.name
                    )));
                }
                roles.push(RoleGlyph {
                    name: r1.name.clone(),
                    vector: delta_between(&r1.vector, &r2.vector)?,
                });
            }

            segments.push(SegmentGlyph {
                name: s1.name.clone(),
                vector: delta_between(&s1.vector, &s2.vector)?,
                roles,
            });
        }

        Ok(LayerGlyph {
            name: l1.name.clone(),
            vector: delta_between(&l1.vector, &l2.vector)?,
            segments,
        })
    }

    /// Produce a new hypothetical glyph by applying a delta at every level.
    ///
    /// The result gets a fresh identifier and a timestamp advanced by the
    /// delta's interval. Inverse of [`compute_delta`](Self::compute_delta).
    pub fn apply_delta(&self, glyph: &Glyph, delta: &TemporalDelta) -> Result<Glyph> {
        if glyph.space_id() != delta.space_id() {
            return Err(GlyphError::IncompatibleSpace {
                left: glyph.space_id().to_string(),
                right: delta.space_id().to_string(),
            });
        }
        if glyph.layers().len() != delta.layers.len() {
            return Err(GlyphError::SchemaMismatch(format!(
                "glyph '{}' and delta hierarchies do not align",
                glyph.name()
            )));
        }

        let mut layers = Vec::with_capacity(glyph.layers().len());
        for (lg, ld) in glyph.layers().iter().zip(&delta.layers) {
            if lg.name != ld.name || lg.segments.len() != ld.segments.len() {
                return Err(GlyphError::SchemaMismatch(format!(
                    "layer '{}' and delta layer '{}' do not align",
                    lg.name, ld.name
                )));
            }

            let mut segments = Vec::with_capacity(lg.segments.len());
            for (sg, sd) in lg.segments.iter().zip(&ld.segments) {
                if sg.name != sd.name || sg.roles.len() != sd.roles.len() {
                    return Err(GlyphError::SchemaMismatch(format!(
                        "segment '{}' and delta segment '{}' do not align",
                        sg.name, sd.name
                    )));
                }

                let mut roles = Vec::with_capacity(sg.roles.len());
                for (rg, rd) in sg.roles.iter().zip(&sd.roles) {
                    if rg.name != rd.name {
                        return Err(GlyphError::SchemaMismatch(format!(
                            "role '{}' and delta role '{}' do not align",
                            rg.name, rd.name
                        )));
                    }
                    roles.push(RoleGlyph {
                        name: rg.name.clone(),
                        vector: apply_change(&rg.vector, &rd.vector)?,
                    });
                }

                segments.push(SegmentGlyph {
                    name: sg.name.clone(),
                    vector: apply_change(&sg.vector, &sd.vector)?,
                    roles,
                });
            }

            layers.push(LayerGlyph {
                name: lg.name.clone(),
                vector: apply_change(&lg.vector, &ld.vector)?,
                segments,
            });
        }

        let mut projected = Glyph::new(
            glyph.name(),
            glyph.space_id(),
            glyph.encoded_with_weights(),
            apply_change(glyph.cortex(), &delta.cortex)?,
            layers,
            None,
        );
        projected.set_created_at(glyph.created_at() + delta.interval());
        Ok(projected)
    }

    /// Derive a temporal edge between two chronological glyphs.
    pub fn create_edge(
        &self,
        from: &Glyph,
        to: &Glyph,
        edge_type: impl Into<String>,
    ) -> Result<crate::edges::TemporalEdge> {
        let delta = self.compute_delta(from, to)?;
        Ok(crate::edges::TemporalEdge {
            from: from.name().to_string(),
            to: to.name().to_string(),
            edge_type: edge_type.into(),
            interval_seconds: delta.interval().num_seconds(),
            delta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Concept;
    use crate::config::{EncoderConfig, LayerConfig, Role, SegmentConfig};
    use crate::encoder::Encoder;
    use std::sync::Arc;

    fn metric_config() -> Arc<EncoderConfig> {
        Arc::new(EncoderConfig::new(4096, 42).with_layers(vec![LayerConfig::new(
            "metrics",
            vec![SegmentConfig::new(
                "signups",
                vec![Role::new("value"), Role::new("change_pct")],
            )],
        )]))
    }

    fn snapshot(encoder: &Encoder, name: &str, value: &str, change: &str) -> Glyph {
        encoder
            .encode(
                &Concept::new(name)
                    .with_attribute("value", value)
                    .with_attribute("change_pct", change),
            )
            .unwrap()
    }

    #[test]
    fn test_delta_round_trip_bit_identical() {
        let encoder = Encoder::new(metric_config()).unwrap();
        let temporal = TemporalEncoder::new();

        let w1 = snapshot(&encoder, "signups_w1", "1000", "8");
        let w2 = snapshot(&encoder, "signups_w2", "1080", "8");

        let delta = temporal.compute_delta(&w1, &w2).unwrap();
        let rebuilt = temporal.apply_delta(&w1, &delta).unwrap();

        assert_eq!(rebuilt.cortex(), w2.cortex());
        for (rl, ol) in rebuilt.layers().iter().zip(w2.layers()) {
            assert_eq!(rl.vector, ol.vector);
            for (rs, os) in rl.segments.iter().zip(&ol.segments) {
                assert_eq!(rs.vector, os.vector);
                for (rr, or) in rs.roles.iter().zip(&os.roles) {
                    assert_eq!(rr.vector, or.vector);
                }
            }
        }
    }

    #[test]
    fn test_identity_delta() {
        let encoder = Encoder::new(metric_config()).unwrap();
        let temporal = TemporalEncoder::new();

        let w1 = snapshot(&encoder, "signups_w1", "1000", "8");
        let w1_again = snapshot(&encoder, "signups_w1", "1000", "8");

        // No change: applying the delta leaves every vector unchanged.
        let delta = temporal.compute_delta(&w1, &w1_again).unwrap();
        let projected = temporal.apply_delta(&w1, &delta).unwrap();
        assert_eq!(projected.cortex(), w1.cortex());
    }

    #[test]
    fn test_cross_space_rejected() {
        let enc_a = Encoder::new(metric_config()).unwrap();
        let config_b = Arc::new(EncoderConfig::new(4096, 7).with_layers(
            (*metric_config()).clone().layers,
        ));
        let enc_b = Encoder::new(config_b).unwrap();
        let temporal = TemporalEncoder::new();

        let a = snapshot(&enc_a, "w1", "1000", "8");
        let b = snapshot(&enc_b, "w2", "1080", "8");

        assert!(matches!(
            temporal.compute_delta(&a, &b),
            Err(GlyphError::IncompatibleSpace { .. })
        ));
    }

    #[test]
    fn test_misaligned_roles_rejected() {
        let encoder = Encoder::new(metric_config()).unwrap();
        let temporal = TemporalEncoder::new();

        let full = snapshot(&encoder, "w1", "1000", "8");
        let partial = encoder
            .encode(&Concept::new("w2").with_attribute("value", "1080"))
            .unwrap();

        assert!(matches!(
            temporal.compute_delta(&full, &partial),
            Err(GlyphError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_apply_delta_advances_timestamp() {
        let encoder = Encoder::new(metric_config()).unwrap();
        let temporal = TemporalEncoder::new();

        let w1 = snapshot(&encoder, "w1", "1000", "8");
        let w2 = snapshot(&encoder, "w2", "1080", "8");

        let delta = temporal.compute_delta(&w1, &w2).unwrap();
        let projected = temporal.apply_delta(&w2, &delta).unwrap();

        assert_ne!(projected.id(), w2.id());
        assert_eq!(
            projected.created_at(),
            w2.created_at() + delta.interval()
        );
    }

    #[test]
    fn test_create_edge() {
        let encoder = Encoder::new(metric_config()).unwrap();
        let temporal = TemporalEncoder::new();

        let w1 = snapshot(&encoder, "w1", "1000", "8");
        let w2 = snapshot(&encoder, "w2", "1080", "8");

        let edge = temporal.create_edge(&w1, &w2, "metric_transition").unwrap();
        assert_eq!(edge.from, "w1");
        assert_eq!(edge.to, "w2");
        assert_eq!(edge.edge_type, "metric_transition");
    }
}

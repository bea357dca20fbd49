//! Explainability edges derived from encoded glyphs.
//!
//! Spatial edges connect glyph pairs whose similarity clears a floor;
//! temporal edges chain chronological glyphs with their change deltas.
//! Both are consumed by serving layers to render explanation graphs.

use crate::error::Result;
use crate::glyph::Glyph;
use crate::similarity::SimilarityCalculator;
use crate::temporal::{TemporalDelta, TemporalEncoder};
use serde::{Deserialize, Serialize};

/// A similarity link between two glyphs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpatialEdge {
    pub from: String,
    pub to: String,
    pub score: f64,
    /// Whether the underlying comparison cleared the visibility threshold.
    pub visible: bool,
}

/// A chronological link between two glyphs carrying their delta.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemporalEdge {
    pub from: String,
    pub to: String,
    pub edge_type: String,
    pub interval_seconds: i64,
    pub delta: TemporalDelta,
}

/// Derives spatial and temporal edges from glyph collections.
#[derive(Clone, Copy, Debug, Default)]
pub struct EdgeGenerator;

impl EdgeGenerator {
    pub fn new() -> Self {
        Self
    }

    /// All unordered glyph pairs scoring at least `min_score`.
    ///
    /// Output is ordered by descending score, then by pair names, so edge
    /// sets are reproducible.
    pub fn spatial_edges(
        &self,
        glyphs: &[Glyph],
        calculator: &SimilarityCalculator,
        min_score: f64,
    ) -> Result<Vec<SpatialEdge>> {
        let mut edges = Vec::new();

        for (i, a) in glyphs.iter().enumerate() {
            for b in &glyphs[i + 1..] {
                let report = calculator.compute(a, b)?;
                if report.score >= min_score {
                    edges.push(SpatialEdge {
                        from: a.name().to_string(),
                        to: b.name().to_string(),
                        score: report.score,
                        visible: report.visible,
                    });
                }
            }
        }

        edges.sort_by(|x, y| {
            y.score
                .partial_cmp(&x.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| x.from.cmp(&y.from))
                .then_with(|| x.to.cmp(&y.to))
        });
        Ok(edges)
    }

    /// Chain a chronological glyph sequence into consecutive edges.
    pub fn temporal_edges(
        &self,
        glyphs: &[Glyph],
        edge_type: &str,
    ) -> Result<Vec<TemporalEdge>> {
        let temporal = TemporalEncoder::new();
        glyphs
            .windows(2)
            .map(|pair| temporal.create_edge(&pair[0], &pair[1], edge_type))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Concept;
    use crate::config::{EncoderConfig, LayerConfig, Role, SegmentConfig};
    use crate::encoder::Encoder;
    use std::sync::Arc;

    fn setup() -> (Encoder, SimilarityCalculator) {
        let config = Arc::new(EncoderConfig::new(4096, 42).with_layers(vec![LayerConfig::new(
            "content",
            vec![SegmentConfig::new(
                "identity",
                vec![Role::new("type"), Role::new("color")],
            )],
        )]));
        (
            Encoder::new(config.clone()).unwrap(),
            SimilarityCalculator::new(config).unwrap(),
        )
    }

    #[test]
    fn test_spatial_edges_sorted_and_filtered() {
        let (encoder, calculator) = setup();

        let glyphs = vec![
            encoder
                .encode(
                    &Concept::new("red car")
                        .with_attribute("type", "car")
                        .with_attribute("color", "red"),
                )
                .unwrap(),
            encoder
                .encode(
                    &Concept::new("red wagon")
                        .with_attribute("type", "wagon")
                        .with_attribute("color", "red"),
                )
                .unwrap(),
            encoder
                .encode(
                    &Concept::new("blue truck")
                        .with_attribute("type", "truck")
                        .with_attribute("color", "blue"),
                )
                .unwrap(),
        ];

        let edges = EdgeGenerator::new()
            .spatial_edges(&glyphs, &calculator, 0.3)
            .unwrap();

        assert!(!edges.is_empty());
        for pair in edges.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // Sharing a color scores above sharing structure alone.
        assert_eq!(edges[0].from, "red car");
        assert_eq!(edges[0].to, "red wagon");
        for edge in &edges {
            assert!(edge.score >= 0.3);
        }
    }

    #[test]
    fn test_temporal_chain() {
        let (encoder, _) = setup();

        let glyphs: Vec<Glyph> = ["red", "green", "blue"]
            .iter()
            .enumerate()
            .map(|(i, color)| {
                encoder
                    .encode(
                        &Concept::new(format!("car_{i}"))
                            .with_attribute("type", "car")
                            .with_attribute("color", *color),
                    )
                    .unwrap()
            })
            .collect();

        let edges = EdgeGenerator::new()
            .temporal_edges(&glyphs, "repaint")
            .unwrap();

        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].from, "car_0");
        assert_eq!(edges[0].to, "car_1");
        assert_eq!(edges[1].from, "car_1");
        assert_eq!(edges[1].to, "car_2");
        assert_eq!(edges[0].edge_type, "repaint");
    }
}

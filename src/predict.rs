//! Beam-search prediction over delta-extrapolated future glyph states.
//!
//! The search keeps an explicit bounded work-list of candidates, never
//! recursing, so pruning and tie-breaking stay auditable. Candidate
//! scoring is order-independent; survivor selection is a deterministic
//! serial sort: accumulated confidence first, then distance to the
//! nearest known vector, then insertion order.

use crate::algebra;
use crate::error::{GlyphError, Result};
use crate::glyph::{Glyph, HierarchyLevel};
use crate::similarity;
use crate::temporal::{apply_change, delta_between};
use crate::vector::Vector;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How many of the most recent deltas seed candidate expansion.
const DELTA_WINDOW: usize = 3;

/// One predicted future state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Prediction {
    pub vector: Vector,
    /// Accumulated confidence in [0, 1]: the product of per-step
    /// confidences along this candidate's path.
    pub confidence: f64,
    /// Closest known glyph by name, with its similarity.
    pub nearest: Option<(String, f64)>,
}

struct Candidate {
    vector: Vector,
    confidence: f64,
    /// Distance to the nearest known vector; breaks confidence ties.
    tie_distance: f64,
}

/// Searches the space of delta-extrapolated future states.
#[derive(Clone, Copy, Debug)]
pub struct BeamSearchPredictor {
    beam_width: usize,
    drift_reduction: bool,
}

impl BeamSearchPredictor {
    /// Fails with `InvalidBeamWidth` if `beam_width < 1`.
    pub fn new(beam_width: usize, drift_reduction: bool) -> Result<Self> {
        if beam_width < 1 {
            return Err(GlyphError::InvalidBeamWidth(beam_width));
        }
        Ok(Self {
            beam_width,
            drift_reduction,
        })
    }

    pub fn beam_width(&self) -> usize {
        self.beam_width
    }

    pub fn drift_reduction(&self) -> bool {
        self.drift_reduction
    }

    /// Predict `time_intervals` steps ahead of a chronological history.
    ///
    /// Returns at most `beam_width` predictions, most confident first.
    pub fn predict(
        &self,
        history: &[Glyph],
        time_intervals: usize,
        level: &HierarchyLevel,
    ) -> Result<Vec<Prediction>> {
        if history.len() < 2 {
            return Err(GlyphError::InsufficientHistory {
                got: history.len(),
            });
        }
        if time_intervals < 1 {
            return Err(GlyphError::Configuration(
                "time_intervals must be >= 1".to_string(),
            ));
        }

        let space_id = history[0].space_id();
        for glyph in &history[1..] {
            if glyph.space_id() != space_id {
                return Err(GlyphError::IncompatibleSpace {
                    left: space_id.to_string(),
                    right: glyph.space_id().to_string(),
                });
            }
        }

        let observed: Vec<&Vector> = history
            .iter()
            .map(|g| {
                g.vector_at(level).ok_or_else(|| {
                    GlyphError::SchemaMismatch(format!(
                        "glyph '{}' has no vector at the requested level",
                        g.name()
                    ))
                })
            })
            .collect::<Result<_>>()?;

        let deltas: Vec<Vector> = observed
            .windows(2)
            .map(|w| delta_between(w[0], w[1]))
            .collect::<Result<_>>()?;

        // Distinct recent deltas, oldest first, plus a recency-weighted
        // blend of the whole window.
        let window = &deltas[deltas.len().saturating_sub(DELTA_WINDOW)..];
        let mut expansion: Vec<Vector> = Vec::new();
        for delta in window {
            if !expansion.contains(delta) {
                expansion.push(delta.clone());
            }
        }
        if expansion.len() > 1 {
            let weighted: Vec<(&Vector, f64)> = window
                .iter()
                .enumerate()
                .map(|(i, d)| (d, (i + 1) as f64))
                .collect();
            let blended = algebra::weighted_bundle(&weighted)?;
            if !expansion.contains(&blended) {
                expansion.push(blended);
            }
        }

        let codebook: Vec<Vector> = observed.iter().map(|v| (*v).clone()).collect();
        let names: Vec<&str> = history.iter().map(|g| g.name()).collect();
        let last_delta = deltas.last().expect("history >= 2 yields >= 1 delta");

        let mut trend = apply_change(observed[observed.len() - 1], last_delta)?;
        let mut beam: Vec<Candidate> = vec![Candidate {
            vector: observed[observed.len() - 1].clone(),
            confidence: 1.0,
            tie_distance: 0.0,
        }];

        for step in 1..=time_intervals {
            let mut candidates: Vec<Candidate> = Vec::new();
            for entry in &beam {
                for delta in &expansion {
                    let vector = apply_change(&entry.vector, delta)?;
                    let step_confidence = similarity::cosine(&vector, &trend).max(0.0);
                    let confidence = (entry.confidence * step_confidence).clamp(0.0, 1.0);
                    let tie_distance = 1.0
                        - algebra::cleanup(&vector, &codebook)
                            .map(|(_, sim)| sim)
                            .unwrap_or(0.0);
                    candidates.push(Candidate {
                        vector,
                        confidence,
                        tie_distance,
                    });
                }
            }

            // Stable sort keeps insertion order as the final tiebreak.
            candidates.sort_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(
                        a.tie_distance
                            .partial_cmp(&b.tie_distance)
                            .unwrap_or(std::cmp::Ordering::Equal),
                    )
            });
            candidates.truncate(self.beam_width);

            if self.drift_reduction {
                for candidate in &mut candidates {
                    if let Some((idx, _)) = algebra::cleanup(&candidate.vector, &codebook) {
                        candidate.vector =
                            algebra::blend(&candidate.vector, &codebook[idx], 0.5)?;
                    }
                }
            }

            debug!(step, beam = candidates.len(), "beam step");
            beam = candidates;
            trend = apply_change(&trend, last_delta)?;
        }

        Ok(beam
            .into_iter()
            .map(|candidate| {
                let nearest = algebra::cleanup(&candidate.vector, &codebook)
                    .map(|(idx, sim)| (names[idx].to_string(), sim));
                Prediction {
                    vector: candidate.vector,
                    confidence: candidate.confidence,
                    nearest,
                }
            })
            .collect())
    }
}

//! # Glyphic: deterministic hyperdimensional encoding and reasoning
//!
//! Glyphic encodes discrete, attributed facts ("concepts") into
//! fixed-dimension high-dimensional vectors ("glyphs") and supports
//! deterministic, explainable similarity search, fact verification, and
//! temporal prediction over them. Everything is reproducible from a seed:
//! the same concept under the same configuration always encodes to the
//! same vectors, so an answer can be audited instead of trusted.
//!
//! ## Quick start
//!
//! ```rust
//! use glyphic::{Concept, EncoderConfig, GlyphModel, LayerConfig, Role, SegmentConfig};
//!
//! let config = EncoderConfig::new(2048, 42).with_layers(vec![LayerConfig::new(
//!     "content",
//!     vec![SegmentConfig::new(
//!         "identity",
//!         vec![Role::new("type"), Role::new("color")],
//!     )],
//! )]);
//!
//! let mut model = GlyphModel::new(config)?;
//! model.encode(
//!     &Concept::new("red car")
//!         .with_attribute("type", "car")
//!         .with_attribute("color", "red"),
//! )?;
//! model.encode(
//!     &Concept::new("blue truck")
//!         .with_attribute("type", "truck")
//!         .with_attribute("color", "blue"),
//! )?;
//!
//! // Identical concepts score 1.0; shared structure scores in between.
//! let report = model.compare("red car", "blue truck")?;
//! assert!(report.score < 1.0);
//!
//! // Free text routes through the rules-first intent matcher.
//! let intent = model.match_intent("find similar to red car").unwrap();
//! assert_eq!(intent.intent_type, "similarity_search");
//! # Ok::<(), glyphic::GlyphError>(())
//! ```
//!
//! ## Core concepts
//!
//! - **Symbols**: deterministic pseudo-random bipolar vectors keyed by
//!   `(seed, key)` — [`SymbolGenerator`]
//! - **Bind**: role–value association, self-inverse — [`algebra::bind`]
//! - **Bundle**: majority-vote superposition — [`algebra::bundle`]
//! - **Glyph**: the per-level encoded record of a concept — [`Glyph`]
//! - **Fact tree**: per-level explanation of a score with citations —
//!   [`FactTree`]
//! - **Temporal delta**: invertible change vector between glyphs —
//!   [`TemporalDelta`]
//!
//! The core performs no I/O and holds no global state; the symbol cache
//! is the only synchronized resource. Serving, persistence, and fallback
//! layers are external collaborators.

pub mod algebra;
pub mod concept;
pub mod config;
pub mod edges;
pub mod encoder;
pub mod error;
pub mod fact_tree;
pub mod glyph;
pub mod intent;
pub mod model;
pub mod predict;
pub mod similarity;
pub mod symbol;
pub mod temporal;
pub mod vector;

pub use concept::{Concept, Relationship};
pub use config::{EncoderConfig, LayerConfig, Role, SegmentConfig};
pub use edges::{EdgeGenerator, SpatialEdge, TemporalEdge};
pub use encoder::Encoder;
pub use error::{GlyphError, Result};
pub use fact_tree::{Citation, FactLevel, FactNode, FactTree};
pub use glyph::{Glyph, HierarchyLevel, LayerGlyph, RoleGlyph, SegmentGlyph};
pub use intent::{IntentEncoder, IntentMatch, IntentPattern};
pub use model::{GlyphModel, SearchResult};
pub use predict::{BeamSearchPredictor, Prediction};
pub use similarity::{
    Metric, ScoreAggregation, SimilarityCalculator, SimilarityOptions, SimilarityReport,
    SCORE_AGGREGATION,
};
pub use symbol::{SymbolCache, SymbolGenerator};
pub use temporal::{TemporalDelta, TemporalEncoder};
pub use vector::Vector;

//! Error types for glyphic.
//!
//! Every failure in the core is a local, synchronous, typed error scoped to
//! the single encode/compute/predict call that raised it. The core never
//! retries and never substitutes a default vector for a missing required
//! value. An intent that fails to match is `None`, not an error.

use thiserror::Error;

/// Glyphic error types.
#[derive(Error, Debug)]
pub enum GlyphError {
    /// Invalid dimension, out-of-range weight, or malformed schema.
    /// Rejected before any encoding happens.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A role marked `primary_id` has no value on the concept being encoded.
    #[error("concept '{concept}' is missing required attribute for role '{role}'")]
    MissingAttribute { concept: String, role: String },

    /// Operand vectors have different widths.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Operand glyphs belong to different vector spaces and cannot be compared.
    #[error("incompatible vector spaces: '{left}' vs '{right}'")]
    IncompatibleSpace { left: String, right: String },

    /// Temporal operation across glyphs whose hierarchies do not align.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Empty input where at least one element was required.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Prediction requires at least two historical glyphs.
    #[error("insufficient history: need at least 2 glyphs, got {got}")]
    InsufficientHistory { got: usize },

    /// Beam width must be at least 1.
    #[error("invalid beam width: {0} (must be >= 1)")]
    InvalidBeamWidth(usize),

    /// A name was not found in an in-memory glyph store.
    #[error("unknown concept: {0}")]
    UnknownConcept(String),
}

/// Result type alias for glyphic operations.
pub type Result<T> = std::result::Result<T, GlyphError>;

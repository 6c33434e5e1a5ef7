//! Scoring & candidate engine: sub-scores, weighted composite, confidence,
//! constraint filtering, deterministic ordering, and rail composition.

pub mod engine;
pub mod rails;
pub mod scoring;
pub mod weights;

/// Default number of items returned by a ranking request.
pub const DEFAULT_LIMIT: usize = 12;

/// Items whose confidence falls below this default are kept out of the
/// primary candidate set (overridable via configuration).
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.35;

/// Composite-score floor for the primary candidate set.
pub const DEFAULT_MIN_SCORE: f64 = 0.30;

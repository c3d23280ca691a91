//! Model wrapper crate - the two pretrained capabilities the bot delegates to.
//!
//! Nothing here trains or tunes anything. The crate wraps:
//! - a sentence-transformer embedding model (intent scoring),
//! - an NLI cross-encoder used for zero-shot course classification,
//!
//! each behind a trait with an ONNX Runtime backend for production and a
//! deterministic mock for tests, plus the intent scorer built on top of
//! the embedding service.

pub mod classifier;
pub mod embedding;
pub mod intent;

pub use classifier::{
    Classification, DynZeroShotClassifier, MockClassifier, OnnxNliClassifier, ZeroShotClassifier,
};
pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding, OnnxEmbeddingService};
pub use intent::{IntentScorer, DEFAULT_INTENT_THRESHOLD, POSITIVE_INTENTS};

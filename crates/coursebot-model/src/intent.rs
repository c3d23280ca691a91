//! Affirmation intent scoring.
//!
//! Decides whether free text answers "yes" to the bot's last question by
//! comparing its embedding against a fixed set of affirmative reference
//! phrases. The reference set is embedded once at construction; only the
//! user's input is embedded per call.

use std::sync::Arc;

use coursebot_core::error::Result;
use coursebot_core::types::Embedding;
use tracing::debug;

use crate::embedding::DynEmbeddingService;

/// Reference phrases treated as affirmative answers.
pub const POSITIVE_INTENTS: [&str; 10] = [
    "yes",
    "sure",
    "okay",
    "why not",
    "go ahead",
    "i want to see",
    "definitely",
    "of course",
    "yeah",
    "show me",
];

/// Default cosine-similarity threshold for a positive verdict.
pub const DEFAULT_INTENT_THRESHOLD: f64 = 0.65;

/// Embedding-similarity yes/no detector with precomputed reference vectors.
pub struct IntentScorer {
    embedder: Arc<dyn DynEmbeddingService>,
    reference: Vec<Embedding>,
    threshold: f64,
}

impl std::fmt::Debug for IntentScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentScorer")
            .field("reference_phrases", &self.reference.len())
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl IntentScorer {
    /// Build a scorer, embedding every reference phrase up front.
    ///
    /// Fails if any reference embedding fails; a scorer with a partial
    /// reference set would silently skew every later verdict.
    pub async fn new(embedder: Arc<dyn DynEmbeddingService>, threshold: f64) -> Result<Self> {
        let mut reference = Vec::with_capacity(POSITIVE_INTENTS.len());
        for phrase in POSITIVE_INTENTS {
            let vector = embedder.embed_boxed(phrase).await?;
            reference.push(Embedding(vector));
        }
        Ok(Self {
            embedder,
            reference,
            threshold,
        })
    }

    /// True iff the text's best similarity against the reference set
    /// exceeds the threshold. Embedding failures are fatal to the turn;
    /// there is no retry.
    pub async fn is_positive(&self, text: &str) -> Result<bool> {
        let vector = Embedding(self.embedder.embed_boxed(text).await?);
        let best = self
            .reference
            .iter()
            .map(|r| vector.cosine_similarity(r))
            .fold(f64::NEG_INFINITY, f64::max);
        debug!(similarity = best, threshold = self.threshold, "Intent scored");
        Ok(best > self.threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

//! Shared value types used across the workspace.

use serde::{Deserialize, Serialize};

// =============================================================================
// Chat roles
// =============================================================================

/// Who produced a line of conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

// =============================================================================
// Embedding
// =============================================================================

/// A dense embedding vector produced by a sentence-transformer model.
///
/// Dimensionality depends on the loaded model (384 for MiniLM-class
/// models); the only hard invariant is non-emptiness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn new(data: Vec<f32>) -> std::result::Result<Self, &'static str> {
        if data.is_empty() {
            return Err("Embedding must not be empty");
        }
        Ok(Self(data))
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Cosine similarity in f64 to avoid accumulating f32 rounding error.
    ///
    /// Returns 0.0 when either vector has zero magnitude.
    pub fn cosine_similarity(&self, other: &Embedding) -> f64 {
        let dot: f64 = self
            .0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (*a as f64) * (*b as f64))
            .sum();
        let mag_a: f64 = self.0.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        let mag_b: f64 = other
            .0
            .iter()
            .map(|x| (*x as f64).powi(2))
            .sum::<f64>()
            .sqrt();
        if mag_a == 0.0 || mag_b == 0.0 {
            return 0.0;
        }
        dot / (mag_a * mag_b)
    }
}

// =============================================================================
// Match score
// =============================================================================

/// Classifier confidence for a course match. Range: 0.0 to 1.0.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MatchScore(pub f64);

impl MatchScore {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Score rounded to four decimal places, as recorded in the log.
    pub fn rounded(&self) -> f64 {
        (self.0 * 10_000.0).round() / 10_000.0
    }
}

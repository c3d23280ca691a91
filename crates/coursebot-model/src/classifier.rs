//! Zero-shot course classification.
//!
//! - `OnnxNliClassifier` runs an NLI cross-encoder (bart-large-mnli style)
//!   once per candidate label, scoring the entailment of
//!   "This text is about {label}." against the user's text, then
//!   softmaxing the entailment logits across labels.
//! - `MockClassifier` scores by token overlap for tests.
//!
//! The full candidate set (every course in the catalog) is passed on every
//! call; nothing is cached across calls.

use std::path::Path;
use std::sync::{Arc, Mutex};

use coursebot_core::error::CoursebotError;
use ort::session::Session;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::embedding::{encode_pair, load_session, run_session};

/// Logit index of the entailment class in MNLI-style model outputs
/// (contradiction=0, neutral=1, entailment=2).
const ENTAILMENT_INDEX: usize = 2;

/// Ranked classification result: `labels[0]` / `scores[0]` is the best
/// match. Scores are softmax-normalized across the candidate set, so they
/// lie in [0, 1] and sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

impl Classification {
    /// The single highest-scoring label and its score.
    ///
    /// `None` when the labels or scores are empty; the fields are public,
    /// so mismatched lengths must not panic.
    pub fn top_label(&self) -> Option<(&str, f64)> {
        self.labels
            .first()
            .zip(self.scores.first())
            .map(|(label, score)| (label.as_str(), *score))
    }
}

/// Service mapping free text onto one of a set of candidate labels.
pub trait ZeroShotClassifier: Send + Sync {
    /// Classify `text` against `labels`, returning candidates ordered by
    /// descending score. Fails with `EmptyCatalog` when `labels` is empty.
    fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> impl std::future::Future<Output = Result<Classification, CoursebotError>> + Send;
}

/// Object-safe twin of [`ZeroShotClassifier`], with a blanket impl.
pub trait DynZeroShotClassifier: Send + Sync {
    fn classify_boxed<'a>(
        &'a self,
        text: &'a str,
        labels: &'a [String],
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Classification, CoursebotError>> + Send + 'a>,
    >;
}

impl<T: ZeroShotClassifier> DynZeroShotClassifier for T {
    fn classify_boxed<'a>(
        &'a self,
        text: &'a str,
        labels: &'a [String],
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Classification, CoursebotError>> + Send + 'a>,
    > {
        Box::pin(self.classify(text, labels))
    }
}

/// Sort parallel label/score vectors by descending score.
fn rank(labels: Vec<String>, scores: Vec<f64>) -> Classification {
    let mut paired: Vec<(String, f64)> = labels.into_iter().zip(scores).collect();
    // Ties keep the underlying model's ordering (stable sort).
    paired.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let (labels, scores) = paired.into_iter().unzip();
    Classification { labels, scores }
}

/// Numerically stable softmax.
fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

// ---------------------------------------------------------------------------
// OnnxNliClassifier
// ---------------------------------------------------------------------------

/// ONNX Runtime-backed zero-shot classifier over an NLI cross-encoder.
///
/// Expects a model directory containing `model.onnx` and `tokenizer.json`.
/// One forward pass per candidate label; cost grows linearly with the
/// catalog size, which is acceptable for a few hundred courses.
pub struct OnnxNliClassifier {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    hypothesis_template: String,
}

// ort::Session is Send + Sync internally (Arc<SharedSessionInner>).
unsafe impl Send for OnnxNliClassifier {}
unsafe impl Sync for OnnxNliClassifier {}

impl std::fmt::Debug for OnnxNliClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxNliClassifier")
            .field("hypothesis_template", &self.hypothesis_template)
            .finish()
    }
}

impl OnnxNliClassifier {
    /// Load from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn from_directory(model_dir: &Path, hypothesis_template: &str) -> Result<Self, CoursebotError> {
        let model_path = model_dir.join("model.onnx");
        let (session, tokenizer) = load_session(&model_path, &model_dir.join("tokenizer.json"))?;

        info!(
            model = %model_path.display(),
            template = hypothesis_template,
            "Loaded ONNX NLI classifier"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            hypothesis_template: hypothesis_template.to_string(),
        })
    }

    fn classify_sync(&self, text: &str, labels: &[String]) -> Result<Classification, CoursebotError> {
        let mut entailment_logits = Vec::with_capacity(labels.len());

        for label in labels {
            let hypothesis = self.hypothesis_template.replace("{}", label);
            let input = encode_pair(&self.tokenizer, text, &hypothesis)?;
            let (shape, logits) = run_session(&self.session, &input)?;

            let class_count = *shape.last().unwrap_or(&0) as usize;
            if class_count <= ENTAILMENT_INDEX {
                return Err(CoursebotError::Model(format!(
                    "NLI output has {} classes, expected at least {}",
                    class_count,
                    ENTAILMENT_INDEX + 1
                )));
            }
            entailment_logits.push(logits[ENTAILMENT_INDEX] as f64);
        }

        let scores = softmax(&entailment_logits);
        let ranked = rank(labels.to_vec(), scores);
        debug!(
            top = ranked.labels.first().map(String::as_str).unwrap_or(""),
            "Zero-shot classification complete"
        );
        Ok(ranked)
    }
}

impl ZeroShotClassifier for OnnxNliClassifier {
    async fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<Classification, CoursebotError> {
        if labels.is_empty() {
            return Err(CoursebotError::EmptyCatalog);
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let template = self.hypothesis_template.clone();
        let text_owned = text.to_string();
        let labels_owned = labels.to_vec();

        tokio::task::spawn_blocking(move || {
            let svc = OnnxNliClassifier {
                session,
                tokenizer,
                hypothesis_template: template,
            };
            svc.classify_sync(&text_owned, &labels_owned)
        })
        .await
        .map_err(|e| CoursebotError::Model(format!("classification task panicked: {}", e)))?
    }
}

// ---------------------------------------------------------------------------
// MockClassifier
// ---------------------------------------------------------------------------

/// Deterministic mock classifier scoring labels by case-insensitive token
/// overlap with the input text, softmax-normalized like the real backend.
///
/// "I like biology" therefore beats every non-overlapping label for a
/// candidate named "Biology", which is enough structure for conversation
/// tests.
#[derive(Debug, Clone, Default)]
pub struct MockClassifier;

impl MockClassifier {
    pub fn new() -> Self {
        Self
    }

    fn overlap(text: &str, label: &str) -> f64 {
        let text_tokens: Vec<String> = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        let label_tokens: Vec<String> = label
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if label_tokens.is_empty() {
            return 0.0;
        }
        let hits = label_tokens
            .iter()
            .filter(|lt| text_tokens.iter().any(|tt| tt == *lt))
            .count();
        // Scale into logit territory so softmax separates hits clearly.
        (hits as f64 / label_tokens.len() as f64) * 8.0
    }
}

impl ZeroShotClassifier for MockClassifier {
    async fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<Classification, CoursebotError> {
        if labels.is_empty() {
            return Err(CoursebotError::EmptyCatalog);
        }
        let logits: Vec<f64> = labels.iter().map(|l| Self::overlap(text, l)).collect();
        Ok(rank(labels.to_vec(), softmax(&logits)))
    }
}

//! Embedding service trait and implementations.
//!
//! - `OnnxEmbeddingService` runs a sentence-transformer ONNX export (e.g.
//!   all-MiniLM-L6-v2) via ort, tokenizing with the HuggingFace tokenizers
//!   crate. Production backend for the intent scorer.
//! - `MockEmbedding` produces deterministic hash-based unit vectors so
//!   tests never need model files.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex};

use coursebot_core::error::CoursebotError;
use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::Tokenizer;
use tracing::info;

/// Shorthand for wrapping backend failures. Model calls have no retry
/// policy; the error surfaces to the caller of the current turn.
fn model_err(context: &str, detail: impl std::fmt::Display) -> CoursebotError {
    CoursebotError::Model(format!("{}: {}", context, detail))
}

/// Service for turning text into a semantic vector.
pub trait EmbeddingService: Send + Sync {
    /// Embed the given text into a fixed-dimensional vector.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, CoursebotError>> + Send;

    /// Dimensionality of the vectors this service produces.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// `EmbeddingService::embed` returns `impl Future`, which is not
/// object-safe; this twin boxes the future so `Arc<dyn DynEmbeddingService>`
/// can be stored without generics. A blanket impl covers every
/// `EmbeddingService`.
pub trait DynEmbeddingService: Send + Sync {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, CoursebotError>> + Send + 'a>,
    >;

    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, CoursebotError>> + Send + 'a>,
    > {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

// ---------------------------------------------------------------------------
// Shared tokenization helper (also used by the NLI classifier)
// ---------------------------------------------------------------------------

/// Encoded model inputs for a batch of one.
pub(crate) struct EncodedInput {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

impl EncodedInput {
    pub(crate) fn seq_len(&self) -> usize {
        self.input_ids.len()
    }
}

pub(crate) fn encode_single(tokenizer: &Tokenizer, text: &str) -> Result<EncodedInput, CoursebotError> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| model_err("tokenization failed", e))?;
    Ok(from_encoding(&encoding))
}

pub(crate) fn encode_pair(
    tokenizer: &Tokenizer,
    premise: &str,
    hypothesis: &str,
) -> Result<EncodedInput, CoursebotError> {
    let encoding = tokenizer
        .encode((premise, hypothesis), true)
        .map_err(|e| model_err("pair tokenization failed", e))?;
    Ok(from_encoding(&encoding))
}

fn from_encoding(encoding: &tokenizers::Encoding) -> EncodedInput {
    EncodedInput {
        input_ids: encoding.get_ids().iter().map(|&id| id as i64).collect(),
        attention_mask: encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect(),
        token_type_ids: encoding.get_type_ids().iter().map(|&t| t as i64).collect(),
    }
}

/// Run one forward pass and return the flat f32 output plus its shape.
pub(crate) fn run_session(
    session: &Mutex<Session>,
    input: &EncodedInput,
) -> Result<(Vec<i64>, Vec<f32>), CoursebotError> {
    let seq_len = input.seq_len();

    let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input.input_ids.clone())
        .map_err(|e| model_err("input_ids array", e))?;
    let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), input.attention_mask.clone())
        .map_err(|e| model_err("attention_mask array", e))?;
    let type_array = ndarray::Array2::from_shape_vec((1, seq_len), input.token_type_ids.clone())
        .map_err(|e| model_err("token_type_ids array", e))?;

    let ids_ref = TensorRef::from_array_view(&ids_array)
        .map_err(|e| model_err("TensorRef input_ids", e))?;
    let mask_ref = TensorRef::from_array_view(&mask_array)
        .map_err(|e| model_err("TensorRef attention_mask", e))?;
    let type_ref = TensorRef::from_array_view(&type_array)
        .map_err(|e| model_err("TensorRef token_type_ids", e))?;

    let mut session = session
        .lock()
        .map_err(|e| model_err("session lock poisoned", e))?;
    let outputs = session
        .run(ort::inputs![ids_ref, mask_ref, type_ref])
        .map_err(|e| model_err("inference failed", e))?;

    let (shape, data) = outputs[0]
        .try_extract_tensor::<f32>()
        .map_err(|e| model_err("extract output tensor", e))?;

    Ok((shape.iter().copied().collect(), data.to_vec()))
}

/// Build an ort session from a model directory holding `model.onnx` and
/// `tokenizer.json`.
pub(crate) fn load_session(
    model_path: &Path,
    tokenizer_path: &Path,
) -> Result<(Session, Tokenizer), CoursebotError> {
    if !model_path.exists() {
        return Err(model_err("ONNX model not found", model_path.display()));
    }
    if !tokenizer_path.exists() {
        return Err(model_err("tokenizer not found", tokenizer_path.display()));
    }

    let session = Session::builder()
        .map_err(|e| model_err("ONNX session builder", e))?
        .with_intra_threads(1)
        .map_err(|e| model_err("ONNX set threads", e))?
        .commit_from_file(model_path)
        .map_err(|e| model_err("ONNX load model", e))?;

    let tokenizer =
        Tokenizer::from_file(tokenizer_path).map_err(|e| model_err("load tokenizer", e))?;

    Ok((session, tokenizer))
}

// ---------------------------------------------------------------------------
// OnnxEmbeddingService
// ---------------------------------------------------------------------------

/// ONNX Runtime-backed sentence-transformer embedding service.
///
/// Expects a model directory containing `model.onnx` and `tokenizer.json`.
/// The model takes `input_ids`, `attention_mask`, and `token_type_ids` and
/// produces token-level embeddings of shape `[1, seq_len, hidden_dim]`;
/// masked mean pooling and L2 normalization yield one unit vector per call.
pub struct OnnxEmbeddingService {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    dimensions: usize,
}

// ort::Session is Send + Sync internally (Arc<SharedSessionInner>).
unsafe impl Send for OnnxEmbeddingService {}
unsafe impl Sync for OnnxEmbeddingService {}

impl std::fmt::Debug for OnnxEmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingService")
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl OnnxEmbeddingService {
    /// Load from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn from_directory(model_dir: &Path) -> Result<Self, CoursebotError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let (session, tokenizer) = load_session(&model_path, &tokenizer_path)?;

        // Infer output width from the model; MiniLM-class models are 384.
        let dimensions = session
            .outputs()
            .first()
            .and_then(|out| out.dtype().tensor_shape())
            .and_then(|shape| shape.last().copied())
            .map(|d| if d > 0 { d as usize } else { 384 })
            .unwrap_or(384);

        info!(
            model = %model_path.display(),
            dimensions,
            "Loaded ONNX embedding model"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            dimensions,
        })
    }

    fn embed_sync(&self, text: &str) -> Result<Vec<f32>, CoursebotError> {
        // Empty text is valid input: the tokenizer still emits the special
        // tokens, and downstream it simply scores as unrelated.
        let input = encode_single(&self.tokenizer, text)?;
        let (shape, data) = run_session(&self.session, &input)?;

        if shape.len() < 2 {
            return Err(model_err("unexpected output shape", format!("{:?}", shape)));
        }
        let hidden_dim = *shape.last().unwrap_or(&0) as usize;

        // Masked mean pooling over the sequence dimension.
        let mut pooled = vec![0.0f32; hidden_dim];
        let mut count = 0.0f32;
        for (tok_idx, &mask_val) in input.attention_mask.iter().enumerate() {
            if mask_val > 0 {
                let offset = tok_idx * hidden_dim;
                for dim in 0..hidden_dim {
                    pooled[dim] += data[offset + dim];
                }
                count += 1.0;
            }
        }
        if count > 0.0 {
            for val in &mut pooled {
                *val /= count;
            }
        }

        // L2 normalize.
        let norm: f32 = pooled.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut pooled {
                *val /= norm;
            }
        }

        Ok(pooled)
    }
}

impl EmbeddingService for OnnxEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CoursebotError> {
        // Inference is CPU-bound; keep it off the async executor.
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let dims = self.dimensions;
        let text_owned = text.to_string();

        tokio::task::spawn_blocking(move || {
            let svc = OnnxEmbeddingService {
                session,
                tokenizer,
                dimensions: dims,
            };
            svc.embed_sync(&text_owned)
        })
        .await
        .map_err(|e| model_err("embedding task panicked", e))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding
// ---------------------------------------------------------------------------

/// Deterministic 384-dimensional mock embedding.
///
/// Vectors are derived from a hash of the input text, so identical inputs
/// always embed identically (cosine 1.0) while distinct inputs land in
/// effectively random directions (cosine near 0). That is exactly the
/// geometry the intent scorer's threshold test needs.
#[derive(Debug, Clone, Default)]
pub struct MockEmbedding;

impl MockEmbedding {
    pub fn new() -> Self {
        Self
    }

    fn hash_to_vector(text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(384);
        for i in 0..384 {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        // Unit-normalize to match the production backend.
        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }

        result
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CoursebotError> {
        Ok(Self::hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        384
    }
}

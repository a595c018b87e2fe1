use async_trait::async_trait;
use thiserror::Error;
use touchline_core::embedding::deterministic_embedding;
use touchline_core::error::{ErrorCode, TouchlineError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Request(String),
    #[error("embedding response malformed: {0}")]
    Response(String),
    #[error("model {model} returned {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },
}

impl TouchlineError for EmbedError {
    fn error_code(&self) -> ErrorCode {
        match self {
            EmbedError::Request(_) => ErrorCode::Unavailable,
            EmbedError::Response(_) | EmbedError::DimensionMismatch { .. } => ErrorCode::Internal,
        }
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Name of the underlying encoder, e.g. `all-MiniLM-L6-v2`.
    fn model_name(&self) -> &str;

    /// Declared output dimensionality.
    fn dimensions(&self) -> usize;
}

/// Offline encoder: hashed character trigrams, stable across runs.
pub struct DeterministicEmbedder {
    model_name: String,
    dims: usize,
}

impl DeterministicEmbedder {
    pub fn new(model_name: impl Into<String>, dims: usize) -> Self {
        Self {
            model_name: model_name.into(),
            dims: dims.max(1),
        }
    }
}

#[async_trait]
impl Embedder for DeterministicEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(deterministic_embedding(text, &self.model_name, self.dims))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

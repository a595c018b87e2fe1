use crate::embedder::{EmbedError, Embedder};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Memoizes embeddings per input text. Once full, new texts are embedded but not stored.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    entries: DashMap<String, Vec<f32>>,
    max_entries: usize,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, max_entries: usize) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if let Some(hit) = self.entries.get(text) {
            return Ok(hit.value().clone());
        }

        let vector = self.inner.embed(text).await?;
        if self.entries.len() < self.max_entries {
            self.entries.insert(text.to_string(), vector.clone());
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

use std::collections::BTreeMap;
use touchline_core::embedding::cosine_similarity;

/// Linear-scan nearest-neighbour index over named vectors.
///
/// Mirrors the `db.index.vector.queryNodes` contract for the in-memory backend.
#[derive(Debug, Clone, Default)]
pub struct LinearAnnIndex {
    embeddings: BTreeMap<String, Vec<f32>>,
}

impl LinearAnnIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, embedding: Vec<f32>) {
        self.embeddings.insert(name.into(), embedding);
    }

    pub fn delete(&mut self, name: &str) -> bool {
        self.embeddings.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.embeddings.get(name).map(Vec::as_slice)
    }

    /// Top-k by cosine similarity, best first. Ties keep name order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        let mut scores: Vec<(String, f32)> = self
            .embeddings
            .iter()
            .filter_map(|(name, emb)| {
                cosine_similarity(query, emb).map(|score| (name.clone(), score))
            })
            .collect();

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(k);
        scores
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

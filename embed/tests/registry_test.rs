use embed::{DeterministicEmbedder, EmbedError, Embedder, EmbedderRegistry, RegistryError};
use std::sync::Arc;
use touchline_core::config::EmbeddingConfig;
use touchline_core::embedding::cosine_similarity;
use touchline_core::model::EmbeddingModel;

struct FixedEmbedder {
    vector: Vec<f32>,
}

#[async_trait::async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.vector.clone())
    }

    fn model_name(&self) -> &str {
        "fixed"
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

#[tokio::test]
async fn test_registry_binds_each_model_to_its_index() {
    let mut registry = EmbedderRegistry::new();
    registry
        .register(
            EmbeddingModel::B,
            Arc::new(FixedEmbedder {
                vector: vec![0.5; 768],
            }),
        )
        .unwrap();

    let resolved = registry.resolve(EmbeddingModel::B).unwrap();
    assert_eq!(resolved.index_name, "player_idx_b");
    assert_eq!(resolved.embedding_property, "embedding_b");
    assert_eq!(resolved.embedder.embed("anything").await.unwrap().len(), 768);

    assert_eq!(
        registry.resolve(EmbeddingModel::A).err(),
        Some(RegistryError::ModelNotFound(EmbeddingModel::A))
    );
}

#[tokio::test]
async fn test_registry_from_default_config_uses_deterministic_backend() {
    let registry = EmbedderRegistry::from_config(&EmbeddingConfig::default()).unwrap();

    let a = registry.resolve(EmbeddingModel::A).unwrap();
    let b = registry.resolve(EmbeddingModel::B).unwrap();
    assert_eq!(a.embedder.model_name(), "all-MiniLM-L6-v2");
    assert_eq!(b.embedder.model_name(), "all-mpnet-base-v2");
    assert_eq!(a.embedder.embed("Kane").await.unwrap().len(), 384);
    assert_eq!(b.embedder.embed("Kane").await.unwrap().len(), 768);
}

#[tokio::test]
async fn test_deterministic_models_keep_typos_close() {
    let embedder = DeterministicEmbedder::new("all-mpnet-base-v2", 768);
    let name = embedder.embed("Gabriel Martinelli").await.unwrap();
    let typo = embedder.embed("Gabriel Martineli").await.unwrap();

    assert!(cosine_similarity(&name, &typo).unwrap() > 0.70);
}

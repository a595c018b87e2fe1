use crate::cache::CachedEmbedder;
use crate::embedder::{DeterministicEmbedder, Embedder};
use crate::http::HttpEmbedder;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use touchline_core::config::{EmbeddingBackend, EmbeddingConfig};
use touchline_core::error::{ErrorCode, TouchlineError};
use touchline_core::model::EmbeddingModel;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no embedder registered for model {0}")]
    ModelNotFound(EmbeddingModel),
    #[error("embedder already registered for model {0}")]
    ModelAlreadyRegistered(EmbeddingModel),
    #[error("embedding backend {0:?} requires an endpoint")]
    MissingEndpoint(EmbeddingBackend),
}

impl TouchlineError for RegistryError {
    fn error_code(&self) -> ErrorCode {
        match self {
            RegistryError::ModelNotFound(_) => ErrorCode::FailedPrecondition,
            RegistryError::ModelAlreadyRegistered(_) | RegistryError::MissingEndpoint(_) => {
                ErrorCode::InvalidArgument
            }
        }
    }
}

/// An embedder together with the vector index and node property it feeds.
#[derive(Clone)]
pub struct ResolvedEmbedder {
    pub model: EmbeddingModel,
    pub index_name: &'static str,
    pub embedding_property: &'static str,
    pub embedder: Arc<dyn Embedder>,
}

#[derive(Default, Clone)]
pub struct EmbedderRegistry {
    models: HashMap<EmbeddingModel, Arc<dyn Embedder>>,
}

impl EmbedderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        model: EmbeddingModel,
        embedder: Arc<dyn Embedder>,
    ) -> Result<(), RegistryError> {
        if self.models.contains_key(&model) {
            return Err(RegistryError::ModelAlreadyRegistered(model));
        }
        if embedder.dimensions() != model.dimensions() {
            tracing::warn!(
                model = %model,
                declared = embedder.dimensions(),
                expected = model.dimensions(),
                "embedder width differs from the model's nominal dimensionality"
            );
        }
        self.models.insert(model, embedder);
        Ok(())
    }

    pub fn resolve(&self, model: EmbeddingModel) -> Result<ResolvedEmbedder, RegistryError> {
        let embedder = self
            .models
            .get(&model)
            .cloned()
            .ok_or(RegistryError::ModelNotFound(model))?;

        Ok(ResolvedEmbedder {
            model,
            index_name: model.index_name(),
            embedding_property: model.embedding_property(),
            embedder,
        })
    }

    pub fn is_registered(&self, model: EmbeddingModel) -> bool {
        self.models.contains_key(&model)
    }

    /// Register both models from configuration, each behind its own cache.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        for model in EmbeddingModel::ALL {
            let model_config = config.model(model);
            let base: Arc<dyn Embedder> = match config.backend {
                EmbeddingBackend::Deterministic => Arc::new(DeterministicEmbedder::new(
                    model_config.name.clone(),
                    model_config.dimensions,
                )),
                EmbeddingBackend::Http => {
                    let endpoint = config
                        .endpoint
                        .clone()
                        .ok_or(RegistryError::MissingEndpoint(config.backend))?;
                    Arc::new(HttpEmbedder::new(
                        endpoint,
                        config.api_key.clone(),
                        model_config.name.clone(),
                        model_config.dimensions,
                    ))
                }
            };

            registry.register(model, Arc::new(CachedEmbedder::new(base, config.cache_entries)))?;
        }

        Ok(registry)
    }

    /// Both models backed by the offline deterministic encoder.
    pub fn deterministic() -> Self {
        let mut registry = Self::new();
        for model in EmbeddingModel::ALL {
            registry.models.insert(
                model,
                Arc::new(DeterministicEmbedder::new(
                    model.default_model_name(),
                    model.dimensions(),
                )),
            );
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = EmbedderRegistry::new();
        registry
            .register(
                EmbeddingModel::A,
                Arc::new(DeterministicEmbedder::new("all-MiniLM-L6-v2", 384)),
            )
            .unwrap();

        let err = registry
            .register(
                EmbeddingModel::A,
                Arc::new(DeterministicEmbedder::new("all-MiniLM-L6-v2", 384)),
            )
            .unwrap_err();

        assert_eq!(err, RegistryError::ModelAlreadyRegistered(EmbeddingModel::A));
    }

    #[test]
    fn test_http_backend_without_endpoint_is_rejected() {
        let config = EmbeddingConfig {
            backend: EmbeddingBackend::Http,
            ..EmbeddingConfig::default()
        };
        let err = EmbedderRegistry::from_config(&config).err().unwrap();
        assert_eq!(err, RegistryError::MissingEndpoint(EmbeddingBackend::Http));
    }
}

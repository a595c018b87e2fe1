use embed::{EmbedError, RegistryError};
use storage::GraphError;
use thiserror::Error;
use touchline_core::error::{ErrorCode, TouchlineError};
use touchline_core::model::EmbeddingModel;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrepError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Embedding(#[from] EmbedError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("model {0} produced an empty probe embedding")]
    EmptyProbe(EmbeddingModel),
}

impl TouchlineError for PrepError {
    fn error_code(&self) -> ErrorCode {
        match self {
            PrepError::Graph(err) => err.error_code(),
            PrepError::Embedding(err) => err.error_code(),
            PrepError::Registry(err) => err.error_code(),
            PrepError::EmptyProbe(_) => ErrorCode::Internal,
        }
    }
}

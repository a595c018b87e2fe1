use crate::dsl::Intent;
use crate::resolve::EntityKind;
use embed::{EmbedError, RegistryError};
use storage::GraphError;
use thiserror::Error;
use touchline_core::error::{ErrorCode, TouchlineError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{0} requires semantic retrieval mode")]
    ModeMismatch(Intent),
    #[error("{intent} needs at least one {entity} mention")]
    MissingEntity { intent: Intent, entity: EntityKind },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Embedding(#[from] EmbedError),
    #[error(transparent)]
    Embedder(#[from] RegistryError),
}

impl TouchlineError for QueryError {
    fn error_code(&self) -> ErrorCode {
        match self {
            QueryError::InvalidRequest(_) => ErrorCode::InvalidArgument,
            QueryError::ModeMismatch(_) => ErrorCode::FailedPrecondition,
            QueryError::MissingEntity { .. } => ErrorCode::InvalidArgument,
            QueryError::Graph(err) => err.error_code(),
            QueryError::Embedding(err) => err.error_code(),
            QueryError::Embedder(err) => err.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use touchline_core::model::EmbeddingModel;

    #[test]
    fn test_error_codes_follow_the_source() {
        assert_eq!(
            QueryError::Graph(GraphError::Connection("refused".to_string())).error_code(),
            ErrorCode::Unavailable
        );
        assert_eq!(
            QueryError::ModeMismatch(Intent::SimilarPlayers).error_code(),
            ErrorCode::FailedPrecondition
        );
        assert_eq!(
            QueryError::Embedder(RegistryError::ModelNotFound(EmbeddingModel::B)).error_code(),
            ErrorCode::FailedPrecondition
        );
        assert_eq!(
            QueryError::MissingEntity {
                intent: Intent::SimilarPlayers,
                entity: EntityKind::Player,
            }
            .to_string(),
            "Similar_Players needs at least one player mention"
        );
    }
}

use crate::cypher::{CypherQuery, Record};
use async_trait::async_trait;
use std::ops::{Deref, DerefMut};
use std::time::Instant;
use thiserror::Error;
use touchline_core::error::{ErrorCode, TouchlineError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("row decoding error: {0}")]
    Decode(String),
}

impl TouchlineError for GraphError {
    fn error_code(&self) -> ErrorCode {
        match self {
            GraphError::Connection(_) => ErrorCode::Unavailable,
            GraphError::Query(_) | GraphError::Decode(_) => ErrorCode::Internal,
        }
    }
}

/// A unit of graph access owned by exactly one request or pipeline phase.
///
/// Dropping the session releases whatever the backend holds for it.
#[async_trait]
pub trait GraphSession: Send {
    async fn run(&mut self, query: &CypherQuery) -> Result<Vec<Record>, GraphError>;
}

/// A shared, pooled handle to the graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn session(&self) -> Result<Box<dyn GraphSession>, GraphError>;
}

/// Scoped session: acquired from a store, released when it leaves scope on any path.
pub struct SessionGuard {
    inner: Box<dyn GraphSession>,
    label: &'static str,
    acquired_at: Instant,
}

impl SessionGuard {
    pub async fn acquire(store: &dyn GraphStore, label: &'static str) -> Result<Self, GraphError> {
        let inner = store.session().await?;
        tracing::debug!(label, "graph session acquired");
        Ok(Self {
            inner,
            label,
            acquired_at: Instant::now(),
        })
    }
}

impl Deref for SessionGuard {
    type Target = dyn GraphSession;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        tracing::debug!(
            label = self.label,
            held_ms = self.acquired_at.elapsed().as_millis() as u64,
            "graph session released"
        );
    }
}

use crate::dedup::{merge_aliases, merge_exact_duplicates, AliasReport};
use crate::error::PrepError;
use crate::integrity::{verify_players, IntegrityCheck};
use crate::vectors::{write_embeddings, EmbeddingReport};
use chrono::{DateTime, Utc};
use embed::EmbedderRegistry;
use serde::Serialize;
use std::sync::Arc;
use storage::{GraphStore, SessionGuard};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duplicate_groups: i64,
    pub aliases: AliasReport,
    pub embeddings: EmbeddingReport,
}

/// Runs the preparation phases in order, each on its own session.
pub struct PrepPipeline {
    store: Arc<dyn GraphStore>,
    embedders: EmbedderRegistry,
}

impl PrepPipeline {
    pub fn new(store: Arc<dyn GraphStore>, embedders: EmbedderRegistry) -> Self {
        Self { store, embedders }
    }

    pub async fn run(&self) -> Result<PrepReport, PrepError> {
        let started_at = Utc::now();

        let duplicate_groups = {
            let mut session = SessionGuard::acquire(self.store.as_ref(), "prep.exact_merge").await?;
            merge_exact_duplicates(&mut *session).await?
        };

        let aliases = {
            let mut session = SessionGuard::acquire(self.store.as_ref(), "prep.alias_merge").await?;
            merge_aliases(&mut *session).await?
        };

        let embeddings = {
            let mut session = SessionGuard::acquire(self.store.as_ref(), "prep.embeddings").await?;
            write_embeddings(&mut *session, &self.embedders).await?
        };

        let report = PrepReport {
            started_at,
            finished_at: Utc::now(),
            duplicate_groups,
            aliases,
            embeddings,
        };
        tracing::info!(
            duplicate_groups = report.duplicate_groups,
            aliases_merged = report.aliases.merged.len(),
            aliases_skipped = report.aliases.skipped.len(),
            players_embedded = report.embeddings.players,
            "graph preparation complete"
        );
        Ok(report)
    }

    pub async fn verify(&self, names: &[String]) -> Result<Vec<IntegrityCheck>, PrepError> {
        let mut session = SessionGuard::acquire(self.store.as_ref(), "prep.verify").await?;
        verify_players(&mut *session, names).await
    }
}

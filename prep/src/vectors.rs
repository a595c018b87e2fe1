use crate::error::PrepError;
use embed::{EmbedderRegistry, ResolvedEmbedder};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use storage::{CypherQuery, GraphSession, ParamValue};
use touchline_core::model::EmbeddingModel;

pub const BATCH_SIZE: usize = 500;
const PROBE_TEXT: &str = "test";
/// Indexes from earlier layouts, dropped alongside the current ones.
const LEGACY_INDEXES: [&str; 2] = ["player_embeddings", "team_embeddings"];

const PLAYER_PROFILES: &str = "MATCH (p:Player)
OPTIONAL MATCH (p)-[r:PLAYED_IN]->(:Fixture)
WITH p, sum(r.total_points) AS total_points
OPTIONAL MATCH (p)-[:PLAYS_AS]->(pos:Position)
WITH p, total_points, collect(DISTINCT pos.name) AS positions
RETURN elementId(p) AS id, p.player_name AS name, head(positions) AS position, total_points
ORDER BY name";

const WRITE_BATCH: &str = "UNWIND $batch AS row
MATCH (p:Player) WHERE elementId(p) = row.id
SET p.text_representation = row.text,
    p.embedding_a = row.embedding_a,
    p.embedding_b = row.embedding_b";

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProfile {
    pub id: String,
    pub name: String,
    pub position: Option<String>,
    pub total_points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EmbeddingReport {
    pub dimensions: BTreeMap<String, usize>,
    pub players: usize,
    pub batches: usize,
}

/// The text each player is embedded from.
pub fn player_sentence(name: &str, position: Option<&str>, total_points: i64) -> String {
    format!(
        "Player: {name}. Position: {}. Total Fantasy Points: {total_points}.",
        position.unwrap_or("Unknown")
    )
}

/// Index DDL. The dimension is measured from the model, never user input.
pub fn create_index_query(model: EmbeddingModel, dimensions: usize) -> CypherQuery {
    CypherQuery::new(format!(
        "CREATE VECTOR INDEX {index} IF NOT EXISTS FOR (n:Player) ON (n.{property}) \
OPTIONS {{ indexConfig: {{ `vector.dimensions`: {dimensions}, `vector.similarity_function`: 'cosine' }} }}",
        index = model.index_name(),
        property = model.embedding_property(),
    ))
}

pub fn drop_index_query(index: &str) -> CypherQuery {
    CypherQuery::new(format!("DROP INDEX {index} IF EXISTS"))
}

pub async fn probe_dimensions(embedder: &ResolvedEmbedder) -> Result<usize, PrepError> {
    let probe = embedder.embedder.embed(PROBE_TEXT).await?;
    if probe.is_empty() {
        return Err(PrepError::EmptyProbe(embedder.model));
    }
    Ok(probe.len())
}

/// Drop every player vector index and recreate both at the measured widths.
pub async fn rebuild_indexes(
    session: &mut dyn GraphSession,
    dimensions: &[(EmbeddingModel, usize)],
) -> Result<(), PrepError> {
    let current = EmbeddingModel::ALL.map(EmbeddingModel::index_name);
    for index in current.iter().chain(LEGACY_INDEXES.iter()) {
        session.run(&drop_index_query(index)).await?;
    }
    for &(model, dims) in dimensions {
        session.run(&create_index_query(model, dims)).await?;
        tracing::info!(index = model.index_name(), dims, "vector index created");
    }
    Ok(())
}

pub async fn load_profiles(session: &mut dyn GraphSession) -> Result<Vec<PlayerProfile>, PrepError> {
    let rows = session.run(&CypherQuery::new(PLAYER_PROFILES)).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row.get("id")?.as_str()?.to_string();
            let name = row.get("name")?.as_str()?.to_string();
            let position = row
                .get("position")
                .and_then(Value::as_str)
                .map(str::to_string);
            let total_points = row
                .get("total_points")
                .and_then(|value| value.as_i64().or_else(|| value.as_f64().map(|v| v as i64)))
                .unwrap_or(0);
            Some(PlayerProfile {
                id,
                name,
                position,
                total_points,
            })
        })
        .collect())
}

fn batch_query(rows: Vec<ParamValue>) -> CypherQuery {
    CypherQuery::new(WRITE_BATCH).param("batch", rows)
}

/// Embed every player with both models and write the vectors in batches.
pub async fn write_embeddings(
    session: &mut dyn GraphSession,
    embedders: &EmbedderRegistry,
) -> Result<EmbeddingReport, PrepError> {
    let model_a = embedders.resolve(EmbeddingModel::A)?;
    let model_b = embedders.resolve(EmbeddingModel::B)?;

    let dims_a = probe_dimensions(&model_a).await?;
    let dims_b = probe_dimensions(&model_b).await?;
    rebuild_indexes(
        session,
        &[(EmbeddingModel::A, dims_a), (EmbeddingModel::B, dims_b)],
    )
    .await?;

    let profiles = load_profiles(session).await?;
    tracing::info!(players = profiles.len(), "embedding players");

    let mut report = EmbeddingReport {
        dimensions: BTreeMap::from([
            (EmbeddingModel::A.to_string(), dims_a),
            (EmbeddingModel::B.to_string(), dims_b),
        ]),
        players: profiles.len(),
        batches: 0,
    };

    for chunk in profiles.chunks(BATCH_SIZE) {
        let mut rows = Vec::with_capacity(chunk.len());
        for profile in chunk {
            let text = player_sentence(
                &profile.name,
                profile.position.as_deref(),
                profile.total_points,
            );
            let embedding_a = model_a.embedder.embed(&text).await?;
            let embedding_b = model_b.embedder.embed(&text).await?;

            let row: BTreeMap<String, ParamValue> = BTreeMap::from([
                ("id".to_string(), ParamValue::from(profile.id.as_str())),
                ("text".to_string(), ParamValue::from(text)),
                ("embedding_a".to_string(), ParamValue::from(embedding_a.as_slice())),
                ("embedding_b".to_string(), ParamValue::from(embedding_b.as_slice())),
            ]);
            rows.push(ParamValue::from(row));
        }

        session.run(&batch_query(rows)).await?;
        report.batches += 1;
        tracing::debug!(batch = report.batches, size = chunk.len(), "embedding batch written");
    }

    Ok(report)
}

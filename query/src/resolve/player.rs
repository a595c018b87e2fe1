use super::{EntityKind, MatchSource, Resolution};
use crate::error::QueryError;
use embed::ResolvedEmbedder;
use storage::{CypherQuery, GraphSession};
use touchline_core::model::SIMILARITY_THRESHOLD;

/// Nearest neighbours fetched per mention before thresholding.
pub const PLAYER_CANDIDATES: i64 = 10;

const NEAREST_PLAYER: &str = "CALL db.index.vector.queryNodes($index_name, $k, $vector)
YIELD node, score
WHERE score > $threshold
RETURN node.player_name AS Name, score AS Score
ORDER BY score DESC
LIMIT 1";

/// Baseline mode passes names through; semantic mode snaps each onto the
/// best-scoring canonical player above the similarity threshold.
pub async fn resolve_players(
    session: &mut dyn GraphSession,
    names: &[String],
    embedder: Option<&ResolvedEmbedder>,
) -> Result<Vec<Resolution>, QueryError> {
    let Some(embedder) = embedder else {
        return Ok(names
            .iter()
            .map(|name| Resolution {
                entity: EntityKind::Player,
                raw: name.clone(),
                resolved: vec![name.clone()],
                source: MatchSource::Identity,
            })
            .collect());
    };

    let mut resolutions = Vec::with_capacity(names.len());
    for name in names {
        let vector = embedder.embedder.embed(name).await?;
        let query = CypherQuery::new(NEAREST_PLAYER)
            .param("index_name", embedder.index_name)
            .param("k", PLAYER_CANDIDATES)
            .param("vector", vector.as_slice())
            .param("threshold", SIMILARITY_THRESHOLD);

        let best = session.run(&query).await?.into_iter().next().and_then(|row| {
            let canonical = row.get("Name")?.as_str()?.to_string();
            let score = row.get("Score").and_then(|score| score.as_f64()).unwrap_or_default();
            Some((canonical, score))
        });

        let resolution = match best {
            Some((canonical, score)) if score > SIMILARITY_THRESHOLD => {
                if canonical != *name {
                    tracing::debug!(raw = %name, canonical = %canonical, score, "player mention snapped");
                }
                Resolution {
                    entity: EntityKind::Player,
                    raw: name.clone(),
                    resolved: vec![canonical],
                    source: MatchSource::Vector { score },
                }
            }
            _ => {
                tracing::info!(raw = %name, model = %embedder.model, "player mention unresolved");
                Resolution::passthrough(EntityKind::Player, name)
            }
        };
        resolutions.push(resolution);
    }

    Ok(resolutions)
}

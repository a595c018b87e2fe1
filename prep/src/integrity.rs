use crate::error::PrepError;
use serde::Serialize;
use serde_json::Value;
use storage::{CypherQuery, GraphSession};

/// Names whose dedup outcome is worth checking after every run: the first
/// three should be one node each, the rest distinct people with similar names.
pub const WATCHED_PLAYERS: [&str; 7] = [
    "Eberechi Eze",
    "Mohamed Naser El Sayed Elneny",
    "Ben Davies",
    "Mathias Jensen",
    "Mathias Jorgensen",
    "Kyle Walker",
    "Kyle Walker-Peters",
];

const NODE_HISTORY: &str = "MATCH (p:Player {player_name: $name})
OPTIONAL MATCH (p)-[:PLAYED_IN]->(f:Fixture)
OPTIONAL MATCH (f)<-[:HAS_FIXTURE]-(:Gameweek)<-[:HAS_GW]-(s:Season)
RETURN elementId(p) AS id, collect(DISTINCT s.season_name) AS seasons, count(DISTINCT f) AS matches
ORDER BY id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeHistory {
    pub id: String,
    pub seasons: Vec<String>,
    pub matches: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityCheck {
    pub name: String,
    pub nodes: Vec<NodeHistory>,
}

impl IntegrityCheck {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_unique(&self) -> bool {
        self.nodes.len() == 1
    }
}

pub async fn verify_player(
    session: &mut dyn GraphSession,
    name: &str,
) -> Result<IntegrityCheck, PrepError> {
    let query = CypherQuery::new(NODE_HISTORY).param("name", name);
    let nodes = session
        .run(&query)
        .await?
        .into_iter()
        .filter_map(|row| {
            let id = row.get("id")?.as_str()?.to_string();
            let mut seasons: Vec<String> = row
                .get("seasons")
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            seasons.sort();
            let matches = row.get("matches").and_then(Value::as_i64).unwrap_or(0);
            Some(NodeHistory {
                id,
                seasons,
                matches,
            })
        })
        .collect();

    let check = IntegrityCheck {
        name: name.to_string(),
        nodes,
    };
    tracing::info!(player = name, nodes = check.node_count(), "integrity checked");
    Ok(check)
}

pub async fn verify_players(
    session: &mut dyn GraphSession,
    names: &[String],
) -> Result<Vec<IntegrityCheck>, PrepError> {
    let mut checks = Vec::with_capacity(names.len());
    for name in names {
        checks.push(verify_player(session, name).await?);
    }
    Ok(checks)
}

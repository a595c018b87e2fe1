//! Player deduplication: exact-name merges, then season-safe alias merges.
//!
//! Two names are only fused when their seasons-played sets are disjoint, so two
//! people active at the same time are never collapsed into one node.

use crate::error::PrepError;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use storage::{CypherQuery, GraphSession, Record};

pub const MAX_LENGTH_GAP: usize = 15;
/// A contained name must be longer than this to count as an alias.
pub const MIN_CONTAINED_LEN: usize = 4;
pub const ALIAS_SIMILARITY: f64 = 0.88;

const DUPLICATE_GROUPS: &str = "MATCH (p:Player)
WITH p.player_name AS name, count(p) AS copies
WHERE copies > 1
RETURN count(name) AS duplicate_groups";

/// Moves positions, affiliations and match history from `remove` onto `keep`.
const REPOINT: &str = "CALL {
    WITH keep, remove
    OPTIONAL MATCH (remove)-[old:PLAYS_AS]->(pos:Position)
    FOREACH (_ IN CASE WHEN old IS NULL THEN [] ELSE [1] END |
        MERGE (keep)-[:PLAYS_AS]->(pos))
    RETURN count(old) AS positions
}
CALL {
    WITH keep, remove
    OPTIONAL MATCH (remove)-[old:PLAYS_FOR]->(t:Team)
    FOREACH (_ IN CASE WHEN old IS NULL THEN [] ELSE [1] END |
        MERGE (keep)-[:PLAYS_FOR]->(t))
    RETURN count(old) AS teams
}
CALL {
    WITH keep, remove
    OPTIONAL MATCH (remove)-[old:PLAYED_IN]->(f:Fixture)
    FOREACH (_ IN CASE WHEN old IS NULL THEN [] ELSE [1] END |
        MERGE (keep)-[moved:PLAYED_IN]->(f)
        SET moved = properties(old))
    RETURN count(old) AS fixtures
}
DETACH DELETE remove";

const SEASONS_PLAYED: &str =
    "MATCH (p:Player)-[:PLAYED_IN]->(:Fixture)<-[:HAS_FIXTURE]-(:Gameweek)<-[:HAS_GW]-(s:Season)
RETURN p.player_name AS name, collect(DISTINCT s.season_name) AS seasons";

const ALL_PLAYERS: &str = "MATCH (p:Player) RETURN p.player_name AS name";

pub fn exact_merge_query() -> CypherQuery {
    CypherQuery::new(format!(
        "MATCH (p:Player)
WITH p.player_name AS name, collect(p) AS nodes
WHERE size(nodes) > 1
WITH head(nodes) AS keep, tail(nodes) AS duplicates
UNWIND duplicates AS remove
{REPOINT}
RETURN count(*) AS merged"
    ))
}

pub fn alias_merge_query(merge: &AliasMerge) -> CypherQuery {
    CypherQuery::new(format!(
        "MATCH (keep:Player {{player_name: $keep}})
MATCH (remove:Player {{player_name: $remove}})
WHERE keep <> remove
{REPOINT}
RETURN count(*) AS merged"
    ))
    .param("keep", merge.keep.as_str())
    .param("remove", merge.remove.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasMerge {
    pub keep: String,
    pub remove: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAlias {
    pub shorter: String,
    pub longer: String,
    pub overlap: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AliasScan {
    pub merges: Vec<AliasMerge>,
    pub skipped: Vec<SkippedAlias>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AliasReport {
    pub merged: Vec<AliasMerge>,
    pub skipped: Vec<SkippedAlias>,
    pub failed: Vec<(AliasMerge, String)>,
}

/// `shorter` must not be longer than `longer`.
pub fn is_alias_candidate(shorter: &str, longer: &str) -> bool {
    let short_len = shorter.chars().count();
    let long_len = longer.chars().count();
    if long_len.abs_diff(short_len) > MAX_LENGTH_GAP {
        return false;
    }
    if shorter.chars().next() != longer.chars().next() {
        return false;
    }

    (short_len > MIN_CONTAINED_LEN && longer.contains(shorter))
        || strsim::normalized_levenshtein(shorter, longer) > ALIAS_SIMILARITY
}

/// Pair up aliases, shortest name first. The shorter name survives and takes
/// over the seasons of every name merged into it.
pub fn find_alias_pairs(seasons: &BTreeMap<String, BTreeSet<String>>) -> AliasScan {
    let mut names: Vec<&str> = seasons
        .keys()
        .map(String::as_str)
        .filter(|name| !name.is_empty())
        .collect();
    names.sort_by_key(|name| name.chars().count());

    let mut active: BTreeMap<&str, BTreeSet<String>> = seasons
        .iter()
        .map(|(name, played)| (name.as_str(), played.clone()))
        .collect();
    let mut merged_away: BTreeSet<&str> = BTreeSet::new();
    let mut scan = AliasScan::default();

    for (i, &shorter) in names.iter().enumerate() {
        if merged_away.contains(shorter) {
            continue;
        }
        for &longer in &names[i + 1..] {
            if merged_away.contains(longer) || !is_alias_candidate(shorter, longer) {
                continue;
            }

            let kept = active.get(shorter).cloned().unwrap_or_default();
            let other = active.get(longer).cloned().unwrap_or_default();
            let overlap: BTreeSet<String> = kept.intersection(&other).cloned().collect();

            if overlap.is_empty() {
                active.entry(shorter).or_default().extend(other);
                merged_away.insert(longer);
                scan.merges.push(AliasMerge {
                    keep: shorter.to_string(),
                    remove: longer.to_string(),
                });
            } else {
                scan.skipped.push(SkippedAlias {
                    shorter: shorter.to_string(),
                    longer: longer.to_string(),
                    overlap,
                });
            }
        }
    }

    scan
}

fn text(row: &Record, column: &str) -> Option<String> {
    row.get(column).and_then(Value::as_str).map(str::to_string)
}

/// Number of player names carried by more than one node.
pub async fn count_duplicate_groups(session: &mut dyn GraphSession) -> Result<i64, PrepError> {
    let rows = session.run(&CypherQuery::new(DUPLICATE_GROUPS)).await?;
    Ok(rows
        .first()
        .and_then(|row| row.get("duplicate_groups"))
        .and_then(Value::as_i64)
        .unwrap_or(0))
}

/// Collapse nodes sharing a name onto the first of them. Returns the group count.
pub async fn merge_exact_duplicates(session: &mut dyn GraphSession) -> Result<i64, PrepError> {
    let groups = count_duplicate_groups(session).await?;
    if groups == 0 {
        tracing::info!("no exact duplicate players");
        return Ok(0);
    }

    tracing::info!(groups, "merging exact duplicate players");
    session.run(&exact_merge_query()).await?;
    Ok(groups)
}

pub async fn load_player_seasons(
    session: &mut dyn GraphSession,
) -> Result<BTreeMap<String, BTreeSet<String>>, PrepError> {
    let mut seasons: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for row in session.run(&CypherQuery::new(SEASONS_PLAYED)).await? {
        let Some(name) = text(&row, "name") else {
            continue;
        };
        let played = row
            .get("seasons")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<BTreeSet<_>>()
            })
            .unwrap_or_default();
        seasons.entry(name).or_default().extend(played);
    }

    for row in session.run(&CypherQuery::new(ALL_PLAYERS)).await? {
        if let Some(name) = text(&row, "name") {
            seasons.entry(name).or_default();
        }
    }

    Ok(seasons)
}

/// Scan for aliases and merge every season-safe pair. A failed merge is logged
/// and reported; the remaining pairs still run.
pub async fn merge_aliases(session: &mut dyn GraphSession) -> Result<AliasReport, PrepError> {
    let seasons = load_player_seasons(session).await?;
    let scan = find_alias_pairs(&seasons);

    for skip in &scan.skipped {
        tracing::info!(
            shorter = %skip.shorter,
            longer = %skip.longer,
            overlap = ?skip.overlap,
            "alias skipped, both names active in the same season"
        );
    }

    let mut report = AliasReport {
        skipped: scan.skipped,
        ..AliasReport::default()
    };
    for merge in scan.merges {
        match session.run(&alias_merge_query(&merge)).await {
            Ok(_) => {
                tracing::info!(keep = %merge.keep, remove = %merge.remove, "alias merged");
                report.merged.push(merge);
            }
            Err(err) => {
                tracing::warn!(keep = %merge.keep, remove = %merge.remove, error = %err, "alias merge failed");
                report.failed.push((merge, err.to_string()));
            }
        }
    }

    Ok(report)
}

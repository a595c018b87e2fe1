use super::{EntityKind, MatchSource, Resolution};
use serde_json::Value;
use storage::{CypherQuery, GraphError, GraphSession, Record};

/// Minimum normalized edit similarity for the fuzzy fallback.
pub const TEAM_SIMILARITY_CUTOFF: f64 = 0.6;

const TEAM_LOOKUP: &str = "MATCH (t:Team)
WHERE toLower(t.name) = $raw
   OR toLower(t.name) CONTAINS $raw
   OR all(term IN split($raw, ' ') WHERE toLower(t.name) CONTAINS term)
RETURN t.name AS Name
LIMIT 1";

const ALL_TEAMS: &str = "MATCH (t:Team) RETURN t.name AS name";

/// The closest candidate at or above the cutoff. Ties keep the earliest candidate.
pub fn best_fuzzy_match<'a>(raw: &str, candidates: &'a [String]) -> Option<(&'a str, f64)> {
    candidates
        .iter()
        .map(|candidate| (candidate.as_str(), strsim::normalized_levenshtein(raw, candidate)))
        .filter(|(_, score)| *score >= TEAM_SIMILARITY_CUTOFF)
        .fold(None, |best: Option<(&str, f64)>, (candidate, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((candidate, score)),
        })
}

fn string_column(rows: Vec<Record>, column: &str) -> Vec<String> {
    rows.into_iter()
        .filter_map(|mut row| match row.remove(column) {
            Some(Value::String(value)) => Some(value),
            _ => None,
        })
        .collect()
}

pub async fn resolve_team(
    session: &mut dyn GraphSession,
    raw: &str,
) -> Result<Resolution, GraphError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Resolution::passthrough(EntityKind::Team, raw));
    }

    let lookup = CypherQuery::new(TEAM_LOOKUP).param("raw", raw.to_lowercase());
    if let Some(name) = string_column(session.run(&lookup).await?, "Name")
        .into_iter()
        .next()
    {
        let source = if name.eq_ignore_ascii_case(raw) {
            MatchSource::Exact
        } else {
            MatchSource::Containment
        };
        return Ok(Resolution {
            entity: EntityKind::Team,
            raw: raw.to_string(),
            resolved: vec![name],
            source,
        });
    }

    let teams = string_column(session.run(&CypherQuery::new(ALL_TEAMS)).await?, "name");
    match best_fuzzy_match(raw, &teams) {
        Some((name, score)) => Ok(Resolution {
            entity: EntityKind::Team,
            raw: raw.to_string(),
            resolved: vec![name.to_string()],
            source: MatchSource::Fuzzy { score },
        }),
        None => {
            tracing::debug!(raw, "team mention unresolved");
            Ok(Resolution::passthrough(EntityKind::Team, raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teams() -> Vec<String> {
        ["Arsenal", "Aston Villa", "Chelsea", "Man City", "Man Utd"]
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    #[test]
    fn test_fuzzy_match_corrects_typos() {
        let teams = teams();
        let (name, score) = best_fuzzy_match("Arsneal", &teams).unwrap();
        assert_eq!(name, "Arsenal");
        assert!(score >= TEAM_SIMILARITY_CUTOFF);

        assert_eq!(best_fuzzy_match("Chelsae", &teams).map(|(n, _)| n), Some("Chelsea"));
    }

    #[test]
    fn test_fuzzy_match_rejects_distant_input() {
        assert_eq!(best_fuzzy_match("Real Madrid", &teams()), None);
    }

    #[test]
    fn test_fuzzy_match_is_case_sensitive_on_original_input() {
        // The fallback compares the trimmed original, not a lowercased copy.
        assert_eq!(best_fuzzy_match("ARSENAL", &teams()), None);
    }
}

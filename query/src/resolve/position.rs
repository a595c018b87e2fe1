use super::{EntityKind, MatchSource, Resolution};
use serde_json::Value;
use storage::{CypherQuery, GraphError, GraphSession};

/// Checked in order; the first keyword contained in the mention wins.
const POSITION_KEYWORDS: [(&str, &str); 15] = [
    ("goal", "GKP"),
    ("keep", "GKP"),
    ("gk", "GKP"),
    ("def", "DEF"),
    ("back", "DEF"),
    ("cb", "DEF"),
    ("lb", "DEF"),
    ("rb", "DEF"),
    ("mid", "MID"),
    ("wing", "MID"),
    ("central", "MID"),
    ("forw", "FWD"),
    ("strik", "FWD"),
    ("attac", "FWD"),
    ("st", "FWD"),
];

const LIVE_POSITIONS: &str = "MATCH (p:Position) RETURN p.name AS name";

/// Every spelling a canonical position code may carry in the graph.
pub fn alias_family(code: &str) -> Vec<String> {
    let family: &[&str] = match code.to_ascii_uppercase().as_str() {
        "GKP" => &["GKP", "GK", "Goalkeeper", "Goalie", "Keeper"],
        "DEF" => &["DEF", "DF", "Defender", "Back", "CB", "LB", "RB"],
        "MID" => &["MID", "MF", "Midfielder", "Wing", "Winger"],
        "FWD" => &["FWD", "FW", "Forward", "Striker", "Attacker", "ST"],
        _ => return vec![code.to_string()],
    };
    family.iter().map(|alias| alias.to_string()).collect()
}

pub fn match_keyword(raw_lower: &str) -> Option<&'static str> {
    POSITION_KEYWORDS
        .iter()
        .find(|(keyword, _)| raw_lower.contains(keyword))
        .map(|(_, code)| *code)
}

/// Exact match first, then containment in either direction with a length guard.
pub fn match_live_position<'a>(
    raw_lower: &str,
    positions: &'a [String],
) -> Option<(&'a str, MatchSource)> {
    if let Some(exact) = positions.iter().find(|pos| pos.to_lowercase() == raw_lower) {
        return Some((exact.as_str(), MatchSource::Exact));
    }

    positions
        .iter()
        .find(|pos| {
            let pos_lower = pos.to_lowercase();
            (raw_lower.contains(&pos_lower) && pos.chars().count() > 2)
                || (pos_lower.contains(raw_lower) && raw_lower.chars().count() > 2)
        })
        .map(|pos| (pos.as_str(), MatchSource::Containment))
}

/// Resolve a position mention to its alias list. `None` means no positional filter.
pub async fn resolve_position(
    session: &mut dyn GraphSession,
    raw: Option<&str>,
) -> Result<Option<Resolution>, GraphError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    let raw_lower = raw.to_lowercase();

    if let Some(code) = match_keyword(&raw_lower) {
        return Ok(Some(Resolution {
            entity: EntityKind::Position,
            raw: raw.to_string(),
            resolved: alias_family(code),
            source: MatchSource::Keyword,
        }));
    }

    let positions: Vec<String> = session
        .run(&CypherQuery::new(LIVE_POSITIONS))
        .await?
        .into_iter()
        .filter_map(|row| match row.get("name") {
            Some(Value::String(name)) => Some(name.clone()),
            _ => None,
        })
        .collect();

    let resolution = match match_live_position(&raw_lower, &positions) {
        Some((position, source)) => Resolution {
            entity: EntityKind::Position,
            raw: raw.to_string(),
            resolved: alias_family(position),
            source,
        },
        None => {
            tracing::debug!(raw, "position mention unresolved");
            Resolution::passthrough(EntityKind::Position, raw)
        }
    };
    Ok(Some(resolution))
}

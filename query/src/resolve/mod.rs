//! Entity resolvers: map loosely typed mentions onto names that exist in the graph.
//!
//! Every resolver is total. A mention that cannot be matched passes through
//! unchanged and is reported as a miss in the response diagnostics.

mod player;
mod position;
mod team;

pub use player::{resolve_players, PLAYER_CANDIDATES};
pub use position::{alias_family, match_keyword, match_live_position, resolve_position};
pub use team::{best_fuzzy_match, resolve_team, TEAM_SIMILARITY_CUTOFF};

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Team,
    Position,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Player => f.write_str("player"),
            EntityKind::Team => f.write_str("team"),
            EntityKind::Position => f.write_str("position"),
        }
    }
}

/// How a mention was matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchSource {
    /// Baseline mode: the mention is used as typed.
    Identity,
    Keyword,
    Exact,
    Containment,
    Fuzzy { score: f64 },
    Vector { score: f64 },
    /// Nothing matched; the raw mention is used.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub entity: EntityKind,
    pub raw: String,
    pub resolved: Vec<String>,
    pub source: MatchSource,
}

impl Resolution {
    pub fn is_miss(&self) -> bool {
        matches!(self.source, MatchSource::Passthrough)
    }

    /// The single resolved name for player and team mentions.
    pub fn name(&self) -> &str {
        self.resolved.first().map(String::as_str).unwrap_or(&self.raw)
    }

    fn passthrough(entity: EntityKind, raw: &str) -> Self {
        Self {
            entity,
            raw: raw.to_string(),
            resolved: vec![raw.to_string()],
            source: MatchSource::Passthrough,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Season labels the graph carries, oldest first.
pub const SUPPORTED_SEASONS: [&str; 2] = ["2021-22", "2022-23"];

/// The season assumed when a question names none.
pub const DEFAULT_SEASON: &str = SUPPORTED_SEASONS[1];

/// Similarity a vector hit must strictly exceed to count as a match.
pub const SIMILARITY_THRESHOLD: f64 = 0.70;

/// Entity-resolution strategy for player mentions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Raw names pass through; matching relies on substring containment.
    #[default]
    Baseline,
    /// Names are snapped to canonical players through the vector index.
    Semantic,
}

impl RetrievalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RetrievalMode::Baseline => "baseline",
            RetrievalMode::Semantic => "semantic",
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" => Ok(RetrievalMode::Baseline),
            "semantic" => Ok(RetrievalMode::Semantic),
            other => Err(format!("unknown retrieval mode: {other}")),
        }
    }
}

/// The two sentence encoders, each bound to its own vector index and node property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EmbeddingModel {
    #[default]
    #[serde(rename = "A", alias = "a")]
    A,
    #[serde(rename = "B", alias = "b")]
    B,
}

impl EmbeddingModel {
    pub const ALL: [EmbeddingModel; 2] = [EmbeddingModel::A, EmbeddingModel::B];

    pub fn dimensions(self) -> usize {
        match self {
            EmbeddingModel::A => 384,
            EmbeddingModel::B => 768,
        }
    }

    pub fn index_name(self) -> &'static str {
        match self {
            EmbeddingModel::A => "player_idx_a",
            EmbeddingModel::B => "player_idx_b",
        }
    }

    pub fn embedding_property(self) -> &'static str {
        match self {
            EmbeddingModel::A => "embedding_a",
            EmbeddingModel::B => "embedding_b",
        }
    }

    pub fn default_model_name(self) -> &'static str {
        match self {
            EmbeddingModel::A => "all-MiniLM-L6-v2",
            EmbeddingModel::B => "all-mpnet-base-v2",
        }
    }
}

impl fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingModel::A => f.write_str("A"),
            EmbeddingModel::B => f.write_str("B"),
        }
    }
}

impl FromStr for EmbeddingModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(EmbeddingModel::A),
            "B" | "b" => Ok(EmbeddingModel::B),
            other => Err(format!("unknown embedding model: {other}")),
        }
    }
}

/// Map a free-form season mention onto a supported label.
///
/// Anything mentioning "21" is the first season, "22"/"23" the second. Unknown
/// values pass through trimmed and an absent value means the latest season.
pub fn normalize_season(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return DEFAULT_SEASON.to_string();
    };

    if raw.contains("21") {
        SUPPORTED_SEASONS[0].to_string()
    } else if raw.contains("22") || raw.contains("23") {
        SUPPORTED_SEASONS[1].to_string()
    } else {
        raw.to_string()
    }
}

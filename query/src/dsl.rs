use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// The closed set of intent labels the upstream classifier emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum Intent {
    #[serde(rename = "Player_Stats")]
    PlayerStats,
    #[serde(rename = "Compare_Players")]
    ComparePlayers,
    #[serde(rename = "Top_Ranked")]
    TopRanked,
    #[serde(rename = "Team_Stats")]
    TeamStats,
    #[serde(rename = "Squad_List")]
    SquadList,
    #[serde(rename = "Gameweek_Schedule")]
    GameweekSchedule,
    #[serde(rename = "Gameweek_Analysis")]
    GameweekAnalysis,
    #[serde(rename = "Head_to_Head")]
    HeadToHead,
    #[serde(rename = "Similar_Players")]
    SimilarPlayers,
    #[serde(rename = "Underlying_Stats")]
    UnderlyingStats,
    #[serde(rename = "Captaincy_Pick")]
    CaptaincyPick,
    #[serde(rename = "Bonus_Points")]
    BonusPoints,
    #[serde(rename = "Fixture_Query")]
    FixtureQuery,
    #[serde(rename = "Injury_Query")]
    InjuryQuery,
    #[default]
    #[serde(rename = "General_Chat")]
    GeneralChat,
    /// Any label outside the vocabulary.
    #[serde(other)]
    Unknown,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::PlayerStats => "Player_Stats",
            Intent::ComparePlayers => "Compare_Players",
            Intent::TopRanked => "Top_Ranked",
            Intent::TeamStats => "Team_Stats",
            Intent::SquadList => "Squad_List",
            Intent::GameweekSchedule => "Gameweek_Schedule",
            Intent::GameweekAnalysis => "Gameweek_Analysis",
            Intent::HeadToHead => "Head_to_Head",
            Intent::SimilarPlayers => "Similar_Players",
            Intent::UnderlyingStats => "Underlying_Stats",
            Intent::CaptaincyPick => "Captaincy_Pick",
            Intent::BonusPoints => "Bonus_Points",
            Intent::FixtureQuery => "Fixture_Query",
            Intent::InjuryQuery => "Injury_Query",
            Intent::GeneralChat => "General_Chat",
            Intent::Unknown => "Unknown",
        }
    }

    /// Only answerable through the vector index.
    pub fn requires_semantic(self) -> bool {
        matches!(self, Intent::SimilarPlayers)
    }

    pub fn uses_players(self) -> bool {
        matches!(
            self,
            Intent::PlayerStats
                | Intent::ComparePlayers
                | Intent::SimilarPlayers
                | Intent::UnderlyingStats
        )
    }

    pub fn uses_teams(self) -> bool {
        matches!(
            self,
            Intent::TeamStats | Intent::SquadList | Intent::HeadToHead
        )
    }

    pub fn uses_position(self) -> bool {
        matches!(self, Intent::TopRanked)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity slots extracted by the classifier, already trimmed with blanks dropped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct Entities {
    #[serde(
        rename = "Player",
        alias = "player",
        default,
        deserialize_with = "string_list"
    )]
    pub players: Vec<String>,
    #[serde(rename = "Team", alias = "team", default, deserialize_with = "string_list")]
    pub teams: Vec<String>,
    #[serde(
        rename = "Position",
        alias = "position",
        default,
        deserialize_with = "first_string"
    )]
    pub position: Option<String>,
    #[serde(
        rename = "Metric",
        alias = "metric",
        default,
        deserialize_with = "first_string"
    )]
    pub metric: Option<String>,
    #[serde(
        rename = "Season",
        alias = "season",
        default,
        deserialize_with = "first_string"
    )]
    pub season: Option<String>,
    #[serde(
        rename = "Gameweek",
        alias = "gameweek",
        alias = "GW",
        default,
        deserialize_with = "first_string"
    )]
    pub gameweek: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct IntentRequest {
    #[serde(default, deserialize_with = "intent_or_chat")]
    pub intent: Intent,
    #[serde(default, deserialize_with = "entities_or_empty")]
    pub entities: Entities,
    #[serde(default, alias = "query")]
    pub user_query: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestParseError {
    #[error("request is not valid JSON: {0}")]
    Malformed(String),
}

impl IntentRequest {
    pub fn new(intent: Intent, entities: Entities, user_query: impl Into<String>) -> Self {
        Self {
            intent,
            entities,
            user_query: user_query.into(),
        }
    }

    pub fn parse_json(raw: &str) -> Result<Self, RequestParseError> {
        serde_json::from_str(raw).map_err(|err| RequestParseError::Malformed(err.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(text) => text,
            Scalar::Int(value) => value.to_string(),
            Scalar::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", value as i64)
            }
            Scalar::Float(value) => value.to_string(),
            Scalar::Bool(value) => value.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Option<Scalar>>),
    One(Scalar),
    Other(IgnoredAny),
}

fn sanitize(raw: Option<OneOrMany>) -> Vec<String> {
    let values = match raw {
        None | Some(OneOrMany::Other(_)) => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values.into_iter().flatten().collect(),
    };

    values
        .into_iter()
        .map(|value| value.into_text().trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<OneOrMany>::deserialize(deserializer).map(sanitize)
}

fn first_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    string_list(deserializer).map(|values| values.into_iter().next())
}

fn intent_or_chat<'de, D>(deserializer: D) -> Result<Intent, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Intent>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn entities_or_empty<'de, D>(deserializer: D) -> Result<Entities, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Entities>::deserialize(deserializer).map(Option::unwrap_or_default)
}

use crate::dsl::{Intent, IntentRequest};
use crate::filters::SeasonFilter;
use touchline_core::model::normalize_season;

const VERSUS_MARKERS: [&str; 6] = [" vs ", " vs. ", "versus", "head to head", "against", "h2h"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub requested_intent: Intent,
    pub intent: Intent,
    pub filter: SeasonFilter,
    pub steps: Vec<&'static str>,
}

pub struct QueryPlanner;

impl QueryPlanner {
    pub fn plan(request: &IntentRequest) -> QueryPlan {
        let entities = &request.entities;
        let mut steps = Vec::new();
        let mut intent = request.intent;

        if intent == Intent::GeneralChat {
            if !entities.players.is_empty() {
                intent = Intent::PlayerStats;
                steps.push("general_chat_with_player");
            } else if !entities.teams.is_empty() {
                intent = Intent::TeamStats;
                steps.push("general_chat_with_team");
            } else if entities.position.is_some() || entities.metric.is_some() {
                intent = Intent::TopRanked;
                steps.push("general_chat_with_ranking");
            }
        }
        if entities.teams.len() >= 2 && mentions_versus(&request.user_query) {
            intent = Intent::HeadToHead;
            steps.push("head_to_head_override");
        }
        if entities.season.is_none() {
            steps.push("default_season");
        }

        let filter = SeasonFilter::new(
            normalize_season(entities.season.as_deref()),
            entities.gameweek.clone(),
        );

        QueryPlan {
            requested_intent: request.intent,
            intent,
            filter,
            steps,
        }
    }
}

/// Whether the question is phrased as one side against another.
pub fn mentions_versus(query: &str) -> bool {
    let padded = format!(" {} ", query.to_lowercase());
    VERSUS_MARKERS.iter().any(|marker| padded.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::Entities;

    fn request(intent: Intent, entities: Entities, query: &str) -> IntentRequest {
        IntentRequest::new(intent, entities, query)
    }

    #[test]
    fn test_general_chat_with_player_becomes_player_stats() {
        let entities = Entities {
            players: vec!["Salah".to_string()],
            ..Entities::default()
        };
        let plan = QueryPlanner::plan(&request(Intent::GeneralChat, entities, "how's salah"));

        assert_eq!(plan.intent, Intent::PlayerStats);
        assert_eq!(plan.requested_intent, Intent::GeneralChat);
        assert!(plan.steps.contains(&"general_chat_with_player"));
    }

    #[test]
    fn test_general_chat_falls_back_through_team_then_ranking() {
        let teams = Entities {
            teams: vec!["Arsenal".to_string()],
            metric: Some("goals".to_string()),
            ..Entities::default()
        };
        let plan = QueryPlanner::plan(&request(Intent::GeneralChat, teams, "arsenal?"));
        assert_eq!(plan.intent, Intent::TeamStats);

        let ranking = Entities {
            metric: Some("assists".to_string()),
            ..Entities::default()
        };
        let plan = QueryPlanner::plan(&request(Intent::GeneralChat, ranking, "most assists"));
        assert_eq!(plan.intent, Intent::TopRanked);

        let plan = QueryPlanner::plan(&request(Intent::GeneralChat, Entities::default(), "hi"));
        assert_eq!(plan.intent, Intent::GeneralChat);
        assert!(!plan.steps.iter().any(|step| step.starts_with("general_chat")));
    }

    #[test]
    fn test_other_intents_are_not_corrected() {
        let entities = Entities {
            players: vec!["Kane".to_string()],
            ..Entities::default()
        };
        let plan = QueryPlanner::plan(&request(Intent::UnderlyingStats, entities, "Kane xG"));
        assert_eq!(plan.intent, Intent::UnderlyingStats);
    }

    #[test]
    fn test_versus_wording_with_two_teams_forces_head_to_head() {
        let entities = Entities {
            teams: vec!["Arsenal".to_string(), "Chelsea".to_string()],
            ..Entities::default()
        };
        for query in [
            "Arsenal vs Chelsea",
            "Arsenal vs. Chelsea",
            "arsenal versus chelsea",
            "Arsenal against Chelsea",
            "h2h arsenal chelsea",
            "Head to head Arsenal Chelsea",
        ] {
            let plan = QueryPlanner::plan(&request(Intent::TeamStats, entities.clone(), query));
            assert_eq!(plan.intent, Intent::HeadToHead, "{query}");
        }

        let plan = QueryPlanner::plan(&request(
            Intent::TeamStats,
            entities,
            "Arsenal and Chelsea stats",
        ));
        assert_eq!(plan.intent, Intent::TeamStats);
    }

    #[test]
    fn test_versus_wording_with_one_team_is_not_overridden() {
        let entities = Entities {
            teams: vec!["Arsenal".to_string()],
            ..Entities::default()
        };
        let plan = QueryPlanner::plan(&request(Intent::TeamStats, entities, "Arsenal vs everyone"));
        assert_eq!(plan.intent, Intent::TeamStats);
    }

    #[test]
    fn test_vs_inside_a_word_does_not_count() {
        assert!(!mentions_versus("canvs of the league"));
        assert!(mentions_versus("vs"));
    }

    #[test]
    fn test_season_is_normalized_and_defaulted() {
        let plan = QueryPlanner::plan(&request(Intent::BonusPoints, Entities::default(), "bonus"));
        assert_eq!(plan.filter.season(), "2022-23");
        assert!(plan.steps.contains(&"default_season"));

        let entities = Entities {
            season: Some("21/22".to_string()),
            gameweek: Some("5".to_string()),
            ..Entities::default()
        };
        let plan = QueryPlanner::plan(&request(Intent::BonusPoints, entities, "bonus"));
        assert_eq!(plan.filter.season(), "2021-22");
        assert_eq!(plan.filter.gameweek(), Some("5"));
    }
}

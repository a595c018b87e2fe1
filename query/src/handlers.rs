//! One pure query builder per answerable intent.
//!
//! A handler only assembles text and parameters; it never touches the graph.
//! User values are always bound as parameters. The only interpolated pieces are
//! the shared filter fragment, the sort column picked from [`RankMetric`] and the
//! embedding property of the active [`EmbeddingModel`].

use crate::dsl::Intent;
use crate::error::QueryError;
use crate::filters::{gameweek_predicate, season_predicate, SeasonFilter};
use crate::resolve::EntityKind;
use storage::CypherQuery;
use touchline_core::model::{EmbeddingModel, RetrievalMode, SIMILARITY_THRESHOLD};

pub const TOP_RANKED_LIMIT: usize = 10;
pub const SQUAD_LIMIT: usize = 20;
pub const GAMEWEEK_ANALYSIS_LIMIT: usize = 10;
pub const SIMILAR_PLAYERS_LIMIT: usize = 5;
pub const SIMILAR_PLAYERS_CANDIDATES: i64 = 10;
pub const CAPTAINCY_LIMIT: usize = 10;
pub const CAPTAINCY_WINDOW: i64 = 5;
pub const CAPTAINCY_MIN_MINUTES: i64 = 60;
pub const CAPTAINCY_MIN_MATCHES: i64 = 3;
pub const BONUS_LIMIT: usize = 20;
/// Share of a player's season fixtures that must be for a team to count as theirs.
pub const MAJORITY_SHARE: f64 = 0.5;

/// Everything a handler may read: resolved entities, the shared filter and
/// the retrieval settings of the request.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub intent: Intent,
    pub players: &'a [String],
    pub teams: &'a [String],
    pub aliases: &'a [String],
    pub metric: Option<&'a str>,
    pub filter: &'a SeasonFilter,
    pub mode: RetrievalMode,
    pub model: EmbeddingModel,
}

pub type Handler = fn(&HandlerContext<'_>) -> Result<CypherQuery, QueryError>;

/// `None` for intents that are answered without touching the graph.
pub fn handler_for(intent: Intent) -> Option<Handler> {
    match intent {
        Intent::PlayerStats => Some(player_stats),
        Intent::ComparePlayers => Some(compare_players),
        Intent::TopRanked => Some(top_ranked),
        Intent::TeamStats => Some(team_stats),
        Intent::SquadList => Some(squad_list),
        Intent::GameweekSchedule => Some(gameweek_schedule),
        Intent::GameweekAnalysis => Some(gameweek_analysis),
        Intent::HeadToHead => Some(head_to_head),
        Intent::SimilarPlayers => Some(similar_players),
        Intent::UnderlyingStats => Some(underlying_stats),
        Intent::CaptaincyPick => Some(captaincy_pick),
        Intent::BonusPoints => Some(bonus_points),
        Intent::FixtureQuery | Intent::InjuryQuery | Intent::GeneralChat | Intent::Unknown => {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMetric {
    Points,
    Goals,
    Assists,
    CleanSheets,
    Saves,
}

impl RankMetric {
    pub fn column(self) -> &'static str {
        match self {
            RankMetric::Points => "Points",
            RankMetric::Goals => "Goals",
            RankMetric::Assists => "Assists",
            RankMetric::CleanSheets => "CleanSheets",
            RankMetric::Saves => "Saves",
        }
    }

    /// Keyword match on the metric mention. Goalkeeper rankings never sort by goals.
    pub fn select(metric: Option<&str>, aliases: &[String]) -> Self {
        let Some(metric) = metric.map(str::to_lowercase) else {
            return RankMetric::Points;
        };
        let keeper_query = aliases.iter().any(|alias| alias.eq_ignore_ascii_case("GKP"));

        if metric.contains("goal") && !keeper_query {
            RankMetric::Goals
        } else if metric.contains("assist") {
            RankMetric::Assists
        } else if metric.contains("clean") {
            RankMetric::CleanSheets
        } else if metric.contains("save") {
            RankMetric::Saves
        } else {
            RankMetric::Points
        }
    }
}

fn player_stats(ctx: &HandlerContext<'_>) -> Result<CypherQuery, QueryError> {
    let text = format!(
        "UNWIND $names AS search_name
MATCH (p:Player)
WHERE toLower(p.player_name) CONTAINS toLower(search_name)
WITH DISTINCT p
MATCH (p)-[r:PLAYED_IN]->(f:Fixture)
WHERE {filter} AND r.minutes > 0
WITH p,
     count(r) AS Matches,
     sum(r.total_points) AS Points,
     sum(r.goals_scored) AS Goals,
     sum(r.assists) AS Assists,
     sum(r.minutes) AS Minutes
ORDER BY Matches DESC, Points DESC
LIMIT 1
RETURN p.player_name AS Player, Points, Goals, Assists, Matches, Minutes",
        filter = ctx.filter.clause()
    );
    Ok(ctx.filter.bind(CypherQuery::new(text).param("names", ctx.players)))
}

fn compare_players(ctx: &HandlerContext<'_>) -> Result<CypherQuery, QueryError> {
    let text = format!(
        "UNWIND $names AS search_name
MATCH (p:Player)
WHERE toLower(p.player_name) CONTAINS toLower(search_name)
WITH DISTINCT p
MATCH (p)-[r:PLAYED_IN]->(f:Fixture)
WHERE {filter} AND r.minutes > 0
RETURN p.player_name AS Player,
       sum(r.total_points) AS Points,
       sum(r.goals_scored) AS Goals,
       sum(r.assists) AS Assists,
       count(r) AS Matches,
       sum(r.minutes) AS Minutes,
       round(toFloat(sum(r.total_points)) / count(r), 2) AS PointsPerGame
ORDER BY Points DESC",
        filter = ctx.filter.clause()
    );
    Ok(ctx.filter.bind(CypherQuery::new(text).param("names", ctx.players)))
}

fn top_ranked(ctx: &HandlerContext<'_>) -> Result<CypherQuery, QueryError> {
    let position_filter = if ctx.aliases.is_empty() {
        ""
    } else {
        "\nWHERE any(alias IN $aliases WHERE
    toLower(pos.name) = toLower(alias)
    OR toLower(pos.name) CONTAINS toLower(alias)
    OR toLower(alias) CONTAINS toLower(pos.name))"
    };
    let sort = RankMetric::select(ctx.metric, ctx.aliases);

    let text = format!(
        "MATCH (p:Player)-[:PLAYS_AS]->(pos:Position){position_filter}
MATCH (p)-[r:PLAYED_IN]->(f:Fixture)
WHERE {filter} AND r.minutes > 0
WITH p, pos,
     count(r) AS Matches,
     sum(r.total_points) AS Points,
     sum(r.goals_scored) AS Goals,
     sum(r.assists) AS Assists,
     sum(r.clean_sheets) AS CleanSheets,
     sum(r.saves) AS Saves
RETURN p.player_name AS Player, pos.name AS Position, Matches, Points, Goals, Assists, CleanSheets, Saves
ORDER BY {column} DESC
LIMIT {TOP_RANKED_LIMIT}",
        filter = ctx.filter.clause(),
        column = sort.column()
    );

    let mut query = ctx.filter.bind(CypherQuery::new(text));
    if !ctx.aliases.is_empty() {
        query.set_param("aliases", ctx.aliases);
    }
    Ok(query)
}

fn team_stats(ctx: &HandlerContext<'_>) -> Result<CypherQuery, QueryError> {
    let season = season_predicate("s");
    let player_season = season_predicate("ps");
    let text = format!(
        "UNWIND $team_names AS team_name
MATCH (t:Team)
WHERE toLower(t.name) CONTAINS toLower(team_name)
WITH DISTINCT t
MATCH (s:Season)-[:HAS_GW]->(:Gameweek)-[:HAS_FIXTURE]->(f:Fixture)
WHERE {season}
  AND EXISTS {{ MATCH (f)-[:HAS_HOME_TEAM|HAS_AWAY_TEAM]->(t) }}
MATCH (p:Player)-[r:PLAYED_IN]->(f)
WHERE r.minutes > 0
CALL {{
    WITH p, t
    MATCH (p)-[q:PLAYED_IN]->(pf:Fixture)<-[:HAS_FIXTURE]-(:Gameweek)<-[:HAS_GW]-(ps:Season)
    WHERE {player_season} AND q.minutes > 0
    RETURN count(DISTINCT pf) AS season_fixtures,
           count(DISTINCT CASE WHEN EXISTS {{ MATCH (pf)-[:HAS_HOME_TEAM|HAS_AWAY_TEAM]->(t) }} THEN pf END) AS team_fixtures
}}
WITH t, f, r, team_fixtures >= season_fixtures * $majority_share AS own_side
WITH t, f,
     sum(CASE WHEN own_side THEN r.goals_scored ELSE 0 END) AS own_goals_scored,
     sum(CASE WHEN own_side THEN 0 ELSE r.goals_scored END) AS opponent_goals_scored,
     sum(CASE WHEN own_side THEN r.own_goals ELSE 0 END) AS own_side_own_goals,
     sum(CASE WHEN own_side THEN 0 ELSE r.own_goals END) AS opponent_own_goals
WITH t,
     own_goals_scored + opponent_own_goals AS gf,
     opponent_goals_scored + own_side_own_goals AS ga
RETURN t.name AS Team,
       count(*) AS Played,
       sum(CASE WHEN gf > ga THEN 1 ELSE 0 END) AS Wins,
       sum(CASE WHEN gf = ga THEN 1 ELSE 0 END) AS Draws,
       sum(CASE WHEN gf < ga THEN 1 ELSE 0 END) AS Losses,
       sum(gf) AS GoalsFor,
       sum(ga) AS GoalsAgainst,
       sum(gf) - sum(ga) AS GoalDifference,
       sum(CASE WHEN ga = 0 THEN 1 ELSE 0 END) AS CleanSheets
ORDER BY Wins DESC, GoalDifference DESC"
    );

    Ok(CypherQuery::new(text)
        .param("team_names", ctx.teams)
        .param("season", ctx.filter.season())
        .param("majority_share", MAJORITY_SHARE))
}

fn squad_list(ctx: &HandlerContext<'_>) -> Result<CypherQuery, QueryError> {
    let text = format!(
        "UNWIND $team_names AS team_name
MATCH (t:Team)
WHERE toLower(t.name) CONTAINS toLower(team_name)
WITH DISTINCT t
MATCH (t)<-[:HAS_HOME_TEAM|HAS_AWAY_TEAM]-(f:Fixture)<-[r:PLAYED_IN]-(p:Player)
WHERE {filter} AND r.minutes > 0
WITH t, p, count(DISTINCT f) AS team_fixtures, sum(r.total_points) AS TotalPoints
CALL {{
    WITH p
    MATCH (p)-[q:PLAYED_IN]->(f:Fixture)
    WHERE {filter} AND q.minutes > 0
    RETURN count(DISTINCT f) AS season_fixtures
}}
WITH t, p, TotalPoints, team_fixtures, season_fixtures
WHERE team_fixtures >= season_fixtures * $majority_share
OPTIONAL MATCH (p)-[:PLAYS_AS]->(pos:Position)
WITH t, p, TotalPoints, collect(DISTINCT pos.name) AS positions
RETURN t.name AS Team, p.player_name AS Player, head(positions) AS Position, TotalPoints
ORDER BY TotalPoints DESC
LIMIT {SQUAD_LIMIT}",
        filter = ctx.filter.clause()
    );

    Ok(ctx.filter.bind(
        CypherQuery::new(text)
            .param("team_names", ctx.teams)
            .param("majority_share", MAJORITY_SHARE),
    ))
}

fn gameweek_schedule(ctx: &HandlerContext<'_>) -> Result<CypherQuery, QueryError> {
    let text = format!(
        "MATCH (s:Season)-[:HAS_GW]->(gw:Gameweek)
WHERE {season} AND {gameweek}
MATCH (gw)-[:HAS_FIXTURE]->(f:Fixture)
MATCH (f)-[:HAS_HOME_TEAM]->(h:Team)
MATCH (f)-[:HAS_AWAY_TEAM]->(a:Team)
RETURN gw.GW_number AS Gameweek, f.kickoff_time AS Kickoff, h.name AS Home, a.name AS Away
ORDER BY Kickoff ASC",
        season = season_predicate("s"),
        gameweek = gameweek_predicate("gw")
    );
    Ok(ctx.filter.bind_all(CypherQuery::new(text)))
}

fn gameweek_analysis(ctx: &HandlerContext<'_>) -> Result<CypherQuery, QueryError> {
    let text = format!(
        "MATCH (s:Season)-[:HAS_GW]->(gw:Gameweek)
WHERE {season} AND {gameweek}
MATCH (gw)-[:HAS_FIXTURE]->(f:Fixture)<-[r:PLAYED_IN]-(p:Player)
WHERE r.minutes > 0
WITH gw, p,
     sum(r.total_points) AS Points,
     sum(r.goals_scored) AS Goals,
     sum(r.assists) AS Assists,
     sum(r.bonus) AS Bonus
RETURN gw.GW_number AS Gameweek, p.player_name AS Player, Points, Goals, Assists, Bonus
ORDER BY Points DESC
LIMIT {GAMEWEEK_ANALYSIS_LIMIT}",
        season = season_predicate("s"),
        gameweek = gameweek_predicate("gw")
    );
    Ok(ctx.filter.bind_all(CypherQuery::new(text)))
}

const HEAD_TO_HEAD: &str = "WITH $team_names AS teams
WHERE size(teams) >= 2
MATCH (t1:Team) WHERE toLower(t1.name) CONTAINS toLower(teams[0])
MATCH (t2:Team) WHERE toLower(t2.name) CONTAINS toLower(teams[1])
MATCH (s:Season)-[:HAS_GW]->(gw:Gameweek)-[:HAS_FIXTURE]->(f:Fixture)
MATCH (f)-[:HAS_HOME_TEAM]->(h:Team)
MATCH (f)-[:HAS_AWAY_TEAM]->(a:Team)
WHERE (h = t1 AND a = t2) OR (h = t2 AND a = t1)
OPTIONAL MATCH (p:Player)-[r:PLAYED_IN]->(f)
WHERE r.minutes > 0
WITH s, gw, f, h, a,
     sum(coalesce(r.goals_scored, 0)) AS TotalGoals,
     collect(CASE WHEN r.goals_scored > 0 THEN {player: p.player_name, goals: r.goals_scored} END) AS GoalScorers
RETURN s.season_name AS Season, gw.GW_number AS Gameweek, f.kickoff_time AS Kickoff,
       h.name AS Home, a.name AS Away, TotalGoals, GoalScorers
ORDER BY Kickoff ASC";

/// All seasons; only the first two teams, in the order supplied.
fn head_to_head(ctx: &HandlerContext<'_>) -> Result<CypherQuery, QueryError> {
    let teams: Vec<String> = ctx.teams.iter().take(2).cloned().collect();
    Ok(CypherQuery::new(HEAD_TO_HEAD).param("team_names", teams))
}

fn similar_players(ctx: &HandlerContext<'_>) -> Result<CypherQuery, QueryError> {
    if ctx.mode != RetrievalMode::Semantic {
        return Err(QueryError::ModeMismatch(ctx.intent));
    }
    let Some(target) = ctx.players.first() else {
        return Err(QueryError::MissingEntity {
            intent: ctx.intent,
            entity: EntityKind::Player,
        });
    };

    let text = format!(
        "MATCH (target:Player)
WHERE toLower(target.player_name) CONTAINS toLower($target_name)
  AND target.{property} IS NOT NULL
WITH target
ORDER BY CASE WHEN toLower(target.player_name) = toLower($target_name) THEN 0 ELSE 1 END,
         size(target.player_name)
LIMIT 1
CALL db.index.vector.queryNodes($index_name, $k, target.{property})
YIELD node AS similar, score
WHERE similar <> target AND score > $threshold
OPTIONAL MATCH (similar)-[r:PLAYED_IN]->(:Fixture)
WITH similar, score, sum(r.total_points) AS TotalPoints
OPTIONAL MATCH (similar)-[:PLAYS_AS]->(pos:Position)
WITH similar, score, TotalPoints, collect(DISTINCT pos.name) AS positions
RETURN similar.player_name AS Player, head(positions) AS Position,
       round(score, 3) AS Similarity, TotalPoints
ORDER BY score DESC
LIMIT {SIMILAR_PLAYERS_LIMIT}",
        property = ctx.model.embedding_property()
    );

    Ok(CypherQuery::new(text)
        .param("target_name", target.as_str())
        .param("index_name", ctx.model.index_name())
        .param("k", SIMILAR_PLAYERS_CANDIDATES)
        .param("threshold", SIMILARITY_THRESHOLD))
}

fn underlying_stats(ctx: &HandlerContext<'_>) -> Result<CypherQuery, QueryError> {
    let text = format!(
        "UNWIND $names AS search_name
MATCH (p:Player)
WHERE toLower(p.player_name) CONTAINS toLower(search_name)
WITH DISTINCT p
MATCH (p)-[r:PLAYED_IN]->(f:Fixture)
WHERE {filter} AND r.minutes > 0
RETURN p.player_name AS Player,
       count(r) AS Matches,
       round(avg(toFloat(r.ict_index)), 2) AS AvgICT,
       round(avg(toFloat(r.influence)), 2) AS AvgInfluence,
       round(avg(toFloat(r.creativity)), 2) AS AvgCreativity,
       round(avg(toFloat(r.threat)), 2) AS AvgThreat,
       sum(r.total_points) AS TotalPoints
ORDER BY AvgICT DESC",
        filter = ctx.filter.clause()
    );
    Ok(ctx.filter.bind(CypherQuery::new(text).param("names", ctx.players)))
}

/// Recent form over the last gameweeks of the season, regardless of any gameweek mention.
fn captaincy_pick(ctx: &HandlerContext<'_>) -> Result<CypherQuery, QueryError> {
    let season = season_predicate("s");
    let text = format!(
        "MATCH (s:Season)-[:HAS_GW]->(gw:Gameweek)-[:HAS_FIXTURE]->(:Fixture)
WHERE {season}
WITH max(gw.GW_number) AS latest_gw
MATCH (s:Season)-[:HAS_GW]->(gw:Gameweek)-[:HAS_FIXTURE]->(f:Fixture)
WHERE {season} AND gw.GW_number > latest_gw - $window
MATCH (p:Player)-[r:PLAYED_IN]->(f)
WHERE r.minutes >= $min_minutes
WITH p,
     count(r) AS RecentMatches,
     sum(r.total_points) AS RecentPoints,
     avg(r.total_points) AS avg_points,
     sum(r.goals_scored) AS Goals,
     sum(r.assists) AS Assists
WHERE RecentMatches >= $min_matches
ORDER BY avg_points DESC
LIMIT {CAPTAINCY_LIMIT}
OPTIONAL MATCH (p)-[:PLAYS_AS]->(pos:Position)
WITH p, RecentMatches, RecentPoints, avg_points, Goals, Assists, collect(DISTINCT pos.name) AS positions
RETURN p.player_name AS Player, head(positions) AS Position, RecentMatches, RecentPoints,
       round(avg_points, 2) AS AvgPoints, Goals, Assists
ORDER BY avg_points DESC"
    );

    Ok(CypherQuery::new(text)
        .param("season", ctx.filter.season())
        .param("window", CAPTAINCY_WINDOW)
        .param("min_minutes", CAPTAINCY_MIN_MINUTES)
        .param("min_matches", CAPTAINCY_MIN_MATCHES))
}

fn bonus_points(ctx: &HandlerContext<'_>) -> Result<CypherQuery, QueryError> {
    let text = format!(
        "MATCH (p:Player)-[r:PLAYED_IN]->(f:Fixture)
WHERE {filter} AND r.bonus > 0
MATCH (f)-[:HAS_HOME_TEAM]->(h:Team)
MATCH (f)-[:HAS_AWAY_TEAM]->(a:Team)
RETURN p.player_name AS Player,
       r.bonus AS BonusPoints,
       r.bps AS BPS,
       h.name + ' vs ' + a.name AS Match,
       r.total_points AS TotalPoints
ORDER BY BonusPoints DESC, BPS DESC
LIMIT {BONUS_LIMIT}",
        filter = ctx.filter.clause()
    );
    Ok(ctx.filter.bind(CypherQuery::new(text)))
}

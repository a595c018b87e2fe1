//! Season and gameweek restriction shared by the fixture-scoped handlers.
//!
//! Handlers bind the fixture under the variable `f`; the clause walks back up
//! `Season -[:HAS_GW]-> Gameweek -[:HAS_FIXTURE]-> Fixture` to test it.

use storage::CypherQuery;

/// Matches a gameweek variable whether `GW_number` is stored as text or integer.
pub fn gameweek_predicate(var: &str) -> String {
    format!("(toString({var}.GW_number) = toString($gw) OR {var}.GW_number = toInteger($gw))")
}

pub fn season_predicate(var: &str) -> String {
    format!("{var}.season_name CONTAINS $season")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonFilter {
    season: String,
    gameweek: Option<String>,
}

impl SeasonFilter {
    pub fn new(season: impl Into<String>, gameweek: Option<String>) -> Self {
        Self {
            season: season.into(),
            gameweek: gameweek
                .map(|gw| gw.trim().to_string())
                .filter(|gw| !gw.is_empty()),
        }
    }

    pub fn season(&self) -> &str {
        &self.season
    }

    pub fn gameweek(&self) -> Option<&str> {
        self.gameweek.as_deref()
    }

    /// Predicate over the fixture variable `f`.
    pub fn clause(&self) -> String {
        let season = format!(
            "EXISTS {{ MATCH (f)<-[:HAS_FIXTURE]-(:Gameweek)<-[:HAS_GW]-(s:Season) WHERE {} }}",
            season_predicate("s")
        );
        match self.gameweek {
            Some(_) => format!(
                "{season} AND EXISTS {{ MATCH (f)<-[:HAS_FIXTURE]-(gw:Gameweek) WHERE {} }}",
                gameweek_predicate("gw")
            ),
            None => season,
        }
    }

    /// Binds `$season`, plus `$gw` when a gameweek is set.
    pub fn bind(&self, query: CypherQuery) -> CypherQuery {
        let query = query.param("season", self.season.as_str());
        match &self.gameweek {
            Some(gw) => query.param("gw", gw.as_str()),
            None => query,
        }
    }

    /// Binds `$season` and `$gw` unconditionally; `$gw` is null when unset.
    pub fn bind_all(&self, query: CypherQuery) -> CypherQuery {
        query
            .param("season", self.season.as_str())
            .param("gw", self.gameweek.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::ParamValue;

    #[test]
    fn season_only_clause_has_no_gameweek() {
        let filter = SeasonFilter::new("2022-23", None);
        let clause = filter.clause();

        assert!(clause.contains("s.season_name CONTAINS $season"));
        assert!(!clause.contains("$gw"));

        let query = filter.bind(CypherQuery::new("RETURN 1"));
        assert_eq!(query.get_param("season").and_then(ParamValue::as_str), Some("2022-23"));
        assert!(query.get_param("gw").is_none());
    }

    #[test]
    fn gameweek_clause_compares_text_and_integer_forms() {
        let filter = SeasonFilter::new("2021-22", Some(" 7 ".to_string()));
        let clause = filter.clause();

        assert!(clause.contains("toString(gw.GW_number) = toString($gw)"));
        assert!(clause.contains("gw.GW_number = toInteger($gw)"));
        assert_eq!(filter.gameweek(), Some("7"));

        let query = filter.bind(CypherQuery::new("RETURN 1"));
        assert_eq!(query.get_param("gw").and_then(ParamValue::as_str), Some("7"));
    }

    #[test]
    fn blank_gameweek_is_treated_as_absent() {
        let filter = SeasonFilter::new("2022-23", Some("  ".to_string()));
        assert_eq!(filter.gameweek(), None);
        assert!(filter.bind_all(CypherQuery::new("RETURN 1")).get_param("gw").unwrap().is_null());
    }
}

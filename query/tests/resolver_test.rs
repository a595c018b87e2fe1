use embed::EmbedderRegistry;
use query::resolve::{resolve_players, resolve_position, resolve_team};
use query::MatchSource;
use serde_json::json;
use storage::scripted::{record, ScriptedGraph};
use storage::{GraphError, GraphStore, SessionGuard};
use touchline_core::embedding::deterministic_embedding;
use touchline_core::model::EmbeddingModel;

fn team_graph() -> ScriptedGraph {
    // The combined lookup misses; only the full team list answers.
    ScriptedGraph::new()
        .on("toLower(t.name) = $raw", Vec::new())
        .on(
            "MATCH (t:Team) RETURN t.name AS name",
            ["Arsenal", "Brentford", "Liverpool"]
                .iter()
                .map(|name| record([("name", json!(name))]))
                .collect(),
        )
}

#[tokio::test]
async fn test_team_resolver_is_total() {
    let graph = team_graph();
    let mut session = SessionGuard::acquire(&graph, "test").await.unwrap();

    for raw in ["Arsneal", "Real Madrid", "x", "  Liverpol  ", "🙂"] {
        let resolution = resolve_team(&mut *session, raw).await.unwrap();
        assert!(!resolution.name().is_empty(), "{raw}");
    }

    let typo = resolve_team(&mut *session, "Arsneal").await.unwrap();
    assert_eq!(typo.name(), "Arsenal");
    assert!(matches!(typo.source, MatchSource::Fuzzy { .. }));

    let miss = resolve_team(&mut *session, "Real Madrid").await.unwrap();
    assert_eq!(miss.name(), "Real Madrid");
    assert!(miss.is_miss());
}

#[tokio::test]
async fn test_team_resolver_prefers_graph_lookup() {
    let graph = ScriptedGraph::new().on(
        "toLower(t.name) = $raw",
        vec![record([("Name", json!("Man City"))])],
    );
    let mut session = SessionGuard::acquire(&graph, "test").await.unwrap();

    let resolution = resolve_team(&mut *session, " man city ").await.unwrap();

    assert_eq!(resolution.name(), "Man City");
    assert_eq!(resolution.source, MatchSource::Exact);
    let lookup = &graph.executed()[0];
    assert_eq!(
        lookup.get_param("raw").and_then(|value| value.as_str()),
        Some("man city")
    );
    assert_eq!(graph.executed().len(), 1);
}

#[tokio::test]
async fn test_position_resolver_is_total_for_non_empty_input() {
    let graph = ScriptedGraph::new().on(
        "MATCH (p:Position)",
        ["GKP", "DEF", "MID", "FWD"]
            .iter()
            .map(|name| record([("name", json!(name))]))
            .collect(),
    );
    let mut session = SessionGuard::acquire(&graph, "test").await.unwrap();

    for raw in ["keeper", "Centre Back", "fwd", "utility", "x"] {
        let resolution = resolve_position(&mut *session, Some(raw))
            .await
            .unwrap()
            .unwrap();
        assert!(!resolution.resolved.is_empty(), "{raw}");
    }

    let passthrough = resolve_position(&mut *session, Some("utility"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(passthrough.resolved, vec!["utility"]);

    assert!(resolve_position(&mut *session, Some("   ")).await.unwrap().is_none());
    assert!(resolve_position(&mut *session, None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_keyword_positions_skip_the_graph() {
    let graph = ScriptedGraph::new();
    let mut session = SessionGuard::acquire(&graph, "test").await.unwrap();

    let resolution = resolve_position(&mut *session, Some("Striker"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(resolution.source, MatchSource::Keyword);
    assert!(resolution.resolved.contains(&"FWD".to_string()));
    assert!(graph.executed().is_empty());
}

#[tokio::test]
async fn test_semantic_player_resolution_snaps_typos() {
    let model = EmbeddingModel::A;
    let entries = ["Bukayo Saka", "Gabriel Martinelli", "Gabriel Jesus"]
        .iter()
        .map(|name| {
            (
                name.to_string(),
                deterministic_embedding(name, model.default_model_name(), model.dimensions()),
            )
        });
    let graph = ScriptedGraph::new().with_vector_index(model.index_name(), entries);
    let registry = EmbedderRegistry::deterministic();
    let embedder = registry.resolve(model).unwrap();
    let mut session = SessionGuard::acquire(&graph, "test").await.unwrap();

    let names = vec!["Gabriel Martineli".to_string(), "Qqqq Zzzz".to_string()];
    let resolutions = resolve_players(&mut *session, &names, Some(&embedder))
        .await
        .unwrap();

    assert_eq!(resolutions[0].name(), "Gabriel Martinelli");
    assert!(matches!(resolutions[0].source, MatchSource::Vector { score } if score > 0.70));
    assert_eq!(resolutions[1].name(), "Qqqq Zzzz");
    assert!(resolutions[1].is_miss());

    let vector_query = &graph.executed()[0];
    assert_eq!(
        vector_query.get_param("index_name").and_then(|v| v.as_str()),
        Some("player_idx_a")
    );
    assert_eq!(vector_query.get_param("k").and_then(|v| v.as_i64()), Some(10));
}

#[tokio::test]
async fn test_baseline_player_resolution_is_identity() {
    let graph = ScriptedGraph::new();
    let mut session = SessionGuard::acquire(&graph, "test").await.unwrap();

    let names = vec!["Gabriel Martineli".to_string()];
    let resolutions = resolve_players(&mut *session, &names, None).await.unwrap();

    assert_eq!(resolutions[0].name(), "Gabriel Martineli");
    assert_eq!(resolutions[0].source, MatchSource::Identity);
    assert!(!resolutions[0].is_miss());
    assert!(graph.executed().is_empty());
}

#[tokio::test]
async fn test_graph_errors_propagate_from_resolvers() {
    let graph = ScriptedGraph::new().on_error(
        "MATCH (t:Team)",
        GraphError::Connection("defunct connection".to_string()),
    );
    let store: &dyn GraphStore = &graph;
    let mut session = SessionGuard::acquire(store, "test").await.unwrap();

    let err = resolve_team(&mut *session, "Arsenal").await.unwrap_err();
    assert_eq!(err, GraphError::Connection("defunct connection".to_string()));
}

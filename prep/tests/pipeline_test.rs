use std::sync::Arc;

use embed::EmbedderRegistry;
use prep::{PrepPipeline, WATCHED_PLAYERS};
use serde_json::json;
use storage::scripted::{record, ScriptedGraph};
use storage::{CypherQuery, GraphError, ParamValue, Record};

const DUPLICATE_GROUPS: &str = "AS duplicate_groups";
const EXACT_MERGE: &str = "tail(nodes) AS duplicates";
const ALIAS_MERGE: &str = "MATCH (keep:Player {player_name: $keep})";
const SEASONS_PLAYED: &str = "RETURN p.player_name AS name, collect";
const ALL_PLAYERS: &str = "MATCH (p:Player) RETURN p.player_name AS name";
const PROFILES: &str = "RETURN elementId(p) AS id, p.player_name AS name";
const WRITE_BATCH: &str = "UNWIND $batch";

fn seasons_row(name: &str, seasons: &[&str]) -> Record {
    record([("name", json!(name)), ("seasons", json!(seasons))])
}

fn profile_row(id: &str, name: &str, position: Option<&str>, points: i64) -> Record {
    record([
        ("id", json!(id)),
        ("name", json!(name)),
        ("position", json!(position)),
        ("total_points", json!(points)),
    ])
}

fn prepared_graph(duplicate_groups: i64) -> ScriptedGraph {
    ScriptedGraph::new()
        .on(
            DUPLICATE_GROUPS,
            vec![record([("duplicate_groups", json!(duplicate_groups))])],
        )
        .on(EXACT_MERGE, vec![record([("merged", json!(duplicate_groups))])])
        .on(
            SEASONS_PLAYED,
            vec![
                seasons_row("Kyle Walker", &["2021-22", "2022-23"]),
                seasons_row("Kyle Walker-Peters", &["2021-22", "2022-23"]),
                seasons_row("Emile Smith Rowe", &["2021-22"]),
                seasons_row("Emile Smith-Rowe", &["2022-23"]),
            ],
        )
        .on(
            ALL_PLAYERS,
            ["Kyle Walker", "Kyle Walker-Peters", "Emile Smith Rowe", "Emile Smith-Rowe", "Trialist"]
                .iter()
                .map(|name| record([("name", json!(name))]))
                .collect(),
        )
        .on(
            PROFILES,
            vec![
                profile_row("4:a:1", "Emile Smith Rowe", Some("MID"), 152),
                profile_row("4:a:2", "Kyle Walker", Some("DEF"), 98),
                profile_row("4:a:3", "Trialist", None, 0),
            ],
        )
}

fn executed_matching(graph: &ScriptedGraph, needle: &str) -> Vec<CypherQuery> {
    graph
        .executed()
        .into_iter()
        .filter(|query| query.text().contains(needle))
        .collect()
}

#[tokio::test]
async fn test_pipeline_runs_every_phase_on_its_own_session() {
    let graph = prepared_graph(2);
    let pipeline = PrepPipeline::new(Arc::new(graph.clone()), EmbedderRegistry::deterministic());

    let report = pipeline.run().await.unwrap();

    assert_eq!(report.duplicate_groups, 2);
    assert_eq!(executed_matching(&graph, EXACT_MERGE).len(), 1);
    assert!(report.finished_at >= report.started_at);
    assert_eq!(graph.sessions_opened(), 3);
    assert_eq!(graph.open_sessions(), 0);
}

#[tokio::test]
async fn test_exact_merge_is_skipped_without_duplicates() {
    let graph = prepared_graph(0);
    let pipeline = PrepPipeline::new(Arc::new(graph.clone()), EmbedderRegistry::deterministic());

    let report = pipeline.run().await.unwrap();

    assert_eq!(report.duplicate_groups, 0);
    assert!(executed_matching(&graph, EXACT_MERGE).is_empty());
}

#[tokio::test]
async fn test_alias_phase_merges_only_season_disjoint_pairs() {
    let graph = prepared_graph(0);
    let pipeline = PrepPipeline::new(Arc::new(graph.clone()), EmbedderRegistry::deterministic());

    let report = pipeline.run().await.unwrap();

    let merges = executed_matching(&graph, ALIAS_MERGE);
    assert_eq!(merges.len(), 1);
    assert_eq!(
        merges[0].get_param("keep").and_then(ParamValue::as_str),
        Some("Emile Smith Rowe")
    );
    assert_eq!(
        merges[0].get_param("remove").and_then(ParamValue::as_str),
        Some("Emile Smith-Rowe")
    );

    assert_eq!(report.aliases.merged.len(), 1);
    assert_eq!(report.aliases.skipped.len(), 1);
    assert_eq!(report.aliases.skipped[0].longer, "Kyle Walker-Peters");
}

#[tokio::test]
async fn test_failed_alias_merge_is_reported_not_fatal() {
    let graph = ScriptedGraph::new()
        .on_error(ALIAS_MERGE, GraphError::Query("deadlock".to_string()))
        .on(
            SEASONS_PLAYED,
            vec![
                seasons_row("Emile Smith Rowe", &["2021-22"]),
                seasons_row("Emile Smith-Rowe", &["2022-23"]),
            ],
        );
    let pipeline = PrepPipeline::new(Arc::new(graph.clone()), EmbedderRegistry::deterministic());

    let report = pipeline.run().await.unwrap();

    assert!(report.aliases.merged.is_empty());
    assert_eq!(report.aliases.failed.len(), 1);
    assert_eq!(report.aliases.failed[0].0.remove, "Emile Smith-Rowe");
}

#[tokio::test]
async fn test_embedding_phase_rebuilds_indexes_and_writes_both_vectors() {
    let graph = prepared_graph(0);
    let pipeline = PrepPipeline::new(Arc::new(graph.clone()), EmbedderRegistry::deterministic());

    let report = pipeline.run().await.unwrap();

    assert_eq!(report.embeddings.players, 3);
    assert_eq!(report.embeddings.batches, 1);
    assert_eq!(report.embeddings.dimensions["A"], 384);
    assert_eq!(report.embeddings.dimensions["B"], 768);

    assert_eq!(executed_matching(&graph, "DROP INDEX").len(), 4);
    let creates = executed_matching(&graph, "CREATE VECTOR INDEX");
    assert_eq!(creates.len(), 2);
    assert!(creates[0].text().contains("`vector.dimensions`: 384"));
    assert!(creates[1].text().contains("`vector.dimensions`: 768"));

    let batches = executed_matching(&graph, WRITE_BATCH);
    assert_eq!(batches.len(), 1);
    let rows = batches[0].get_param("batch").and_then(ParamValue::as_list).unwrap();
    assert_eq!(rows.len(), 3);

    let ParamValue::Map(first) = &rows[0] else {
        panic!("batch rows are maps");
    };
    assert_eq!(
        first["text"].as_str(),
        Some("Player: Emile Smith Rowe. Position: MID. Total Fantasy Points: 152.")
    );
    assert_eq!(first["embedding_a"].as_list().map(<[ParamValue]>::len), Some(384));
    assert_eq!(first["embedding_b"].as_list().map(<[ParamValue]>::len), Some(768));

    let ParamValue::Map(trialist) = &rows[2] else {
        panic!("batch rows are maps");
    };
    assert_eq!(
        trialist["text"].as_str(),
        Some("Player: Trialist. Position: Unknown. Total Fantasy Points: 0.")
    );
}

#[tokio::test]
async fn test_missing_model_aborts_embedding_phase() {
    let graph = prepared_graph(0);
    let pipeline = PrepPipeline::new(Arc::new(graph.clone()), EmbedderRegistry::new());

    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(err, prep::PrepError::Registry(_)));
    assert!(executed_matching(&graph, WRITE_BATCH).is_empty());
    assert_eq!(graph.open_sessions(), 0);
}

#[tokio::test]
async fn test_verify_reports_nodes_per_watched_name() {
    let graph = ScriptedGraph::new().on_with("MATCH (p:Player {player_name: $name})", |query| {
        let name = query
            .get_param("name")
            .and_then(ParamValue::as_str)
            .unwrap_or_default();
        let rows = match name {
            "Kyle Walker" => vec![record([
                ("id", json!("4:p:1")),
                ("seasons", json!(["2022-23", "2021-22"])),
                ("matches", json!(61)),
            ])],
            "Ben Davies" => vec![
                record([("id", json!("4:p:2")), ("seasons", json!(["2021-22"])), ("matches", json!(20))]),
                record([("id", json!("4:p:3")), ("seasons", json!(["2022-23"])), ("matches", json!(11))]),
            ],
            _ => Vec::new(),
        };
        Ok(rows)
    });
    let pipeline = PrepPipeline::new(Arc::new(graph.clone()), EmbedderRegistry::deterministic());

    let names: Vec<String> = WATCHED_PLAYERS.iter().map(|name| name.to_string()).collect();
    let checks = pipeline.verify(&names).await.unwrap();

    assert_eq!(checks.len(), WATCHED_PLAYERS.len());
    let walker = checks.iter().find(|check| check.name == "Kyle Walker").unwrap();
    assert!(walker.is_unique());
    assert_eq!(walker.nodes[0].seasons, vec!["2021-22", "2022-23"]);
    assert_eq!(walker.nodes[0].matches, 61);

    let davies = checks.iter().find(|check| check.name == "Ben Davies").unwrap();
    assert_eq!(davies.node_count(), 2);

    let eze = checks.iter().find(|check| check.name == "Eberechi Eze").unwrap();
    assert_eq!(eze.node_count(), 0);
    assert_eq!(graph.sessions_opened(), 1);
}

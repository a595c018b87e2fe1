use crate::dsl::{Intent, IntentRequest};
use crate::error::QueryError;
use crate::handlers::{handler_for, Handler, HandlerContext};
use crate::planner::{QueryPlan, QueryPlanner};
use crate::resolve::{resolve_players, resolve_position, resolve_team, Resolution};
use embed::EmbedderRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use storage::{GraphStore, Record, SessionGuard};
use touchline_core::error::TouchlineError;
use touchline_core::metrics::{MetricsCollector, MetricsSnapshot, RequestOutcome};
use touchline_core::model::{EmbeddingModel, RetrievalMode};

pub const GENERAL_CHAT_DATA: &str =
    "This appears to be a general conversation. No database query was executed.";
pub const GENERAL_CHAT_CYPHER: &str = "N/A - General Chat";
pub const MODE_MISMATCH_DATA: &str =
    "Similar Players requires Semantic mode. Please switch retrieval mode to semantic.";
pub const MODE_MISMATCH_CYPHER: &str = "N/A - Requires Vector Index";
pub const MISSING_PLAYER_DATA: &str = "Please specify a player name.";
pub const NOT_APPLICABLE_CYPHER: &str = "N/A";
pub const NO_MATCH_DATA: &str = "No matching records found.";
pub const NO_QUERY_EXECUTED: &str = "No Query Executed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub mode: RetrievalMode,
    #[serde(default)]
    pub model: EmbeddingModel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Rows(Vec<Record>),
    /// The intent is not answered from the graph.
    GeneralConversation,
    Failed(QueryError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub requested_intent: Intent,
    pub intent: Intent,
    pub options: QueryOptions,
    pub outcome: Outcome,
    /// Text of the query that was run, or the last one built before a failure.
    pub cypher: Option<String>,
    pub resolutions: Vec<Resolution>,
    pub steps: Vec<&'static str>,
    pub latency_ms: u64,
}

/// The `{data, cypher}` pair returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundPayload {
    pub data: String,
    pub cypher: String,
}

impl QueryResponse {
    pub fn rows(&self) -> Option<&[Record]> {
        match &self.outcome {
            Outcome::Rows(rows) => Some(rows.as_slice()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&QueryError> {
        match &self.outcome {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn resolution_misses(&self) -> usize {
        self.resolutions.iter().filter(|r| r.is_miss()).count()
    }

    pub fn to_payload(&self) -> OutboundPayload {
        let executed = || {
            self.cypher
                .clone()
                .unwrap_or_else(|| NO_QUERY_EXECUTED.to_string())
        };

        let (data, cypher) = match &self.outcome {
            Outcome::Rows(rows) if rows.is_empty() => (NO_MATCH_DATA.to_string(), executed()),
            Outcome::Rows(rows) => (
                serde_json::to_string(rows).unwrap_or_else(|err| format!("Serialization Error: {err}")),
                executed(),
            ),
            Outcome::GeneralConversation => {
                (GENERAL_CHAT_DATA.to_string(), GENERAL_CHAT_CYPHER.to_string())
            }
            Outcome::Failed(QueryError::ModeMismatch(_)) => {
                (MODE_MISMATCH_DATA.to_string(), MODE_MISMATCH_CYPHER.to_string())
            }
            Outcome::Failed(QueryError::MissingEntity { .. }) => {
                (MISSING_PLAYER_DATA.to_string(), NOT_APPLICABLE_CYPHER.to_string())
            }
            Outcome::Failed(err @ QueryError::Graph(_)) => {
                (format!("Database Error: {err}"), executed())
            }
            Outcome::Failed(err @ (QueryError::Embedding(_) | QueryError::Embedder(_))) => {
                (format!("Embedding Error: {err}"), executed())
            }
            Outcome::Failed(err @ QueryError::InvalidRequest(_)) => {
                (format!("Invalid Request: {err}"), NO_QUERY_EXECUTED.to_string())
            }
        };

        OutboundPayload { data, cypher }
    }
}

/// Answers structured intent requests against a shared graph store.
///
/// Each request takes one session from the store and releases it before the
/// response is returned, whichever way the request ends.
pub struct QueryEngine {
    store: Arc<dyn GraphStore>,
    embedders: EmbedderRegistry,
    metrics: MetricsCollector,
}

struct Execution {
    cypher: Option<String>,
    resolutions: Vec<Resolution>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn GraphStore>, embedders: EmbedderRegistry) -> Self {
        Self {
            store,
            embedders,
            metrics: MetricsCollector::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn execute_json(&self, raw: &str, options: QueryOptions) -> QueryResponse {
        match IntentRequest::parse_json(raw) {
            Ok(request) => self.execute(request, options).await,
            Err(err) => {
                let response = QueryResponse {
                    requested_intent: Intent::Unknown,
                    intent: Intent::Unknown,
                    options,
                    outcome: Outcome::Failed(QueryError::InvalidRequest(err.to_string())),
                    cypher: None,
                    resolutions: Vec::new(),
                    steps: Vec::new(),
                    latency_ms: 0,
                };
                self.record(&response, 0);
                response
            }
        }
    }

    pub async fn execute(&self, request: IntentRequest, options: QueryOptions) -> QueryResponse {
        let started = Instant::now();
        let plan = QueryPlanner::plan(&request);
        if plan.intent != plan.requested_intent {
            tracing::info!(
                from = %plan.requested_intent,
                to = %plan.intent,
                steps = ?plan.steps,
                "intent corrected"
            );
        }

        let mut execution = Execution {
            cypher: None,
            resolutions: Vec::new(),
        };
        let outcome = match handler_for(plan.intent) {
            None => Outcome::GeneralConversation,
            Some(_) if plan.intent.requires_semantic() && options.mode != RetrievalMode::Semantic => {
                Outcome::Failed(QueryError::ModeMismatch(plan.intent))
            }
            Some(handler) => match self
                .run(&request, &plan, options, handler, &mut execution)
                .await
            {
                Ok(rows) => Outcome::Rows(rows),
                Err(err) => {
                    tracing::warn!(
                        intent = %plan.intent,
                        code = %err.error_code(),
                        error = %err,
                        "query failed"
                    );
                    Outcome::Failed(err)
                }
            },
        };

        let latency_us = started.elapsed().as_micros() as u64;
        let response = QueryResponse {
            requested_intent: plan.requested_intent,
            intent: plan.intent,
            options,
            outcome,
            cypher: execution.cypher,
            resolutions: execution.resolutions,
            steps: plan.steps,
            latency_ms: latency_us / 1_000,
        };
        self.record(&response, latency_us);
        response
    }

    async fn run(
        &self,
        request: &IntentRequest,
        plan: &QueryPlan,
        options: QueryOptions,
        handler: Handler,
        execution: &mut Execution,
    ) -> Result<Vec<Record>, QueryError> {
        let entities = &request.entities;
        let mut session = SessionGuard::acquire(self.store.as_ref(), "query").await?;

        let mut players = Vec::new();
        if plan.intent.uses_players() && !entities.players.is_empty() {
            let embedder = match options.mode {
                RetrievalMode::Semantic => Some(self.embedders.resolve(options.model)?),
                RetrievalMode::Baseline => None,
            };
            let resolved = resolve_players(&mut *session, &entities.players, embedder.as_ref()).await?;
            players = resolved.iter().map(|r| r.name().to_string()).collect();
            execution.resolutions.extend(resolved);
        }

        let mut teams = Vec::new();
        if plan.intent.uses_teams() {
            for raw in &entities.teams {
                let resolved = resolve_team(&mut *session, raw).await?;
                teams.push(resolved.name().to_string());
                execution.resolutions.push(resolved);
            }
        }

        let mut aliases = Vec::new();
        if plan.intent.uses_position() {
            if let Some(resolved) = resolve_position(&mut *session, entities.position.as_deref()).await? {
                aliases = resolved.resolved.clone();
                execution.resolutions.push(resolved);
            }
        }

        let ctx = HandlerContext {
            intent: plan.intent,
            players: &players,
            teams: &teams,
            aliases: &aliases,
            metric: entities.metric.as_deref(),
            filter: &plan.filter,
            mode: options.mode,
            model: options.model,
        };
        let query = handler(&ctx)?;
        execution.cypher = Some(query.text().to_string());

        let rows = session.run(&query).await?;
        tracing::info!(
            intent = %plan.intent,
            mode = %options.mode,
            model = %options.model,
            rows = rows.len(),
            "query executed"
        );
        Ok(rows)
    }

    fn record(&self, response: &QueryResponse, latency_us: u64) {
        let (outcome, row_count) = match &response.outcome {
            Outcome::Rows(rows) => (RequestOutcome::Executed, rows.len()),
            Outcome::GeneralConversation => (RequestOutcome::Sentinel, 0),
            Outcome::Failed(QueryError::ModeMismatch(_) | QueryError::MissingEntity { .. }) => {
                (RequestOutcome::Sentinel, 0)
            }
            Outcome::Failed(_) => (RequestOutcome::Failed, 0),
        };
        self.metrics
            .record_request(response.intent.as_str(), outcome, row_count, latency_us);
        self.metrics
            .record_resolution_misses(response.resolution_misses());
    }
}

//! In-memory graph backend that answers queries from a script.
//!
//! Used by tests and offline dry runs: rules match on a fragment of the query
//! text, every executed query is recorded, and open sessions are counted so
//! callers can check that sessions are released. Calls to
//! `db.index.vector.queryNodes` are answered from registered vector indexes.

use crate::ann::LinearAnnIndex;
use crate::cypher::{CypherQuery, ParamValue, Record};
use crate::session::{GraphError, GraphSession, GraphStore};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type Responder = Arc<dyn Fn(&CypherQuery) -> Result<Vec<Record>, GraphError> + Send + Sync>;

const VECTOR_CALL: &str = "db.index.vector.queryNodes";

struct Rule {
    needle: String,
    responder: Responder,
}

#[derive(Default)]
struct ScriptState {
    rules: Vec<Rule>,
    indexes: HashMap<String, LinearAnnIndex>,
    executed: Vec<CypherQuery>,
    session_failure: Option<GraphError>,
}

#[derive(Clone, Default)]
pub struct ScriptedGraph {
    state: Arc<Mutex<ScriptState>>,
    open_sessions: Arc<AtomicUsize>,
    sessions_opened: Arc<AtomicUsize>,
}

impl ScriptedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer any query whose text contains `needle` with `rows`. First match wins.
    pub fn on(self, needle: impl Into<String>, rows: Vec<Record>) -> Self {
        self.on_with(needle, move |_| Ok(rows.clone()))
    }

    pub fn on_error(self, needle: impl Into<String>, error: GraphError) -> Self {
        self.on_with(needle, move |_| Err(error.clone()))
    }

    pub fn on_with<F>(self, needle: impl Into<String>, responder: F) -> Self
    where
        F: Fn(&CypherQuery) -> Result<Vec<Record>, GraphError> + Send + Sync + 'static,
    {
        self.lock().rules.push(Rule {
            needle: needle.into(),
            responder: Arc::new(responder),
        });
        self
    }

    /// Register a vector index whose entries are keyed by player name.
    pub fn with_vector_index(
        self,
        index_name: impl Into<String>,
        entries: impl IntoIterator<Item = (String, Vec<f32>)>,
    ) -> Self {
        {
            let mut state = self.lock();
            let index = state.indexes.entry(index_name.into()).or_default();
            for (name, embedding) in entries {
                index.insert(name, embedding);
            }
        }
        self
    }

    /// Make every subsequent `session()` call fail.
    pub fn fail_sessions(self, error: GraphError) -> Self {
        self.lock().session_failure = Some(error);
        self
    }

    pub fn executed(&self) -> Vec<CypherQuery> {
        self.lock().executed.clone()
    }

    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    fn answer(&self, query: &CypherQuery) -> Result<Vec<Record>, GraphError> {
        let responder = {
            let mut state = self.lock();
            state.executed.push(query.clone());

            let rule = state
                .rules
                .iter()
                .find(|rule| query.text().contains(rule.needle.as_str()))
                .map(|rule| rule.responder.clone());

            match rule {
                Some(responder) => responder,
                None if query.text().contains(VECTOR_CALL) => {
                    return Ok(vector_rows(&state.indexes, query));
                }
                None => return Ok(Vec::new()),
            }
        };

        responder(query)
    }
}

fn vector_rows(indexes: &HashMap<String, LinearAnnIndex>, query: &CypherQuery) -> Vec<Record> {
    let Some(index) = query
        .get_param("index_name")
        .and_then(ParamValue::as_str)
        .and_then(|name| indexes.get(name))
    else {
        return Vec::new();
    };

    let vector: Vec<f32> = query
        .get_param("vector")
        .and_then(ParamValue::as_list)
        .map(|values| {
            values
                .iter()
                .filter_map(ParamValue::as_f64)
                .map(|value| value as f32)
                .collect()
        })
        .unwrap_or_default();
    let k = query
        .get_param("k")
        .and_then(ParamValue::as_i64)
        .unwrap_or(10)
        .max(0) as usize;
    let threshold = query
        .get_param("threshold")
        .and_then(ParamValue::as_f64)
        .unwrap_or(f64::MIN);

    index
        .search(&vector, k)
        .into_iter()
        .filter(|(_, score)| f64::from(*score) > threshold)
        .map(|(name, score)| {
            let mut row = Record::new();
            row.insert("Name".to_string(), json!(name));
            row.insert("Score".to_string(), json!(score));
            row
        })
        .collect()
}

#[async_trait]
impl GraphStore for ScriptedGraph {
    async fn session(&self) -> Result<Box<dyn GraphSession>, GraphError> {
        if let Some(error) = self.lock().session_failure.clone() {
            return Err(error);
        }
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            graph: self.clone(),
        }))
    }
}

struct ScriptedSession {
    graph: ScriptedGraph,
}

#[async_trait]
impl GraphSession for ScriptedSession {
    async fn run(&mut self, query: &CypherQuery) -> Result<Vec<Record>, GraphError> {
        self.graph.answer(query)
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.graph.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Build a row from `(column, value)` pairs.
pub fn record<I, K>(columns: I) -> Record
where
    I: IntoIterator<Item = (K, serde_json::Value)>,
    K: Into<String>,
{
    columns
        .into_iter()
        .map(|(key, value)| (key.into(), value))
        .collect()
}

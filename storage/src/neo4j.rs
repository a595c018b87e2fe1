//! Neo4j backend over the `neo4rs` connection pool.

use crate::cypher::{CypherQuery, ParamValue, Record};
use crate::session::{GraphError, GraphSession, GraphStore};
use async_trait::async_trait;
use neo4rs::{BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph};
use touchline_core::config::Neo4jConfig;

#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, GraphError> {
        let driver_config = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .db(config.database.as_str())
            .max_connections(config.max_connections)
            .build()
            .map_err(|err| GraphError::Connection(err.to_string()))?;

        let graph = Graph::connect(driver_config)
            .await
            .map_err(|err| GraphError::Connection(err.to_string()))?;

        tracing::info!(uri = %config.uri, database = %config.database, "connected to neo4j");
        Ok(Self { graph })
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn session(&self) -> Result<Box<dyn GraphSession>, GraphError> {
        // The pool hands out a connection per statement; the stream is fully
        // drained inside `run`, so nothing outlives the session.
        Ok(Box::new(Neo4jSession {
            graph: self.graph.clone(),
        }))
    }
}

pub struct Neo4jSession {
    graph: Graph,
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn run(&mut self, query: &CypherQuery) -> Result<Vec<Record>, GraphError> {
        let mut statement = neo4rs::query(query.text());
        for (key, value) in query.params() {
            statement = statement.param(key.as_str(), to_bolt(value));
        }

        let mut stream = self
            .graph
            .execute(statement)
            .await
            .map_err(|err| GraphError::Query(err.to_string()))?;

        let mut rows = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|err| GraphError::Query(err.to_string()))?
        {
            let record: Record = row
                .to()
                .map_err(|err| GraphError::Decode(err.to_string()))?;
            rows.push(record);
        }

        Ok(rows)
    }
}

fn to_bolt(value: &ParamValue) -> BoltType {
    match value {
        ParamValue::Null => BoltType::Null(BoltNull),
        ParamValue::Bool(value) => BoltType::from(*value),
        ParamValue::Int(value) => BoltType::from(*value),
        ParamValue::Float(value) => BoltType::from(*value),
        ParamValue::String(value) => BoltType::from(value.as_str()),
        ParamValue::List(values) => {
            BoltType::List(BoltList::from(values.iter().map(to_bolt).collect::<Vec<_>>()))
        }
        ParamValue::Map(values) => {
            let mut map = BoltMap::new();
            for (key, value) in values {
                map.put(BoltString::from(key.as_str()), to_bolt(value));
            }
            BoltType::Map(map)
        }
    }
}

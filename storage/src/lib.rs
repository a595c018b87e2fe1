pub mod ann;
pub mod cypher;
pub mod neo4j;
pub mod scripted;
pub mod session;

pub use cypher::{CypherQuery, ParamValue, Record};
pub use session::{GraphError, GraphSession, GraphStore, SessionGuard};

pub mod dsl;
pub mod engine;
pub mod error;
pub mod filters;
pub mod handlers;
pub mod planner;
pub mod resolve;

pub use dsl::{Entities, Intent, IntentRequest};
pub use engine::{OutboundPayload, Outcome, QueryEngine, QueryOptions, QueryResponse};
pub use error::QueryError;
pub use planner::{QueryPlan, QueryPlanner};
pub use resolve::{EntityKind, MatchSource, Resolution};

//! Offline graph preparation.
//!
//! Establishes what the query path relies on: one node per real player, and
//! both embedding vectors on every player behind their vector indexes. The
//! phases rewrite the graph and must not run alongside live traffic or another
//! preparation run.

pub mod dedup;
pub mod error;
pub mod integrity;
pub mod pipeline;
pub mod vectors;

pub use dedup::{find_alias_pairs, AliasMerge, AliasReport, AliasScan, SkippedAlias};
pub use error::PrepError;
pub use integrity::{IntegrityCheck, NodeHistory, WATCHED_PLAYERS};
pub use pipeline::{PrepPipeline, PrepReport};
pub use vectors::{player_sentence, EmbeddingReport};

pub mod cache;
pub mod embedder;
pub mod http;
pub mod registry;

pub use embedder::{DeterministicEmbedder, EmbedError, Embedder};
pub use registry::{EmbedderRegistry, RegistryError, ResolvedEmbedder};

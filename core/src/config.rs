use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::model::{EmbeddingModel, RetrievalMode};

#[derive(Debug, Deserialize, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    #[default]
    Deterministic,
    Http,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingModelConfig {
    pub name: String,
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,
    /// Base URL of an OpenAI-compatible `/v1/embeddings` server.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model_a")]
    pub model_a: EmbeddingModelConfig,
    #[serde(default = "default_model_b")]
    pub model_b: EmbeddingModelConfig,
    #[serde(default = "default_cache_entries")]
    pub cache_entries: usize,
}

impl EmbeddingConfig {
    pub fn model(&self, model: EmbeddingModel) -> &EmbeddingModelConfig {
        match model {
            EmbeddingModel::A => &self.model_a,
            EmbeddingModel::B => &self.model_b,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            endpoint: None,
            api_key: None,
            model_a: default_model_a(),
            model_b: default_model_b(),
            cache_entries: default_cache_entries(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub mode: RetrievalMode,
    #[serde(default)]
    pub model: EmbeddingModel,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub neo4j: Neo4jConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Layering: `<dir>/default` → `<dir>/<RUN_MODE>` → `TOUCHLINE__*` env vars.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let dir = dir.as_ref();
        let default_path = dir.join("default");
        let mode_path = dir.join(&run_mode);

        let builder = Config::builder()
            .add_source(File::with_name(&default_path.to_string_lossy()))
            .add_source(File::with_name(&mode_path.to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("TOUCHLINE").separator("__"));

        builder.build()?.try_deserialize()
    }
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_database() -> String {
    "neo4j".to_string()
}

const fn default_max_connections() -> usize {
    8
}

const fn default_cache_entries() -> usize {
    1_024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model_a() -> EmbeddingModelConfig {
    EmbeddingModelConfig {
        name: EmbeddingModel::A.default_model_name().to_string(),
        dimensions: EmbeddingModel::A.dimensions(),
    }
}

fn default_model_b() -> EmbeddingModelConfig {
    EmbeddingModelConfig {
        name: EmbeddingModel::B.default_model_name().to_string(),
        dimensions: EmbeddingModel::B.dimensions(),
    }
}

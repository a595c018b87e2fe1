//! `touchline` command line.
//!
//! Usage:
//!   touchline ask '{"intent": "Player_Stats", "entities": {"Player": ["Salah"]}}'
//!   touchline ask --file request.json --mode baseline
//!   echo '{...}' | touchline ask --model B
//!   touchline prep
//!   touchline verify --player "Kyle Walker"

use anyhow::Context;
use clap::{Parser, Subcommand};
use embed::EmbedderRegistry;
use prep::{PrepPipeline, WATCHED_PLAYERS};
use query::{QueryEngine, QueryOptions};
use std::path::PathBuf;
use std::sync::Arc;
use storage::neo4j::Neo4jStore;
use tokio::io::AsyncReadExt;
use touchline_core::config::AppConfig;
use touchline_core::model::{EmbeddingModel, RetrievalMode};

#[derive(Parser)]
#[command(name = "touchline")]
#[command(about = "Fantasy football graph questions answered from Neo4j")]
struct Cli {
    /// Directory holding default.toml and the RUN_MODE overlay
    #[arg(short = 'c', long, default_value = "config", env = "TOUCHLINE_CONFIG_DIR")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one intent request and print the {data, cypher} payload
    Ask {
        /// Request JSON; read from --file or stdin when omitted
        request: Option<String>,

        #[arg(short, long, conflicts_with = "request")]
        file: Option<PathBuf>,

        /// baseline or semantic; defaults to the configured mode
        #[arg(long)]
        mode: Option<RetrievalMode>,

        /// A or B; defaults to the configured model
        #[arg(long)]
        model: Option<EmbeddingModel>,

        /// Also print the resolution trace and plan steps to stderr
        #[arg(short, long)]
        verbose: bool,
    },
    /// Deduplicate players and rebuild both embedding indexes
    Prep,
    /// Report how many nodes carry each player name
    Verify {
        /// Defaults to the built-in watch list
        #[arg(short, long = "player")]
        players: Vec<String>,
    },
}

async fn read_request(request: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    if let Some(request) = request {
        return Ok(request);
    }
    if let Some(path) = file {
        return tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading request from {}", path.display()));
    }

    let mut buffer = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buffer)
        .await
        .context("reading request from stdin")?;
    Ok(buffer)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir)
        .with_context(|| format!("loading configuration from {}", cli.config_dir.display()))?;
    touchline_core::init_tracing(&config.logging.level, config.logging.format);

    let store = Arc::new(
        Neo4jStore::connect(&config.neo4j)
            .await
            .context("connecting to neo4j")?,
    );
    let embedders =
        EmbedderRegistry::from_config(&config.embedding).context("building embedders")?;

    match cli.command {
        Command::Ask {
            request,
            file,
            mode,
            model,
            verbose,
        } => {
            let raw = read_request(request, file).await?;
            let options = QueryOptions {
                mode: mode.unwrap_or(config.retrieval.mode),
                model: model.unwrap_or(config.retrieval.model),
            };

            let engine = QueryEngine::new(store, embedders);
            let response = engine.execute_json(&raw, options).await;
            if verbose {
                eprintln!(
                    "intent: {} -> {} ({:?}, {} ms)",
                    response.requested_intent,
                    response.intent,
                    response.steps,
                    response.latency_ms
                );
                for resolution in &response.resolutions {
                    eprintln!("{}", serde_json::to_string(resolution)?);
                }
            }
            println!("{}", serde_json::to_string_pretty(&response.to_payload())?);
        }
        Command::Prep => {
            let report = PrepPipeline::new(store, embedders)
                .run()
                .await
                .context("graph preparation failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Verify { players } => {
            let names = if players.is_empty() {
                WATCHED_PLAYERS.iter().map(|name| name.to_string()).collect()
            } else {
                players
            };
            let checks = PrepPipeline::new(store, embedders)
                .verify(&names)
                .await
                .context("integrity check failed")?;
            for check in &checks {
                if !check.is_unique() {
                    tracing::warn!(player = %check.name, nodes = check.node_count(), "name is not a single node");
                }
            }
            println!("{}", serde_json::to_string_pretty(&checks)?);
        }
    }

    Ok(())
}

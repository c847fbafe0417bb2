//! Document Q&A server binary
//!
//! Run with: cargo run -p docqa --bin docqa-server -- --config docqa.toml

use clap::Parser;
use docqa::{config::AnswererBackend, AppConfig, DocQaServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "docqa-server", version, about = "Document Q&A server")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Answerer: {:?}", config.llm.backend);
    tracing::info!("  - Chunk size: {}", config.ingestion.chunk_size);
    tracing::info!("  - Max upload: {} bytes", config.server.max_upload_size);
    for (key, path) in &config.demo.files {
        if !path.is_file() {
            tracing::warn!("Demo '{}' has no file at {}", key, path.display());
        }
    }

    if config.llm.backend == AnswererBackend::Ollama {
        tracing::info!("Checking Ollama at {}...", config.llm.base_url);
        let client = reqwest::Client::new();
        match client.get(format!("{}/api/tags", config.llm.base_url)).send().await {
            Ok(resp) if resp.status().is_success() => tracing::info!("Ollama is running"),
            _ => {
                tracing::warn!("Ollama not available at {}", config.llm.base_url);
                tracing::warn!("Queries will fail until it is reachable (ollama serve)");
            }
        }
    }

    let server = DocQaServer::new(config)?;
    tracing::info!("Health: http://{}/api/health", server.address());

    server.start().await?;

    Ok(())
}

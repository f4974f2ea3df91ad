use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use chatrelay_agent::{ChatSession, ContextWindow};
use chatrelay_config::Config;
use chatrelay_gateway::{start_server, GatewayState};
use chatrelay_history::HistoryStore;
use chatrelay_model::OpenAiModel;

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(about = "chatrelay - bounded-history chat completion proxy")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    let api_key = config
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY is not set; the model service cannot be reached")?;

    let model = OpenAiModel::new(
        api_key,
        config.model.as_str(),
        Duration::from_secs(config.request_timeout_secs),
    )?;

    let store = HistoryStore::new(config.history_path.as_str());
    let window = ContextWindow::new(config.max_history, config.context_budget());
    let mut session = ChatSession::new(window, store, Arc::new(model), config.generation_params());
    session.preload_history().await;

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("Invalid bind address")?;
    let state = GatewayState::new(session);

    info!(
        model = %config.model,
        max_history = config.max_history,
        context_budget = config.context_budget(),
        "Starting chatrelay"
    );

    tokio::select! {
        result = start_server(addr, state) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received; stopping server");
            Ok(())
        }
    }
}

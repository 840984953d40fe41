//! `buddy` command-line entry point.

use anyhow::{Context, bail};
use buddy::config::{BuddyConfig, LayeredConfigOptions};
use buddy::core::{Embedder, Generator, MemorySession, OllamaEmbedder, OllamaGenerator};
use buddy::memory::snapshot;
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Conversational assistant with persistent vector memory.
#[derive(Parser)]
#[command(name = "buddy", version)]
struct Cli {
    /// Config file applied on top of the discovered buddy.json5 layers
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP chat API
    Serve {
        /// Address to bind, overriding `server.bind`
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Run a single turn and print the reply
    Chat {
        /// Message to send
        query: String,
    },
    /// Print stored records without contacting any model
    Inspect {
        /// Show only the most recent N records
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    buddy::init_logging();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Serve { bind } => serve(&config, bind).await,
        Command::Chat { query } => chat(&config, &query).await,
        Command::Inspect { limit } => inspect(&config, limit),
    }
}

fn load_config(runtime_path: Option<&Path>) -> anyhow::Result<BuddyConfig> {
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    info!("loading layered config from cwd: {}", cwd.display());
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = runtime_path {
        options = options.with_runtime_path(path);
    }
    let layered =
        BuddyConfig::load_layered_with_options(options).context("failed to load config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    Ok(layered.config)
}

async fn open_session(config: &BuddyConfig) -> anyhow::Result<Arc<MemorySession>> {
    let embedder: Arc<dyn Embedder> = Arc::new(
        OllamaEmbedder::from_config(&config.embedding)
            .context("failed to build embedding client")?,
    );
    let generator: Arc<dyn Generator> = Arc::new(
        OllamaGenerator::from_config(&config.generation)
            .context("failed to build generation client")?,
    );
    let session = MemorySession::from_config(config, embedder, generator)
        .await
        .context("failed to open memory")?;
    Ok(Arc::new(session))
}

async fn serve(config: &BuddyConfig, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let addr = match bind {
        Some(addr) => addr,
        None => config
            .server
            .bind
            .parse()
            .with_context(|| format!("invalid server.bind: {}", config.server.bind))?,
    };
    let session = open_session(config).await?;
    buddy::server::serve(session, addr)
        .await
        .context("server stopped")
}

async fn chat(config: &BuddyConfig, query: &str) -> anyhow::Result<()> {
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }
    let session = open_session(config).await?;
    let outcome = session.submit(query).await.context("turn failed")?;
    println!("{}", outcome.reply);
    if let buddy::core::Durability::Deferred { error } = &outcome.durability {
        eprintln!("warning: memory not saved: {error}");
    }
    Ok(())
}

fn inspect(config: &BuddyConfig, limit: Option<usize>) -> anyhow::Result<()> {
    let path = config.memory_path()?;
    let store = snapshot::load(&path)
        .with_context(|| format!("failed to load snapshot {}", path.display()))?;
    let records = store.all();
    let skip = limit.map_or(0, |limit| records.len().saturating_sub(limit));
    println!(
        "{} ({} records, dimension {})",
        path.display(),
        records.len(),
        store
            .dimension()
            .map_or_else(|| "unset".to_string(), |dimension| dimension.to_string())
    );
    for record in &records[skip..] {
        println!("{:>6}  {:<6}  {}", record.id, record.role.as_str(), record.text);
    }
    Ok(())
}

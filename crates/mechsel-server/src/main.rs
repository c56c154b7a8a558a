use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mechsel_core::config::{CatalogLocation, ServiceConfig};
use mechsel_server::{import, router, AppState};

#[derive(Debug, Parser)]
#[command(name = "mechsel-server", version, about = "AI-assisted motor and gear material selection service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve(ServeArgs),
    /// Pull motor records from remote catalog services into a catalog file
    Import(ImportArgs),
}

#[derive(Debug, Default, Args)]
struct ServeArgs {
    /// Listening port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,
    /// Catalog file path or http(s) URL (overrides CATALOG_URI)
    #[arg(long)]
    catalog: Option<CatalogLocation>,
}

#[derive(Debug, Args)]
struct ImportArgs {
    /// Catalog service URL returning a JSON array of motors; repeatable
    #[arg(long = "source", required = true)]
    sources: Vec<String>,
    /// Output catalog file (default: ~/.mechsel/catalog.json)
    #[arg(long, short)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env().context("invalid configuration")?;

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => serve(config, args).await,
        Command::Import(args) => run_import(config, args).await,
    }
}

async fn serve(mut config: ServiceConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(catalog) = args.catalog {
        config.catalog = catalog;
    }

    let state = AppState::from_config(&config)?;
    if state.reference.is_none() {
        info!("IMAGE_URL not set; find-material requests will fail");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        catalog = %config.catalog,
        provider = %config.ai.provider,
        model = %config.ai.model,
        "Listening on http://localhost:{}",
        config.port
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn run_import(config: ServiceConfig, args: ImportArgs) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .context("failed to create HTTP client")?;
    let out = args.out.unwrap_or_else(mechsel_core::default_catalog_path);

    let summary = import::import_catalog(&client, &args.sources, &out).await?;
    eprintln!(
        "Wrote {} motors to {} ({} fetched, {} duplicates skipped)",
        summary.written,
        out.display(),
        summary.fetched,
        summary.duplicates
    );
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

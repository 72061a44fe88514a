use anyhow::Context;
use clap::Parser;
use docqa::{api, config::Config, logging, service::QaService};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Retrieval-augmented question answering over linked or uploaded documents.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Address to bind, overriding `SERVER_HOST`.
    #[arg(long)]
    host: Option<IpAddr>,
    /// Port to bind, overriding `SERVER_PORT` / `PORT`.
    #[arg(long)]
    port: Option<u16>,
    /// Dotenv file loaded before reading the environment.
    #[arg(long, env = "DOCQA_ENV_FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    logging::init_tracing();

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.log_summary();

    let service = QaService::from_config(&config).context("failed to build service")?;
    let app = api::create_router(Arc::new(service), api::ApiSettings::from_config(&config));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use patient_registry::ai::{AiService, GeminiClient};
use patient_registry::api;
use patient_registry::config::Config;
use patient_registry::repository::PatientRepository;
use patient_registry::store::MemoryStore;

#[derive(Parser)]
#[command(name = "patient-registry", about = "Patient records service")]
struct Cli {
    /// Configuration file (TOML or JSON).
    #[arg(long)]
    config: Option<String>,
    /// Override the configured bind host.
    #[arg(long)]
    host: Option<String>,
    /// Override the configured bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => {
            let mut config = Config::default();
            config.apply_env();
            config
        }
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Err(errors) = config.validate() {
        return Err(errors.join("; ").into());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.level))
        .init();

    let store = if config.store.ordered_queries {
        MemoryStore::new()
    } else {
        MemoryStore::without_ordering()
    };
    let repository = Arc::new(PatientRepository::new(Arc::new(store)));

    if config.ai.api_key.is_empty() {
        info!("no AI credential configured; summary and chat calls will be rejected upstream");
    }
    let llm = Arc::new(GeminiClient::new(&config.ai));
    let ai = Arc::new(AiService::new(llm, config.ai.record_limit));

    let app = api::router(repository, ai);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("patient registry listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

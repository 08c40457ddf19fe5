//! traceval CLI application
//!
//! Thin front end over `traceval-core`: dataset management plus the
//! evaluation entry points, wired to any OpenAI-compatible model endpoint.

mod args;
mod commands;

use clap::Parser;
use traceval_core::{ApiClient, ApiConfig, TracevalResult};

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> TracevalResult<()> {
    // Set RUST_LOG=debug for verbose logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = ApiConfig::from_env();
    if let Some(endpoint) = cli.endpoint.clone() {
        config = config.with_api_url(endpoint);
    }
    if let Some(api_key) = cli.api_key.clone() {
        config = config.with_api_key(api_key);
    }
    if let Some(tenant_id) = cli.tenant_id.clone() {
        config = config.with_tenant_id(tenant_id);
    }
    let client = ApiClient::connect(config).await?;

    match cli.command {
        Commands::Datasets { action } => commands::datasets::handle(&client, action).await,
        Commands::Examples { action } => commands::examples::handle(&client, action).await,
        Commands::Run(run_args) => commands::run::handle(&client, run_args).await,
    }
}

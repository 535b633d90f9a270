//! Order execution bot entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Derivatives order execution bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via ORDEX_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    ordex_bot::logging::init_logging();

    info!("starting ordex-bot v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(|| std::env::var("ORDEX_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());
    info!(config_path = %config_path, "loading configuration");

    let config = ordex_bot::AppConfig::from_file(&config_path)?;
    let app = ordex_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}

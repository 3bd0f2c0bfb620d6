//! mintfeed - live token-listing feed. Entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Live deduplicated token-listing feed
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MINTFEED_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any wss:// connection
    mintfeed_ws::init_crypto();

    let args = Args::parse();

    mintfeed_telemetry::init_logging()?;

    info!("Starting mintfeed v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > MINTFEED_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("MINTFEED_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = mintfeed_app::AppConfig::from_file(&config_path)?;
    info!(
        endpoint = %config.ws.endpoint,
        max_entries = config.feed.max_entries,
        dashboard = config.dashboard.enabled,
        "Configuration loaded"
    );

    let app = mintfeed_app::Application::new(config)?;
    app.run().await?;

    info!("mintfeed stopped");
    Ok(())
}

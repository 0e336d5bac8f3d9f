use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meme_front::{config::Config, utils, web::{AppState, WebServer}};

#[derive(Parser)]
#[command(name = "meme-front")]
#[command(version = "0.1.0")]
#[command(about = "A caching front end for a meme rendering service")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Rendering service base URL (overrides config file)
    #[arg(short = 'u', long, value_name = "URL")]
    upstream: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = if cli.log_level == "trace" {
        format!("meme_front={},tower_http=trace", cli.log_level)
    } else {
        format!("meme_front={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting meme-front v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration from specified file
    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    // Override config with CLI arguments
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream.url = upstream;
    }
    config.upstream.url = utils::sanitize_base_url(&config.upstream.url);

    info!("Using rendering service at: {}", config.upstream.url);

    tokio::fs::create_dir_all(&config.storage.templates_path).await?;
    info!(
        "Templates directory: {}",
        config.storage.templates_path.display()
    );

    let state = AppState::from_config(config)?;

    // Warm the catalog so the first page load does not pay for the full
    // upstream crawl; failure is not fatal, the next request retries.
    {
        let catalog = state.catalog.clone();
        tokio::spawn(async move {
            match catalog.list().await {
                Ok(snapshot) => info!("catalog warmed with {} templates", snapshot.len()),
                Err(e) => warn!("catalog warm-up failed: {}", e),
            }
        });
    }

    let web_server = WebServer::new(state)?;
    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await?;

    Ok(())
}

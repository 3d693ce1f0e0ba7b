// HTTP server for the escalating scraper
//
// Reads config.yaml (or $ALLSCRAPE_CONFIG) and serves /scrape and /search.
// Log verbosity follows RUST_LOG, defaulting to info.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = allscrape::load_yaml_config().context("Failed to load configuration")?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid server address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    allscrape::start_server(addr, config).await
}

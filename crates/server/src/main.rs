//! skycache entry point.
//!
//! Boots the caching worker and serves lifecycle events as JSON lines on stdio.
//! Logging goes to stderr so it never interleaves with replies on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use skycache_client::{FetchConfig, HttpFetcher};
use skycache_core::{AppConfig, CacheDb};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod worker;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let origin = config.origin_url()?;

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;

    let mut fetch_config = FetchConfig::new(origin.clone());
    fetch_config.user_agent = config.user_agent.clone();
    let fetcher = Arc::new(HttpFetcher::new(fetch_config)?);

    let worker = worker::ServiceWorker::new(&config, db, fetcher)?;
    tracing::info!(store = worker.registry().store_name(), origin = %origin, "starting skycache worker on stdio");

    let host = handler::Host::new(worker, origin);
    host.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    tracing::info!("input closed; shutting down");
    Ok(())
}

//! shellcache server entry point.
//!
//! Boots the offline cache controller, runs setup and activation, then
//! serves MCP on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{ControllerConfig, FetchClient, FetchConfig, Network, OfflineController};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let base = config.base_url()?;

    tracing::info!(
        generation = %config.generation_name(),
        db_path = %config.db_path.display(),
        "Starting shellcache server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config)?)?);
    let controller = OfflineController::new(ControllerConfig::from_app_config(&config)?, db, Arc::clone(&network));

    let setup = controller.setup().await?;
    for failure in &setup.failed {
        tracing::warn!(url = %failure.url, error = %failure.error, "asset not cached");
    }
    let activated = controller.activate().await?;
    tracing::info!(
        generation = %activated.generation,
        cached = setup.cached.len(),
        purged = activated.purged.len(),
        "controller ready"
    );

    let handler = handler::ShellCacheServer::new(controller.clone(), network, base);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    controller.settle().await;
    if let Err(e) = controller.db().close().await {
        tracing::warn!(error = %e, "cache database did not close cleanly");
    }

    Ok(())
}

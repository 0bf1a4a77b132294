use std::sync::Arc;

use items_server::config::ServerConfig;
use items_server::logging::init_logging;
use items_server::{DocumentStore, ItemService, MemoryStore, TimeoutStore};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = ServerConfig::from_env()?;
    init_logging(&config.logging)?;

    let store: Arc<dyn DocumentStore> = match config.store_timeout {
        Some(limit) => Arc::new(TimeoutStore::new(MemoryStore::new(), limit)),
        None => Arc::new(MemoryStore::new()),
    };
    let service = ItemService::new(store).with_create_response(config.create_response);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, create_response = ?config.create_response, "listening");

    items_server::run_until(listener, service, shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

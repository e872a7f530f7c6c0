//! Compensation engine HTTP server.

use std::env;
use std::sync::Arc;

use compensation_engine::api::{AppState, create_router};
use compensation_engine::config::ConfigLoader;
use compensation_engine::services::EngineContext;
use compensation_engine::store::{MemoryStore, SeedData};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_DIR: &str = "config/default";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_dir =
        env::var("COMPENSATION_CONFIG_DIR").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    let bind_addr =
        env::var("COMPENSATION_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

    let loader = ConfigLoader::load(&config_dir)?;
    info!(config_dir = %config_dir, files = loader.files().len(), "Configuration loaded");

    let store = Arc::new(MemoryStore::new());
    if let Ok(seed_file) = env::var("COMPENSATION_SEED_FILE") {
        store.apply_seed(SeedData::load(&seed_file)?)?;
        info!(seed_file = %seed_file, "Seed file applied");
    }

    let ctx = EngineContext::in_memory(Arc::new(loader.into_store()), store);
    let app = create_router(AppState::new(ctx));

    let listener = tokio::net::TcpListener::bind(bind_addr.as_str()).await?;
    info!(bind_addr = %bind_addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}

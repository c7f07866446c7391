//! Lekha-Terminal gateway
//!
//! Serves `POST /api/gemini` and forwards actions to the model provider.

use lekha_terminal::config::{API_KEY_VAR, ServerConfig};
use lekha_terminal::provider::GeminiFactory;
use lekha_terminal::server::ApiServer;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lekha_terminal::init();

    let config = ServerConfig::from_env()?;
    if config.credentials.resolve().is_none() {
        warn!("{} is not set; requests will fail with API_KEY_MISSING until it is", API_KEY_VAR);
    }

    let factory = Arc::new(GeminiFactory::new(config.base_url.clone()));
    let mut server = ApiServer::new(config, factory);
    let addr = server.start().await?;
    info!("Gateway listening on http://{}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    server.stop();

    Ok(())
}

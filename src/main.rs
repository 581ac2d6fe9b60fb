//! # chat-relay server
//!
//! Reads configuration, builds the provider client and serves the relay
//! until Ctrl-C or SIGTERM.

use chat_relay::{create_router, shutdown_signal, AppState, ChatClient, Config};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from CLI args and .env file
    let config = Config::parse_args();

    let state = match AppState::new(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to create chat client: {}", e);
            std::process::exit(1);
        }
    };

    info!("Provider: {}", state.adapter().provider());
    info!("Model: {}", state.adapter().model_id());
    info!("CORS origins: {}", config.cors_origins);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("chat-relay listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

//! HTTP server setup and configuration.

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::{Config, WatsonConfig};
use crate::watson::WatsonClient;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub watson: Arc<WatsonClient>,
}

impl AppState {
    pub fn new(config: &Config, http_client: Client) -> Self {
        let watson = WatsonClient::new(http_client, config);
        Self {
            watson: Arc::new(watson),
        }
    }
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health))
        // State and middleware
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Build the outbound HTTP client used for IAM and watsonx.ai calls.
pub fn build_http_client(config: &WatsonConfig) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    let http_client = build_http_client(&config.watson)?;
    let state = AppState::new(&config, http_client);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting medrelay server");

    axum::serve(listener, app).await?;

    Ok(())
}

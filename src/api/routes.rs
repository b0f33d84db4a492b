//! HTTP route handlers.

use std::sync::Arc;

use axum::middleware;
use axum::{extract::State, response::Json, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::provisioning::{HttpKeyMinter, KeyMinter, WalletProvisioner};
use crate::registry::ConnectedWalletRegistry;
use crate::store::{create_wallet_store, SharedWalletStore};

use super::auth;
use super::connected_wallets;
use super::types::HealthResponse;
use super::wallets;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Wallet and connected-wallet records
    pub store: SharedWalletStore,
    /// Wallet creation hook sequence
    pub provisioner: WalletProvisioner,
    /// Connected wallet registry
    pub registry: ConnectedWalletRegistry,
}

impl AppState {
    pub fn new(config: Config, store: SharedWalletStore, minter: Arc<dyn KeyMinter>) -> Self {
        Self {
            provisioner: WalletProvisioner::new(minter, Arc::clone(&store)),
            registry: ConnectedWalletRegistry::new(Arc::clone(&store)),
            store,
            config,
        }
    }
}

/// Build the API router for a prepared state.
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/api/health", get(health));

    let protected_routes = Router::new()
        .nest("/api/wallets", wallets::routes())
        .nest("/api/connected-wallets", connected_wallets::routes())
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    public_routes
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = create_wallet_store(config.store, config.data_dir.clone()).await?;
    tracing::info!(
        persistent = store.is_persistent(),
        "Wallet store initialized ({:?})",
        config.store
    );

    let minter = Arc::new(HttpKeyMinter::new(&config.key_service)?);
    tracing::info!("Key service at {}", minter.url());

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, store, minter));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        persistent_store: state.store.is_persistent(),
    })
}

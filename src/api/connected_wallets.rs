//! API endpoints for linked external wallets.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get},
    Router,
};

use super::auth::AuthUser;
use super::routes::AppState;
use super::types::{api_error, AddConnectedWalletRequest, ApiError, ConnectedWallet};

/// Create the connected-wallet API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_connected_wallets).post(add_connected_wallet))
        .route("/:id", delete(remove_connected_wallet))
}

/// GET /api/connected-wallets
async fn list_connected_wallets(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ConnectedWallet>>, ApiError> {
    state
        .registry
        .list(&user.id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// POST /api/connected-wallets
/// Link an external wallet after verifying its signed proof.
async fn add_connected_wallet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AddConnectedWalletRequest>,
) -> Result<Json<ConnectedWallet>, ApiError> {
    state
        .registry
        .add(&user.id, req)
        .await
        .map(Json)
        .map_err(api_error)
}

/// DELETE /api/connected-wallets/:id
async fn remove_connected_wallet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .registry
        .remove(&user.id, &id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(api_error)
}

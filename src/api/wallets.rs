//! API endpoints for the caller's custodied wallet.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::HeaderMap,
    response::Json,
    routing::get,
    Router,
};

use super::auth::AuthUser;
use super::routes::AppState;
use super::types::{api_error, ApiError, PublicWallet};
use crate::error::WAuthError;
use crate::provisioning::EncryptedCredentials;
use crate::visibility::enrich_wallet;

/// Create the wallet API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_wallets).post(create_wallet))
        .route("/:id", get(get_wallet))
}

/// POST /api/wallets
/// Create the caller's wallet. The encrypted password blobs travel as headers.
async fn create_wallet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
) -> Result<Json<PublicWallet>, ApiError> {
    let credentials = EncryptedCredentials::from_headers(&headers);
    let outcome = state
        .provisioner
        .create_wallet(&user.id, credentials.as_ref())
        .await
        .map_err(api_error)?;
    Ok(Json(enrich_wallet(outcome.wallet())))
}

/// GET /api/wallets
/// The caller's wallets (zero or one).
async fn list_wallets(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PublicWallet>>, ApiError> {
    let wallet = state
        .store
        .find_wallet_by_owner(&user.id)
        .await
        .map_err(|e| api_error(e.into()))?;
    Ok(Json(wallet.iter().map(enrich_wallet).collect()))
}

/// GET /api/wallets/:id
async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<PublicWallet>, ApiError> {
    let wallet = state
        .store
        .get_wallet(&id)
        .await
        .map_err(|e| api_error(e.into()))?
        .filter(|w| w.owner == user.id)
        .ok_or_else(|| api_error(WAuthError::NotFound))?;
    Ok(Json(enrich_wallet(&wallet)))
}

//! API request and response types.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::{WAuthError, UNKNOWN_OPERATION, UNSUPPORTED_OPERATIONS};

pub use crate::registry::AddConnectedWalletRequest;
pub use crate::store::ConnectedWallet;
pub use crate::visibility::PublicWallet;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether the record store survives restarts
    pub persistent_store: bool,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code (see [`WAuthError::code`])
    pub error: String,
    pub message: String,
    /// Status returned by the key service, for `provisioning_upstream`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    /// Raw body returned by the key service, for `provisioning_upstream`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_body: Option<String>,
}

impl From<&WAuthError> for ErrorResponse {
    fn from(err: &WAuthError) -> Self {
        let (upstream_status, upstream_body) = match err {
            WAuthError::ProvisioningUpstream { status, body } => (*status, Some(body.clone())),
            _ => (None, None),
        };
        Self {
            error: err.code().to_string(),
            message: err.to_string(),
            upstream_status,
            upstream_body,
        }
    }
}

impl ErrorResponse {
    /// Rebuild the error on the client side.
    ///
    /// Every code produced by [`WAuthError::code`] maps back to its own
    /// variant; only unknown codes become [`WAuthError::Transport`].
    pub fn into_error(self) -> WAuthError {
        match self.error.as_str() {
            "missing_credentials" => WAuthError::MissingCredentials,
            "provisioning_upstream" => WAuthError::ProvisioningUpstream {
                status: self.upstream_status,
                body: self.upstream_body.unwrap_or_default(),
            },
            "missing_address" => WAuthError::MissingAddress,
            "missing_public_key" => WAuthError::MissingPublicKey,
            "invalid_proof" => WAuthError::InvalidProof,
            "not_found" => WAuthError::NotFound,
            "not_connected" => WAuthError::NotConnected,
            "not_implemented" => WAuthError::NotImplemented(operation_name(&self.message)),
            "unauthorized" => WAuthError::Unauthorized(detail(self.message, "Unauthorized: ")),
            "conflict" => WAuthError::Conflict(detail(self.message, "Conflict: ")),
            "storage" => WAuthError::Storage(detail(self.message, "Storage error: ")),
            "transport" => WAuthError::Transport(detail(self.message, "Transport error: ")),
            "signing" => WAuthError::Signing(detail(self.message, "Signing failed: ")),
            _ => WAuthError::Transport(self.message),
        }
    }
}

/// Strip the display prefix the server added, leaving the original detail.
fn detail(message: String, prefix: &str) -> String {
    match message.strip_prefix(prefix) {
        Some(rest) => rest.to_string(),
        None => message,
    }
}

fn operation_name(message: &str) -> &'static str {
    let name = message
        .strip_suffix(" is not implemented in WAuth yet")
        .unwrap_or(message);
    UNSUPPORTED_OPERATIONS
        .iter()
        .copied()
        .find(|op| *op == name)
        .unwrap_or(UNKNOWN_OPERATION)
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Convert a domain error into an API error response.
pub fn api_error(err: WAuthError) -> ApiError {
    (err.status_code(), Json(ErrorResponse::from(&err)))
}

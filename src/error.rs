//! Error taxonomy shared by the server hooks, the registry and the client adapter.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised by wallet provisioning, the connected-wallet registry and
/// the client-side strategy adapter.
#[derive(Debug, Error)]
pub enum WAuthError {
    /// One or both encrypted credential headers were absent or empty.
    #[error("Missing encrypted password headers")]
    MissingCredentials,

    /// The key-minting service answered with something other than 200,
    /// or could not be reached at all (`status` is `None`).
    #[error("Key service returned status {}: {body}", status.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string()))]
    ProvisioningUpstream { status: Option<u16>, body: String },

    #[error("No address found")]
    MissingAddress,

    #[error("No public key found")]
    MissingPublicKey,

    /// Signature did not verify against the claimed address / public key.
    #[error("Invalid wallet ownership proof")]
    InvalidProof,

    /// Record missing or owned by another identity. Both cases look the same.
    #[error("Record not found")]
    NotFound,

    #[error("Wallet is not connected")]
    NotConnected,

    #[error("{0} is not implemented in WAuth yet")]
    NotImplemented(&'static str),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Raised by an external wallet handle while signing; passed through as-is.
    #[error("Signing failed: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, WAuthError>;

/// Wallet operations the strategy refuses with [`WAuthError::NotImplemented`].
pub const UNSUPPORTED_OPERATIONS: [&str; 5] =
    ["Sign", "Dispatch", "Sign data item", "Encrypt", "Decrypt"];

/// Placeholder for an unsupported operation whose name was lost in transit.
pub const UNKNOWN_OPERATION: &str = "Operation";

impl WAuthError {
    /// HTTP status used when this error crosses the API boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCredentials
            | Self::MissingAddress
            | Self::MissingPublicKey
            | Self::InvalidProof => StatusCode::BAD_REQUEST,
            Self::ProvisioningUpstream { .. } => StatusCode::BAD_GATEWAY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) | Self::NotConnected => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Storage(_) | Self::Transport(_) | Self::Signing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code carried in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::ProvisioningUpstream { .. } => "provisioning_upstream",
            Self::MissingAddress => "missing_address",
            Self::MissingPublicKey => "missing_public_key",
            Self::InvalidProof => "invalid_proof",
            Self::NotFound => "not_found",
            Self::NotConnected => "not_connected",
            Self::NotImplemented(_) => "not_implemented",
            Self::Unauthorized(_) => "unauthorized",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "storage",
            Self::Transport(_) => "transport",
            Self::Signing(_) => "signing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_message_includes_status_and_body() {
        let err = WAuthError::ProvisioningUpstream {
            status: Some(500),
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Key service returned status 500: boom");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn not_found_and_forbidden_share_one_status() {
        assert_eq!(WAuthError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(WAuthError::NotFound.code(), "not_found");
    }

    #[test]
    fn not_implemented_names_the_operation() {
        let err = WAuthError::NotImplemented("Sign");
        assert_eq!(err.to_string(), "Sign is not implemented in WAuth yet");
    }
}

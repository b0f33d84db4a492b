//! Encrypted credential headers.
//!
//! The client never sends the wallet password as a record field. Two opaque
//! blobs travel as request headers on wallet creation and are forwarded
//! verbatim to the key-minting service.

use axum::http::HeaderMap;

use crate::util::non_empty;

pub const ENCRYPTED_PASSWORD_HEADER: &str = "encrypted-password";
pub const ENCRYPTED_CONFIRM_PASSWORD_HEADER: &str = "encrypted-confirm-password";

/// The pair of encrypted password blobs.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedCredentials {
    password: String,
    confirm_password: String,
}

impl std::fmt::Debug for EncryptedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedCredentials")
            .field("password", &"<redacted>")
            .field("confirm_password", &"<redacted>")
            .finish()
    }
}

impl EncryptedCredentials {
    /// Build from two blobs. Returns `None` if either is empty.
    pub fn new(password: impl Into<String>, confirm_password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        let confirm_password = confirm_password.into();
        let password = non_empty(Some(password.as_str()))?.to_string();
        let confirm_password = non_empty(Some(confirm_password.as_str()))?.to_string();
        Some(Self {
            password,
            confirm_password,
        })
    }

    /// Read both blobs from inbound request headers.
    ///
    /// Returns `None` when either header is missing, empty or not valid UTF-8.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let read = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        Self::new(
            read(ENCRYPTED_PASSWORD_HEADER)?,
            read(ENCRYPTED_CONFIRM_PASSWORD_HEADER)?,
        )
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn confirm_password(&self) -> &str {
        &self.confirm_password
    }

    /// Attach both blobs to an outgoing request.
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(ENCRYPTED_PASSWORD_HEADER, &self.password)
            .header(ENCRYPTED_CONFIRM_PASSWORD_HEADER, &self.confirm_password)
    }
}

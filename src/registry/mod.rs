//! Connected wallets: secondary, externally held keys linked to an identity.
//!
//! Linking requires proof-of-possession. The client asks the external wallet
//! to sign the canonical [`ProofPayload`] ([`build_add_request`]); the server
//! verifies that proof before inserting a row ([`ConnectedWalletRegistry::add`]).
//! Removal and listing are scoped to the caller's identity.

mod local;
pub mod proof;

pub use local::LocalWallet;
pub use proof::{verify_ownership_proof, ProofPayload};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, WAuthError};
use crate::store::{ConnectedWallet, NewConnectedWallet, SharedWalletStore};
use crate::util::{non_empty, short_address};

/// A wallet the user controls outside WAuth (browser extension, keyfile…).
///
/// Signing requires the handle to hold a signature permission; a refusal
/// comes back as an error from `sign_message` and is passed through.
#[async_trait]
pub trait ExternalWallet: Send + Sync {
    async fn get_active_address(&self) -> Result<Option<String>>;
    async fn get_active_public_key(&self) -> Result<Option<String>>;
    async fn sign_message(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Body of a connected-wallet add request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddConnectedWalletRequest {
    /// Absent fields decode as empty so [`ConnectedWalletRegistry::add`] reports them.
    #[serde(default)]
    pub address: String,
    #[serde(default, rename = "publicKey")]
    pub public_key: String,
    /// Base64 signature over the canonical payload
    #[serde(default)]
    pub signature: String,
}

/// Collect address and public key from `wallet`, have it sign the canonical
/// payload, and package the result for submission.
pub async fn build_add_request(wallet: &dyn ExternalWallet) -> Result<AddConnectedWalletRequest> {
    let address = wallet.get_active_address().await?;
    let public_key = wallet.get_active_public_key().await?;
    let address = non_empty(address.as_deref())
        .ok_or(WAuthError::MissingAddress)?
        .to_string();
    let public_key = non_empty(public_key.as_deref())
        .ok_or(WAuthError::MissingPublicKey)?
        .to_string();

    let message = ProofPayload::new(&address, &public_key).to_bytes()?;
    let signature = wallet.sign_message(&message).await?;
    debug!(address = %short_address(&address), "Signed connected wallet proof");

    Ok(AddConnectedWalletRequest {
        address,
        public_key,
        signature: proof::encode_signature(&signature),
    })
}

/// Server-side registry of connected wallets.
#[derive(Clone)]
pub struct ConnectedWalletRegistry {
    store: SharedWalletStore,
}

impl ConnectedWalletRegistry {
    pub fn new(store: SharedWalletStore) -> Self {
        Self { store }
    }

    /// Verify the proof and link the wallet to `owner`.
    pub async fn add(
        &self,
        owner: &str,
        request: AddConnectedWalletRequest,
    ) -> Result<ConnectedWallet> {
        let address = non_empty(Some(request.address.as_str()))
            .ok_or(WAuthError::MissingAddress)?
            .to_string();
        let public_key = non_empty(Some(request.public_key.as_str()))
            .ok_or(WAuthError::MissingPublicKey)?
            .to_string();

        if let Err(e) = verify_ownership_proof(&address, &public_key, &request.signature) {
            warn!(owner = %owner, address = %short_address(&address), "Rejected connected wallet proof");
            return Err(e);
        }

        let wallet = self
            .store
            .insert_connected_wallet(NewConnectedWallet {
                owner: owner.to_string(),
                address,
                public_key,
                signature: request.signature,
            })
            .await?;
        info!(
            owner = %owner,
            wallet_id = %wallet.id,
            address = %short_address(&wallet.address),
            "Connected external wallet"
        );
        Ok(wallet)
    }

    /// Unlink a wallet. Missing and foreign rows both yield `NotFound`.
    pub async fn remove(&self, owner: &str, id: &str) -> Result<()> {
        if self.store.delete_connected_wallet(owner, id).await? {
            info!(owner = %owner, wallet_id = %id, "Removed connected wallet");
            Ok(())
        } else {
            Err(WAuthError::NotFound)
        }
    }

    pub async fn list(&self, owner: &str) -> Result<Vec<ConnectedWallet>> {
        Ok(self.store.list_connected_wallets(owner).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryWalletStore;
    use std::sync::Arc;

    /// Handle with configurable answers.
    struct StubWallet {
        address: Option<String>,
        public_key: Option<String>,
        refuse_signing: bool,
    }

    #[async_trait]
    impl ExternalWallet for StubWallet {
        async fn get_active_address(&self) -> Result<Option<String>> {
            Ok(self.address.clone())
        }

        async fn get_active_public_key(&self) -> Result<Option<String>> {
            Ok(self.public_key.clone())
        }

        async fn sign_message(&self, _data: &[u8]) -> Result<Vec<u8>> {
            if self.refuse_signing {
                Err(WAuthError::Signing("SIGNATURE permission not granted".to_string()))
            } else {
                Ok(vec![1, 2, 3])
            }
        }
    }

    fn registry() -> ConnectedWalletRegistry {
        ConnectedWalletRegistry::new(Arc::new(InMemoryWalletStore::new()))
    }

    #[tokio::test]
    async fn test_build_request_requires_address_and_public_key() {
        let no_address = StubWallet {
            address: None,
            public_key: Some("pk".to_string()),
            refuse_signing: false,
        };
        assert!(matches!(
            build_add_request(&no_address).await,
            Err(WAuthError::MissingAddress)
        ));

        let no_key = StubWallet {
            address: Some("addr".to_string()),
            public_key: Some(String::new()),
            refuse_signing: false,
        };
        assert!(matches!(
            build_add_request(&no_key).await,
            Err(WAuthError::MissingPublicKey)
        ));
    }

    #[tokio::test]
    async fn test_signing_refusal_propagates_unchanged() {
        let wallet = StubWallet {
            address: Some("addr".to_string()),
            public_key: Some("pk".to_string()),
            refuse_signing: true,
        };
        match build_add_request(&wallet).await {
            Err(WAuthError::Signing(msg)) => assert!(msg.contains("SIGNATURE")),
            other => panic!("expected signing error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_with_valid_proof_creates_one_row() {
        let registry = registry();
        let wallet = LocalWallet::generate(1024).unwrap();
        let request = build_add_request(&wallet).await.unwrap();
        assert_eq!(request.address, wallet.address());

        let linked = registry.add("user-1", request).await.expect("proof accepted");
        assert_eq!(linked.owner, "user-1");
        assert_eq!(linked.address, wallet.address());
        assert_eq!(linked.public_key, wallet.public_key());
        assert!(!linked.id.is_empty());

        let list = registry.list("user-1").await.unwrap();
        assert_eq!(list, vec![linked]);
    }

    #[tokio::test]
    async fn test_add_with_forged_proof_creates_nothing() {
        let registry = registry();
        let victim = LocalWallet::generate(1024).unwrap();
        let attacker = LocalWallet::generate(1024).unwrap();

        // Attacker claims the victim's address/key but signs with their own key.
        let mut request = build_add_request(&attacker).await.unwrap();
        request.address = victim.address().to_string();
        request.public_key = victim.public_key().to_string();

        let err = registry.add("user-1", request).await.unwrap_err();
        assert!(matches!(err, WAuthError::InvalidProof));
        assert!(registry.list("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_absent_fields_are_reported_by_name() {
        let registry = registry();

        let request: AddConnectedWalletRequest =
            serde_json::from_str(r#"{"publicKey":"pk","signature":"sig"}"#).unwrap();
        assert!(matches!(
            registry.add("user-1", request).await,
            Err(WAuthError::MissingAddress)
        ));

        let request: AddConnectedWalletRequest =
            serde_json::from_str(r#"{"address":"addr"}"#).unwrap();
        assert!(matches!(
            registry.add("user-1", request).await,
            Err(WAuthError::MissingPublicKey)
        ));
        assert!(registry.list("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_relinking_same_address_conflicts() {
        let registry = registry();
        let wallet = LocalWallet::generate(1024).unwrap();
        registry
            .add("user-1", build_add_request(&wallet).await.unwrap())
            .await
            .unwrap();

        let err = registry
            .add("user-1", build_add_request(&wallet).await.unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, WAuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_remove_is_owner_scoped() {
        let registry = registry();
        let wallet = LocalWallet::generate(1024).unwrap();
        let linked = registry
            .add("alice", build_add_request(&wallet).await.unwrap())
            .await
            .unwrap();

        let err = registry.remove("mallory", &linked.id).await.unwrap_err();
        assert!(matches!(err, WAuthError::NotFound));
        assert_eq!(registry.list("alice").await.unwrap().len(), 1);

        registry.remove("alice", &linked.id).await.expect("owner may remove");
        assert!(registry.list("alice").await.unwrap().is_empty());

        let err = registry.remove("alice", &linked.id).await.unwrap_err();
        assert!(matches!(err, WAuthError::NotFound));
    }
}

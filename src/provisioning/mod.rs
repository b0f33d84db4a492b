//! Server-side wallet provisioning.
//!
//! Runs when a client creates its wallet record:
//!
//! 1. The draft record is stamped with the caller's identity as `owner`
//!    (before anything can fail).
//! 2. Both encrypted credential headers must be present.
//! 3. An identity that already owns a wallet gets that wallet back; nothing is minted.
//! 4. The key-minting service exchanges the credentials for an encrypted JWK,
//!    salt, public key and address.
//! 5. The populated record is inserted. The store's one-wallet-per-owner
//!    constraint settles concurrent duplicates.
//!
//! Any failure before step 5 leaves the store untouched.

mod credentials;
mod minter;

pub use credentials::{
    EncryptedCredentials, ENCRYPTED_CONFIRM_PASSWORD_HEADER, ENCRYPTED_PASSWORD_HEADER,
};
pub use minter::{HttpKeyMinter, KeyMinter, MintedKey};

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Result, WAuthError};
use crate::store::{NewWallet, SharedWalletStore, StoreError, WalletRecord};

/// A wallet record under construction.
#[derive(Debug, Default, Clone)]
pub struct WalletDraft {
    pub owner: Option<String>,
    pub minted: Option<MintedKey>,
}

impl WalletDraft {
    fn into_new_wallet(self) -> Option<NewWallet> {
        let owner = self.owner?;
        let minted = self.minted?;
        Some(NewWallet {
            owner,
            encrypted_jwk: minted.encrypted_jwk,
            salt: minted.salt,
            public_key: minted.public_key,
            address: minted.address,
        })
    }
}

/// How a create request was satisfied.
#[derive(Debug, Clone)]
pub enum ProvisionOutcome {
    /// A new wallet was minted and stored.
    Created(WalletRecord),
    /// The identity already had a wallet; it was returned unchanged.
    Existing(WalletRecord),
}

impl ProvisionOutcome {
    pub fn wallet(&self) -> &WalletRecord {
        match self {
            Self::Created(w) | Self::Existing(w) => w,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Mints and stores custodied wallets.
#[derive(Clone)]
pub struct WalletProvisioner {
    minter: Arc<dyn KeyMinter>,
    store: SharedWalletStore,
}

impl WalletProvisioner {
    pub fn new(minter: Arc<dyn KeyMinter>, store: SharedWalletStore) -> Self {
        Self { minter, store }
    }

    /// The pre-persist hook: fills `draft` or fails.
    ///
    /// `draft.owner` is set first and stays set even when this returns an error.
    /// Returns `Some(existing)` when the identity already owns a wallet, in
    /// which case the draft is left without key material.
    pub async fn prepare(
        &self,
        draft: &mut WalletDraft,
        identity: &str,
        credentials: Option<&EncryptedCredentials>,
    ) -> Result<Option<WalletRecord>> {
        draft.owner = Some(identity.to_string());

        let credentials = credentials.ok_or(WAuthError::MissingCredentials)?;

        if let Some(existing) = self.store.find_wallet_by_owner(identity).await? {
            return Ok(Some(existing));
        }

        let minted = self.minter.mint(credentials).await?;
        draft.minted = Some(minted);
        Ok(None)
    }

    /// Create the caller's wallet record.
    pub async fn create_wallet(
        &self,
        identity: &str,
        credentials: Option<&EncryptedCredentials>,
    ) -> Result<ProvisionOutcome> {
        let mut draft = WalletDraft::default();

        let prepared = self.prepare(&mut draft, identity, credentials).await;
        match prepared {
            Ok(Some(existing)) => {
                info!(identity = %identity, wallet_id = %existing.id, "Wallet already exists, skipping mint");
                return Ok(ProvisionOutcome::Existing(existing));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(identity = %identity, error = %e, "Wallet provisioning failed");
                return Err(e);
            }
        }

        let new_wallet = draft
            .into_new_wallet()
            .ok_or_else(|| WAuthError::Storage("Wallet draft incomplete".to_string()))?;

        match self.store.insert_wallet(new_wallet).await {
            Ok(record) => {
                info!(
                    identity = %identity,
                    wallet_id = %record.id,
                    address = %record.address,
                    "Provisioned new wallet"
                );
                Ok(ProvisionOutcome::Created(record))
            }
            Err(StoreError::Conflict(_)) => {
                // Lost a race with a concurrent create for the same identity.
                let existing = self
                    .store
                    .find_wallet_by_owner(identity)
                    .await?
                    .ok_or(WAuthError::NotFound)?;
                info!(identity = %identity, wallet_id = %existing.id, "Concurrent create resolved to existing wallet");
                Ok(ProvisionOutcome::Existing(existing))
            }
            Err(e) => Err(e.into()),
        }
    }
}

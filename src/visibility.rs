//! Outgoing representation of wallet records.
//!
//! Every wallet that leaves the server goes through [`enrich_wallet`], which
//! drops the key material (`encrypted_jwk`, `salt`). [`PublicWallet`] has no
//! field that could carry it.

use serde::{Deserialize, Serialize};

use crate::store::WalletRecord;

/// Field names never present in a client-facing wallet representation.
pub const HIDDEN_WALLET_FIELDS: [&str; 2] = ["encrypted_jwk", "salt"];

/// Wallet record as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicWallet {
    pub id: String,
    pub owner: String,
    pub public_key: String,
    pub address: String,
    pub created: String,
    pub updated: String,
}

/// Redact a stored wallet for the wire.
pub fn enrich_wallet(record: &WalletRecord) -> PublicWallet {
    PublicWallet {
        id: record.id.clone(),
        owner: record.owner.clone(),
        public_key: record.public_key.clone(),
        address: record.address.clone(),
        created: record.created.clone(),
        updated: record.updated.clone(),
    }
}

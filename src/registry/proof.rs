//! Proof-of-possession for linked wallets.
//!
//! The signed message is the UTF-8 JSON of [`ProofPayload`],
//! `{"address":"…","pkey":"…"}`, with exactly that field order and naming.
//! Signer and verifier both build it from this one type.
//!
//! Signatures follow Arweave `signMessage`: RSA-PSS (SHA-256, 32-byte salt)
//! over `SHA-256(message)`. Public keys are the base64url RSA modulus
//! (exponent 65537) and the address is `base64url(SHA-256(modulus))`.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use rsa::{BigUint, Pss, RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Result, WAuthError};

/// Arweave RSA public exponent.
pub const PUBLIC_EXPONENT: u32 = 65537;

/// The canonical signed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProofPayload<'a> {
    pub address: &'a str,
    pub pkey: &'a str,
}

impl<'a> ProofPayload<'a> {
    pub fn new(address: &'a str, pkey: &'a str) -> Self {
        Self { address, pkey }
    }

    /// Exact bytes handed to the signer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| WAuthError::Signing(format!("Failed to serialize proof payload: {}", e)))
    }
}

/// Decode a base64url public key (padding tolerated) to modulus bytes.
pub fn decode_public_key(public_key: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(public_key.trim().trim_end_matches('='))
        .ok()
        .filter(|n| !n.is_empty())
}

/// Arweave address of a modulus.
pub fn address_from_modulus(modulus: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(modulus))
}

/// Arweave address of a base64url public key.
pub fn address_from_public_key(public_key: &str) -> Option<String> {
    decode_public_key(public_key).map(|n| address_from_modulus(&n))
}

/// The digest RSA-PSS actually signs for a given message.
fn message_digest(message: &[u8]) -> Vec<u8> {
    Sha256::digest(Sha256::digest(message)).to_vec()
}

/// Sign `message` the way Arweave wallets do for `signMessage`.
pub fn sign_message(key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>> {
    let mut rng = rand::thread_rng();
    key.sign_with_rng(&mut rng, Pss::new::<Sha256>(), &message_digest(message))
        .map_err(|e| WAuthError::Signing(e.to_string()))
}

/// Check that `signature` proves control of `public_key` and that `address`
/// belongs to it.
///
/// Every failure mode collapses to [`WAuthError::InvalidProof`].
pub fn verify_ownership_proof(address: &str, public_key: &str, signature: &str) -> Result<()> {
    let modulus = decode_public_key(public_key).ok_or(WAuthError::InvalidProof)?;
    if address_from_modulus(&modulus) != address {
        return Err(WAuthError::InvalidProof);
    }

    let key = RsaPublicKey::new(
        BigUint::from_bytes_be(&modulus),
        BigUint::from(PUBLIC_EXPONENT),
    )
    .map_err(|_| WAuthError::InvalidProof)?;

    let signature = STANDARD
        .decode(signature.trim())
        .map_err(|_| WAuthError::InvalidProof)?;

    let message = ProofPayload::new(address, public_key).to_bytes()?;
    key.verify(Pss::new::<Sha256>(), &message_digest(&message), &signature)
        .map_err(|_| WAuthError::InvalidProof)
}

/// Base64 encoding used on the wire for signatures.
pub fn encode_signature(signature: &[u8]) -> String {
    STANDARD.encode(signature)
}

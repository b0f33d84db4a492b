//! An external wallet backed by an in-process RSA key (e.g. an Arweave keyfile).

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey};
use serde::Deserialize;

use super::proof::{address_from_modulus, sign_message};
use super::ExternalWallet;
use crate::error::{Result, WAuthError};

/// Arweave keyfile (RSA JWK) fields needed to rebuild the private key.
#[derive(Deserialize)]
struct ArweaveJwk {
    kty: String,
    n: String,
    e: String,
    d: String,
    p: String,
    q: String,
}

fn decode_component(name: &str, value: &str) -> Result<BigUint> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map(|bytes| BigUint::from_bytes_be(&bytes))
        .map_err(|e| WAuthError::Signing(format!("Invalid JWK component {}: {}", name, e)))
}

/// Wallet holding its own private key.
pub struct LocalWallet {
    key: RsaPrivateKey,
    public_key: String,
    address: String,
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalWallet {
    pub fn from_private_key(key: RsaPrivateKey) -> Self {
        let modulus = key.n().to_bytes_be();
        Self {
            public_key: URL_SAFE_NO_PAD.encode(&modulus),
            address: address_from_modulus(&modulus),
            key,
        }
    }

    /// Generate a fresh key of `bits` size. Arweave uses 4096.
    pub fn generate(bits: usize) -> Result<Self> {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| WAuthError::Signing(format!("Failed to generate key: {}", e)))?;
        Ok(Self::from_private_key(key))
    }

    /// Load an Arweave keyfile (JWK JSON).
    pub fn from_jwk(json: &str) -> Result<Self> {
        let jwk: ArweaveJwk = serde_json::from_str(json)
            .map_err(|e| WAuthError::Signing(format!("Invalid JWK: {}", e)))?;
        if jwk.kty != "RSA" {
            return Err(WAuthError::Signing(format!(
                "Unsupported key type {}",
                jwk.kty
            )));
        }
        let key = RsaPrivateKey::from_components(
            decode_component("n", &jwk.n)?,
            decode_component("e", &jwk.e)?,
            decode_component("d", &jwk.d)?,
            vec![decode_component("p", &jwk.p)?, decode_component("q", &jwk.q)?],
        )
        .map_err(|e| WAuthError::Signing(format!("Invalid RSA key: {}", e)))?;
        Ok(Self::from_private_key(key))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }
}

#[async_trait]
impl ExternalWallet for LocalWallet {
    async fn get_active_address(&self) -> Result<Option<String>> {
        Ok(Some(self.address.clone()))
    }

    async fn get_active_public_key(&self) -> Result<Option<String>> {
        Ok(Some(self.public_key.clone()))
    }

    async fn sign_message(&self, data: &[u8]) -> Result<Vec<u8>> {
        sign_message(&self.key, data)
    }
}

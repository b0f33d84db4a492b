//! Configuration management for the WAuth server.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8090`.
//! - `KEY_SERVICE_URL` - Optional. Key-minting endpoint. Defaults to `http://localhost:8091/jwk`.
//! - `KEY_SERVICE_TIMEOUT_SECS` - Optional. Request timeout for the key service. Defaults to `30`.
//! - `JWT_SECRET` - Required unless `DEV_MODE` is enabled. Shared with the OAuth front.
//! - `JWT_TTL_DAYS` - Optional. Lifetime of tokens from `api::issue_token`, 1 to 3650. Defaults to `30`.
//! - `DEV_MODE` - Optional. Uses a fixed development secret when `JWT_SECRET` is unset.
//! - `STORE` - Optional. `memory` or `sqlite`. Defaults to `sqlite`.
//! - `DATA_DIR` - Optional. Directory for the SQLite database. Defaults to `./data`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::store::StoreType;
use crate::util::env_var_bool;

/// Default key-minting endpoint.
pub const DEFAULT_KEY_SERVICE_URL: &str = "http://localhost:8091/jwk";

const DEV_JWT_SECRET: &str = "wauth-dev-secret-do-not-use-in-production";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Key-minting service settings.
#[derive(Debug, Clone)]
pub struct KeyServiceConfig {
    /// Endpoint that exchanges encrypted credentials for a fresh JWK
    pub url: url::Url,

    /// Request timeout
    pub timeout: Duration,
}

const MAX_JWT_TTL_DAYS: i64 = 3650;

fn parse_ttl_days(value: &str) -> Result<i64, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidValue("JWT_TTL_DAYS".to_string(), msg);
    let days: i64 = value.trim().parse().map_err(|e| invalid(format!("{}", e)))?;
    if !(1..=MAX_JWT_TTL_DAYS).contains(&days) {
        return Err(invalid(format!("must be between 1 and {}", MAX_JWT_TTL_DAYS)));
    }
    Ok(days)
}

/// Bearer-token verification settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with whoever issues identity tokens
    pub jwt_secret: String,

    /// Lifetime of tokens minted by [`crate::api::issue_token`]
    pub jwt_ttl_days: i64,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Development mode
    pub dev_mode: bool,

    pub key_service: KeyServiceConfig,

    pub auth: AuthConfig,

    /// Record store backend
    pub store: StoreType,

    /// Directory holding persistent store files
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `JWT_SECRET` is not set outside dev mode,
    /// and `ConfigError::InvalidValue` for unparseable numbers or URLs.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8090".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let dev_mode = env_var_bool("DEV_MODE", false);

        let key_service_url = std::env::var("KEY_SERVICE_URL")
            .unwrap_or_else(|_| DEFAULT_KEY_SERVICE_URL.to_string());
        let url = url::Url::parse(&key_service_url).map_err(|e| {
            ConfigError::InvalidValue("KEY_SERVICE_URL".to_string(), format!("{}", e))
        })?;

        let timeout_secs: u64 = std::env::var("KEY_SERVICE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("KEY_SERVICE_TIMEOUT_SECS".to_string(), format!("{}", e))
            })?;

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if dev_mode => {
                tracing::warn!("JWT_SECRET not set, using the development secret (DEV_MODE=true)");
                DEV_JWT_SECRET.to_string()
            }
            _ => return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string())),
        };

        let jwt_ttl_days =
            parse_ttl_days(&std::env::var("JWT_TTL_DAYS").unwrap_or_else(|_| "30".to_string()))?;

        let store = std::env::var("STORE")
            .map(|s| StoreType::from_str(&s))
            .unwrap_or_default();

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        Ok(Self {
            host,
            port,
            dev_mode,
            key_service: KeyServiceConfig {
                url,
                timeout: Duration::from_secs(timeout_secs),
            },
            auth: AuthConfig {
                jwt_secret,
                jwt_ttl_days,
            },
            store,
            data_dir,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(jwt_secret: impl Into<String>, key_service_url: url::Url) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
            dev_mode: false,
            key_service: KeyServiceConfig {
                url: key_service_url,
                timeout: Duration::from_secs(30),
            },
            auth: AuthConfig {
                jwt_secret: jwt_secret.into(),
                jwt_ttl_days: 30,
            },
            store: StoreType::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

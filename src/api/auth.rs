//! Bearer-token identity for the API.
//!
//! - The OAuth front authenticates the user and issues an HS256 JWT whose
//!   `sub` is the identity id, signed with the shared `JWT_SECRET`
//! - Every protected endpoint requires `Authorization: Bearer <jwt>`
//! - The verified identity is attached to the request as [`AuthUser`]

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use super::routes::AppState;
use super::types::ErrorResponse;
use crate::config::AuthConfig;
use crate::error::WAuthError;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    /// Identity id
    sub: String,
    /// Issued-at unix seconds
    iat: i64,
    /// Expiration unix seconds
    exp: i64,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
}

/// Issue a token for `identity`, valid for `auth.jwt_ttl_days` (at least one day).
/// Returns the token and its expiry (unix seconds).
pub fn issue_token(auth: &AuthConfig, identity: &str) -> anyhow::Result<(String, i64)> {
    let now = Utc::now();
    let ttl = Duration::try_days(auth.jwt_ttl_days.max(1))
        .ok_or_else(|| anyhow::anyhow!("Token lifetime out of range: {} days", auth.jwt_ttl_days))?;
    let exp = now
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow::anyhow!("Token expiry out of range"))?;
    let claims = Claims {
        sub: identity.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )?;
    Ok((token, claims.exp))
}

fn verify_jwt(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let validation = Validation::default();
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

fn unauthorized(message: &str) -> Response {
    let err = WAuthError::Unauthorized(message.to_string());
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse::from(&err))).into_response()
}

pub async fn require_auth(
    State(state): State<std::sync::Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("");

    if token.is_empty() {
        return unauthorized("Missing Authorization header");
    }

    match verify_jwt(token, &state.config.auth.jwt_secret) {
        Ok(claims) if !claims.sub.trim().is_empty() => {
            req.extensions_mut().insert(AuthUser { id: claims.sub });
            next.run(req).await
        }
        Ok(_) => unauthorized("Token has no subject"),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            unauthorized("Invalid or expired token")
        }
    }
}

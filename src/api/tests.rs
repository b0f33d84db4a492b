//! End-to-end tests: the real router on a loopback port, a fake key service,
//! and the HTTP client session driving it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use serde_json::Value;

use super::{issue_token, router, AppState};
use crate::client::storage::PERSISTED_SESSION_KEY;
use crate::client::{
    AuthData, Authenticator, ClientStorage, ConnectionReconciler, HttpWalletSession,
    MemoryStorage, OAuthGrant, Provider, StrategySet, WAuthStrategy,
};
use crate::config::{AuthConfig, Config};
use crate::error::{Result, WAuthError};
use crate::provisioning::{
    EncryptedCredentials, HttpKeyMinter, ENCRYPTED_CONFIRM_PASSWORD_HEADER,
    ENCRYPTED_PASSWORD_HEADER,
};
use crate::registry::{build_add_request, LocalWallet};
use crate::store::{create_wallet_store, StoreType};

const SECRET: &str = "test-secret";

fn auth_config(secret: &str) -> AuthConfig {
    AuthConfig {
        jwt_secret: secret.to_string(),
        jwt_ttl_days: 1,
    }
}

struct TestServer {
    base: String,
    state: Arc<AppState>,
    mints: Arc<AtomicUsize>,
    http: reqwest::Client,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

fn token(identity: &str) -> String {
    issue_token(&auth_config(SECRET), identity).unwrap().0
}

/// Key service that answers `key_status`; 200 mints `addr-<n>`.
async fn spawn_key_service(key_status: StatusCode) -> (url::Url, Arc<AtomicUsize>) {
    let mints = Arc::new(AtomicUsize::new(0));
    let counter = mints.clone();
    let app = Router::new().route(
        "/jwk",
        get(move || {
            let counter = counter.clone();
            async move {
                if key_status != StatusCode::OK {
                    return (key_status, "upstream exploded").into_response();
                }
                let n = counter.fetch_add(1, Ordering::SeqCst);
                axum::Json(serde_json::json!({
                    "encryptedJWK": format!("jwk-{n}"),
                    "salt": format!("salt-{n}"),
                    "publicKey": format!("pk-{n}"),
                    "address": format!("addr-{n}"),
                }))
                .into_response()
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (url::Url::parse(&format!("http://{addr}/jwk")).unwrap(), mints)
}

async fn spawn_server(key_status: StatusCode) -> TestServer {
    let (key_url, mints) = spawn_key_service(key_status).await;
    let config = Config::new(SECRET, key_url);
    let store = create_wallet_store(StoreType::Memory, PathBuf::new())
        .await
        .unwrap();
    let minter = Arc::new(HttpKeyMinter::new(&config.key_service).unwrap());
    let state = Arc::new(AppState::new(config, store, minter));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{addr}"),
        state,
        mints,
        http: reqwest::Client::new(),
    }
}

async fn create_wallet(server: &TestServer, identity: &str) -> reqwest::Response {
    server
        .http
        .post(server.url("/api/wallets"))
        .bearer_auth(token(identity))
        .header(ENCRYPTED_PASSWORD_HEADER, "enc-pw")
        .header(ENCRYPTED_CONFIRM_PASSWORD_HEADER, "enc-pw")
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_public_and_wallets_are_not() {
    let server = spawn_server(StatusCode::OK).await;

    let health = server.http.get(server.url("/api/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    let body: Value = health.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["persistent_store"], false);

    let anon = server.http.get(server.url("/api/wallets")).send().await.unwrap();
    assert_eq!(anon.status(), 401);
    let body: Value = anon.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let forged = server
        .http
        .get(server.url("/api/wallets"))
        .bearer_auth(issue_token(&auth_config("other-secret"), "mallory").unwrap().0)
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status(), 401);
}

#[tokio::test]
async fn wallet_round_trip_never_exposes_key_material() {
    let server = spawn_server(StatusCode::OK).await;

    let created = create_wallet(&server, "alice").await;
    assert_eq!(created.status(), 200);
    let created: Value = created.json().await.unwrap();
    assert_eq!(created["owner"], "alice");
    assert_eq!(created["address"], "addr-0");
    assert_eq!(created["public_key"], "pk-0");
    for hidden in crate::visibility::HIDDEN_WALLET_FIELDS {
        assert!(created.get(hidden).is_none(), "{hidden} leaked on create");
    }

    let id = created["id"].as_str().unwrap().to_string();
    let listed: Value = server
        .http
        .get(server.url("/api/wallets"))
        .bearer_auth(token("alice"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());
    assert!(listed[0].get("encrypted_jwk").is_none());

    let fetched = server
        .http
        .get(server.url(&format!("/api/wallets/{id}")))
        .bearer_auth(token("alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status(), 200);
    let fetched: Value = fetched.json().await.unwrap();
    assert!(fetched.get("salt").is_none());

    // Key material is still stored.
    let record = server
        .state
        .store
        .find_wallet_by_owner("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.encrypted_jwk, "jwk-0");
    assert_eq!(record.salt, "salt-0");

    let foreign = server
        .http
        .get(server.url(&format!("/api/wallets/{id}")))
        .bearer_auth(token("bob"))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status(), 404);
}

#[tokio::test]
async fn repeated_create_returns_existing_wallet_without_minting() {
    let server = spawn_server(StatusCode::OK).await;

    let first: Value = create_wallet(&server, "alice").await.json().await.unwrap();
    let second = create_wallet(&server, "alice").await;
    assert_eq!(second.status(), 200);
    let second: Value = second.json().await.unwrap();

    assert_eq!(first["id"], second["id"]);
    assert_eq!(server.mints.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_credential_headers_are_rejected_before_minting() {
    let server = spawn_server(StatusCode::OK).await;

    let resp = server
        .http
        .post(server.url("/api/wallets"))
        .bearer_auth(token("alice"))
        .header(ENCRYPTED_PASSWORD_HEADER, "enc-pw")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "missing_credentials");

    assert_eq!(server.mints.load(Ordering::SeqCst), 0);
    assert!(server
        .state
        .store
        .find_wallet_by_owner("alice")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn upstream_failure_persists_nothing() {
    let server = spawn_server(StatusCode::INTERNAL_SERVER_ERROR).await;

    let resp = create_wallet(&server, "alice").await;
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "provisioning_upstream");
    assert_eq!(body["upstream_status"], 500);
    assert_eq!(body["upstream_body"], "upstream exploded");

    assert!(server
        .state
        .store
        .find_wallet_by_owner("alice")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn connected_wallets_require_a_valid_proof_and_stay_owner_scoped() {
    let server = spawn_server(StatusCode::OK).await;
    let external = LocalWallet::generate(1024).unwrap();
    let impostor = LocalWallet::generate(1024).unwrap();

    let request = build_add_request(&external).await.unwrap();
    let added = server
        .http
        .post(server.url("/api/connected-wallets"))
        .bearer_auth(token("alice"))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(added.status(), 200);
    let added: Value = added.json().await.unwrap();
    assert_eq!(added["owner"], "alice");
    assert_eq!(added["address"], external.address());
    let id = added["id"].as_str().unwrap().to_string();

    // Signature from one key presented for another.
    let mut forged = build_add_request(&impostor).await.unwrap();
    forged.address = external.address().to_string();
    forged.public_key = external.public_key().to_string();
    let rejected = server
        .http
        .post(server.url("/api/connected-wallets"))
        .bearer_auth(token("bob"))
        .json(&forged)
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), 400);
    let body: Value = rejected.json().await.unwrap();
    assert_eq!(body["error"], "invalid_proof");

    let bob_list: Value = server
        .http
        .get(server.url("/api/connected-wallets"))
        .bearer_auth(token("bob"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bob_list, serde_json::json!([]));

    let stolen = server
        .http
        .delete(server.url(&format!("/api/connected-wallets/{id}")))
        .bearer_auth(token("bob"))
        .send()
        .await
        .unwrap();
    assert_eq!(stolen.status(), 404);

    let removed = server
        .http
        .delete(server.url(&format!("/api/connected-wallets/{id}")))
        .bearer_auth(token("alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(removed.status(), 204);

    let alice_list = tokio_test::assert_ok!(server.state.registry.list("alice").await);
    assert!(alice_list.is_empty());
}

#[tokio::test]
async fn connected_wallet_without_address_is_a_json_400() {
    let server = spawn_server(StatusCode::OK).await;

    let response = server
        .http
        .post(server.url("/api/connected-wallets"))
        .bearer_auth(token("alice"))
        .json(&serde_json::json!({ "publicKey": "pk", "signature": "sig" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "missing_address");

    let response = server
        .http
        .post(server.url("/api/connected-wallets"))
        .bearer_auth(token("alice"))
        .json(&serde_json::json!({ "address": "addr", "signature": "sig" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "missing_public_key");
}

struct TokenAuthenticator {
    identity: String,
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, _provider: Provider) -> Result<OAuthGrant> {
        Ok(OAuthGrant {
            token: token(&self.identity),
            meta: AuthData {
                email: Some(format!("{}@example.com", self.identity)),
                ..Default::default()
            },
        })
    }
}

struct RefusingAuthenticator;

#[async_trait]
impl Authenticator for RefusingAuthenticator {
    async fn authenticate(&self, _provider: Provider) -> Result<OAuthGrant> {
        Err(WAuthError::Unauthorized("popup closed".to_string()))
    }
}

fn session(
    server: &TestServer,
    authenticator: Arc<dyn Authenticator>,
    storage: Arc<MemoryStorage>,
) -> HttpWalletSession {
    HttpWalletSession::new(
        &server.base,
        authenticator,
        Arc::new(EncryptedCredentials::new("enc-pw", "enc-pw").unwrap()),
        storage,
    )
    .unwrap()
}

#[tokio::test]
async fn strategy_drives_the_api_end_to_end() {
    let server = spawn_server(StatusCode::OK).await;
    let storage = Arc::new(MemoryStorage::new());
    let auth = Arc::new(TokenAuthenticator {
        identity: "carol".to_string(),
    });
    let set = StrategySet::new(
        Arc::new(session(&server, auth, storage.clone())),
        storage.clone(),
    );

    let github = set.get(Provider::Github);
    tokio_test::assert_ok!(github.connect(&[]).await);
    assert_eq!(github.get_active_address().await.unwrap(), "addr-0");
    assert_eq!(github.get_active_public_key().await.unwrap(), "pk-0");
    assert_eq!(
        github.get_auth_data().await.and_then(|d| d.email).as_deref(),
        Some("carol@example.com")
    );
    assert_eq!(set.active().map(|s| s.provider()), Some(Provider::Github));
    assert!(storage.get(PERSISTED_SESSION_KEY).is_some());

    let external = LocalWallet::generate(1024).unwrap();
    let linked = github.add_connected_wallet(&external).await.unwrap();
    assert_eq!(linked.owner, "carol");
    assert_eq!(github.get_connected_wallets().await.unwrap().len(), 1);
    github.remove_connected_wallet(&linked.id).await.unwrap();
    assert!(github.get_connected_wallets().await.unwrap().is_empty());
    assert!(matches!(
        github.remove_connected_wallet(&linked.id).await,
        Err(WAuthError::NotFound)
    ));

    // A fresh client resumes from storage without another OAuth flow.
    let resumed = WAuthStrategy::new(
        Provider::Github,
        Arc::new(session(&server, Arc::new(RefusingAuthenticator), storage.clone())),
        storage.clone(),
    );
    resumed.reconnect().await.unwrap();
    assert_eq!(resumed.get_active_address().await.unwrap(), "addr-0");
    assert_eq!(server.mints.load(Ordering::SeqCst), 1);

    // Logging out elsewhere leaves `resumed` connected with no session behind it.
    github.disconnect().await;
    assert!(storage.get(PERSISTED_SESSION_KEY).is_none());
    assert!(set.active().is_none());

    let mut reconciler = ConnectionReconciler::new();
    assert!(reconciler.reconcile(&resumed, None, true).await);
    assert!(!resumed.is_connected().await);
    assert!(!reconciler.reconcile(&resumed, None, true).await);
}

#[tokio::test]
async fn failed_oauth_leaves_strategy_disconnected() {
    let server = spawn_server(StatusCode::OK).await;
    let storage = Arc::new(MemoryStorage::new());
    let strategy = WAuthStrategy::new(
        Provider::Discord,
        Arc::new(session(&server, Arc::new(RefusingAuthenticator), storage.clone())),
        storage.clone(),
    );

    let err = strategy.connect(&[]).await.unwrap_err();
    assert!(matches!(err, WAuthError::Unauthorized(_)));
    assert!(!strategy.is_connected().await);
    assert!(matches!(
        strategy.get_active_address().await,
        Err(WAuthError::NotConnected)
    ));
    assert_eq!(server.mints.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upstream_failure_reaches_the_client_intact() {
    let server = spawn_server(StatusCode::INTERNAL_SERVER_ERROR).await;
    let storage = Arc::new(MemoryStorage::new());
    let strategy = WAuthStrategy::new(
        Provider::Google,
        Arc::new(session(
            &server,
            Arc::new(TokenAuthenticator {
                identity: "dave".to_string(),
            }),
            storage.clone(),
        )),
        storage.clone(),
    );

    match strategy.connect(&[]).await {
        Err(WAuthError::ProvisioningUpstream { status, body }) => {
            assert_eq!(status, Some(500));
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
    assert!(storage.get(PERSISTED_SESSION_KEY).is_none());
}

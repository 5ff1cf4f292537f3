mod common;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::ETAG},
    response::{IntoResponse, Response},
    routing::get,
};
use common::{PROJECT, id_token, provider_keys};
use sitegate::{
    session::{AuthError, JwksIdentityVerifier, KeysetStatus, now_unix_seconds},
    token::{self, Jwks, SessionKeys},
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tokio::net::TcpListener;

#[derive(Default)]
struct JwksEndpoint {
    keys: Mutex<Option<Jwks>>,
    hits: AtomicUsize,
}

impl JwksEndpoint {
    fn serve(&self, jwks: Option<Jwks>) {
        if let Ok(mut keys) = self.keys.lock() {
            *keys = jwks;
        }
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn jwks(State(endpoint): State<Arc<JwksEndpoint>>) -> Response {
    endpoint.hits.fetch_add(1, Ordering::SeqCst);
    let keys = endpoint.keys.lock().ok().and_then(|keys| keys.clone());
    match keys {
        Some(keys) => ([(ETAG, "\"v1\"")], Json(keys)).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn start(endpoint: Arc<JwksEndpoint>) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route("/jwks", get(jwks)).with_state(endpoint);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/jwks"))
}

#[tokio::test]
async fn fetches_keys_at_startup() -> Result<()> {
    let provider = provider_keys()?;
    let endpoint = Arc::new(JwksEndpoint::default());
    endpoint.serve(Some(provider.jwks().clone()));
    let url = start(endpoint.clone()).await?;

    let verifier = JwksIdentityVerifier::new_remote(url, PROJECT).await?;
    assert_eq!(verifier.keyset_status().await, KeysetStatus::Ok);
    assert_eq!(endpoint.hits(), 1);

    let identity = verifier
        .verify_token(&id_token(&provider, "alice")?, now_unix_seconds())
        .await?;
    assert_eq!(identity.uid, "alice");
    // Cached keys are fresh, no second fetch.
    assert_eq!(endpoint.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn recovers_after_failed_startup_fetch() -> Result<()> {
    let provider = provider_keys()?;
    let endpoint = Arc::new(JwksEndpoint::default());
    let url = start(endpoint.clone()).await?;

    let verifier = JwksIdentityVerifier::new_remote(url, PROJECT).await?;
    assert_eq!(verifier.keyset_status().await, KeysetStatus::Error);

    endpoint.serve(Some(provider.jwks().clone()));
    let identity = verifier
        .verify_token(&id_token(&provider, "alice")?, now_unix_seconds())
        .await?;
    assert_eq!(identity.uid, "alice");
    assert_eq!(verifier.keyset_status().await, KeysetStatus::Ok);
    assert_eq!(endpoint.hits(), 2);
    Ok(())
}

#[tokio::test]
async fn provider_down_fails_closed() -> Result<()> {
    let provider = provider_keys()?;
    let endpoint = Arc::new(JwksEndpoint::default());
    let url = start(endpoint.clone()).await?;

    let verifier = JwksIdentityVerifier::new_remote(url, PROJECT).await?;
    let result = verifier
        .verify_token(&id_token(&provider, "alice")?, now_unix_seconds())
        .await;
    assert!(matches!(result, Err(AuthError::KeysUnavailable)));
    Ok(())
}

#[tokio::test]
async fn unknown_kid_refresh_is_throttled() -> Result<()> {
    let provider = provider_keys()?;
    let endpoint = Arc::new(JwksEndpoint::default());
    endpoint.serve(Some(provider.jwks().clone()));
    let url = start(endpoint.clone()).await?;

    let verifier = JwksIdentityVerifier::new_remote(url, PROJECT).await?;
    let rotated = SessionKeys::from_pem_or_der(common::PROVIDER_KEY_PEM, "provider-2")?;

    for _ in 0..3 {
        let result = verifier
            .verify_token(&id_token(&rotated, "alice")?, now_unix_seconds())
            .await;
        assert!(matches!(
            result,
            Err(AuthError::Token(token::Error::UnknownKid(_)))
        ));
    }
    // Startup fetch only; refreshes inside the cooldown are skipped.
    assert_eq!(endpoint.hits(), 1);
    Ok(())
}

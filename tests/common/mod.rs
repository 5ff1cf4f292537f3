#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header::SET_COOKIE},
};
use serde_json::json;
use sitegate::{
    api,
    events::{AccessDenied, Observers},
    guard::{RouteGuard, RouteMatcher, RuntimeMode},
    session::{
        JwksIdentityVerifier, Session, SessionConfig, SessionReadError, SessionStore,
        SessionValidator, SignedSessions, now_unix_seconds,
    },
    token::SessionKeys,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

pub const PROJECT: &str = "acme-site";
pub const PROVIDER_KEY_PEM: &[u8] = include_bytes!("../fixtures/identity_provider_key.pem");
pub const SESSION_KEY_PEM: &[u8] = include_bytes!("../fixtures/session_key.pem");

pub fn provider_keys() -> Result<SessionKeys> {
    Ok(SessionKeys::from_pem_or_der(PROVIDER_KEY_PEM, "provider-1")?)
}

pub fn session_keys() -> Result<SessionKeys> {
    Ok(SessionKeys::from_pem_or_der(SESSION_KEY_PEM, "session-1")?)
}

/// ID token as the identity provider would mint it for `uid`.
pub fn id_token(provider: &SessionKeys, uid: &str) -> Result<String> {
    let now = now_unix_seconds();
    Ok(provider.sign(&json!({
        "iss": format!("https://securetoken.google.com/{PROJECT}"),
        "aud": PROJECT,
        "sub": uid,
        "email": format!("{uid}@example.com"),
        "iat": now - 5,
        "exp": now + 3600,
        "auth_time": now - 5,
    }))?)
}

/// Counts session reads so tests can prove the guard skipped a path.
pub struct CountingValidator {
    inner: Arc<SignedSessions>,
    reads: AtomicUsize,
}

impl CountingValidator {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SessionValidator for CountingValidator {
    fn verify(&self, token: &str, now: i64) -> Result<Session, SessionReadError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(token, now)
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: SessionStore,
    pub provider: SessionKeys,
    pub validator: Arc<CountingValidator>,
    pub denials: Arc<Observers<AccessDenied>>,
}

impl TestApp {
    pub fn new(mode: RuntimeMode) -> Result<Self> {
        let provider = provider_keys()?;
        let verifier = JwksIdentityVerifier::new(provider.jwks().clone(), PROJECT);
        let sessions = Arc::new(SignedSessions::new(session_keys()?));
        let validator = Arc::new(CountingValidator {
            inner: sessions.clone(),
            reads: AtomicUsize::new(0),
        });
        let store = SessionStore::from_parts(
            Arc::new(verifier),
            sessions,
            validator.clone(),
            SessionConfig::new("http://localhost:8080".to_string()),
        );
        let denials = Arc::new(Observers::new());
        let guard = RouteGuard::new(
            store.clone(),
            RouteMatcher::site_defaults()?,
            mode,
            denials.clone(),
        );

        Ok(Self {
            router: api::app(store.clone(), Arc::new(guard)),
            store,
            provider,
            validator,
            denials,
        })
    }

    /// `__session=<token>` for a freshly created session.
    pub async fn session_cookie(&self, uid: &str) -> Result<String> {
        let created = self
            .store
            .create_session(&id_token(&self.provider, uid)?)
            .await?;
        cookie_pair(created.cookie.to_str()?)
    }
}

/// `name=value` part of a `Set-Cookie` header.
pub fn cookie_pair(set_cookie: &str) -> Result<String> {
    set_cookie
        .split(';')
        .next()
        .map(str::to_string)
        .context("empty Set-Cookie header")
}

pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub fn get(uri: &str, cookie: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    Ok(builder.body(Body::empty())?)
}

pub async fn body_string(response: Response<Body>) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

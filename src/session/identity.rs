//! Identity token verification against the provider's published signing keys.
//!
//! Flow Overview: peek the token header for `kid`, make sure a matching key is
//! cached (refreshing the JWKS when stale or when the `kid` is unknown), verify
//! the RS256 signature, then validate the provider claims. Any failure fails
//! closed with an `AuthError`.

use anyhow::{Context, Result, anyhow};
use reqwest::{
    Client, StatusCode,
    header::{ETAG, IF_NONE_MATCH},
};
use serde::Deserialize;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use url::{Host, Url};

use super::{BoxFuture, Identity, IdentityVerifier, error::AuthError, now_unix_seconds};
use crate::token::{self, Jwks, JwtHeader};

/// Public signing keys for the provider's ID tokens.
pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

// Keys rotate a few times a day; refresh on stale cache or unknown kid.
// If refresh fails, keep the last known keyset so verification keeps working.
const KEYSET_CACHE_TTL_SECONDS: u64 = 3600;
const KEYSET_REFRESH_COOLDOWN_SECONDS: u64 = 30;
const KEYSET_FETCH_TIMEOUT_SECONDS: u64 = 5;
const MAX_UID_LEN: usize = 128;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn contains(&self, expected: &str) -> bool {
        match self {
            Self::One(aud) => aud == expected,
            Self::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    iss: String,
    aud: Audience,
    sub: String,
    iat: i64,
    exp: i64,
    auth_time: Option<i64>,
    email: Option<String>,
}

#[derive(Debug)]
enum KeysetSource {
    /// Keyset loaded from a local file and never refreshed.
    Static,
    /// Keyset fetched from the provider and refreshed as needed.
    Remote { url: String, client: Client },
}

#[derive(Debug, Clone)]
struct KeysetCache {
    jwks: Jwks,
    fetched_at: Instant,
    etag: Option<String>,
}

impl KeysetCache {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < Duration::from_secs(KEYSET_CACHE_TTL_SECONDS)
    }
}

enum FetchOutcome {
    Updated { jwks: Jwks, etag: Option<String> },
    NotModified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeysetStatus {
    /// Remote keyset is loaded.
    Ok,
    /// Remote keyset could not be fetched; verification fails closed.
    Error,
    /// Static keyset means no external dependency.
    Static,
}

impl KeysetStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Static => "static",
        }
    }

    #[must_use]
    pub const fn is_healthy(self) -> bool {
        !matches!(self, Self::Error)
    }
}

/// Verifies provider ID tokens (RS256 JWTs) for one project.
#[derive(Debug)]
pub struct JwksIdentityVerifier {
    keyset_source: KeysetSource,
    keyset_cache: RwLock<KeysetCache>,
    /// Expected `iss`, `https://securetoken.google.com/<project>` unless overridden.
    issuer: String,
    /// Expected `aud`, the project id.
    audience: String,
    /// Timestamp to throttle refresh attempts on unknown kid.
    last_refresh_unix: AtomicU64,
}

impl JwksIdentityVerifier {
    /// Build from a static keyset, no remote refresh.
    #[must_use]
    pub fn new(jwks: Jwks, project_id: &str) -> Self {
        Self {
            keyset_source: KeysetSource::Static,
            keyset_cache: RwLock::new(KeysetCache {
                jwks,
                fetched_at: Instant::now(),
                etag: None,
            }),
            issuer: format!("{ISSUER_PREFIX}{project_id}"),
            audience: project_id.to_string(),
            last_refresh_unix: AtomicU64::new(0),
        }
    }

    /// Build a verifier that fetches the keyset from a remote URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub async fn new_remote(url: String, project_id: &str) -> Result<Self> {
        let parsed = Url::parse(&url).context("Invalid identity JWKS URL")?;
        if !is_trusted_scheme(&parsed) {
            return Err(anyhow!("Identity JWKS URL must use https: {url}"));
        }

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(KEYSET_FETCH_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build JWKS HTTP client")?;

        // Startup fetch is best-effort: if the provider is unreachable, start with an empty,
        // stale cache so /health stays red and verification fails closed until refresh succeeds.
        let (jwks, fetched_at, last_refresh_unix, etag) =
            match fetch_keyset(&client, &url, None).await {
                Ok(FetchOutcome::Updated { jwks, etag }) => {
                    (jwks, Instant::now(), now_unix_seconds_u64(), etag)
                }
                Ok(FetchOutcome::NotModified) => {
                    warn!("identity JWKS fetch returned not-modified during startup");
                    (Jwks::default(), stale_instant(), 0, None)
                }
                Err(err) => {
                    warn!(
                        url = %url,
                        error = %err,
                        "identity JWKS fetch failed during startup; continuing with empty keyset"
                    );
                    (Jwks::default(), stale_instant(), 0, None)
                }
            };

        Ok(Self {
            keyset_source: KeysetSource::Remote { url, client },
            keyset_cache: RwLock::new(KeysetCache {
                jwks,
                fetched_at,
                etag,
            }),
            issuer: format!("{ISSUER_PREFIX}{project_id}"),
            audience: project_id.to_string(),
            last_refresh_unix: AtomicU64::new(last_refresh_unix),
        })
    }

    /// Override the expected issuer (e.g. when tokens come from an emulator or a proxy).
    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Report keyset status for `/health`.
    pub async fn keyset_status(&self) -> KeysetStatus {
        match self.keyset_source {
            KeysetSource::Static => KeysetStatus::Static,
            KeysetSource::Remote { .. } => {
                if self.keyset_cache.read().await.jwks.is_empty() {
                    KeysetStatus::Error
                } else {
                    KeysetStatus::Ok
                }
            }
        }
    }

    /// Verify an ID token and return the identity it asserts.
    ///
    /// # Errors
    /// Returns an `AuthError` if the token is malformed, signed by an unknown key,
    /// or carries claims for another project, an expired token, or an invalid subject.
    #[instrument(skip(self, id_token))]
    pub async fn verify_token(&self, id_token: &str, now: i64) -> Result<Identity, AuthError> {
        let header = JwtHeader::peek(id_token)?;
        let jwks = self.keyset_for(&header.kid).await;
        if jwks.is_empty() {
            return Err(AuthError::KeysUnavailable);
        }

        let claims: IdTokenClaims = token::verify_rs256(id_token, &jwks)?;
        self.validate_claims(claims, now)
    }

    fn validate_claims(&self, claims: IdTokenClaims, now: i64) -> Result<Identity, AuthError> {
        if !claims.aud.contains(&self.audience) {
            return Err(AuthError::InvalidAudience);
        }
        if claims.iss != self.issuer {
            return Err(AuthError::InvalidIssuer);
        }
        if claims.exp <= now {
            return Err(AuthError::Expired);
        }
        if claims.iat > now {
            return Err(AuthError::IssuedInFuture);
        }
        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            return Err(AuthError::InvalidSubject);
        }
        let auth_time = claims.auth_time.unwrap_or(claims.iat);
        if auth_time > now {
            return Err(AuthError::IssuedInFuture);
        }

        Ok(Identity {
            uid: claims.sub,
            email: claims.email,
            auth_time,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    /// Return a keyset that should contain `kid`, refreshing when needed.
    async fn keyset_for(&self, kid: &str) -> Jwks {
        let (known, fresh) = {
            let cache = self.keyset_cache.read().await;
            (cache.jwks.find_by_kid(kid).is_some(), cache.is_fresh())
        };

        if !known || !fresh {
            if let KeysetSource::Remote { url, client } = &self.keyset_source {
                // Unknown kids are attacker-controlled; throttle refreshes they trigger.
                if self.claim_refresh_slot() {
                    self.refresh(client, url).await;
                } else {
                    debug!(kid, "skipping JWKS refresh during cooldown");
                }
            }
        }

        self.keyset_cache.read().await.jwks.clone()
    }

    fn claim_refresh_slot(&self) -> bool {
        let now = now_unix_seconds_u64();
        let last = self.last_refresh_unix.load(Ordering::Acquire);
        if now.saturating_sub(last) < KEYSET_REFRESH_COOLDOWN_SECONDS {
            return false;
        }
        self.last_refresh_unix
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    async fn refresh(&self, client: &Client, url: &str) {
        let etag = self.keyset_cache.read().await.etag.clone();
        match fetch_keyset(client, url, etag.as_deref()).await {
            Ok(FetchOutcome::Updated { jwks, etag }) => {
                debug!(keys = jwks.keys.len(), "identity JWKS refreshed");
                let mut cache = self.keyset_cache.write().await;
                *cache = KeysetCache {
                    jwks,
                    fetched_at: Instant::now(),
                    etag,
                };
            }
            Ok(FetchOutcome::NotModified) => {
                self.keyset_cache.write().await.fetched_at = Instant::now();
            }
            Err(err) => {
                warn!(url = %url, error = %err, "identity JWKS refresh failed; keeping last keyset");
            }
        }
    }
}

impl IdentityVerifier for JwksIdentityVerifier {
    fn verify<'a>(
        &'a self,
        id_token: &'a str,
        now: i64,
    ) -> BoxFuture<'a, Result<Identity, AuthError>> {
        Box::pin(self.verify_token(id_token, now))
    }

    fn keyset_status(&self) -> BoxFuture<'_, KeysetStatus> {
        Box::pin(JwksIdentityVerifier::keyset_status(self))
    }
}

async fn fetch_keyset(client: &Client, url: &str, etag: Option<&str>) -> Result<FetchOutcome> {
    let mut request = client.get(url);
    if let Some(etag) = etag {
        request = request.header(IF_NONE_MATCH, etag);
    }
    let response = request.send().await.context("JWKS request failed")?;

    if response.status() == StatusCode::NOT_MODIFIED {
        return Ok(FetchOutcome::NotModified);
    }
    if !response.status().is_success() {
        return Err(anyhow!("{url} - {}", response.status()));
    }

    let etag = response
        .headers()
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    let body = response.text().await.context("Failed to read JWKS body")?;
    let jwks = Jwks::from_json(&body).context("Invalid JWKS JSON")?;
    Ok(FetchOutcome::Updated { jwks, etag })
}

/// https everywhere; plain http only for loopback hosts (local emulators).
fn is_trusted_scheme(url: &Url) -> bool {
    match url.scheme() {
        "https" => true,
        "http" => match url.host() {
            Some(Host::Domain(domain)) => domain == "localhost",
            Some(Host::Ipv4(ip)) => ip.is_loopback(),
            Some(Host::Ipv6(ip)) => ip.is_loopback(),
            None => false,
        },
        _ => false,
    }
}

fn stale_instant() -> Instant {
    Instant::now()
        .checked_sub(Duration::from_secs(KEYSET_CACHE_TTL_SECONDS))
        .unwrap_or_else(Instant::now)
}

fn now_unix_seconds_u64() -> u64 {
    u64::try_from(now_unix_seconds()).unwrap_or(0)
}

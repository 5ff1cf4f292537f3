//! Session lifecycle: identity token in, signed session cookie out.
//!
//! The store never caches. Every `get_session` call re-reads the cookie and
//! re-verifies the token, so a cookie that changed between requests is always
//! seen as it is now.

pub mod config;
pub mod cookie;
pub mod error;
pub mod identity;
pub mod signed;

use axum::http::{HeaderMap, HeaderValue, header::InvalidHeaderValue};
use serde::Serialize;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, instrument};

pub use config::SessionConfig;
pub use cookie::SESSION_COOKIE_NAME;
pub use error::{AuthError, SessionReadError};
pub use identity::{JwksIdentityVerifier, KeysetStatus};
pub use signed::SignedSessions;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Who the identity provider says the caller is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    /// When the user last signed in with the provider.
    pub auth_time: i64,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// An authenticated admin session, as carried by the session cookie.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub uid: String,
    pub email: Option<String>,
    pub issued_at: i64,
    pub expires_at: i64,
    pub auth_time: i64,
}

#[derive(Debug)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

/// Result of reading the session cookie. `Invalid` means the same as `Absent` to every caller.
#[derive(Debug)]
pub enum SessionLookup {
    Valid(Session),
    Absent,
    Invalid(SessionReadError),
}

impl SessionLookup {
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Valid(session) => Some(session),
            Self::Absent | Self::Invalid(_) => None,
        }
    }

    #[must_use]
    pub fn into_session(self) -> Option<Session> {
        match self {
            Self::Valid(session) => Some(session),
            Self::Absent | Self::Invalid(_) => None,
        }
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Verifies identity tokens minted by the external identity provider.
pub trait IdentityVerifier: Send + Sync {
    fn verify<'a>(
        &'a self,
        id_token: &'a str,
        now: i64,
    ) -> BoxFuture<'a, Result<Identity, AuthError>>;

    fn keyset_status(&self) -> BoxFuture<'_, KeysetStatus>;
}

/// Checks a session credential: `verify(token) -> {identity, expiry} | invalid`.
pub trait SessionValidator: Send + Sync {
    /// # Errors
    /// Returns a `SessionReadError` when the token is malformed, mis-signed or expired.
    fn verify(&self, token: &str, now: i64) -> Result<Session, SessionReadError>;
}

/// Mints session credentials for a verified identity.
pub trait SessionIssuer: Send + Sync {
    /// # Errors
    /// Returns an `AuthError` when the credential cannot be signed.
    fn issue(&self, identity: &Identity, now: i64, ttl_seconds: i64)
    -> Result<IssuedSession, AuthError>;
}

/// Outcome of a successful `create_session`.
#[derive(Debug)]
pub struct CreatedSession {
    pub cookie: HeaderValue,
    pub session: Session,
}

#[derive(Clone)]
pub struct SessionStore {
    identity: Arc<dyn IdentityVerifier>,
    issuer: Arc<dyn SessionIssuer>,
    validator: Arc<dyn SessionValidator>,
    config: SessionConfig,
}

impl SessionStore {
    /// Store backed by server-signed sessions.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityVerifier>,
        sessions: Arc<SignedSessions>,
        config: SessionConfig,
    ) -> Self {
        Self {
            identity,
            issuer: sessions.clone(),
            validator: sessions,
            config,
        }
    }

    #[must_use]
    pub fn from_parts(
        identity: Arc<dyn IdentityVerifier>,
        issuer: Arc<dyn SessionIssuer>,
        validator: Arc<dyn SessionValidator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            identity,
            issuer,
            validator,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Exchange a provider identity token for a session cookie.
    ///
    /// # Errors
    /// Returns `AuthError` when the identity token is missing, cannot be verified,
    /// or the sign-in is older than the recent-auth window.
    #[instrument(skip_all)]
    pub async fn create_session(&self, id_token: &str) -> Result<CreatedSession, AuthError> {
        let id_token = id_token.trim();
        if id_token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let now = now_unix_seconds();
        let identity = self.identity.verify(id_token, now).await?;

        let recent = self.config.recent_auth_seconds();
        if recent > 0 && now.saturating_sub(identity.auth_time) > recent {
            return Err(AuthError::StaleAuthentication);
        }

        let issued = self
            .issuer
            .issue(&identity, now, self.config.ttl_seconds())?;
        let cookie = cookie::session_cookie(&self.config, &issued.token)
            .map_err(|err| AuthError::Issue(err.to_string()))?;

        debug!(uid = %issued.session.uid, "session created");
        Ok(CreatedSession {
            cookie,
            session: issued.session,
        })
    }

    /// Read and validate the session cookie. Never fails.
    #[must_use]
    pub fn get_session(&self, headers: &HeaderMap) -> SessionLookup {
        let Some(token) = cookie::extract_session_token(headers) else {
            return SessionLookup::Absent;
        };

        match self.validator.verify(&token, now_unix_seconds()) {
            Ok(session) => SessionLookup::Valid(session),
            Err(err) => {
                debug!(error = %err, "session cookie rejected");
                SessionLookup::Invalid(err)
            }
        }
    }

    /// Cookie that clears the session. Safe to send whether or not a session exists.
    ///
    /// # Errors
    /// Returns an error if the cookie header cannot be built.
    pub fn delete_session(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        cookie::clear_session_cookie(&self.config)
    }

    pub async fn identity_key_status(&self) -> KeysetStatus {
        self.identity.keyset_status().await
    }
}

#[must_use]
pub fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| {
            i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
        })
}

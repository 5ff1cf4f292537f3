//! Server-signed session credentials.
//!
//! A session is an RS256 JWT signed with the server's session key. Nothing is
//! stored server-side: validity is the signature plus the `exp` claim, checked
//! again on every read.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::{
    Identity, IssuedSession, Session, SessionIssuer, SessionValidator,
    error::{AuthError, SessionReadError},
};
use crate::token::{self, SessionKeys};

pub const SESSION_TOKEN_VERSION: u8 = 1;
const SESSION_ISSUER: &str = "sitegate";
const SESSION_AUDIENCE: &str = "sitegate-admin";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct SessionClaims {
    v: u8,
    iss: String,
    aud: String,
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    iat: i64,
    exp: i64,
    auth_time: i64,
    jti: String,
}

#[derive(Debug)]
pub struct SignedSessions {
    keys: SessionKeys,
}

impl SignedSessions {
    #[must_use]
    pub fn new(keys: SessionKeys) -> Self {
        Self { keys }
    }

    #[must_use]
    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }
}

impl SessionIssuer for SignedSessions {
    fn issue(
        &self,
        identity: &Identity,
        now: i64,
        ttl_seconds: i64,
    ) -> Result<IssuedSession, AuthError> {
        let claims = SessionClaims {
            v: SESSION_TOKEN_VERSION,
            iss: SESSION_ISSUER.to_string(),
            aud: SESSION_AUDIENCE.to_string(),
            sub: identity.uid.clone(),
            email: identity.email.clone(),
            iat: now,
            exp: now.saturating_add(ttl_seconds),
            auth_time: identity.auth_time,
            jti: Ulid::new().to_string(),
        };
        let token = self
            .keys
            .sign(&claims)
            .map_err(|err| AuthError::Issue(err.to_string()))?;
        Ok(IssuedSession {
            token,
            session: claims.into_session(),
        })
    }
}

impl SessionValidator for SignedSessions {
    fn verify(&self, token: &str, now: i64) -> Result<Session, SessionReadError> {
        let claims: SessionClaims = token::verify_rs256(token, self.keys.jwks())?;
        if claims.v != SESSION_TOKEN_VERSION {
            return Err(SessionReadError::InvalidVersion);
        }
        if claims.iss != SESSION_ISSUER {
            return Err(SessionReadError::InvalidIssuer);
        }
        if claims.aud != SESSION_AUDIENCE {
            return Err(SessionReadError::InvalidAudience);
        }
        if claims.exp <= now {
            return Err(SessionReadError::Expired);
        }
        if claims.iat > now {
            return Err(SessionReadError::NotYetValid);
        }
        if claims.sub.is_empty() {
            return Err(SessionReadError::MissingSubject);
        }
        Ok(claims.into_session())
    }
}

impl SessionClaims {
    fn into_session(self) -> Session {
        Session {
            uid: self.sub,
            email: self.email,
            issued_at: self.iat,
            expires_at: self.exp,
            auth_time: self.auth_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const SESSION_KEY_PEM: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/session_key.pem"
    ));
    const OTHER_KEY_PEM: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/identity_provider_key.pem"
    ));
    const NOW: i64 = 1_700_000_000;

    fn sessions(pem: &str) -> Result<SignedSessions> {
        Ok(SignedSessions::new(SessionKeys::from_pem_or_der(
            pem.as_bytes(),
            "session-1",
        )?))
    }

    fn identity() -> Identity {
        Identity {
            uid: "uid-123".to_string(),
            email: Some("admin@example.com".to_string()),
            auth_time: NOW - 10,
            issued_at: NOW - 10,
            expires_at: NOW + 3600,
        }
    }

    #[test]
    fn issued_session_verifies() -> Result<()> {
        let sessions = sessions(SESSION_KEY_PEM)?;
        let issued = sessions.issue(&identity(), NOW, 600)?;
        assert_eq!(issued.session.expires_at, NOW + 600);

        let session = sessions.verify(&issued.token, NOW + 1)?;
        assert_eq!(session, issued.session);
        assert_eq!(session.uid, "uid-123");
        assert_eq!(session.email.as_deref(), Some("admin@example.com"));
        assert_eq!(session.auth_time, NOW - 10);
        Ok(())
    }

    #[test]
    fn each_issue_is_unique() -> Result<()> {
        let sessions = sessions(SESSION_KEY_PEM)?;
        let first = sessions.issue(&identity(), NOW, 600)?;
        let second = sessions.issue(&identity(), NOW, 600)?;
        assert_ne!(first.token, second.token);
        Ok(())
    }

    #[test]
    fn expired_session_is_rejected() -> Result<()> {
        let sessions = sessions(SESSION_KEY_PEM)?;
        let issued = sessions.issue(&identity(), NOW, 600)?;
        assert!(matches!(
            sessions.verify(&issued.token, NOW + 600),
            Err(SessionReadError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn future_session_is_rejected() -> Result<()> {
        let sessions = sessions(SESSION_KEY_PEM)?;
        let issued = sessions.issue(&identity(), NOW, 600)?;
        assert!(matches!(
            sessions.verify(&issued.token, NOW - 1),
            Err(SessionReadError::NotYetValid)
        ));
        Ok(())
    }

    #[test]
    fn foreign_key_is_rejected() -> Result<()> {
        let ours = sessions(SESSION_KEY_PEM)?;
        let theirs = sessions(OTHER_KEY_PEM)?;
        let issued = theirs.issue(&identity(), NOW, 600)?;
        assert!(matches!(
            ours.verify(&issued.token, NOW + 1),
            Err(SessionReadError::Token(token::Error::InvalidSignature))
        ));
        Ok(())
    }

    #[test]
    fn wrong_audience_is_rejected() -> Result<()> {
        let sessions = sessions(SESSION_KEY_PEM)?;
        let mut claims = SessionClaims {
            v: SESSION_TOKEN_VERSION,
            iss: SESSION_ISSUER.to_string(),
            aud: "someone-else".to_string(),
            sub: "uid-123".to_string(),
            email: None,
            iat: NOW,
            exp: NOW + 600,
            auth_time: NOW,
            jti: "jti".to_string(),
        };
        let token = sessions.keys().sign(&claims)?;
        assert!(matches!(
            sessions.verify(&token, NOW + 1),
            Err(SessionReadError::InvalidAudience)
        ));

        claims.aud = SESSION_AUDIENCE.to_string();
        claims.v = 9;
        let token = sessions.keys().sign(&claims)?;
        assert!(matches!(
            sessions.verify(&token, NOW + 1),
            Err(SessionReadError::InvalidVersion)
        ));
        Ok(())
    }

    #[test]
    fn garbage_is_rejected() -> Result<()> {
        let sessions = sessions(SESSION_KEY_PEM)?;
        assert!(matches!(
            sessions.verify("not-a-token", NOW),
            Err(SessionReadError::Token(_))
        ));
        Ok(())
    }
}

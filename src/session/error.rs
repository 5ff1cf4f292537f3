use crate::token;
use thiserror::Error;

/// Identity token could not be exchanged for a session.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing identity token")]
    MissingToken,
    #[error("invalid identity token: {0}")]
    Token(#[from] token::Error),
    #[error("identity provider keys unavailable")]
    KeysUnavailable,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("invalid audience")]
    InvalidAudience,
    #[error("identity token expired")]
    Expired,
    #[error("identity token issued in the future")]
    IssuedInFuture,
    #[error("invalid subject")]
    InvalidSubject,
    #[error("sign-in is too old to open a session")]
    StaleAuthentication,
    #[error("failed to issue session: {0}")]
    Issue(String),
}

/// Session cookie is present but unusable. Callers treat it as no session.
#[derive(Debug, Error)]
pub enum SessionReadError {
    #[error("malformed session token: {0}")]
    Token(#[from] token::Error),
    #[error("invalid session version")]
    InvalidVersion,
    #[error("invalid session issuer")]
    InvalidIssuer,
    #[error("invalid session audience")]
    InvalidAudience,
    #[error("session expired")]
    Expired,
    #[error("session not yet valid")]
    NotYetValid,
    #[error("session has no subject")]
    MissingSubject,
}

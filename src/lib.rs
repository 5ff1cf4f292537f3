//! # Sitegate
//!
//! Session-gated access to the admin area of the company website.
//!
//! ## Flow
//!
//! 1. The browser signs in with the identity provider.
//! 2. The [`bridge`] sees the sign-in and posts the provider's ID token to
//!    `POST /api/auth/session`.
//! 3. The [`session`] store verifies the ID token against the provider's JWKS
//!    and answers with a signed `__session` cookie.
//! 4. On every later request the [`guard`] reads the cookie: `/admin/**`
//!    without a valid session redirects to `/login`, `/login` with one
//!    redirects to `/admin`, everything else is left alone.
//!
//! Sessions are stateless RS256 tokens. Nothing is stored server-side and
//! nothing is cached: each read re-verifies the signature and expiry.
//!
//! Outside production mode the guard is a pass-through so the site can be
//! developed without provider credentials.

pub mod api;
pub mod bridge;
pub mod cli;
pub mod events;
pub mod guard;
pub mod session;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}

//! Maps validated CLI arguments to the action to run.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, identity, session};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let session_opts = session::Options::parse(matches)?;
    let identity_opts = identity::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        mode: session_opts.mode,
        public_base_url: session_opts.public_base_url,
        session_key_path: session_opts.key_path,
        session_key_id: session_opts.key_id,
        session_ttl_seconds: session_opts.ttl_seconds,
        recent_auth_seconds: session_opts.recent_auth_seconds,
        identity_project_id: identity_opts.project_id,
        identity_issuer: identity_opts.issuer,
        identity_jwks_url: identity_opts.jwks_url,
        identity_jwks_path: identity_opts.jwks_path,
    }))
}

use crate::{
    api,
    cli::telemetry,
    events::{AccessDenied, Observers},
    guard::{RouteGuard, RouteMatcher, RuntimeMode},
    session::{JwksIdentityVerifier, SessionConfig, SessionStore, SignedSessions},
    token::{Jwks, SessionKeys},
};
use anyhow::{Context, Result, anyhow};
use std::{fs, sync::Arc};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub mode: RuntimeMode,
    pub public_base_url: String,
    pub session_key_path: Option<String>,
    pub session_key_id: String,
    pub session_ttl_seconds: i64,
    pub recent_auth_seconds: i64,
    pub identity_project_id: String,
    pub identity_issuer: Option<String>,
    pub identity_jwks_url: String,
    pub identity_jwks_path: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if keys cannot be loaded or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let session_keys = load_session_keys(&args)?;
    debug!(kid = session_keys.kid(), "session signing key loaded");

    let identity = identity_verifier(&args).await?;

    let config = SessionConfig::new(args.public_base_url)
        .with_ttl_seconds(args.session_ttl_seconds)
        .with_recent_auth_seconds(args.recent_auth_seconds);

    let store = SessionStore::new(
        Arc::new(identity),
        Arc::new(SignedSessions::new(session_keys)),
        config,
    );

    let denials = Arc::new(Observers::<AccessDenied>::new());
    // Lives until the server stops.
    let _denial_log = denials.subscribe(|event: &AccessDenied| {
        info!(path = %event.path, reason = event.reason.as_str(), "admin access denied");
    });

    if !args.mode.is_production() {
        warn!(mode = %args.mode, "route guard disabled, admin pages are open");
    }

    let guard = RouteGuard::new(
        store.clone(),
        RouteMatcher::site_defaults()?,
        args.mode,
        denials,
    );

    let result = api::serve(args.port, api::app(store, Arc::new(guard))).await;

    telemetry::shutdown_tracer();

    result
}

fn load_session_keys(args: &Args) -> Result<SessionKeys> {
    match &args.session_key_path {
        Some(path) => {
            let bytes =
                fs::read(path).with_context(|| format!("Failed to read session key: {path}"))?;
            SessionKeys::from_pem_or_der(&bytes, args.session_key_id.clone())
                .with_context(|| format!("Invalid session key: {path}"))
        }
        None if !args.mode.is_production() => {
            warn!("no session key configured, generating an ephemeral one");
            SessionKeys::generate(args.session_key_id.clone())
                .context("Failed to generate session key")
        }
        None => Err(anyhow!("Session key is required in production mode")),
    }
}

async fn identity_verifier(args: &Args) -> Result<JwksIdentityVerifier> {
    let verifier = if let Some(path) = &args.identity_jwks_path {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read identity JWKS file: {path}"))?;
        let jwks = Jwks::from_json(&json).context("Invalid identity JWKS JSON")?;
        if jwks.is_empty() {
            return Err(anyhow!("Identity JWKS file has no keys: {path}"));
        }
        JwksIdentityVerifier::new(jwks, &args.identity_project_id)
    } else {
        JwksIdentityVerifier::new_remote(args.identity_jwks_url.clone(), &args.identity_project_id)
            .await?
    };

    Ok(match &args.identity_issuer {
        Some(issuer) => verifier.with_issuer(issuer.clone()),
        None => verifier,
    })
}

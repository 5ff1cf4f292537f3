use clap::{Arg, ArgMatches, Command};

use crate::session::identity::DEFAULT_JWKS_URL;

pub const ARG_IDENTITY_PROJECT_ID: &str = "identity-project-id";
pub const ARG_IDENTITY_ISSUER: &str = "identity-issuer";
pub const ARG_IDENTITY_JWKS_URL: &str = "identity-jwks-url";
pub const ARG_IDENTITY_JWKS_PATH: &str = "identity-jwks-path";

#[derive(Debug, Clone)]
pub struct Options {
    pub project_id: String,
    pub issuer: Option<String>,
    pub jwks_url: String,
    pub jwks_path: Option<String>,
}

impl Options {
    /// Parse identity provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the project id is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // clap passes empty env values through; treat them as unset.
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let Some(project_id) = get_non_empty(ARG_IDENTITY_PROJECT_ID) else {
            anyhow::bail!("missing required argument: --{ARG_IDENTITY_PROJECT_ID}");
        };

        Ok(Self {
            project_id,
            issuer: get_non_empty(ARG_IDENTITY_ISSUER),
            jwks_url: get_non_empty(ARG_IDENTITY_JWKS_URL)
                .unwrap_or_else(|| DEFAULT_JWKS_URL.to_string()),
            jwks_path: get_non_empty(ARG_IDENTITY_JWKS_PATH),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_IDENTITY_PROJECT_ID)
                .long(ARG_IDENTITY_PROJECT_ID)
                .help("Identity provider project id, the expected ID token audience")
                .env("SITEGATE_IDENTITY_PROJECT_ID"),
        )
        .arg(
            Arg::new(ARG_IDENTITY_ISSUER)
                .long(ARG_IDENTITY_ISSUER)
                .help("Expected ID token issuer (default: https://securetoken.google.com/<project>)")
                .env("SITEGATE_IDENTITY_ISSUER"),
        )
        .arg(
            Arg::new(ARG_IDENTITY_JWKS_URL)
                .long(ARG_IDENTITY_JWKS_URL)
                .help("JWKS URL with the provider's ID token signing keys")
                .long_help(
                    "JWKS URL with the provider's ID token signing keys.\n\nThe keyset is cached (TTL ~1 hour) and refreshed on unknown `kid` with a cooldown. Verification\nitself is local and does not call the provider per request.",
                )
                .env("SITEGATE_IDENTITY_JWKS_URL")
                .default_value(DEFAULT_JWKS_URL),
        )
        .arg(
            Arg::new(ARG_IDENTITY_JWKS_PATH)
                .long(ARG_IDENTITY_JWKS_PATH)
                .help("Static JWKS file; disables remote key fetching")
                .env("SITEGATE_IDENTITY_JWKS_PATH"),
        )
}

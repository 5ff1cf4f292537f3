use clap::{Arg, ArgMatches, Command};

use crate::guard::RuntimeMode;

pub const ARG_MODE: &str = "mode";
pub const ARG_PUBLIC_BASE_URL: &str = "public-base-url";
pub const ARG_SESSION_KEY_PATH: &str = "session-key-path";
pub const ARG_SESSION_KEY_ID: &str = "session-key-id";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_RECENT_AUTH_SECONDS: &str = "recent-auth-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub mode: RuntimeMode,
    pub public_base_url: String,
    pub key_path: Option<String>,
    pub key_id: String,
    pub ttl_seconds: i64,
    pub recent_auth_seconds: i64,
}

impl Options {
    /// Parse session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if production mode is selected without a session key or
    /// with a non-https public base URL.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let mode = matches
            .get_one::<RuntimeMode>(ARG_MODE)
            .copied()
            .unwrap_or_default();
        let key_path = matches
            .get_one::<String>(ARG_SESSION_KEY_PATH)
            .cloned()
            .filter(|v| !v.trim().is_empty());

        if mode.is_production() && key_path.is_none() {
            anyhow::bail!(
                "missing required argument: --{ARG_SESSION_KEY_PATH} (required in production mode)"
            );
        }

        let public_base_url = matches
            .get_one::<String>(ARG_PUBLIC_BASE_URL)
            .cloned()
            .unwrap_or_else(|| "http://localhost:8080".to_string());

        // Session cookies only get `Secure` on an https origin.
        if mode.is_production() && !public_base_url.starts_with("https://") {
            anyhow::bail!(
                "invalid argument: --{ARG_PUBLIC_BASE_URL} must be an https URL in production mode, got {public_base_url}"
            );
        }

        Ok(Self {
            mode,
            public_base_url,
            key_path,
            key_id: matches
                .get_one::<String>(ARG_SESSION_KEY_ID)
                .cloned()
                .unwrap_or_else(|| "session-1".to_string()),
            ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(432_000),
            recent_auth_seconds: matches
                .get_one::<i64>(ARG_RECENT_AUTH_SECONDS)
                .copied()
                .unwrap_or(300),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MODE)
                .long(ARG_MODE)
                .help("Runtime mode: production or development")
                .long_help(
                    "Runtime mode. In development mode the route guard lets every request through and an ephemeral session key is generated when none is configured.",
                )
                .env("SITEGATE_MODE")
                .default_value("production")
                .value_parser(clap::value_parser!(RuntimeMode)),
        )
        .arg(
            Arg::new(ARG_PUBLIC_BASE_URL)
                .long(ARG_PUBLIC_BASE_URL)
                .help("Public base URL of the site; must be https in production mode")
                .env("SITEGATE_PUBLIC_BASE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_SESSION_KEY_PATH)
                .long(ARG_SESSION_KEY_PATH)
                .help("RSA private key (PEM or DER) used to sign session cookies")
                .env("SITEGATE_SESSION_KEY_PATH"),
        )
        .arg(
            Arg::new(ARG_SESSION_KEY_ID)
                .long(ARG_SESSION_KEY_ID)
                .help("Key id written to the session token header")
                .env("SITEGATE_SESSION_KEY_ID")
                .default_value("session-1"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds (300 to 1209600)")
                .env("SITEGATE_SESSION_TTL_SECONDS")
                .default_value("432000")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_RECENT_AUTH_SECONDS)
                .long(ARG_RECENT_AUTH_SECONDS)
                .help("Max age of the provider sign-in when creating a session (0 disables)")
                .env("SITEGATE_RECENT_AUTH_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(i64)),
        )
}

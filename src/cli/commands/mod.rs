pub mod identity;
pub mod logging;
pub mod session;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("sitegate")
        .about("Session-gated admin access for the company website")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("SITEGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = session::with_args(command);
    let command = identity::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::RuntimeMode;

    const ENV_VARS: [&str; 12] = [
        "SITEGATE_PORT",
        "SITEGATE_MODE",
        "SITEGATE_PUBLIC_BASE_URL",
        "SITEGATE_SESSION_KEY_PATH",
        "SITEGATE_SESSION_KEY_ID",
        "SITEGATE_SESSION_TTL_SECONDS",
        "SITEGATE_RECENT_AUTH_SECONDS",
        "SITEGATE_IDENTITY_PROJECT_ID",
        "SITEGATE_IDENTITY_ISSUER",
        "SITEGATE_IDENTITY_JWKS_URL",
        "SITEGATE_IDENTITY_JWKS_PATH",
        "SITEGATE_LOG_LEVEL",
    ];

    fn clean_env<F: FnOnce()>(f: F) {
        temp_env::with_vars(ENV_VARS.map(|key| (key, None::<&str>)), f);
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "sitegate");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Session-gated admin access for the company website".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_defaults() {
        clean_env(|| {
            let matches = new().get_matches_from(vec!["sitegate"]);
            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(8080));
            assert_eq!(
                matches.get_one::<RuntimeMode>(session::ARG_MODE).copied(),
                Some(RuntimeMode::Production)
            );
            assert_eq!(
                matches
                    .get_one::<i64>(session::ARG_SESSION_TTL_SECONDS)
                    .copied(),
                Some(432_000)
            );
            assert_eq!(
                matches
                    .get_one::<String>(identity::ARG_IDENTITY_JWKS_URL)
                    .cloned(),
                Some(crate::session::identity::DEFAULT_JWKS_URL.to_string())
            );
        });
    }

    #[test]
    fn test_check_args() {
        clean_env(|| {
            let matches = new().get_matches_from(vec![
                "sitegate",
                "--port",
                "9090",
                "--mode",
                "development",
                "--public-base-url",
                "https://www.example.com",
                "--identity-project-id",
                "acme-site",
                "--session-ttl-seconds",
                "3600",
            ]);

            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(9090));
            assert_eq!(
                matches.get_one::<RuntimeMode>(session::ARG_MODE).copied(),
                Some(RuntimeMode::Development)
            );
            assert_eq!(
                matches
                    .get_one::<String>(session::ARG_PUBLIC_BASE_URL)
                    .cloned(),
                Some("https://www.example.com".to_string())
            );
            assert_eq!(
                matches
                    .get_one::<String>(identity::ARG_IDENTITY_PROJECT_ID)
                    .cloned(),
                Some("acme-site".to_string())
            );
            assert_eq!(
                matches
                    .get_one::<i64>(session::ARG_SESSION_TTL_SECONDS)
                    .copied(),
                Some(3600)
            );
        });
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("SITEGATE_PORT", Some("443")),
                ("SITEGATE_MODE", Some("dev")),
                ("SITEGATE_SESSION_KEY_PATH", Some("/etc/sitegate/session.pem")),
                ("SITEGATE_IDENTITY_PROJECT_ID", Some("acme-site")),
                ("SITEGATE_IDENTITY_JWKS_PATH", Some("/etc/sitegate/jwks.json")),
                ("SITEGATE_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["sitegate"]);
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    matches.get_one::<RuntimeMode>(session::ARG_MODE).copied(),
                    Some(RuntimeMode::Development)
                );
                assert_eq!(
                    matches
                        .get_one::<String>(session::ARG_SESSION_KEY_PATH)
                        .cloned(),
                    Some("/etc/sitegate/session.pem".to_string())
                );
                assert_eq!(
                    matches
                        .get_one::<String>(identity::ARG_IDENTITY_JWKS_PATH)
                        .cloned(),
                    Some("/etc/sitegate/jwks.json".to_string())
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_invalid_mode() {
        clean_env(|| {
            let result = new().try_get_matches_from(vec!["sitegate", "--mode", "staging"]);
            assert!(result.is_err());
        });
    }
}

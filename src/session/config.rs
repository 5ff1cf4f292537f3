//! Session cookie configuration.

const DEFAULT_SESSION_TTL_SECONDS: i64 = 5 * 24 * 60 * 60;
const MIN_SESSION_TTL_SECONDS: i64 = 5 * 60;
const MAX_SESSION_TTL_SECONDS: i64 = 14 * 24 * 60 * 60;
const DEFAULT_RECENT_AUTH_SECONDS: i64 = 5 * 60;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    public_base_url: String,
    ttl_seconds: i64,
    recent_auth_seconds: i64,
}

impl SessionConfig {
    #[must_use]
    pub fn new(public_base_url: String) -> Self {
        Self {
            public_base_url,
            ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            recent_auth_seconds: DEFAULT_RECENT_AUTH_SECONDS,
        }
    }

    /// Session lifetime, clamped to the range the cookie supports (5 minutes to 2 weeks).
    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds.clamp(MIN_SESSION_TTL_SECONDS, MAX_SESSION_TTL_SECONDS);
        self
    }

    /// Maximum age of the provider sign-in when a session is created. `0` disables the check.
    #[must_use]
    pub fn with_recent_auth_seconds(mut self, seconds: i64) -> Self {
        self.recent_auth_seconds = seconds.max(0);
        self
    }

    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    #[must_use]
    pub fn recent_auth_seconds(&self) -> i64 {
        self.recent_auth_seconds
    }

    /// Only mark cookies secure when the site is served over HTTPS.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.public_base_url.starts_with("https://")
    }
}

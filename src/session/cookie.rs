use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};

use super::config::SessionConfig;

/// Cookie carrying the session token. Hosting CDNs in front of the site only
/// forward a cookie with this exact name.
pub const SESSION_COOKIE_NAME: &str = "__session";

/// Build a secure `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    config: &SessionConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_session_cookie(
    config: &SessionConfig,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Find the session token among all `Cookie` headers. Empty values count as missing.
pub(super) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == SESSION_COOKIE_NAME)
        .map(|(_, val)| val.trim().trim_matches('"').to_string())
        .filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            if let Ok(value) = HeaderValue::from_str(cookie) {
                headers.append(COOKIE, value);
            }
        }
        headers
    }

    #[test]
    fn cookie_attributes() -> Result<(), InvalidHeaderValue> {
        let config = SessionConfig::new("http://localhost:8080".to_string()).with_ttl_seconds(600);
        let cookie = session_cookie(&config, "abc.def.ghi")?;
        assert_eq!(
            cookie.to_str().ok(),
            Some("__session=abc.def.ghi; Path=/; HttpOnly; SameSite=Lax; Max-Age=600")
        );

        let config = SessionConfig::new("https://example.com".to_string()).with_ttl_seconds(600);
        let cookie = session_cookie(&config, "abc")?;
        assert!(cookie.to_str().is_ok_and(|c| c.ends_with("; Secure")));
        Ok(())
    }

    #[test]
    fn clear_cookie_expires_immediately() -> Result<(), InvalidHeaderValue> {
        let config = SessionConfig::new("https://example.com".to_string());
        let cookie = clear_session_cookie(&config)?;
        assert_eq!(
            cookie.to_str().ok(),
            Some("__session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Secure")
        );
        Ok(())
    }

    #[test]
    fn extracts_among_other_cookies() {
        let map = headers(&["theme=dark; __session=tok.en.sig; lang=en"]);
        assert_eq!(extract_session_token(&map), Some("tok.en.sig".to_string()));

        let map = headers(&["theme=dark", "__session=second"]);
        assert_eq!(extract_session_token(&map), Some("second".to_string()));
    }

    #[test]
    fn missing_or_empty_is_none() {
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
        assert_eq!(extract_session_token(&headers(&["__session="])), None);
        assert_eq!(extract_session_token(&headers(&["broken; x"])), None);
        assert_eq!(extract_session_token(&headers(&["__sessionx=1"])), None);
    }
}

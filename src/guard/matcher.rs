//! Path patterns in the `/admin/:path*` style.
//!
//! Supported segments: literals, `:name` (exactly one segment), `:name*` (zero
//! or more), `:name+` (one or more).
//!
//! Request paths are matched segment-wise: repeated slashes, `.` segments and a
//! trailing slash are dropped first, so `/admin//x` and `/admin/./x` classify
//! like `/admin/x`. `..` is kept as a literal segment, which is how the router
//! sees it too.

use regex::Regex;
use thiserror::Error;

pub const ADMIN_PATTERN: &str = "/admin/:path*";
pub const LOGIN_PATTERN: &str = "/login";
pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_PATH: &str = "/admin";

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern must start with '/': {0}")]
    Relative(String),
    #[error("empty parameter name in pattern: {0}")]
    EmptyParam(String),
    #[error("invalid pattern {pattern}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Needs a valid session.
    Protected,
    /// Bounces callers that already have a session.
    Login,
    /// Not gated.
    Public,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    regex: Regex,
    class: RouteClass,
}

/// Static list of guarded patterns. Paths that match none are never seen by the guard.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    patterns: Vec<CompiledPattern>,
}

impl RouteMatcher {
    /// Matcher for `/admin/:path*` (protected) and `/login`.
    ///
    /// # Errors
    /// Returns an error if a pattern fails to compile.
    pub fn site_defaults() -> Result<Self, PatternError> {
        Self::new(&[
            (ADMIN_PATTERN, RouteClass::Protected),
            (LOGIN_PATTERN, RouteClass::Login),
        ])
    }

    /// # Errors
    /// Returns an error if a pattern is relative or fails to compile.
    pub fn new(patterns: &[(&str, RouteClass)]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|(pattern, class)| {
                Ok(CompiledPattern {
                    source: (*pattern).to_string(),
                    regex: compile(pattern)?,
                    class: *class,
                })
            })
            .collect::<Result<Vec<_>, PatternError>>()?;
        Ok(Self { patterns })
    }

    /// Class of the first matching pattern, or `None` when the guard does not apply.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<RouteClass> {
        let path = normalize(path);
        self.patterns
            .iter()
            .find(|pattern| pattern.regex.is_match(&path))
            .map(|pattern| pattern.class)
    }

    /// Pure classification of any path.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        self.matches(path).unwrap_or(RouteClass::Public)
    }

    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.source.as_str()).collect()
    }
}

fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    format!("/{}", segments.join("/"))
}

fn compile(pattern: &str) -> Result<Regex, PatternError> {
    if !pattern.starts_with('/') {
        return Err(PatternError::Relative(pattern.to_string()));
    }

    let mut expr = String::from("^");
    for segment in pattern.split('/').skip(1) {
        if segment.is_empty() {
            continue;
        }
        if let Some(param) = segment.strip_prefix(':') {
            let (name, repeat) = match param.chars().last() {
                Some('*') => (&param[..param.len() - 1], Some('*')),
                Some('+') => (&param[..param.len() - 1], Some('+')),
                _ => (param, None),
            };
            if name.is_empty() {
                return Err(PatternError::EmptyParam(pattern.to_string()));
            }
            match repeat {
                Some('*') => expr.push_str("(?:/[^/]+)*"),
                Some(_) => expr.push_str("(?:/[^/]+)+"),
                None => expr.push_str("/[^/]+"),
            }
        } else {
            expr.push('/');
            expr.push_str(&regex::escape(segment));
        }
    }
    if expr == "^" {
        expr.push('/');
    }
    expr.push('$');

    Regex::new(&expr).map_err(|source| PatternError::Regex {
        pattern: pattern.to_string(),
        source,
    })
}

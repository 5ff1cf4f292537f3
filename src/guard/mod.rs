//! Route guard for the admin area.
//!
//! Runs as axum middleware in front of every route, but only does work for
//! paths the matcher knows about:
//!
//! - protected path, no valid session: redirect to `/login`
//! - `/login` with a valid session: redirect to `/admin`
//! - anything else: pass through untouched
//!
//! A session that fails to verify counts as no session. Outside production the
//! guard lets every request through.

pub mod matcher;
pub mod mode;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::{
    events::{AccessDenied, DenialReason, Observers},
    session::{Session, SessionLookup, SessionStore},
};

pub use matcher::{ADMIN_PATH, LOGIN_PATH, PatternError, RouteClass, RouteMatcher};
pub use mode::RuntimeMode;

/// What the guard decided for one request.
#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    /// Not a guarded path; no session was read.
    Skip,
    /// Let the request through, with the session when one was verified.
    Pass(Option<Session>),
    Redirect(&'static str),
}

pub struct RouteGuard {
    store: SessionStore,
    matcher: RouteMatcher,
    mode: RuntimeMode,
    denials: Arc<Observers<AccessDenied>>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(
        store: SessionStore,
        matcher: RouteMatcher,
        mode: RuntimeMode,
        denials: Arc<Observers<AccessDenied>>,
    ) -> Self {
        Self {
            store,
            matcher,
            mode,
            denials,
        }
    }

    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    #[must_use]
    pub fn decide(&self, path: &str, headers: &HeaderMap) -> Decision {
        let Some(class) = self.matcher.matches(path) else {
            return Decision::Skip;
        };

        if !self.mode.is_production() {
            debug!(path, mode = %self.mode, "route guard bypassed");
            return Decision::Pass(None);
        }

        let lookup = self.store.get_session(headers);
        match (class, lookup) {
            (RouteClass::Protected, SessionLookup::Valid(session)) => Decision::Pass(Some(session)),
            (RouteClass::Protected, lookup) => {
                let reason = if matches!(lookup, SessionLookup::Invalid(_)) {
                    DenialReason::InvalidSession
                } else {
                    DenialReason::NoSession
                };
                debug!(path, reason = reason.as_str(), "redirecting to login");
                self.denials.publish(&AccessDenied {
                    path: path.to_string(),
                    reason,
                });
                Decision::Redirect(LOGIN_PATH)
            }
            (RouteClass::Login, SessionLookup::Valid(_)) => {
                debug!(path, "already signed in, redirecting to admin");
                Decision::Redirect(ADMIN_PATH)
            }
            (RouteClass::Login | RouteClass::Public, _) => Decision::Pass(None),
        }
    }
}

/// Middleware entry point, install with `axum::middleware::from_fn_with_state`.
pub async fn route_guard(
    State(guard): State<Arc<RouteGuard>>,
    mut request: Request,
    next: Next,
) -> Response {
    match guard.decide(request.uri().path(), request.headers()) {
        Decision::Skip | Decision::Pass(None) => next.run(request).await,
        Decision::Pass(Some(session)) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Decision::Redirect(location) => Redirect::temporary(location).into_response(),
    }
}

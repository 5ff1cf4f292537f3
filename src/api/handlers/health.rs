use crate::{GIT_COMMIT_HASH, session::SessionStore};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    /// `ok`, `error` or `static`.
    identity_keys: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Identity provider keys are available", body = Health),
        (status = 503, description = "Identity provider keys could not be fetched", body = Health)
    ),
    tag = "health"
)]
pub async fn health(method: Method, store: Extension<SessionStore>) -> Response {
    let key_status = store.identity_key_status().await;
    debug!(identity_keys = key_status.as_str(), "health check");

    let status = if key_status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        identity_keys: key_status.as_str().to_string(),
    };

    let mut headers = HeaderMap::new();
    if let Some(value) = app_header(&health) {
        headers.insert("X-App", value);
    }

    // OPTIONS gets the status and headers only.
    if method == Method::GET {
        (status, headers, Json(health)).into_response()
    } else {
        (status, headers, Body::empty()).into_response()
    }
}

/// `name:version:short-commit`.
fn app_header(health: &Health) -> Option<HeaderValue> {
    let short_commit = health.commit.get(..7).unwrap_or_default();
    let value = format!("{}:{}:{short_commit}", health.name, health.version);
    HeaderValue::from_str(&value)
        .inspect_err(|err| warn!("Failed to build X-App header: {err}"))
        .ok()
}

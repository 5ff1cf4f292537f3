//! Session lifecycle endpoints used by the auth state bridge.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::session::{AuthError, SessionLookup, SessionStore};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// ID token from the identity provider.
    #[serde(default)]
    pub id_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub uid: String,
    pub email: Option<String>,
    pub expires_at: i64,
}

#[utoipa::path(
    post,
    path = "/api/auth/session",
    request_body = CreateSessionRequest,
    responses(
        (status = 204, description = "Session created, cookie set"),
        (status = 400, description = "Missing payload or ID token", body = String),
        (status = 401, description = "ID token could not be verified", body = String)
    ),
    tag = "session"
)]
pub async fn create(
    store: Extension<SessionStore>,
    payload: Option<Json<CreateSessionRequest>>,
) -> impl IntoResponse {
    let request: CreateSessionRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match store.create_session(&request.id_token).await {
        Ok(created) => {
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, created.cookie);
            (StatusCode::NO_CONTENT, headers).into_response()
        }
        Err(AuthError::MissingToken) => {
            (StatusCode::BAD_REQUEST, "Missing idToken".to_string()).into_response()
        }
        Err(AuthError::Issue(err)) => {
            error!("Failed to issue session: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(err) => {
            warn!("Rejected identity token: {err}");
            (StatusCode::UNAUTHORIZED, "Invalid identity token".to_string()).into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/auth/session",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "session"
)]
pub async fn delete(store: Extension<SessionStore>) -> impl IntoResponse {
    // Always clear the cookie, even if there was no session.
    let mut headers = HeaderMap::new();
    match store.delete_session() {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build clearing cookie: {err}"),
    }
    (StatusCode::NO_CONTENT, headers)
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "session"
)]
pub async fn status(headers: HeaderMap, store: Extension<SessionStore>) -> impl IntoResponse {
    match store.get_session(&headers) {
        SessionLookup::Valid(session) => {
            let response = SessionResponse {
                uid: session.uid,
                email: session.email,
                expires_at: session.expires_at,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        SessionLookup::Absent | SessionLookup::Invalid(_) => {
            debug!("No active session");
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect},
};
use tracing::error;

use crate::{guard::LOGIN_PATH, session::SessionStore};

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 303, description = "Session cleared, redirect to /login")
    ),
    tag = "session"
)]
pub async fn logout(store: Extension<SessionStore>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    match store.delete_session() {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build clearing cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    (headers, Redirect::to(LOGIN_PATH)).into_response()
}

//! Minimal pages behind the guard. The real site renders these elsewhere;
//! here they only prove what the guard let through.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{Html, IntoResponse},
};

use crate::session::Session;

#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login page", body = String, content_type = "text/html"),
        (status = 307, description = "Already signed in, redirect to /admin")
    ),
    tag = "pages"
)]
pub async fn login() -> impl IntoResponse {
    Html(
        "<!doctype html><title>Sign in</title><main><h1>Sign in</h1>\
         <p>Sign in with your company account to manage the site.</p></main>",
    )
}

#[utoipa::path(
    get,
    path = "/admin",
    responses(
        (status = 200, description = "Admin dashboard", body = String, content_type = "text/html"),
        (status = 307, description = "No session, redirect to /login")
    ),
    tag = "pages"
)]
pub async fn admin(session: Option<Extension<Session>>) -> impl IntoResponse {
    Html(dashboard("dashboard", session.as_deref()))
}

/// Any page under `/admin/`. Not part of the API document.
pub async fn admin_section(
    Path(rest): Path<String>,
    session: Option<Extension<Session>>,
) -> impl IntoResponse {
    Html(dashboard(&rest, session.as_deref()))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

fn dashboard(section: &str, session: Option<&Session>) -> String {
    let who = session
        .map(|session| session.email.as_deref().unwrap_or(&session.uid))
        .unwrap_or("developer");
    format!(
        "<!doctype html><title>Admin</title><main><h1>Admin: {}</h1><p>Signed in as {}</p>\
         <form method=\"post\" action=\"/api/auth/logout\"><button>Sign out</button></form></main>",
        escape(section),
        escape(who)
    )
}

fn escape(text: &str) -> String {
    text.chars()
        .fold(String::with_capacity(text.len()), |mut out, c| {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(c),
            }
            out
        })
}

use axum::response::IntoResponse;

// Public landing route; the guard never looks at it.
pub async fn root() -> impl IntoResponse {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

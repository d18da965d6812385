use axum::response::{IntoResponse, Json};
use serde_json::json;

// axum handler for the root route
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": format!("Welcome to the {} API", env!("CARGO_PKG_NAME")),
    }))
}

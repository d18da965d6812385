use crate::api::handlers::auth::{
    password, storage::find_user_by_email, types::TokenResponse, AuthState,
};
use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    /// The client sends the account email in the username field.
    username: String,
    password: String,
}

// One message for "no such account" and "wrong password": never reveal
// which half of the pair was wrong.
fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        "Incorrect username or password",
    )
        .into_response()
}

#[utoipa::path(
    post,
    path= "/auth/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Login successful, returns an access token", body = TokenResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Incorrect username or password"),
    ),
    tag= "auth"
)]
#[instrument(skip(pool, auth, payload))]
pub async fn login(
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if request.username.trim().is_empty() || request.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Username and password required".to_string(),
        )
            .into_response();
    }

    let email = request.username.trim().to_lowercase();

    let user = match find_user_by_email(&pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => return unauthorized(),
        Err(e) => {
            error!("Error looking up user: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error looking up user".to_string(),
            )
                .into_response();
        }
    };

    // Verification is CPU-bound; keep it off the async workers
    let plaintext = request.password.clone();
    let digest = user.hashed_password.clone();
    let verified =
        match tokio::task::spawn_blocking(move || password::verify_password(&plaintext, &digest))
            .await
        {
            Ok(verified) => verified,
            Err(e) => {
                error!("Password verification task failed: {:?}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error verifying password".to_string(),
                )
                    .into_response();
            }
        };

    if !verified {
        return unauthorized();
    }

    let access_token = match auth.issue_token(&user.email) {
        Ok(token) => token,
        Err(e) => {
            error!("Error issuing token: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error issuing token".to_string(),
            )
                .into_response();
        }
    };

    (StatusCode::OK, Json(TokenResponse::new(access_token, &user))).into_response()
}

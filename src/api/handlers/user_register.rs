use crate::api::handlers::{
    auth::{
        password,
        storage::{find_user_by_email, user_from_row, User, USER_COLUMNS},
        types::TokenResponse,
        AuthState,
    },
    valid_email, valid_username,
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{error, instrument, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Deserialize)]
pub struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    age: Option<i32>,
    weight: Option<i32>,
    height: Option<i32>,
    goal: Option<String>,
    diet: Option<String>,
    activity_level: Option<String>,
    health_conditions: Option<String>,
}

#[utoipa::path(
    post,
    path= "/auth/register",
    request_body = RegisterRequest,
    responses (
        (status = 200, description = "Registration successful, returns an access token", body = TokenResponse),
        (status = 400, description = "Invalid payload, or email/username already taken"),
    ),
    tag= "auth"
)]
#[instrument(skip(pool, auth, payload))]
pub async fn register(
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let email = request.email.trim().to_lowercase();

    // if not valid email, username or password return 400
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    if !valid_username(&request.username) {
        return (StatusCode::BAD_REQUEST, "Invalid username".to_string()).into_response();
    }

    if request.password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Password required".to_string()).into_response();
    }

    // check if email or username is already taken
    match find_user_by_email(&pool, &email).await {
        Ok(Some(_)) => {
            return (
                StatusCode::BAD_REQUEST,
                "Email already registered".to_string(),
            )
                .into_response();
        }
        Ok(None) => (),
        Err(e) => {
            error!("Error checking if user exists: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error checking if user exists".to_string(),
            )
                .into_response();
        }
    }

    match username_taken(&pool, &request.username).await {
        Ok(true) => {
            return (StatusCode::BAD_REQUEST, "Username already taken".to_string()).into_response();
        }
        Ok(false) => (),
        Err(e) => {
            error!("Error checking if user exists: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error checking if user exists".to_string(),
            )
                .into_response();
        }
    }

    // Hashing is CPU-bound; keep it off the async workers
    let plaintext = request.password.clone();
    let hashed_password =
        match tokio::task::spawn_blocking(move || password::hash_password(&plaintext)).await {
            Ok(Ok(digest)) => digest,
            Ok(Err(e)) => {
                error!("Error hashing password: {:?}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error hashing password".to_string(),
                )
                    .into_response();
            }
            Err(e) => {
                error!("Password hashing task failed: {:?}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error hashing password".to_string(),
                )
                    .into_response();
            }
        };

    let user = match insert_user(&pool, &request, &email, &hashed_password).await {
        Ok(user) => user,
        Err(e) => {
            error!("Error inserting user: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error inserting user".to_string(),
            )
                .into_response();
        }
    };

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

async fn username_taken(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
    let query = "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1) AS exists";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(row.get("exists"))
}

async fn insert_user(
    pool: &PgPool,
    request: &RegisterRequest,
    email: &str,
    hashed_password: &str,
) -> Result<User, sqlx::Error> {
    let query = format!(
        "INSERT INTO users \
            (id, email, username, hashed_password, age, weight, height, goal, diet, \
             activity_level, health_conditions) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {USER_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(&request.username)
        .bind(hashed_password)
        .bind(request.age)
        .bind(request.weight)
        .bind(request.height)
        .bind(&request.goal)
        .bind(&request.diet)
        .bind(&request.activity_level)
        .bind(&request.health_conditions)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(user_from_row(&row))
}

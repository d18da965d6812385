//! Authenticated self-service endpoints.
//!
//! Flow Overview:
//! 1) Authenticate via bearer token.
//! 2) Resolve the current user from the database.
//! 3) Apply allow-listed profile updates.

use crate::api::{
    handlers::auth::{
        require_auth,
        storage::{user_from_row, User, USER_COLUMNS},
        AuthState,
    },
    storage,
};
use crate::cli::globals::GlobalArgs;
use axum::{
    extract::{Extension, Multipart},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, instrument, Instrument};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub age: Option<i32>,
    pub weight: Option<i32>,
    pub height: Option<i32>,
    pub goal: Option<String>,
    pub diet: Option<String>,
    pub activity_level: Option<String>,
    pub health_conditions: Option<String>,
    pub profile_picture: Option<String>,
}

impl UserResponse {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            age: user.age,
            weight: user.weight,
            height: user.height,
            goal: user.goal.clone(),
            diet: user.diet.clone(),
            activity_level: user.activity_level.clone(),
            health_conditions: user.health_conditions.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserProfileUpdate {
    pub age: Option<i32>,
    pub weight: Option<i32>,
    pub height: Option<i32>,
    pub goal: Option<String>,
    pub diet: Option<String>,
    pub activity_level: Option<String>,
    pub health_conditions: Option<String>,
    pub profile_picture: Option<String>,
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Return the authenticated user profile", body = UserResponse),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "auth"
)]
pub async fn get_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    (StatusCode::OK, Json(UserResponse::from_user(&principal.user))).into_response()
}

#[utoipa::path(
    post,
    path = "/auth/update-profile",
    request_body = UserProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "auth"
)]
#[instrument(skip(headers, pool, auth, payload))]
pub async fn update_profile(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
    payload: Option<Json<UserProfileUpdate>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    let Some(Json(update)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match apply_profile_update(&pool, &principal.user, &update).await {
        Ok(user) => (StatusCode::OK, Json(UserResponse::from_user(&user))).into_response(),
        Err(e) => {
            error!("Error updating profile: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error updating profile".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/upload-profile-picture",
    responses(
        (status = 200, description = "Profile picture stored, returns its public URL"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Storage service not configured or unavailable"),
    ),
    tag = "auth"
)]
#[instrument(skip(headers, pool, auth, globals, multipart))]
pub async fn upload_profile_picture(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    multipart: Multipart,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    if !storage::is_configured(&globals) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Storage service not configured".to_string(),
        )
            .into_response();
    }

    let upload = match storage::read_upload(multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return (StatusCode::BAD_REQUEST, "Missing file".to_string()).into_response();
        }
        Err(e) => {
            error!("Error reading upload: {:?}", e);
            return (StatusCode::BAD_REQUEST, "Invalid upload".to_string()).into_response();
        }
    };

    let object_name = format!("profile_{}_{}", principal.user.id, upload.filename);

    let url = match storage::put_object(
        &globals,
        &object_name,
        upload.bytes,
        &upload.content_type,
    )
    .await
    {
        Ok(url) => url,
        Err(e) => {
            error!("Error storing profile picture: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Upload failed: {e}"),
            )
                .into_response();
        }
    };

    match set_profile_picture(&pool, &principal.user, &url).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "profile_picture": url }))).into_response(),
        Err(e) => {
            error!("Error saving profile picture URL: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error saving profile picture".to_string(),
            )
                .into_response()
        }
    }
}

// Only provided fields change; absent fields keep their stored value.
async fn apply_profile_update(
    pool: &PgPool,
    user: &User,
    update: &UserProfileUpdate,
) -> Result<User, sqlx::Error> {
    let query = format!(
        "UPDATE users SET \
            age = COALESCE($2, age), \
            weight = COALESCE($3, weight), \
            height = COALESCE($4, height), \
            goal = COALESCE($5, goal), \
            diet = COALESCE($6, diet), \
            activity_level = COALESCE($7, activity_level), \
            health_conditions = COALESCE($8, health_conditions), \
            profile_picture = COALESCE($9, profile_picture) \
         WHERE id = $1 \
         RETURNING {USER_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user.id)
        .bind(update.age)
        .bind(update.weight)
        .bind(update.height)
        .bind(&update.goal)
        .bind(&update.diet)
        .bind(&update.activity_level)
        .bind(&update.health_conditions)
        .bind(&update.profile_picture)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(user_from_row(&row))
}

async fn set_profile_picture(pool: &PgPool, user: &User, url: &str) -> Result<(), sqlx::Error> {
    let query = "UPDATE users SET profile_picture = $2 WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user.id)
        .bind(url)
        .execute(pool)
        .instrument(span)
        .await?;

    Ok(())
}

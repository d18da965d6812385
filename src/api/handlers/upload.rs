//! Meal photo upload and analysis.
//!
//! Flow Overview: store the image in the object store, ask the AI vision
//! service for a nutritional analysis, and write the analysis JSON next to
//! the image. A failed analysis degrades to a note; the upload itself still
//! succeeds.

use crate::api::{
    genai,
    handlers::auth::{require_auth, AuthState},
    storage,
};
use crate::cli::globals::GlobalArgs;
use axum::{
    extract::{Extension, Multipart},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, instrument, warn};
use utoipa::ToSchema;

const ANALYSIS_PROMPT: &str = "Analyze this meal image and return ONLY a valid JSON object \
    (no markdown, no code blocks, no extra text) with these exact keys: description (string), \
    calories (number), protein_g (number), carbs_g (number), fat_g (number), rating (number 1-10), \
    suggestion (string with health tip). Provide realistic estimates based on the visible food.";

#[derive(ToSchema, Serialize, Debug)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub analysis: Value,
}

#[utoipa::path(
    post,
    path = "/upload",
    responses(
        (status = 201, description = "Image stored and analyzed", body = UploadResponse),
        (status = 400, description = "Missing file"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Storage service not configured or unavailable"),
    ),
    tag = "upload"
)]
#[instrument(skip(headers, pool, auth, globals, multipart))]
pub async fn upload_image(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    multipart: Multipart,
) -> impl IntoResponse {
    if let Err(e) = require_auth(&headers, &pool, &auth).await {
        return e.into_response();
    }

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

    let url = match storage::put_object(
        &globals,
        &upload.filename,
        upload.bytes.clone(),
        &upload.content_type,
    )
    .await
    {
        Ok(url) => url,
        Err(e) => {
            error!("Upload failed: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Upload failed: {e}"),
            )
                .into_response();
        }
    };

    let analysis = analyze_meal(&globals, &upload).await;

    // Keep the analysis alongside the image; losing it is not fatal.
    match serde_json::to_vec(&analysis) {
        Ok(bytes) => {
            let analysis_object = format!("{}.analysis.json", upload.filename);
            if let Err(e) =
                storage::put_object(&globals, &analysis_object, bytes, "application/json").await
            {
                warn!("Failed to store analysis document: {:?}", e);
            }
        }
        Err(e) => {
            warn!("Failed to serialize analysis document: {:?}", e);
        }
    }

    let response = UploadResponse {
        url,
        filename: upload.filename,
        analysis,
    };

    (StatusCode::CREATED, Json(response)).into_response()
}

async fn analyze_meal(globals: &GlobalArgs, upload: &storage::Upload) -> Value {
    if !genai::is_configured(globals) {
        return json!({ "note": "Missing: AI service configuration" });
    }

    match genai::analyze_image(globals, ANALYSIS_PROMPT, &upload.bytes, &upload.content_type).await
    {
        Ok(text) => genai::extract_json(&text).unwrap_or_else(|| json!({ "text": text })),
        Err(e) => {
            warn!("AI analysis failed: {:?}", e);
            json!({ "note": format!("AI analysis failed: {e}") })
        }
    }
}

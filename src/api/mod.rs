use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod db;
pub mod genai;
pub mod handlers;
pub mod openapi;
pub mod storage;

use handlers::auth::{AuthConfig, AuthState};

// Meal photos routinely exceed axum's 2 MB default body limit.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, globals: GlobalArgs) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    db::ensure_schema(&pool)
        .await
        .context("Failed to create database schema")?;

    let auth_config = AuthConfig::new(globals.token_secret.clone())
        .with_token_ttl_minutes(globals.token_ttl_minutes);
    let auth_state = Arc::new(AuthState::new(&auth_config));

    // The mobile client is served from app schemes and local dev hosts.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::health::health))
        .route("/auth/register", post(handlers::user_register::register))
        .route("/auth/login", post(handlers::user_login::login))
        .route("/auth/me", get(handlers::me::get_me))
        .route("/auth/update-profile", post(handlers::me::update_profile))
        .route(
            "/auth/upload-profile-picture",
            post(handlers::me::upload_profile_picture),
        )
        .route(
            "/activity/track-activity",
            post(handlers::activity::track_activity),
        )
        .route("/activity/recent", get(handlers::activity::recent))
        .route(
            "/activity/meal-analysis",
            post(handlers::activity::save_meal_analysis),
        )
        .route(
            "/activity/meal-insights",
            get(handlers::activity::meal_insights),
        )
        .route("/activity/stats", get(handlers::activity::stats))
        .route("/plan/generate-plan", post(handlers::plan::generate_plan))
        .route("/plan/wellness-score", get(handlers::plan::wellness_score))
        .route(
            "/plan/generate-recipe",
            post(handlers::plan::generate_recipe),
        )
        .route("/upload", post(handlers::upload::upload_image))
        .route("/chat/message", post(handlers::chat::message))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(Extension(auth_state))
                .layer(Extension(globals))
                .layer(Extension(pool)),
        );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

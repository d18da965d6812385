//! OpenAPI document served through Swagger UI at `/docs`.
//!
//! Add new endpoints to `paths(...)` and their request/response types to
//! `components(...)` so they show up in the generated spec.

use utoipa::OpenApi;

use super::handlers::auth::types::TokenResponse;
use super::handlers::{activity, chat, health, me, plan, upload, user_login, user_register};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        user_register::register,
        user_login::login,
        me::get_me,
        me::update_profile,
        me::upload_profile_picture,
        activity::track_activity,
        activity::recent,
        activity::save_meal_analysis,
        activity::meal_insights,
        activity::stats,
        plan::generate_plan,
        plan::wellness_score,
        plan::generate_recipe,
        upload::upload_image,
        chat::message,
    ),
    components(schemas(
        health::Health,
        user_register::RegisterRequest,
        user_login::LoginRequest,
        TokenResponse,
        me::UserResponse,
        me::UserProfileUpdate,
        activity::ActivityCreate,
        activity::ActivityResponse,
        activity::MealAnalysisCreate,
        activity::MealAnalysisResponse,
        activity::ActivityStats,
        plan::MealDay,
        plan::WorkoutDay,
        plan::PlanResponse,
        plan::WellnessScore,
        plan::RecipeRequest,
        upload::UploadResponse,
        chat::ChatTurn,
        chat::ChatRequest,
        chat::ChatResponse,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Registration, login, and profile management"),
        (name = "activity", description = "Activity tracking and meal history"),
        (name = "plan", description = "Diet and workout plan generation"),
        (name = "upload", description = "Meal photo upload and analysis"),
        (name = "chat", description = "Health assistant chat"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_info_from_cargo() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_openapi_covers_all_routes() {
        let spec = ApiDoc::openapi();
        for path in [
            "/health",
            "/auth/register",
            "/auth/login",
            "/auth/me",
            "/auth/update-profile",
            "/auth/upload-profile-picture",
            "/activity/track-activity",
            "/activity/recent",
            "/activity/meal-analysis",
            "/activity/meal-insights",
            "/activity/stats",
            "/plan/generate-plan",
            "/plan/wellness-score",
            "/plan/generate-recipe",
            "/upload",
            "/chat/message",
        ] {
            assert!(
                spec.paths.paths.contains_key(path),
                "missing OpenAPI path: {path}"
            );
        }
    }
}

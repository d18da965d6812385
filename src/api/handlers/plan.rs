//! Diet and workout plan generation.
//!
//! Calorie targets come from the Mifflin-St Jeor equation plus an activity
//! multiplier and a goal adjustment. Plans are produced by the generative-AI
//! service when configured, with built-in Mediterranean/Tunisian plans as
//! the fallback.

use crate::api::{
    genai,
    handlers::auth::{require_auth, storage::User, AuthState},
};
use crate::cli::globals::GlobalArgs;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{error, instrument, warn, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

const CALORIE_DEFICIT_FOR_LOSS: i32 = 500;
const CALORIE_SURPLUS_FOR_GAIN: i32 = 300;

#[derive(ToSchema, Serialize, Debug, Clone)]
pub struct MealDay {
    pub day: u8,
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
}

#[derive(ToSchema, Serialize, Debug, Clone)]
pub struct WorkoutDay {
    pub day: u8,
    pub workout: String,
    pub duration: i32,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct PlanResponse {
    pub daily_calories: i32,
    pub bmr: i32,
    pub tdee: i32,
    pub goal: String,
    pub diet: String,
    pub meal_plan: Value,
    pub workout_routine: Value,
    pub tips: Value,
    pub ai_generated: bool,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct WellnessScore {
    pub wellness_score: u32,
    pub profile_complete: bool,
    pub recent_activities_count: usize,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct RecipeRequest {
    ingredients: String,
}

/// Basal Metabolic Rate, Mifflin-St Jeor equation.
fn calculate_bmr(weight: i32, height: i32, age: i32) -> f64 {
    10.0 * f64::from(weight) + 6.25 * f64::from(height) - 5.0 * f64::from(age) + 5.0
}

/// Total Daily Energy Expenditure from BMR and self-reported activity level.
#[allow(clippy::cast_possible_truncation)]
fn calculate_tdee(bmr: f64, activity_level: &str) -> i32 {
    let multiplier = match activity_level {
        "sedentary" => 1.2,
        "light" => 1.375,
        "very_active" => 1.725,
        "extra_active" => 1.9,
        _ => 1.55,
    };

    (bmr * multiplier) as i32
}

fn adjust_calories_for_goal(tdee: i32, goal: &str) -> i32 {
    match goal {
        "lose" => tdee - CALORIE_DEFICIT_FOR_LOSS,
        "gain" => tdee + CALORIE_SURPLUS_FOR_GAIN,
        _ => tdee,
    }
}

fn meal_day(day: u8, breakfast: &str, lunch: &str, dinner: &str) -> MealDay {
    MealDay {
        day,
        breakfast: breakfast.to_string(),
        lunch: lunch.to_string(),
        dinner: dinner.to_string(),
    }
}

fn workout_day(day: u8, workout: &str, duration: i32) -> WorkoutDay {
    WorkoutDay {
        day,
        workout: workout.to_string(),
        duration,
    }
}

fn fallback_meal_plan(diet: &str) -> Vec<MealDay> {
    match diet {
        "vegan" => vec![
            meal_day(1, "Harissa Shakshuka with chickpeas", "Couscous with roasted vegetables", "Tunisian lentil soup (Chorba)"),
            meal_day(2, "Olive oil flatbread with zaatar", "Stuffed peppers with quinoa", "Mechouia salad with chickpeas"),
            meal_day(3, "Tunisian chickpea stew", "Grilled eggplant with tahini", "Couscous with seven vegetables"),
            meal_day(4, "Whole grain msemen with honey", "Tunisian vegetable tajine", "Lentil salad with harissa dressing"),
            meal_day(5, "Fresh figs with almonds", "Brik with vegetables (no egg)", "White bean stew with harissa"),
            meal_day(6, "Tunisian chickpea soup", "Grilled vegetables with couscous", "Mechouia with olive oil"),
            meal_day(7, "Dates with nuts and mint tea", "Mediterranean veggie wrap", "Tunisian vegetable stew"),
        ],
        "keto" => vec![
            meal_day(1, "Tunisian brik with egg and tuna", "Grilled sea bass with harissa", "Lamb kebabs with mechouia"),
            meal_day(2, "Shakshuka with merguez", "Grilled sardines with olive oil", "Lamb tajine with vegetables"),
            meal_day(3, "Cheese omelette with harissa", "Grilled octopus salad", "Tunisian grilled chicken"),
            meal_day(4, "Brik with egg and harissa", "Sea bream with lemon", "Merguez with mechouia salad"),
            meal_day(5, "Poached eggs with olive oil", "Grilled prawns with garlic", "Lamb chops with herbs"),
            meal_day(6, "Tunisian egg tajine", "Grilled tuna steak", "Chicken with preserved lemon"),
            meal_day(7, "Shakshuka with merguez", "Mixed seafood grill", "Lamb kofta with salad"),
        ],
        _ => vec![
            meal_day(1, "Tunisian breakfast with olive oil and eggs", "Couscous with chicken and vegetables", "Grilled fish with mechouia salad"),
            meal_day(2, "Brik with egg and tuna", "Lamb tajine with prunes", "Tunisian chickpea soup"),
            meal_day(3, "Msemen with honey and almonds", "Grilled sea bass with couscous", "Vegetable tajine"),
            meal_day(4, "Shakshuka with bread", "Chicken with preserved lemon", "Tunisian salad with tuna"),
            meal_day(5, "Tunisian pastry with dates", "Couscous royal (mixed meats)", "Grilled sardines with salad"),
            meal_day(6, "Olive oil flatbread with harissa", "Fish tagine with vegetables", "Lentil soup with bread"),
            meal_day(7, "Fresh figs with yogurt", "Lamb couscous", "Grilled prawns with salad"),
        ],
    }
}

fn fallback_workout_routine(goal: &str) -> Vec<WorkoutDay> {
    match goal {
        "lose" => vec![
            workout_day(1, "Cardio - 30 min Running", 30),
            workout_day(2, "Strength Training - Full Body", 45),
            workout_day(3, "Cardio - 30 min Cycling", 30),
            workout_day(4, "Strength Training - Upper Body", 45),
            workout_day(5, "Cardio - 30 min Swimming", 30),
            workout_day(6, "Strength Training - Lower Body", 45),
            workout_day(7, "Active Rest - Yoga or Walking", 20),
        ],
        "gain" => vec![
            workout_day(1, "Strength Training - Chest & Triceps", 60),
            workout_day(2, "Strength Training - Back & Biceps", 60),
            workout_day(3, "Light Cardio - 20 min", 20),
            workout_day(4, "Strength Training - Legs", 60),
            workout_day(5, "Strength Training - Shoulders", 60),
            workout_day(6, "Light Cardio - 20 min", 20),
            workout_day(7, "Rest", 0),
        ],
        _ => vec![
            workout_day(1, "Full Body Strength Training", 45),
            workout_day(2, "Cardio - 25 min Running", 25),
            workout_day(3, "Full Body Strength Training", 45),
            workout_day(4, "Cardio - 25 min Cycling", 25),
            workout_day(5, "Full Body Strength Training", 45),
            workout_day(6, "Active Rest - Yoga", 30),
            workout_day(7, "Rest", 0),
        ],
    }
}

#[allow(clippy::cast_possible_truncation)]
fn plan_prompt(user: &User, daily_calories: i32, bmr: f64, tdee: i32) -> String {
    let goal = user.goal.as_deref().unwrap_or("maintain");
    let diet = user.diet.as_deref().unwrap_or("balanced");
    let activity_level = user.activity_level.as_deref().unwrap_or("moderate");
    let health_conditions = user
        .health_conditions
        .as_ref()
        .map(|conditions| format!("\n- Health conditions: {conditions}"))
        .unwrap_or_default();

    format!(
        r#"Generate a personalized 7-day Mediterranean/Tunisian fitness and nutrition plan for a user with the following profile:
- Age: {age}
- Weight: {weight} kg
- Height: {height} cm
- Goal: {goal}
- Diet preference: {diet}
- Activity level: {activity_level}
- Daily calorie target: {daily_calories} kcal
- BMR: {bmr} kcal
- TDEE: {tdee} kcal{health_conditions}

IMPORTANT: Focus on Mediterranean and Tunisian cuisine (couscous, tajine, brik, mechouia, harissa, olive oil, fish, etc.).
Keep meals HEALTHY and aligned with their goal.

Return ONLY a valid JSON object (no markdown, no code blocks) with this exact structure:
{{
  "meal_plan": [
    {{"day": 1, "breakfast": "meal name only", "lunch": "meal name only", "dinner": "meal name only"}},
    ... (7 days total)
  ],
  "workout_routine": [
    {{"day": 1, "workout": "...", "duration": 45}},
    ... (7 days total)
  ],
  "tips": ["tip1", "tip2", "tip3"]
}}

Just provide MEAL NAMES, not recipes or ingredients. Make it Mediterranean/Tunisian focused and healthy."#,
        age = user.age.unwrap_or_default(),
        weight = user.weight.unwrap_or_default(),
        height = user.height.unwrap_or_default(),
        bmr = bmr as i32,
    )
}

#[utoipa::path(
    post,
    path = "/plan/generate-plan",
    responses(
        (status = 200, description = "Personalized 7-day plan", body = PlanResponse),
        (status = 400, description = "Profile is missing age, weight, or height"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "plan"
)]
#[instrument(skip(headers, pool, auth, globals))]
pub async fn generate_plan(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };
    let user = principal.user;

    let (Some(age), Some(weight), Some(height)) = (user.age, user.weight, user.height) else {
        return (
            StatusCode::BAD_REQUEST,
            "Please complete your profile (age, weight, height) before generating a plan"
                .to_string(),
        )
            .into_response();
    };

    let bmr = calculate_bmr(weight, height, age);
    let tdee = calculate_tdee(bmr, user.activity_level.as_deref().unwrap_or("moderate"));
    let daily_calories = adjust_calories_for_goal(tdee, user.goal.as_deref().unwrap_or("maintain"));

    let goal = user.goal.clone().unwrap_or_else(|| "maintain".to_string());
    let diet = user.diet.clone().unwrap_or_else(|| "balanced".to_string());

    #[allow(clippy::cast_possible_truncation)]
    let mut response = PlanResponse {
        daily_calories,
        bmr: bmr as i32,
        tdee,
        goal,
        diet,
        meal_plan: Value::Null,
        workout_routine: Value::Null,
        tips: json!([]),
        ai_generated: false,
    };

    if genai::is_configured(&globals) {
        let prompt = plan_prompt(&user, daily_calories, bmr, tdee);
        match genai::generate_text(&globals, &prompt).await {
            Ok(text) => {
                if let Some(plan) = genai::extract_json(&text) {
                    response.meal_plan = plan.get("meal_plan").cloned().unwrap_or(json!([]));
                    response.workout_routine =
                        plan.get("workout_routine").cloned().unwrap_or(json!([]));
                    response.tips = plan.get("tips").cloned().unwrap_or(json!([]));
                    response.ai_generated = true;
                    return (StatusCode::OK, Json(response)).into_response();
                }
                warn!("AI plan response contained no JSON, using fallback plan");
            }
            Err(e) => {
                warn!("AI plan generation failed: {:?}", e);
            }
        }
    }

    // Static fallback keeps the endpoint useful without the AI service.
    response.meal_plan = json!(fallback_meal_plan(&response.diet));
    response.workout_routine = json!(fallback_workout_routine(&response.goal));
    response.tips = json!([]);

    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    get,
    path = "/plan/wellness-score",
    responses(
        (status = 200, description = "Wellness score from profile completeness and recent activity", body = WellnessScore),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "plan"
)]
pub async fn wellness_score(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };
    let user = principal.user;

    let recent_count = match recent_activity_count(&pool, user.id, 7).await {
        Ok(count) => count,
        Err(e) => {
            error!("Error counting recent activities: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error computing wellness score".to_string(),
            )
                .into_response();
        }
    };

    let mut score: u32 = 0;

    // Profile completeness (30 points)
    for complete in [
        user.age.is_some(),
        user.weight.is_some(),
        user.height.is_some(),
        user.goal.is_some(),
        user.diet.is_some(),
        user.activity_level.is_some(),
    ] {
        if complete {
            score += 5;
        }
    }
    let profile_complete = score >= 30;

    // Activity tracking (40 points)
    score += u32::try_from(recent_count).unwrap_or(0).saturating_mul(5).min(40);

    // Consistency bonus (30 points)
    score += match recent_count {
        count if count >= 5 => 30,
        count if count >= 3 => 20,
        count if count >= 1 => 10,
        _ => 0,
    };

    let response = WellnessScore {
        wellness_score: score.min(100),
        profile_complete,
        recent_activities_count: recent_count,
    };

    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/plan/generate-recipe",
    request_body = RecipeRequest,
    responses(
        (status = 200, description = "Generated recipe with nutrition estimates"),
        (status = 400, description = "No ingredients provided"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Recipe generation failed"),
    ),
    tag = "plan"
)]
#[instrument(skip(headers, pool, auth, globals, payload))]
pub async fn generate_recipe(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    payload: Option<Json<RecipeRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Please provide ingredients".to_string()).into_response();
    };

    if request.ingredients.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Please provide ingredients".to_string()).into_response();
    }

    if !genai::is_configured(&globals) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Recipe generation failed".to_string(),
        )
            .into_response();
    }

    let prompt = recipe_prompt(&principal.user, &request.ingredients);

    match genai::generate_text(&globals, &prompt).await {
        Ok(text) => match genai::extract_json(&text) {
            Some(recipe) => (StatusCode::OK, Json(recipe)).into_response(),
            None => {
                error!("Recipe response contained no JSON");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Recipe generation failed".to_string(),
                )
                    .into_response()
            }
        },
        Err(e) => {
            error!("Recipe generation failed: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Recipe generation failed".to_string(),
            )
                .into_response()
        }
    }
}

fn recipe_prompt(user: &User, ingredients: &str) -> String {
    let mut dietary_info = String::new();
    if let Some(diet) = &user.diet {
        dietary_info.push_str(&format!("\n- Diet preference: {diet}"));
    }
    if let Some(goal) = &user.goal {
        dietary_info.push_str(&format!("\n- Health goal: {goal}"));
    }
    if let Some(conditions) = &user.health_conditions {
        dietary_info.push_str(&format!("\n- Health conditions: {conditions}"));
    }

    format!(
        r#"Create a healthy Mediterranean/Tunisian recipe using these available ingredients:
{ingredients}
{dietary_info}

IMPORTANT Guidelines:
- Focus on Mediterranean/Tunisian cooking style (use harissa, olive oil, cumin, coriander, etc.)
- Make it HEALTHY and nutritious
- Keep it simple and realistic
- Estimate calories and macros

Return ONLY a valid JSON object (no markdown, no code blocks) with this structure:
{{
  "recipe_name": "...",
  "cuisine": "Mediterranean/Tunisian",
  "prep_time": "15 mins",
  "cook_time": "20 mins",
  "servings": 2,
  "ingredients": [
    "ingredient 1 with quantity",
    "ingredient 2 with quantity"
  ],
  "instructions": [
    "Step 1",
    "Step 2"
  ],
  "nutrition": {{
    "calories": 400,
    "protein_g": 25,
    "carbs_g": 35,
    "fat_g": 15
  }},
  "health_benefits": "Brief description of health benefits"
}}"#
    )
}

async fn recent_activity_count(
    pool: &PgPool,
    owner_id: Uuid,
    limit: i64,
) -> Result<usize, sqlx::Error> {
    let query = "SELECT count(*) AS count FROM \
         (SELECT 1 FROM activities WHERE owner_id = $1 LIMIT $2) AS recent";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(owner_id)
        .bind(limit)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    let count: i64 = row.get("count");
    Ok(usize::try_from(count).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmr_mifflin_st_jeor() {
        // 10*80 + 6.25*180 - 5*30 + 5 = 1780
        let bmr = calculate_bmr(80, 180, 30);
        assert!((bmr - 1780.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tdee_multipliers() {
        assert_eq!(calculate_tdee(1000.0, "sedentary"), 1200);
        assert_eq!(calculate_tdee(1000.0, "light"), 1375);
        assert_eq!(calculate_tdee(1000.0, "moderate"), 1550);
        assert_eq!(calculate_tdee(1000.0, "very_active"), 1725);
        assert_eq!(calculate_tdee(1000.0, "extra_active"), 1900);
        // unknown levels fall back to moderate
        assert_eq!(calculate_tdee(1000.0, "couch"), 1550);
    }

    #[test]
    fn test_goal_adjustment() {
        assert_eq!(adjust_calories_for_goal(2000, "lose"), 1500);
        assert_eq!(adjust_calories_for_goal(2000, "gain"), 2300);
        assert_eq!(adjust_calories_for_goal(2000, "maintain"), 2000);
        assert_eq!(adjust_calories_for_goal(2000, "anything-else"), 2000);
    }

    #[test]
    fn test_fallback_meal_plan_covers_a_week() {
        for diet in ["vegan", "keto", "balanced", "unknown"] {
            let plan = fallback_meal_plan(diet);
            assert_eq!(plan.len(), 7);
            for (index, day) in plan.iter().enumerate() {
                assert_eq!(usize::from(day.day), index + 1);
                assert!(!day.breakfast.is_empty());
                assert!(!day.lunch.is_empty());
                assert!(!day.dinner.is_empty());
            }
        }
    }

    #[test]
    fn test_fallback_workout_covers_a_week() {
        for goal in ["lose", "gain", "maintain", "unknown"] {
            let routine = fallback_workout_routine(goal);
            assert_eq!(routine.len(), 7);
        }
    }

    #[test]
    fn test_fallback_diets_differ() {
        let vegan = fallback_meal_plan("vegan");
        let keto = fallback_meal_plan("keto");
        assert_ne!(vegan[0].breakfast, keto[0].breakfast);

        // unknown diets get the balanced plan
        let balanced = fallback_meal_plan("balanced");
        let unknown = fallback_meal_plan("paleo");
        assert_eq!(balanced[0].breakfast, unknown[0].breakfast);
    }
}

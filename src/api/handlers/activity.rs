//! Activity tracking and meal-analysis history.

use crate::api::handlers::auth::{require_auth, AuthState};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{error, instrument, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

// Rough estimate: ~5-7 cal/min for moderate activity
const CALORIES_PER_MINUTE: i64 = 6;

#[derive(ToSchema, Deserialize, Debug)]
pub struct ActivityCreate {
    activity: String,
    duration: i32,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ActivityResponse {
    pub id: String,
    pub activity: String,
    pub duration: i32,
    pub date: DateTime<Utc>,
    pub owner_id: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct MealAnalysisCreate {
    image_uri: Option<String>,
    analysis: serde_json::Value,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct MealAnalysisResponse {
    pub id: String,
    pub image_uri: Option<String>,
    pub analysis_data: serde_json::Value,
    pub date: DateTime<Utc>,
    pub owner_id: String,
}

/// Weekly totals plus the current consecutive-day streak. Field names match
/// what the mobile client already renders.
#[derive(ToSchema, Serialize, Debug)]
pub struct ActivityStats {
    #[serde(rename = "totalMinutes")]
    pub total_minutes: i64,
    #[serde(rename = "totalActivities")]
    pub total_activities: usize,
    #[serde(rename = "caloriesBurned")]
    pub calories_burned: i64,
    pub streak: u32,
}

#[utoipa::path(
    post,
    path = "/activity/track-activity",
    request_body = ActivityCreate,
    responses(
        (status = 200, description = "Activity recorded", body = ActivityResponse),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "activity"
)]
#[instrument(skip(headers, pool, auth, payload))]
pub async fn track_activity(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
    payload: Option<Json<ActivityCreate>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    let Some(Json(activity)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if activity.activity.trim().is_empty() || activity.duration <= 0 {
        return (
            StatusCode::BAD_REQUEST,
            "Activity name and a positive duration are required".to_string(),
        )
            .into_response();
    }

    match insert_activity(&pool, principal.user.id, &activity).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Error inserting activity: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error inserting activity".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/activity/recent",
    responses(
        (status = 200, description = "Last 10 activities, newest first", body = [ActivityResponse]),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "activity"
)]
pub async fn recent(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    match recent_activities(&pool, principal.user.id, 10).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => {
            error!("Error fetching recent activities: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error fetching recent activities".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/activity/meal-analysis",
    request_body = MealAnalysisCreate,
    responses(
        (status = 200, description = "Meal analysis saved", body = MealAnalysisResponse),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "activity"
)]
#[instrument(skip(headers, pool, auth, payload))]
pub async fn save_meal_analysis(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
    payload: Option<Json<MealAnalysisCreate>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    let Some(Json(meal)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match insert_meal_analysis(&pool, principal.user.id, &meal).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Error inserting meal analysis: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error inserting meal analysis".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/activity/meal-insights",
    responses(
        (status = 200, description = "Last 20 meal analyses, newest first", body = [MealAnalysisResponse]),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "activity"
)]
pub async fn meal_insights(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    match recent_meal_analyses(&pool, principal.user.id, 20).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => {
            error!("Error fetching meal insights: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error fetching meal insights".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/activity/stats",
    responses(
        (status = 200, description = "Weekly activity totals and streak", body = ActivityStats),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "activity"
)]
pub async fn stats(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth).await {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    let week_ago = Utc::now() - Duration::days(7);
    let week = match activity_durations_since(&pool, principal.user.id, week_ago).await {
        Ok(durations) => durations,
        Err(e) => {
            error!("Error fetching weekly activities: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error computing stats".to_string(),
            )
                .into_response();
        }
    };

    let dates = match activity_dates_desc(&pool, principal.user.id).await {
        Ok(dates) => dates,
        Err(e) => {
            error!("Error fetching activity dates: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error computing stats".to_string(),
            )
                .into_response();
        }
    };

    let total_minutes: i64 = week.iter().map(|&d| i64::from(d)).sum();
    let stats = ActivityStats {
        total_minutes,
        total_activities: week.len(),
        calories_burned: total_minutes * CALORIES_PER_MINUTE,
        streak: streak_from_dates(&dates, Utc::now().date_naive()),
    };

    (StatusCode::OK, Json(stats)).into_response()
}

/// Count the run of activities on consecutive days ending today or
/// yesterday. `dates` must be sorted newest first; every entry on a counted
/// day contributes to the streak.
fn streak_from_dates(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut current = today;

    for &date in dates {
        let days_diff = (current - date).num_days();
        if days_diff == 0 || days_diff == 1 {
            if date < current {
                current = date;
            }
            streak += 1;
        } else {
            break;
        }
    }

    streak
}

async fn insert_activity(
    pool: &PgPool,
    owner_id: Uuid,
    activity: &ActivityCreate,
) -> Result<ActivityResponse, sqlx::Error> {
    let query = "INSERT INTO activities (id, activity, duration, owner_id) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, activity, duration, date, owner_id";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(Uuid::new_v4())
        .bind(&activity.activity)
        .bind(activity.duration)
        .bind(owner_id)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(activity_from_row(&row))
}

async fn recent_activities(
    pool: &PgPool,
    owner_id: Uuid,
    limit: i64,
) -> Result<Vec<ActivityResponse>, sqlx::Error> {
    let query = "SELECT id, activity, duration, date, owner_id FROM activities \
         WHERE owner_id = $1 ORDER BY date DESC LIMIT $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(owner_id)
        .bind(limit)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    Ok(rows.iter().map(activity_from_row).collect())
}

async fn activity_durations_since(
    pool: &PgPool,
    owner_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<i32>, sqlx::Error> {
    let query = "SELECT duration FROM activities WHERE owner_id = $1 AND date >= $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(owner_id)
        .bind(since)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    Ok(rows.iter().map(|row| row.get("duration")).collect())
}

async fn activity_dates_desc(pool: &PgPool, owner_id: Uuid) -> Result<Vec<NaiveDate>, sqlx::Error> {
    let query = "SELECT date FROM activities WHERE owner_id = $1 ORDER BY date DESC";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(owner_id)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let date: DateTime<Utc> = row.get("date");
            date.date_naive()
        })
        .collect())
}

async fn insert_meal_analysis(
    pool: &PgPool,
    owner_id: Uuid,
    meal: &MealAnalysisCreate,
) -> Result<MealAnalysisResponse, sqlx::Error> {
    let query = "INSERT INTO meal_analyses (id, image_uri, analysis_data, owner_id) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, image_uri, analysis_data, date, owner_id";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(Uuid::new_v4())
        .bind(&meal.image_uri)
        .bind(&meal.analysis)
        .bind(owner_id)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(meal_analysis_from_row(&row))
}

async fn recent_meal_analyses(
    pool: &PgPool,
    owner_id: Uuid,
    limit: i64,
) -> Result<Vec<MealAnalysisResponse>, sqlx::Error> {
    let query = "SELECT id, image_uri, analysis_data, date, owner_id FROM meal_analyses \
         WHERE owner_id = $1 ORDER BY date DESC LIMIT $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(owner_id)
        .bind(limit)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    Ok(rows.iter().map(meal_analysis_from_row).collect())
}

fn activity_from_row(row: &sqlx::postgres::PgRow) -> ActivityResponse {
    let id: Uuid = row.get("id");
    let owner_id: Uuid = row.get("owner_id");

    ActivityResponse {
        id: id.to_string(),
        activity: row.get("activity"),
        duration: row.get("duration"),
        date: row.get("date"),
        owner_id: owner_id.to_string(),
    }
}

fn meal_analysis_from_row(row: &sqlx::postgres::PgRow) -> MealAnalysisResponse {
    let id: Uuid = row.get("id");
    let owner_id: Uuid = row.get("owner_id");

    MealAnalysisResponse {
        id: id.to_string(),
        image_uri: row.get("image_uri"),
        analysis_data: row.get("analysis_data"),
        date: row.get("date"),
        owner_id: owner_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(ordinal: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, ordinal as u32).unwrap()
    }

    #[test]
    fn test_streak_empty() {
        assert_eq!(streak_from_dates(&[], day(10)), 0);
    }

    #[test]
    fn test_streak_counts_consecutive_days() {
        // today, yesterday, two days ago
        let dates = vec![day(10), day(9), day(8)];
        assert_eq!(streak_from_dates(&dates, day(10)), 3);
    }

    #[test]
    fn test_streak_counts_each_entry_on_a_day() {
        // two workouts today plus one yesterday
        let dates = vec![day(10), day(10), day(9)];
        assert_eq!(streak_from_dates(&dates, day(10)), 3);
    }

    #[test]
    fn test_streak_breaks_on_gap() {
        let dates = vec![day(10), day(9), day(6), day(5)];
        assert_eq!(streak_from_dates(&dates, day(10)), 2);
    }

    #[test]
    fn test_streak_starting_yesterday_still_counts() {
        let dates = vec![day(9), day(8)];
        assert_eq!(streak_from_dates(&dates, day(10)), 2);
    }

    #[test]
    fn test_streak_stale_history_is_zero() {
        let dates = vec![day(5), day(4)];
        assert_eq!(streak_from_dates(&dates, day(10)), 0);
    }

    #[test]
    fn test_stats_serializes_with_client_field_names() {
        let stats = ActivityStats {
            total_minutes: 90,
            total_activities: 3,
            calories_burned: 540,
            streak: 2,
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalMinutes"], 90);
        assert_eq!(json["totalActivities"], 3);
        assert_eq!(json["caloriesBurned"], 540);
        assert_eq!(json["streak"], 2);
    }
}

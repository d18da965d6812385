//! Database helpers shared by the auth flow.

use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// Persisted user record. Resolved once per request and owned by it; never
/// cached across requests.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub hashed_password: String,
    pub age: Option<i32>,
    pub weight: Option<i32>,
    pub height: Option<i32>,
    pub goal: Option<String>,
    pub diet: Option<String>,
    pub activity_level: Option<String>,
    pub health_conditions: Option<String>,
    pub profile_picture: Option<String>,
}

pub(crate) const USER_COLUMNS: &str = "id, email, username, hashed_password, age, weight, \
     height, goal, diet, activity_level, health_conditions, profile_picture";

pub(crate) fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        hashed_password: row.get("hashed_password"),
        age: row.get("age"),
        weight: row.get("weight"),
        height: row.get("height"),
        goal: row.get("goal"),
        diet: row.get("diet"),
        activity_level: row.get("activity_level"),
        health_conditions: row.get("health_conditions"),
        profile_picture: row.get("profile_picture"),
    }
}

/// Look up a user by email. This is the resolver's single persistence
/// contract.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );

    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    Ok(row.as_ref().map(user_from_row))
}

//! Schema bootstrap.
//!
//! Tables are created at startup when missing so a fresh database is usable
//! without a separate migration step. Statements are idempotent.

use sqlx::PgPool;
use tracing::Instrument;

const CREATE_USERS: &str = r"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        username TEXT NOT NULL UNIQUE,
        hashed_password TEXT NOT NULL,
        age INTEGER,
        weight INTEGER,
        height INTEGER,
        goal TEXT,
        diet TEXT,
        activity_level TEXT,
        health_conditions TEXT,
        profile_picture TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
";

const CREATE_ACTIVITIES: &str = r"
    CREATE TABLE IF NOT EXISTS activities (
        id UUID PRIMARY KEY,
        activity TEXT NOT NULL,
        duration INTEGER NOT NULL,
        date TIMESTAMPTZ NOT NULL DEFAULT now(),
        owner_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE
    )
";

const CREATE_MEAL_ANALYSES: &str = r"
    CREATE TABLE IF NOT EXISTS meal_analyses (
        id UUID PRIMARY KEY,
        image_uri TEXT,
        analysis_data JSONB NOT NULL,
        date TIMESTAMPTZ NOT NULL DEFAULT now(),
        owner_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE
    )
";

const CREATE_ACTIVITIES_OWNER_IDX: &str =
    "CREATE INDEX IF NOT EXISTS activities_owner_date_idx ON activities (owner_id, date DESC)";

const CREATE_MEAL_ANALYSES_OWNER_IDX: &str =
    "CREATE INDEX IF NOT EXISTS meal_analyses_owner_date_idx ON meal_analyses (owner_id, date DESC)";

/// Create tables and indexes when missing.
///
/// # Errors
///
/// Returns an error if any of the DDL statements fail.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for query in [
        CREATE_USERS,
        CREATE_ACTIVITIES,
        CREATE_MEAL_ANALYSES,
        CREATE_ACTIVITIES_OWNER_IDX,
        CREATE_MEAL_ANALYSES_OWNER_IDX,
    ] {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DDL",
            db.statement = query
        );
        sqlx::query(query).execute(pool).instrument(span).await?;
    }

    Ok(())
}

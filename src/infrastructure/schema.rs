//! `PostgreSQL` schema bootstrap.
//!
//! Statements are idempotent and run at every startup.

use sqlx::PgPool;

use super::StoreError;

const STATEMENTS: [&str; 7] = [
    "CREATE TABLE IF NOT EXISTS tasks (
        task_id BIGINT PRIMARY KEY,
        creator_username TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        status TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS task_id_high_water (
        singleton BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (singleton),
        last_task_id BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS engagement_likes (
        position BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL,
        task_id BIGINT NOT NULL,
        task_author TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS engagement_views (
        position BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL,
        task_id BIGINT NOT NULL,
        task_author TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_engagement_likes_task_id ON engagement_likes (task_id)",
    "CREATE INDEX IF NOT EXISTS idx_engagement_views_task_id ON engagement_views (task_id)",
    "CREATE TABLE IF NOT EXISTS ingest_cursors (
        topic TEXT PRIMARY KEY,
        position TEXT NOT NULL
    )",
];

/// Creates every table and index the stores need, if absent.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if a statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!(statements = STATEMENTS.len(), "database schema ensured");
    Ok(())
}

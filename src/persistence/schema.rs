//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` — safe to
//! re-run on every startup. Produces a convergent result.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS post (
    id          TEXT PRIMARY KEY NOT NULL,
    channel_id  TEXT NOT NULL,
    user_id     TEXT NOT NULL,
    create_at   TEXT NOT NULL,
    message     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_post_channel_create ON post(channel_id, create_at);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}

//! `SQLite` post-cache connection and schema bootstrap.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

use crate::{AppError, Result};

use super::schema;

/// Open the file-backed post cache, creating file and schema as needed.
///
/// # Errors
///
/// Returns `AppError::Db` if the connection or schema application fails,
/// or `AppError::Io` if the cache directory cannot be created.
pub async fn connect(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| AppError::Io(format!("failed to create cache dir: {err}")))?;
    }
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    schema::bootstrap_schema(&pool).await?;
    Ok(pool)
}

/// Open an in-memory post cache (tests).
///
/// # Errors
///
/// Returns `AppError::Db` if the connection or schema application fails.
pub async fn connect_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|err| AppError::Db(err.to_string()))?;
    let pool = SqlitePool::connect_with(options).await?;
    schema::bootstrap_schema(&pool).await?;
    Ok(pool)
}

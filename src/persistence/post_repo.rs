//! Post-cache repository.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::models::channel::ChannelId;
use crate::models::post::Post;
use crate::Result;

/// Repository wrapper around the `SQLite` post cache.
#[derive(Clone)]
pub struct PostRepo {
    pool: SqlitePool,
}

impl PostRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert a page of fetched posts.
    ///
    /// Re-fetching a channel replaces existing rows by post id, so the
    /// cache converges on the server's view.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the transaction fails.
    pub async fn upsert_posts(&self, posts: &[Post]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        for post in posts {
            sqlx::query(
                "INSERT OR REPLACE INTO post (id, channel_id, user_id, create_at, message) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&post.id)
            .bind(post.channel_id.as_str())
            .bind(&post.user_id)
            .bind(post.create_at)
            .bind(&post.message)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(posts.len() as u64)
    }

    /// Cached posts of a channel in ascending creation order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn posts_for_channel(&self, channel_id: &ChannelId, limit: u32) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            "SELECT id, channel_id, user_id, create_at, message FROM post \
             WHERE channel_id = ?1 ORDER BY create_at ASC LIMIT ?2",
        )
        .bind(channel_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            posts.push(Post {
                id: row.try_get("id")?,
                channel_id: ChannelId(row.try_get("channel_id")?),
                user_id: row.try_get("user_id")?,
                create_at: row.try_get("create_at")?,
                message: row.try_get("message")?,
            });
        }
        Ok(posts)
    }

    /// Number of cached posts for a channel.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count_for_channel(&self, channel_id: &ChannelId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post WHERE channel_id = ?1")
            .bind(channel_id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Creation time of the newest cached post in a channel, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn latest_post_at(&self, channel_id: &ChannelId) -> Result<Option<DateTime<Utc>>> {
        let latest: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(create_at) FROM post WHERE channel_id = ?1")
                .bind(channel_id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(latest)
    }
}

//! Post model for the local cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channel::ChannelId;

/// A single message fetched from the server and stored in the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Post {
    /// Server-assigned post identifier.
    pub id: String,
    /// Channel the post was made in.
    pub channel_id: ChannelId,
    /// Author's user identifier.
    pub user_id: String,
    /// Creation timestamp.
    pub create_at: DateTime<Utc>,
    /// Message body (markdown as sent).
    pub message: String,
}

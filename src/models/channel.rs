//! Channel and membership models consumed by the scheduler.
//!
//! Both are read-only inputs owned by the surrounding application; the
//! scheduler never mutates them.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque channel identifier assigned by the messaging server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    /// View the identifier as a plain string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Channel visibility class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// Public team channel.
    Open,
    /// Invite-only team channel.
    Private,
    /// One-to-one direct message.
    Direct,
    /// Multi-party direct message.
    Group,
}

impl ChannelType {
    /// Whether fetches for this channel class participate in jitter.
    ///
    /// Direct and group messages are dispatched immediately; only team
    /// channels desynchronize, since a new post there fans out to every
    /// member at once.
    #[must_use]
    pub fn jitters(self) -> bool {
        matches!(self, Self::Open | Self::Private)
    }
}

/// Channel summary as supplied by the application on every evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Channel {
    /// Server-assigned identifier.
    pub id: ChannelId,
    /// Visibility class.
    pub channel_type: ChannelType,
    /// Timestamp of the most recent post in the channel.
    pub last_post_at: DateTime<Utc>,
}

/// Per-user relation to a channel carrying unread/mention counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Membership {
    /// Channel this membership belongs to.
    pub channel_id: ChannelId,
    /// Root-level mentions of the user since the last view.
    pub mention_count_root: u64,
    /// Messages posted since the last view.
    pub unread_msg_count: u64,
    /// When the user last viewed the channel.
    pub last_viewed_at: DateTime<Utc>,
}

impl Membership {
    /// Whether the channel carries at least one mention.
    #[must_use]
    pub fn has_mention(&self) -> bool {
        self.mention_count_root > 0
    }

    /// Whether the channel carries unread messages.
    #[must_use]
    pub fn has_unread(&self) -> bool {
        self.unread_msg_count > 0
    }
}

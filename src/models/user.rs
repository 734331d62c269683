//! User profile model for the sidebar preload.

use serde::{Deserialize, Serialize};

/// Minimal user profile fetched during the one-time sidebar preload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct UserProfile {
    /// Server-assigned user identifier.
    pub id: String,
    /// Login/display handle.
    pub username: String,
}

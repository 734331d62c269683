//! Per-channel fetch outcome tracking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::channel::ChannelId;

/// Outcome of a channel post fetch.
///
/// A channel present in the request-status map under *any* value is never
/// re-enqueued for the remainder of the session; absence is the only state
/// that permits dispatch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// Fetch dispatched, response outstanding.
    Pending,
    /// Posts fetched and cached.
    Success,
    /// Fetch settled with an error.
    Failure,
}

/// Read-only snapshot of the request-status map handed to the scheduler.
pub type RequestStatusMap = HashMap<ChannelId, FetchStatus>;

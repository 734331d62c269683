//! Fire-and-forget telemetry for prefetch dispatch cycles.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Event category reported with every prefetch tracking event.
pub const TRACK_CATEGORY: &str = "performance";

/// Event name for the per-session prefetch summary.
pub const TRACK_EVENT: &str = "prefetch_cycle";

/// Per-bucket counts reported once per team session, on the first
/// dispatch cycle.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PrefetchStats {
    /// Engine instance identifier (one per team session).
    pub session_id: Uuid,
    /// Channels queued in the mention bucket.
    pub mention_count: usize,
    /// Channels queued in the unread bucket.
    pub unread_count: usize,
    /// Total unread channels supplied, queued or not.
    pub total_unread_channels: usize,
    /// Whether this was the very first preload of the application session.
    /// The first preload typically includes direct and group messages
    /// disproportionately.
    pub first_preload: bool,
}

/// Fire-and-forget event sink.
pub trait Tracker: Send + Sync {
    /// Emit one tracking event. Must not block or fail loudly.
    fn track(&self, stats: &PrefetchStats);
}

/// Tracker that emits events as structured log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracker;

impl Tracker for TracingTracker {
    fn track(&self, stats: &PrefetchStats) {
        let properties =
            serde_json::to_string(stats).unwrap_or_else(|_| String::from("{}"));
        info!(
            category = TRACK_CATEGORY,
            event = TRACK_EVENT,
            %properties,
            "telemetry event"
        );
    }
}

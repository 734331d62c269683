//! Unit tests for telemetry event shapes.

use channel_prewarm::telemetry::{PrefetchStats, TracingTracker, Tracker, TRACK_CATEGORY, TRACK_EVENT};
use uuid::Uuid;

fn stats() -> PrefetchStats {
    PrefetchStats {
        session_id: Uuid::nil(),
        mention_count: 2,
        unread_count: 5,
        total_unread_channels: 9,
        first_preload: true,
    }
}

/// The serialized event carries every counter under its snake_case key.
#[test]
fn stats_serialize_with_stable_keys() {
    let value = serde_json::to_value(stats()).expect("stats serialize");
    assert_eq!(value["mention_count"], 2);
    assert_eq!(value["unread_count"], 5);
    assert_eq!(value["total_unread_channels"], 9);
    assert_eq!(value["first_preload"], true);
}

/// Category and event names are stable identifiers consumed downstream.
#[test]
fn track_identifiers_are_stable() {
    assert_eq!(TRACK_CATEGORY, "performance");
    assert_eq!(TRACK_EVENT, "prefetch_cycle");
}

/// The tracing-backed tracker is fire-and-forget: emitting must not panic
/// even without a subscriber installed.
#[test]
fn tracing_tracker_never_panics() {
    TracingTracker.track(&stats());
}

//! Shared test helpers for scheduler integration tests.
//!
//! Provides a recording mock fetcher (optionally gated so tests control
//! when fetches settle), a counting profile loader, a recording tracker,
//! and snapshot/scheduler builders so individual test modules can focus
//! on behaviour rather than wiring.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Semaphore};

use channel_prewarm::models::channel::{Channel, ChannelId, ChannelType, Membership};
use channel_prewarm::models::status::RequestStatusMap;
use channel_prewarm::scheduler::{
    JitterSettings, PostFetcher, PrefetchScheduler, ProfileLoader, SchedulerSnapshot, WorkerPool,
};
use channel_prewarm::telemetry::{PrefetchStats, Tracker};
use channel_prewarm::{AppError, Result};

/// Recording `PostFetcher` double.
///
/// Every call is recorded (channel id plus the jitter it was handed) the
/// moment the fetch starts. A gated fetcher then blocks until the test
/// releases a permit, which is how tests pin fetches "in flight".
pub struct MockFetcher {
    calls: Mutex<Vec<(ChannelId, Option<Duration>)>>,
    gate: Option<Arc<Semaphore>>,
    fail_on: Vec<ChannelId>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockFetcher {
    /// Fetcher whose calls settle immediately.
    pub fn instant() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            gate: None,
            fail_on: Vec::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Fetcher that blocks each call until `gate` yields a permit.
    pub fn gated(gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            gate: Some(gate),
            fail_on: Vec::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Instant fetcher that fails for the given channel ids.
    pub fn failing_on(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            gate: None,
            fail_on: ids.iter().map(|id| ChannelId::from(*id)).collect(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Channel ids recorded so far, in start order.
    pub async fn recorded_ids(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|(id, _)| id.as_str().to_owned())
            .collect()
    }

    /// Raw recorded calls (id, jitter) in start order.
    pub async fn recorded_calls(&self) -> Vec<(ChannelId, Option<Duration>)> {
        self.calls.lock().await.clone()
    }

    /// Highest number of simultaneously in-flight fetches observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Block until at least `count` fetches have started.
    pub async fn wait_for_calls(&self, count: usize) {
        let deadline = Duration::from_secs(5);
        tokio::time::timeout(deadline, async {
            loop {
                if self.calls.lock().await.len() >= count {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for fetch calls");
    }
}

impl PostFetcher for MockFetcher {
    fn fetch_channel_posts(
        &self,
        channel_id: &ChannelId,
        jitter: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let channel_id = channel_id.clone();
        Box::pin(async move {
            self.calls.lock().await.push((channel_id.clone(), jitter));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate never closes").forget();
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail_on.contains(&channel_id) {
                return Err(AppError::Api(format!("injected failure for {channel_id}")));
            }
            Ok(())
        })
    }
}

/// Counting `ProfileLoader` double.
#[derive(Default)]
pub struct MockProfileLoader {
    calls: AtomicUsize,
}

impl MockProfileLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Block until the preload has run `count` times.
    pub async fn wait_for_calls(&self, count: usize) {
        let deadline = Duration::from_secs(5);
        tokio::time::timeout(deadline, async {
            loop {
                if self.call_count() >= count {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for profile preloads");
    }
}

impl ProfileLoader for MockProfileLoader {
    fn load_profiles_for_sidebar(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

/// Recording `Tracker` double.
#[derive(Default)]
pub struct RecordingTracker {
    events: std::sync::Mutex<Vec<PrefetchStats>>,
}

impl RecordingTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<PrefetchStats> {
        self.events.lock().expect("tracker lock").clone()
    }
}

impl Tracker for RecordingTracker {
    fn track(&self, stats: &PrefetchStats) {
        self.events.lock().expect("tracker lock").push(stats.clone());
    }
}

/// A channel whose last post is old enough that it never jitters.
pub fn stale_channel(id: &str, channel_type: ChannelType) -> Channel {
    Channel {
        id: ChannelId::from(id),
        channel_type,
        last_post_at: DateTime::UNIX_EPOCH,
    }
}

/// A channel whose last post is "now", i.e. jitter-eligible if its type is.
pub fn hot_channel(id: &str, channel_type: ChannelType) -> Channel {
    Channel {
        id: ChannelId::from(id),
        channel_type,
        last_post_at: Utc::now(),
    }
}

/// Membership entry for a channel with the given counters.
pub fn membership(id: &str, mentions: u64, unreads: u64) -> (ChannelId, Membership) {
    (
        ChannelId::from(id),
        Membership {
            channel_id: ChannelId::from(id),
            mention_count_root: mentions,
            unread_msg_count: unreads,
            last_viewed_at: DateTime::UNIX_EPOCH,
        },
    )
}

/// Assemble a snapshot from parts.
pub fn snapshot(
    current: Option<&str>,
    sidebar_loaded: bool,
    unread_channels: Vec<Channel>,
    memberships: HashMap<ChannelId, Membership>,
    request_status: RequestStatusMap,
) -> SchedulerSnapshot {
    SchedulerSnapshot {
        current_channel: current.map(ChannelId::from),
        sidebar_loaded,
        unread_channels,
        memberships,
        request_status,
    }
}

/// Default jitter settings matching the shipped configuration.
pub fn default_jitter() -> JitterSettings {
    JitterSettings {
        window: Duration::from_millis(1000),
        recency_threshold: Duration::from_millis(1000),
    }
}

/// Build an engine with concurrency 2 around the given doubles.
pub fn build_scheduler(
    fetcher: Arc<MockFetcher>,
    profiles: Arc<MockProfileLoader>,
    tracker: Arc<RecordingTracker>,
    preload_done: Arc<AtomicBool>,
) -> PrefetchScheduler {
    let pool = WorkerPool::new(2, default_jitter(), fetcher as Arc<dyn PostFetcher>);
    PrefetchScheduler::new(
        pool,
        profiles as Arc<dyn ProfileLoader>,
        tracker as Arc<dyn Tracker>,
        preload_done,
    )
}

/// Build an engine and its doubles in one call; returns everything the
/// common tests need.
pub fn standard_rig() -> (
    PrefetchScheduler,
    Arc<MockFetcher>,
    Arc<MockProfileLoader>,
    Arc<RecordingTracker>,
) {
    let fetcher = MockFetcher::instant();
    let profiles = MockProfileLoader::new();
    let tracker = RecordingTracker::new();
    let scheduler = build_scheduler(
        Arc::clone(&fetcher),
        Arc::clone(&profiles),
        Arc::clone(&tracker),
        Arc::new(AtomicBool::new(false)),
    );
    (scheduler, fetcher, profiles, tracker)
}

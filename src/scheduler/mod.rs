//! Prefetch scheduling core.
//!
//! [`priority`] computes the bucketed queue as a pure function of the
//! application's unread state; [`queue`] and [`pool`] turn it into paced,
//! bounded-concurrency fetch dispatch; [`engine`] holds the persistent
//! scheduler that diffs recomputed queues and decides what to enqueue.
//!
//! The [`PostFetcher`] and [`ProfileLoader`] traits are the scheduler's
//! only outward seams. The scheduler does not inspect fetch results beyond
//! treating a settled future as "slot freed", and it never owns retry
//! policy or the request-status map.

pub mod engine;
pub mod pool;
pub mod priority;
pub mod queue;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::models::channel::{Channel, ChannelId, Membership};
use crate::models::status::RequestStatusMap;
use crate::Result;

pub use engine::PrefetchScheduler;
pub use pool::WorkerPool;
pub use priority::{compute_priority_queue, Priority, PriorityQueue};
pub use queue::{needs_jitter, JitterSettings, Pacing, PrefetchTask, WorkQueue};

/// Initiates the actual network fetch of a channel's post history.
///
/// Implementations own the delay handed to them: they sleep for `jitter`
/// (if any) before issuing the request, mark the channel's request status
/// on start and settle, and write fetched posts wherever the application
/// keeps them. The scheduler only awaits completion.
pub trait PostFetcher: Send + Sync {
    /// Fetch the post history of `channel_id` after an optional delay.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the caller treats any settled future,
    /// `Ok` or `Err`, identically as "task done".
    fn fetch_channel_posts(
        &self,
        channel_id: &ChannelId,
        jitter: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// One-time sidebar profile preload collaborator.
pub trait ProfileLoader: Send + Sync {
    /// Load the user profiles the sidebar needs.
    ///
    /// # Errors
    ///
    /// Returns the underlying API error; the scheduler logs and ignores it.
    fn load_profiles_for_sidebar(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Inputs supplied by the surrounding application on every evaluation.
#[derive(Debug, Clone, Default)]
pub struct SchedulerSnapshot {
    /// Channel the user is actively viewing; `None` before first load.
    pub current_channel: Option<ChannelId>,
    /// Whether the channel list finished initial load for the active team.
    pub sidebar_loaded: bool,
    /// All channels with unread state for the current team.
    pub unread_channels: Vec<Channel>,
    /// Per-channel unread/mention counters.
    pub memberships: HashMap<ChannelId, Membership>,
    /// Channels already fetched or in flight. Read-only here; owned and
    /// mutated exclusively by the application state layer.
    pub request_status: RequestStatusMap,
}

impl SchedulerSnapshot {
    /// Whether both readiness conditions hold: a channel is open and the
    /// sidebar finished loading.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.sidebar_loaded && self.current_channel.is_some()
    }
}

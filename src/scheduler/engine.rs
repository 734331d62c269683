//! Persistent prefetch scheduler.
//!
//! The engine is constructed once per team session and fed a
//! [`SchedulerSnapshot`] on every change to the upstream unread state. All
//! queue bookkeeping here is synchronous; suspension happens only inside
//! the pool's spawned fetch tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::channel::{Channel, ChannelId};
use crate::telemetry::{PrefetchStats, Tracker};

use super::pool::WorkerPool;
use super::priority::{compute_priority_queue, Priority, PriorityQueue};
use super::queue::{PrefetchTask, WorkQueue};
use super::{ProfileLoader, SchedulerSnapshot};

/// Stateful scheduler deciding what to enqueue on each recomputation.
///
/// Owns its work queue and worker pool exclusively; no other component
/// mutates either. Reads, never writes, the request-status snapshot.
pub struct PrefetchScheduler {
    pool: WorkerPool,
    queue: Option<WorkQueue>,
    last_queue: Option<PriorityQueue>,
    last_current: Option<ChannelId>,
    was_ready: bool,
    stats_sent: bool,
    /// Session-scoped "a preload already happened" flag, owned by the
    /// context that constructs schedulers (one per team switch).
    preload_done: Arc<AtomicBool>,
    profiles: Arc<dyn ProfileLoader>,
    tracker: Arc<dyn Tracker>,
    session_id: Uuid,
}

impl PrefetchScheduler {
    /// Construct an engine around its collaborators.
    ///
    /// `preload_done` is shared across engines of one application session
    /// so telemetry can distinguish the very first preload, which usually
    /// includes direct/group messages disproportionately.
    #[must_use]
    pub fn new(
        pool: WorkerPool,
        profiles: Arc<dyn ProfileLoader>,
        tracker: Arc<dyn Tracker>,
        preload_done: Arc<AtomicBool>,
    ) -> Self {
        Self {
            pool,
            queue: None,
            last_queue: None,
            last_current: None,
            was_ready: false,
            stats_sent: false,
            preload_done,
            profiles,
            tracker,
            session_id: Uuid::new_v4(),
        }
    }

    /// Evaluate a fresh snapshot of the application's unread state.
    ///
    /// Recomputes the priority queue, and when it differs from the previous
    /// one discards queued-but-unstarted tasks and enqueues the new buckets
    /// in strict priority-then-insertion order, skipping every channel the
    /// request-status map already tracks. The currently open channel is
    /// enqueued first, with no delay, once per transition into it.
    ///
    /// Must be called from within a tokio runtime; dispatch itself never
    /// blocks this call.
    pub fn observe(&mut self, snapshot: &SchedulerSnapshot) {
        if !snapshot.ready() {
            self.was_ready = false;
            return;
        }
        let became_ready = !self.was_ready;
        self.was_ready = true;

        let queue = compute_priority_queue(
            snapshot.current_channel.as_ref(),
            &snapshot.unread_channels,
            &snapshot.memberships,
        );
        let queue_changed = self.last_queue.as_ref() != Some(&queue);
        let current_changed = self.last_current != snapshot.current_channel;

        if !became_ready && !queue_changed && !current_changed {
            return;
        }

        let rebuild = became_ready || queue_changed || self.queue.is_none();
        if rebuild {
            if let Some(old) = self.queue.take() {
                old.clear();
            }
            self.queue = Some(self.pool.begin_generation());
        }
        let Some(work) = self.queue.as_ref() else {
            return;
        };

        // The open channel always goes first, exactly once per transition
        // into it, and never with jitter.
        if became_ready || current_changed {
            if let Some(current) = snapshot.current_channel.clone() {
                debug!(channel_id = %current, "enqueueing current channel");
                work.enqueue(PrefetchTask::immediate(current.clone()));
                self.last_current = Some(current);
            }
        }

        if became_ready {
            self.spawn_profile_preload();
        }

        if rebuild {
            self.enqueue_buckets(&queue, snapshot);
        }

        if !self.stats_sent {
            self.stats_sent = true;
            self.report_stats(&queue, snapshot);
        }

        self.last_queue = Some(queue);
    }

    /// Clear the active generation and wait for in-flight fetches.
    pub async fn shutdown(mut self) {
        if let Some(queue) = self.queue.take() {
            queue.shutdown().await;
        }
        self.pool.drain().await;
        info!(session_id = %self.session_id, "prefetch scheduler drained");
    }

    fn enqueue_buckets(&self, queue: &PriorityQueue, snapshot: &SchedulerSnapshot) {
        let Some(work) = self.queue.as_ref() else {
            return;
        };
        let by_id: HashMap<&ChannelId, &Channel> = snapshot
            .unread_channels
            .iter()
            .map(|channel| (&channel.id, channel))
            .collect();

        let mut enqueued = 0usize;
        for channel_id in queue.iter_in_order() {
            if snapshot.request_status.contains_key(channel_id) {
                continue;
            }
            let Some(channel) = by_id.get(channel_id) else {
                continue;
            };
            work.enqueue(PrefetchTask::paced(channel));
            enqueued += 1;
        }
        debug!(
            mentions = queue.bucket(Priority::Mention).len(),
            unreads = queue.bucket(Priority::Unread).len(),
            enqueued,
            "work queue rebuilt"
        );
    }

    fn spawn_profile_preload(&self) {
        let profiles = Arc::clone(&self.profiles);
        tokio::spawn(async move {
            if let Err(err) = profiles.load_profiles_for_sidebar().await {
                warn!(%err, "sidebar profile preload failed");
            }
        });
    }

    fn report_stats(&self, queue: &PriorityQueue, snapshot: &SchedulerSnapshot) {
        let first_preload = !self.preload_done.swap(true, Ordering::SeqCst);
        self.tracker.track(&PrefetchStats {
            session_id: self.session_id,
            mention_count: queue.bucket(Priority::Mention).len(),
            unread_count: queue.bucket(Priority::Unread).len(),
            total_unread_channels: snapshot.unread_channels.len(),
            first_preload,
        });
    }
}

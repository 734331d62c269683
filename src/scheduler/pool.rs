//! Bounded-concurrency dispatcher for prefetch tasks.
//!
//! The pool owns a semaphore shared by every work-queue generation, so
//! clearing a generation never interrupts fetches already holding a slot.
//! Task start order is strict queue order bounded only by the permit count:
//! the dispatcher pulls one task at a time, waits for a slot, then spawns
//! the fetch.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use super::queue::{JitterSettings, PrefetchTask, WorkQueue};
use super::PostFetcher;

/// Bounded executor draining queued fetch tasks.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    concurrency: u32,
    fetcher: Arc<dyn PostFetcher>,
    jitter: JitterSettings,
}

impl WorkerPool {
    /// Create a pool admitting `concurrency` simultaneous fetches.
    #[must_use]
    pub fn new(concurrency: u32, jitter: JitterSettings, fetcher: Arc<dyn PostFetcher>) -> Self {
        let slots = usize::try_from(concurrency).unwrap_or(usize::MAX);
        Self {
            permits: Arc::new(Semaphore::new(slots)),
            concurrency,
            fetcher,
            jitter,
        }
    }

    /// Start a fresh work-queue generation feeding this pool.
    ///
    /// The previous generation, if any, should be cleared first; its
    /// in-flight fetches keep occupying slots until they settle.
    #[must_use]
    pub fn begin_generation(&self) -> WorkQueue {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let dispatcher = tokio::spawn(
            dispatch_loop(
                rx,
                cancel.clone(),
                Arc::clone(&self.permits),
                Arc::clone(&self.fetcher),
                self.jitter,
            )
            .instrument(info_span!("prefetch_dispatch")),
        );
        WorkQueue::new(tx, cancel, dispatcher)
    }

    /// Wait until every in-flight fetch has settled.
    ///
    /// Acquires the full permit count, so it resolves once the last slot is
    /// freed. Clear or shut down the active generation first, otherwise
    /// queued tasks keep competing for slots.
    pub async fn drain(&self) {
        let _all = self.permits.acquire_many(self.concurrency).await;
    }
}

/// Pull tasks in order, gate each on a pool slot, spawn the fetch.
async fn dispatch_loop(
    mut rx: mpsc::UnboundedReceiver<PrefetchTask>,
    cancel: CancellationToken,
    permits: Arc<Semaphore>,
    fetcher: Arc<dyn PostFetcher>,
    jitter: JitterSettings,
) {
    loop {
        let task = tokio::select! {
            () = cancel.cancelled() => break,
            task = rx.recv() => match task {
                Some(task) => task,
                None => break,
            },
        };

        // A task is "started" only once it holds a slot; cancellation while
        // waiting here drops it like any other queued task.
        let permit = tokio::select! {
            () = cancel.cancelled() => break,
            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let fetcher = Arc::clone(&fetcher);
        tokio::spawn(async move {
            let delay = task.jitter(Utc::now(), &jitter);
            debug!(channel_id = %task.channel_id, ?delay, "dispatching prefetch");
            // Success and failure free the slot identically; one channel's
            // failure never aborts its siblings.
            if let Err(err) = fetcher.fetch_channel_posts(&task.channel_id, delay).await {
                warn!(channel_id = %task.channel_id, %err, "prefetch fetch failed");
            }
            drop(permit);
        });
    }
    debug!("dispatcher exiting");
}

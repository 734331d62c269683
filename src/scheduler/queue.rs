//! Work-queue generations and dispatch pacing.
//!
//! A [`WorkQueue`] is one generation of deferred fetch tasks. The engine
//! discards the whole generation whenever the recomputed priority queue
//! differs from the previous one; [`WorkQueue::clear`] drops only tasks the
//! dispatcher has not started — fetches already in flight run to completion.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::PrefetchConfig;
use crate::models::channel::{Channel, ChannelId, ChannelType};

/// Jitter window and recency threshold for paced dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterSettings {
    /// Upper bound of the randomized delay.
    pub window: Duration,
    /// Channels whose last post is younger than this get jittered.
    pub recency_threshold: Duration,
}

impl From<&PrefetchConfig> for JitterSettings {
    fn from(config: &PrefetchConfig) -> Self {
        Self {
            window: Duration::from_millis(config.jitter_window_ms),
            recency_threshold: Duration::from_millis(config.recency_threshold_ms),
        }
    }
}

/// Dispatch pacing for a queued fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pacing {
    /// Dispatch with no delay. Used for the currently open channel.
    Immediate,
    /// Jitter-eligible: delayed when the channel is a team channel whose
    /// last post is recent enough that many clients likely saw it at once.
    Paced {
        /// Visibility class of the channel.
        channel_type: ChannelType,
        /// Timestamp of the channel's most recent post.
        last_post_at: DateTime<Utc>,
    },
}

/// One deferred fetch for a single channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchTask {
    /// Channel whose post history is fetched.
    pub channel_id: ChannelId,
    /// Dispatch pacing for this task.
    pub pacing: Pacing,
}

impl PrefetchTask {
    /// Task dispatched with no delay (the currently open channel).
    #[must_use]
    pub fn immediate(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            pacing: Pacing::Immediate,
        }
    }

    /// Jitter-eligible task built from an unread channel record.
    #[must_use]
    pub fn paced(channel: &Channel) -> Self {
        Self {
            channel_id: channel.id.clone(),
            pacing: Pacing::Paced {
                channel_type: channel.channel_type,
                last_post_at: channel.last_post_at,
            },
        }
    }

    /// Compute the dispatch delay for this task at run time.
    ///
    /// Returns a uniform draw from `[0, window)` when the task is paced,
    /// the channel is a team channel, and its last post falls within the
    /// recency threshold of `now`. Direct/group messages and immediate
    /// tasks never receive a delay.
    #[must_use]
    pub fn jitter(&self, now: DateTime<Utc>, settings: &JitterSettings) -> Option<Duration> {
        match &self.pacing {
            Pacing::Immediate => None,
            Pacing::Paced {
                channel_type,
                last_post_at,
            } => {
                if !needs_jitter(*channel_type, *last_post_at, now, settings) {
                    return None;
                }
                let window_ms = u64::try_from(settings.window.as_millis()).unwrap_or(u64::MAX);
                if window_ms == 0 {
                    return None;
                }
                let delay_ms = rand::thread_rng().gen_range(0..window_ms);
                Some(Duration::from_millis(delay_ms))
            }
        }
    }
}

/// Pure recency predicate behind the jitter decision.
///
/// True when the channel class desynchronizes (open/private) and the last
/// post landed within the recency threshold of `now`. A last-post timestamp
/// in the future counts as recent.
#[must_use]
pub fn needs_jitter(
    channel_type: ChannelType,
    last_post_at: DateTime<Utc>,
    now: DateTime<Utc>,
    settings: &JitterSettings,
) -> bool {
    if !channel_type.jitters() {
        return false;
    }
    let age = now.signed_duration_since(last_post_at);
    match age.to_std() {
        Ok(age) => age <= settings.recency_threshold,
        // Negative age: the post is newer than our clock says.
        Err(_) => true,
    }
}

/// One generation of queued fetch tasks feeding the worker pool.
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<PrefetchTask>,
    cancel: CancellationToken,
    /// Dispatcher task handle, taken on shutdown.
    dispatcher: Option<JoinHandle<()>>,
}

impl WorkQueue {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<PrefetchTask>,
        cancel: CancellationToken,
        dispatcher: JoinHandle<()>,
    ) -> Self {
        Self {
            tx,
            cancel,
            dispatcher: Some(dispatcher),
        }
    }

    /// Append a task to this generation.
    ///
    /// Returns `false` if the generation was already cleared and the
    /// dispatcher is gone; the task is silently dropped in that case.
    pub fn enqueue(&self, task: PrefetchTask) -> bool {
        self.tx.send(task).is_ok()
    }

    /// Drop every task the dispatcher has not started.
    ///
    /// Not preemptive: fetches already handed to the pool keep their slot
    /// and run to completion.
    pub fn clear(&self) {
        self.cancel.cancel();
    }

    /// Clear the generation and wait for its dispatcher to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(dispatcher) = self.dispatcher.take() {
            let _ = dispatcher.await;
        }
    }
}

impl Drop for WorkQueue {
    /// A dropped generation stops feeding the pool.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

//! Application-owned request-status store.
//!
//! The store is mutated only by the fetch path (pending on dispatch,
//! success/failure on settle). The scheduler consumes read-only
//! [`snapshot`](RequestStatusStore::snapshot)s and never clears entries;
//! a fresh store comes with a fresh application session.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::channel::ChannelId;
use crate::models::status::{FetchStatus, RequestStatusMap};

/// Shared per-channel fetch-outcome map.
#[derive(Clone, Default)]
pub struct RequestStatusStore {
    inner: Arc<Mutex<RequestStatusMap>>,
}

impl RequestStatusStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a fetch for `channel_id` was dispatched.
    pub async fn mark_pending(&self, channel_id: &ChannelId) {
        self.mark(channel_id, FetchStatus::Pending).await;
    }

    /// Record that the fetch for `channel_id` settled successfully.
    pub async fn mark_success(&self, channel_id: &ChannelId) {
        self.mark(channel_id, FetchStatus::Success).await;
    }

    /// Record that the fetch for `channel_id` settled with an error.
    pub async fn mark_failure(&self, channel_id: &ChannelId) {
        self.mark(channel_id, FetchStatus::Failure).await;
    }

    /// Current status of `channel_id`, if any fetch was ever dispatched.
    pub async fn status(&self, channel_id: &ChannelId) -> Option<FetchStatus> {
        self.inner.lock().await.get(channel_id).copied()
    }

    /// Clone the full map for a scheduler evaluation.
    pub async fn snapshot(&self) -> RequestStatusMap {
        self.inner.lock().await.clone()
    }

    async fn mark(&self, channel_id: &ChannelId, status: FetchStatus) {
        self.inner.lock().await.insert(channel_id.clone(), status);
    }
}

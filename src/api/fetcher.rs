//! Production fetch collaborators: network fetch into the local cache.
//!
//! `CachingPostFetcher` is the application-layer glue the scheduler
//! dispatches through. It owns the handed-down jitter delay, marks the
//! request-status store on dispatch and settle, and upserts fetched posts
//! into the `SQLite` cache. Retry and backoff are deliberately absent —
//! a failed channel stays marked `Failure` for the session.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::models::channel::ChannelId;
use crate::persistence::post_repo::PostRepo;
use crate::scheduler::{PostFetcher, ProfileLoader};
use crate::state::RequestStatusStore;
use crate::Result;

/// Fetcher that lands channel posts in the local post cache.
pub struct CachingPostFetcher {
    api: Arc<ApiClient>,
    posts: PostRepo,
    status: RequestStatusStore,
    team_id: String,
    posts_per_page: u32,
}

impl CachingPostFetcher {
    /// Wire the fetcher to its API client, cache, and status store.
    #[must_use]
    pub fn new(
        api: Arc<ApiClient>,
        posts: PostRepo,
        status: RequestStatusStore,
        team_id: String,
        posts_per_page: u32,
    ) -> Self {
        Self {
            api,
            posts,
            status,
            team_id,
            posts_per_page,
        }
    }

    async fn fetch_and_cache(&self, channel_id: ChannelId, jitter: Option<Duration>) -> Result<()> {
        self.status.mark_pending(&channel_id).await;

        if let Some(delay) = jitter {
            sleep(delay).await;
        }

        let outcome = match self.api.channel_posts(&channel_id, self.posts_per_page).await {
            Ok(posts) => self.posts.upsert_posts(&posts).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(cached) => {
                self.status.mark_success(&channel_id).await;
                debug!(channel_id = %channel_id, cached, "channel posts cached");
                Ok(())
            }
            Err(err) => {
                self.status.mark_failure(&channel_id).await;
                Err(err)
            }
        }
    }
}

impl PostFetcher for CachingPostFetcher {
    fn fetch_channel_posts(
        &self,
        channel_id: &ChannelId,
        jitter: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let channel_id = channel_id.clone();
        Box::pin(self.fetch_and_cache(channel_id, jitter))
    }
}

impl ProfileLoader for CachingPostFetcher {
    fn load_profiles_for_sidebar(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let profiles = self.api.team_profiles(&self.team_id, 200).await?;
            info!(count = profiles.len(), "sidebar profiles preloaded");
            Ok(())
        })
    }
}

//! REST client for the messaging server's v4 API.
//!
//! Wire DTOs carry millisecond epoch timestamps and single-letter channel
//! types; everything is mapped into domain models at this boundary so the
//! rest of the crate never sees the wire shapes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::channel::{Channel, ChannelId, ChannelType, Membership};
use crate::models::post::Post;
use crate::models::user::UserProfile;
use crate::{AppError, GlobalConfig, Result};

/// Bearer-token client for the messaging server.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Build a client from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Api` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: &GlobalConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("channel-prewarm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AppError::Api(format!("failed to build http client: {err}")))?;
        Ok(Self {
            http,
            base_url: config.server_url.clone(),
            token: config.api_token.clone(),
        })
    }

    /// Fetch the current user's channels and memberships for a team and
    /// reduce them to the scheduler's inputs: channels with unread state
    /// plus a membership map keyed by channel id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Api` if either request fails.
    pub async fn team_unread_state(
        &self,
        team_id: &str,
    ) -> Result<(Vec<Channel>, HashMap<ChannelId, Membership>)> {
        let channels: Vec<WireChannel> = self
            .get_json(&format!("/api/v4/users/me/teams/{team_id}/channels"))
            .await?;
        let members: Vec<WireMember> = self
            .get_json(&format!("/api/v4/users/me/teams/{team_id}/channels/members"))
            .await?;

        let members_by_channel: HashMap<&str, &WireMember> = members
            .iter()
            .map(|member| (member.channel_id.as_str(), member))
            .collect();

        let mut unread_channels = Vec::new();
        let mut memberships = HashMap::new();

        for wire in &channels {
            // Unknown channel types are excluded rather than guessed at.
            let Some(channel_type) = parse_channel_type(&wire.channel_type) else {
                continue;
            };
            let Some(member) = members_by_channel.get(wire.id.as_str()) else {
                continue;
            };
            let channel_id = ChannelId(wire.id.clone());
            let unread_msg_count = wire.total_msg_count.saturating_sub(member.msg_count);
            let membership = Membership {
                channel_id: channel_id.clone(),
                mention_count_root: member.mention_count_root,
                unread_msg_count,
                last_viewed_at: from_millis(member.last_viewed_at),
            };
            if membership.has_mention() || membership.has_unread() {
                unread_channels.push(Channel {
                    id: channel_id.clone(),
                    channel_type,
                    last_post_at: from_millis(wire.last_post_at),
                });
            }
            memberships.insert(channel_id, membership);
        }

        Ok((unread_channels, memberships))
    }

    /// Fetch one page of a channel's post history, newest page first,
    /// returned in the server's display order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Api` if the request fails.
    pub async fn channel_posts(&self, channel_id: &ChannelId, per_page: u32) -> Result<Vec<Post>> {
        let page: WirePostPage = self
            .get_json(&format!(
                "/api/v4/channels/{channel_id}/posts?page=0&per_page={per_page}"
            ))
            .await?;

        let mut posts = Vec::with_capacity(page.order.len());
        for post_id in &page.order {
            let Some(wire) = page.posts.get(post_id) else {
                continue;
            };
            posts.push(Post {
                id: wire.id.clone(),
                channel_id: ChannelId(wire.channel_id.clone()),
                user_id: wire.user_id.clone(),
                create_at: from_millis(wire.create_at),
                message: wire.message.clone(),
            });
        }
        Ok(posts)
    }

    /// Fetch the first page of team member profiles for the sidebar.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Api` if the request fails.
    pub async fn team_profiles(&self, team_id: &str, per_page: u32) -> Result<Vec<UserProfile>> {
        let users: Vec<WireUser> = self
            .get_json(&format!(
                "/api/v4/users?in_team={team_id}&page=0&per_page={per_page}"
            ))
            .await?;
        Ok(users
            .into_iter()
            .map(|user| UserProfile {
                id: user.id,
                username: user.username,
            })
            .collect())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()
            .map_err(|err| AppError::Api(format!("{path}: {err}")))?;
        Ok(response.json::<T>().await?)
    }
}

fn parse_channel_type(raw: &str) -> Option<ChannelType> {
    match raw {
        "O" => Some(ChannelType::Open),
        "P" => Some(ChannelType::Private),
        "D" => Some(ChannelType::Direct),
        "G" => Some(ChannelType::Group),
        _ => None,
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

#[derive(Debug, Deserialize)]
struct WireChannel {
    id: String,
    #[serde(rename = "type")]
    channel_type: String,
    last_post_at: i64,
    total_msg_count: u64,
}

#[derive(Debug, Deserialize)]
struct WireMember {
    channel_id: String,
    #[serde(default)]
    mention_count_root: u64,
    #[serde(default)]
    msg_count: u64,
    #[serde(default)]
    last_viewed_at: i64,
}

#[derive(Debug, Deserialize)]
struct WirePostPage {
    order: Vec<String>,
    posts: HashMap<String, WirePost>,
}

#[derive(Debug, Deserialize)]
struct WirePost {
    id: String,
    channel_id: String,
    user_id: String,
    create_at: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    username: String,
}

//! Messaging-server REST client and the production fetch collaborators.

pub mod client;
pub mod fetcher;

pub use client::ApiClient;
pub use fetcher::CachingPostFetcher;

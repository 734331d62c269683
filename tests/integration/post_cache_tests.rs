//! Post-cache persistence round trips against an in-memory database.

use chrono::{TimeDelta, Utc};

use channel_prewarm::models::channel::ChannelId;
use channel_prewarm::models::post::Post;
use channel_prewarm::persistence::{db, post_repo::PostRepo};

fn post(id: &str, channel: &str, minutes_ago: i64, message: &str) -> Post {
    Post {
        id: id.to_owned(),
        channel_id: ChannelId::from(channel),
        user_id: String::from("user-1"),
        create_at: Utc::now() - TimeDelta::minutes(minutes_ago),
        message: message.to_owned(),
    }
}

/// Upserted posts read back per channel in ascending creation order.
#[tokio::test]
async fn upsert_and_read_back_in_creation_order() {
    let pool = db::connect_memory().await.expect("in-memory cache opens");
    let repo = PostRepo::new(pool);

    let posts = vec![
        post("p2", "chan-a", 5, "second"),
        post("p1", "chan-a", 10, "first"),
        post("p3", "chan-b", 1, "other channel"),
    ];
    let written = repo.upsert_posts(&posts).await.expect("upsert succeeds");
    assert_eq!(written, 3);

    let cached = repo
        .posts_for_channel(&ChannelId::from("chan-a"), 60)
        .await
        .expect("read succeeds");
    let ids: Vec<&str> = cached.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2"], "ascending creation order");
}

/// Re-upserting an existing post replaces it instead of duplicating.
#[tokio::test]
async fn upsert_replaces_by_post_id() {
    let pool = db::connect_memory().await.expect("in-memory cache opens");
    let repo = PostRepo::new(pool);

    repo.upsert_posts(&[post("p1", "chan-a", 10, "original")])
        .await
        .expect("first upsert");
    repo.upsert_posts(&[post("p1", "chan-a", 10, "edited")])
        .await
        .expect("second upsert");

    assert_eq!(
        repo.count_for_channel(&ChannelId::from("chan-a"))
            .await
            .expect("count succeeds"),
        1
    );
    let cached = repo
        .posts_for_channel(&ChannelId::from("chan-a"), 60)
        .await
        .expect("read succeeds");
    assert_eq!(cached[0].message, "edited");
}

/// The newest cached timestamp is reported per channel, `None` when the
/// channel has no cached posts.
#[tokio::test]
async fn latest_post_at_tracks_the_newest_row() {
    let pool = db::connect_memory().await.expect("in-memory cache opens");
    let repo = PostRepo::new(pool);

    assert_eq!(
        repo.latest_post_at(&ChannelId::from("chan-a"))
            .await
            .expect("query succeeds"),
        None
    );

    let newest = post("p2", "chan-a", 1, "newest");
    let expected = newest.create_at;
    repo.upsert_posts(&[post("p1", "chan-a", 30, "older"), newest])
        .await
        .expect("upsert succeeds");

    let latest = repo
        .latest_post_at(&ChannelId::from("chan-a"))
        .await
        .expect("query succeeds")
        .expect("channel has cached posts");
    assert_eq!(latest, expected);
}

/// An empty upsert is a no-op, not an error.
#[tokio::test]
async fn empty_upsert_is_a_no_op() {
    let pool = db::connect_memory().await.expect("in-memory cache opens");
    let repo = PostRepo::new(pool);

    assert_eq!(repo.upsert_posts(&[]).await.expect("upsert succeeds"), 0);
    assert_eq!(
        repo.count_for_channel(&ChannelId::from("chan-a"))
            .await
            .expect("count succeeds"),
        0
    );
}

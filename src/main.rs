#![forbid(unsafe_code)]

//! `channel-prewarm` — headless channel prefetch daemon.
//!
//! Bootstraps configuration, opens the local post cache, and runs a poll
//! loop that feeds the prefetch scheduler a fresh snapshot of the team's
//! unread state every interval.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use channel_prewarm::api::{ApiClient, CachingPostFetcher};
use channel_prewarm::config::GlobalConfig;
use channel_prewarm::models::channel::{ChannelId, Membership};
use channel_prewarm::persistence::{db, post_repo::PostRepo};
use channel_prewarm::scheduler::{
    JitterSettings, PostFetcher, PrefetchScheduler, ProfileLoader, SchedulerSnapshot, WorkerPool,
};
use channel_prewarm::state::RequestStatusStore;
use channel_prewarm::telemetry::TracingTracker;
use channel_prewarm::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "channel-prewarm", about = "Headless channel prefetch daemon", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the post-cache database path.
    #[arg(long)]
    db: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("channel-prewarm daemon bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(db_path) = args.db {
        config.cache_path = db_path;
    }
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Open the post cache ─────────────────────────────
    let pool = db::connect(&config.cache_path).await?;
    let posts = PostRepo::new(pool);
    info!(path = %config.cache_path.display(), "post cache opened");

    // ── Wire the scheduler to its collaborators ─────────
    let api = Arc::new(ApiClient::new(&config)?);
    let status = RequestStatusStore::new();
    let fetcher = Arc::new(CachingPostFetcher::new(
        Arc::clone(&api),
        posts,
        status.clone(),
        config.team_id.clone(),
        config.prefetch.posts_per_page,
    ));
    let worker_pool = WorkerPool::new(
        config.prefetch.concurrency,
        JitterSettings::from(&config.prefetch),
        Arc::clone(&fetcher) as Arc<dyn PostFetcher>,
    );
    let scheduler = PrefetchScheduler::new(
        worker_pool,
        fetcher as Arc<dyn ProfileLoader>,
        Arc::new(TracingTracker),
        Arc::new(AtomicBool::new(false)),
    );

    // ── Poll loop ───────────────────────────────────────
    let ct = CancellationToken::new();
    let poll_ct = ct.clone();
    let poll_api = Arc::clone(&api);
    let poll_config = Arc::clone(&config);
    let poll_handle = tokio::spawn(poll_loop(
        scheduler,
        poll_api,
        status,
        poll_config,
        poll_ct,
    ));

    info!("prefetch daemon ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    // ── Graceful shutdown: drain in-flight fetches ──────
    match poll_handle.await {
        Ok(scheduler) => scheduler.shutdown().await,
        Err(err) => error!(%err, "poll loop panicked"),
    }
    info!("channel-prewarm shut down");

    Ok(())
}

/// Poll the server's unread state and feed the scheduler until cancelled.
///
/// Returns the scheduler so the caller can drain in-flight fetches.
async fn poll_loop(
    mut scheduler: PrefetchScheduler,
    api: Arc<ApiClient>,
    status: RequestStatusStore,
    config: Arc<GlobalConfig>,
    cancel: CancellationToken,
) -> PrefetchScheduler {
    let mut sidebar_loaded = false;
    let mut ticker = tokio::time::interval(Duration::from_secs(config.poll_interval_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match api.team_unread_state(&config.team_id).await {
            Ok((unread_channels, memberships)) => {
                // The first successful channel-list poll is the headless
                // equivalent of "the sidebar finished loading".
                sidebar_loaded = true;
                let snapshot = SchedulerSnapshot {
                    current_channel: current_channel(&memberships),
                    sidebar_loaded,
                    unread_channels,
                    memberships,
                    request_status: status.snapshot().await,
                };
                scheduler.observe(&snapshot);
            }
            Err(err) => {
                warn!(%err, "unread-state poll failed");
            }
        }
    }

    scheduler
}

/// Headless stand-in for the channel the user is viewing: the most
/// recently viewed channel wins.
fn current_channel(
    memberships: &std::collections::HashMap<ChannelId, Membership>,
) -> Option<ChannelId> {
    memberships
        .values()
        .max_by_key(|membership| membership.last_viewed_at)
        .map(|membership| membership.channel_id.clone())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}

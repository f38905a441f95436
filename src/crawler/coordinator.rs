//! Crawl coordinator - main crawl orchestration logic
//!
//! This module drives the two crawl cycles and owns the only writer to
//! the record store:
//! - Channel discovery (one-shot, cycle-fatal on failure)
//! - The room list cycle: one scanner task per valid channel
//! - The room detail cycle: one detail task per open room
//! - The draining loop that applies every queued result before a cycle
//!   reports completion

use crate::config::Config;
use crate::crawler::detail::crawl_room_detail;
use crate::crawler::discovery::discover_channels;
use crate::crawler::messages::CrawlMessage;
use crate::crawler::pool::TaskPool;
use crate::crawler::scanner::{scan_channel_rooms, TaskContext};
use crate::storage::{SqliteStorage, Storage};
use crate::LivetideError;
use chrono::Utc;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::timeout;

/// How long the draining loop waits for a message before re-checking
/// whether the pool has gone idle
const DRAIN_POLL: Duration = Duration::from_secs(1);

/// Counters describing one completed crawl cycle
#[derive(Debug, Clone, Default)]
pub struct CycleStats {
    /// Channels in the discovery response
    pub channels_discovered: usize,
    /// Channels whose room list scan finished
    pub channels_scanned: u64,
    /// Room list pages applied
    pub room_pages: u64,
    /// Rooms seen across all applied pages (overlapping rows included)
    pub rooms_listed: u64,
    /// Rooms refreshed by the detail cycle
    pub rooms_detailed: u64,
    /// Error messages drained from the queue plus failed applies
    pub errors: u64,
}

/// Main crawl coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: SqliteStorage,
    client: Client,
    site_id: i64,
}

impl Coordinator {
    /// Creates a new coordinator: opens storage, ensures the site row,
    /// and builds the shared HTTP client
    pub fn new(config: Config) -> crate::Result<Self> {
        let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        let site_id =
            storage.ensure_site(&config.site.code, &config.site.name, &config.site.url)?;
        let client = crate::api::build_http_client(&config.site)?;

        Ok(Self {
            config: Arc::new(config),
            storage,
            client,
            site_id,
        })
    }

    /// Coordinator over an already-open storage handle (for testing
    /// against an in-memory database)
    pub fn with_storage(config: Config, mut storage: SqliteStorage) -> crate::Result<Self> {
        let site_id =
            storage.ensure_site(&config.site.code, &config.site.name, &config.site.url)?;
        let client = crate::api::build_http_client(&config.site)?;
        Ok(Self {
            config: Arc::new(config),
            storage,
            client,
            site_id,
        })
    }

    /// Read access to the underlying storage
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Runs one full crawl: discovery, then the room list cycle, then the
    /// room detail cycle, strictly in that order
    pub async fn run_cycle(&mut self) -> crate::Result<CycleStats> {
        let started = std::time::Instant::now();
        let mut stats = CycleStats::default();

        stats.channels_discovered = discover_channels(
            &self.client,
            &self.config.site,
            self.site_id,
            &mut self.storage,
        )
        .await?;

        self.run_room_list_cycle(&mut stats).await?;
        self.run_room_detail_cycle(&mut stats).await?;

        tracing::info!(
            "cycle complete in {:?}: {} channels scanned, {} rooms listed, {} rooms detailed, {} errors",
            started.elapsed(),
            stats.channels_scanned,
            stats.rooms_listed,
            stats.rooms_detailed,
            stats.errors
        );
        Ok(stats)
    }

    /// Runs discovery and the room list scan, skipping detail refreshes
    pub async fn run_list_cycle(&mut self) -> crate::Result<CycleStats> {
        let mut stats = CycleStats::default();
        stats.channels_discovered = discover_channels(
            &self.client,
            &self.config.site,
            self.site_id,
            &mut self.storage,
        )
        .await?;
        self.run_room_list_cycle(&mut stats).await?;
        Ok(stats)
    }

    /// Runs only the room detail refresh, without rediscovering channels
    pub async fn run_detail_cycle(&mut self) -> crate::Result<CycleStats> {
        let mut stats = CycleStats::default();
        self.run_room_detail_cycle(&mut stats).await?;
        Ok(stats)
    }

    async fn run_room_list_cycle(&mut self, stats: &mut CycleStats) -> crate::Result<()> {
        let channels = self.storage.list_valid_channels(self.site_id)?;
        tracing::info!("room list cycle over {} valid channels", channels.len());

        let pool = TaskPool::new(self.config.crawler.concurrency);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctx = TaskContext::new(self.client.clone(), &self.config);

        for channel in channels {
            // Rooms no longer listed stay closed until contradicted by a
            // page that includes them.
            self.storage.mark_channel_rooms_closed(channel.id)?;

            let ctx = ctx.clone();
            let tx = tx.clone();
            let label = format!("scan channel {}", channel.office_id);
            pool.spawn(label, async move { scan_channel_rooms(ctx, channel, tx).await })
                .await;
        }
        drop(tx);

        self.drain(&pool, &mut rx, stats).await;
        Ok(())
    }

    async fn run_room_detail_cycle(&mut self, stats: &mut CycleStats) -> crate::Result<()> {
        let rooms = self.storage.list_open_rooms()?;
        tracing::info!("room detail cycle over {} open rooms", rooms.len());

        let pool = TaskPool::new(self.config.crawler.concurrency);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctx = TaskContext::new(self.client.clone(), &self.config);

        for room in rooms {
            let ctx = ctx.clone();
            let tx = tx.clone();
            let label = format!("room detail {}", room.office_id);
            pool.spawn(label, async move { crawl_room_detail(ctx, room, tx).await })
                .await;
        }
        drop(tx);

        self.drain(&pool, &mut rx, stats).await;
        Ok(())
    }

    /// Drains the result queue until the pool is idle and the queue is empty
    ///
    /// The dequeue uses a short timeout instead of a pure blocking wait so
    /// the idle condition is re-checked even when no message arrives; the
    /// loop exits within one poll interval of the last task finishing. A
    /// message that fails to apply is logged and skipped - every apply
    /// commits on its own, so earlier progress is never rolled back.
    async fn drain(
        &mut self,
        pool: &TaskPool,
        rx: &mut UnboundedReceiver<CrawlMessage>,
        stats: &mut CycleStats,
    ) {
        loop {
            match timeout(DRAIN_POLL, rx.recv()).await {
                Ok(Some(message)) => self.apply(message, stats),
                // Every sender dropped; nothing more can arrive.
                Ok(None) => break,
                Err(_elapsed) => {
                    if pool.is_idle() {
                        // The last task may have pushed between the
                        // timeout firing and the idle check.
                        while let Ok(message) = rx.try_recv() {
                            self.apply(message, stats);
                        }
                        break;
                    }
                    tracing::debug!("waiting for crawl results");
                }
            }
        }
    }

    /// Applies one drained message to the record store
    fn apply(&mut self, message: CrawlMessage, stats: &mut CycleStats) {
        let result = match message {
            CrawlMessage::RoomList { channel_id, rooms } => {
                stats.room_pages += 1;
                stats.rooms_listed += rooms.len() as u64;
                self.storage
                    .apply_room_page(channel_id, &rooms, Utc::now())
                    .map_err(LivetideError::from)
            }
            CrawlMessage::Channel {
                channel_id,
                room_total,
                room_range,
            } => {
                stats.channels_scanned += 1;
                self.storage
                    .apply_channel_counters(channel_id, room_total, room_range, Utc::now())
                    .map_err(LivetideError::from)
            }
            CrawlMessage::Room { update } => {
                match self.storage.apply_room_detail(&update, Utc::now()) {
                    Ok(true) => {
                        stats.rooms_detailed += 1;
                        Ok(())
                    }
                    Ok(false) => {
                        tracing::warn!(
                            "room {} vanished before its detail could be applied",
                            update.office_id
                        );
                        Ok(())
                    }
                    Err(e) => Err(LivetideError::from(e)),
                }
            }
            CrawlMessage::Error { subject, message } => {
                stats.errors += 1;
                tracing::error!("crawl error for {}: {}", subject, message);
                Ok(())
            }
        };

        if let Err(e) = result {
            stats.errors += 1;
            tracing::error!("failed to apply crawl result: {}", e);
        }
    }
}

/// Runs one complete crawl with a coordinator built from the config
pub async fn run_crawl(config: Config) -> crate::Result<CycleStats> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run_cycle().await
}

//! Storage trait and error types

use crate::storage::{
    ChannelRecord, ChannelUpsert, RoomDetailUpdate, RoomObserved, RoomRecord, SiteRecord,
    StorageCounts,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Each mutating operation is one transaction: a committed unit stays
/// committed regardless of what happens to later messages in the cycle.
pub trait Storage {
    // ===== Sites =====

    /// Inserts the site row if missing, refreshing name and url, and
    /// returns its id
    fn ensure_site(&mut self, code: &str, name: &str, url: &str) -> StorageResult<i64>;

    /// Gets a site by code
    fn get_site(&self, code: &str) -> StorageResult<Option<SiteRecord>>;

    // ===== Channels =====

    /// Applies a full channel discovery pass in a single transaction:
    /// marks every channel of the site invalid, upserts each entry with
    /// `valid = true` and refreshed attributes, and stamps the site's
    /// crawl date
    ///
    /// Returns the number of channels upserted.
    fn replace_channel_list(
        &mut self,
        site_id: i64,
        entries: &[ChannelUpsert],
        crawl_date: DateTime<Utc>,
    ) -> StorageResult<usize>;

    /// Lists channels with `valid = true` for a site
    fn list_valid_channels(&self, site_id: i64) -> StorageResult<Vec<ChannelRecord>>;

    /// Gets a channel by (site, office id)
    fn get_channel(&self, site_id: i64, office_id: &str) -> StorageResult<Option<ChannelRecord>>;

    /// Writes a channel's post-scan counters and appends a ChannelSnapshot,
    /// as one transaction
    fn apply_channel_counters(
        &mut self,
        channel_id: i64,
        room_total: i64,
        room_range: i64,
        crawl_date: DateTime<Utc>,
    ) -> StorageResult<()>;

    // ===== Rooms =====

    /// Marks every room currently linked to a channel as closed
    ///
    /// Returns the number of rooms affected.
    fn mark_channel_rooms_closed(&mut self, channel_id: i64) -> StorageResult<usize>;

    /// Applies one page of scanned rooms under a channel, as one
    /// transaction: upserts each room (`openstatus = true`, channel link
    /// reassigned to the reporting channel) and appends one RoomSnapshot
    /// per room
    fn apply_room_page(
        &mut self,
        channel_id: i64,
        rooms: &[RoomObserved],
        crawl_date: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Applies a room detail refresh plus its RoomSnapshot (including
    /// weight fields), as one transaction
    ///
    /// Returns false if the room no longer exists.
    fn apply_room_detail(
        &mut self,
        update: &RoomDetailUpdate,
        crawl_date: DateTime<Utc>,
    ) -> StorageResult<bool>;

    /// Lists rooms currently marked open, across all channels
    fn list_open_rooms(&self) -> StorageResult<Vec<RoomRecord>>;

    /// Gets a room by office id
    fn get_room(&self, office_id: &str) -> StorageResult<Option<RoomRecord>>;

    // ===== Statistics =====

    /// Entity and snapshot counts for the stats view
    fn counts(&self) -> StorageResult<StorageCounts>;

    /// Number of snapshots recorded for one room
    fn count_room_snapshots_for(&self, office_id: &str) -> StorageResult<u64>;

    /// Number of snapshots recorded for one channel
    fn count_channel_snapshots_for(&self, site_id: i64, office_id: &str) -> StorageResult<u64>;
}

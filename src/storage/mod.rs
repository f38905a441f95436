//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Channel and room upserts keyed by the platform's office ids
//! - Append-only snapshot history for trend tracking
//! - Commit-per-logical-unit transaction boundaries

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::LivetideError;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, LivetideError> {
    SqliteStorage::new(path)
}

/// Represents a crawled site
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub url: String,
    pub crawl_date: Option<DateTime<Utc>>,
}

/// Represents a channel (category) in the database
#[derive(Debug, Clone)]
pub struct ChannelRecord {
    pub id: i64,
    pub site_id: i64,
    pub office_id: String,
    pub name: String,
    pub code: String,
    pub url: String,
    pub image_url: String,
    pub icon_url: String,
    pub valid: bool,
    pub room_total: i64,
    pub room_range: i64,
    pub crawl_date: Option<DateTime<Utc>>,
}

/// Represents a room (broadcast) in the database
#[derive(Debug, Clone)]
pub struct RoomRecord {
    pub id: i64,
    pub channel_id: i64,
    pub office_id: String,
    pub name: String,
    pub url: String,
    pub image_url: String,
    pub owner_name: String,
    pub owner_uid: String,
    pub owner_avatar: String,
    pub spectators: i64,
    pub followers: i64,
    pub weight: Option<String>,
    pub weight_int: Option<i64>,
    pub openstatus: bool,
    pub crawl_date: Option<DateTime<Utc>>,
    pub start_time: Option<NaiveDateTime>,
}

/// Channel attributes refreshed by a discovery pass
#[derive(Debug, Clone)]
pub struct ChannelUpsert {
    pub office_id: String,
    pub name: String,
    pub code: String,
    pub url: String,
    pub image_url: String,
    pub icon_url: String,
}

/// One room as observed by the room list scan
///
/// `followers` is `None` when the page entry carried no fan count; the
/// room's stored value is left untouched in that case.
#[derive(Debug, Clone)]
pub struct RoomObserved {
    pub office_id: String,
    pub name: String,
    pub url: String,
    pub image_url: String,
    pub owner_name: String,
    pub owner_uid: String,
    pub owner_avatar: String,
    pub spectators: i64,
    pub followers: Option<i64>,
}

/// Fully normalized room state from the detail endpoint
#[derive(Debug, Clone)]
pub struct RoomDetailUpdate {
    pub office_id: String,
    pub name: String,
    pub image_url: String,
    pub owner_name: String,
    pub owner_avatar: String,
    pub spectators: i64,
    pub followers: i64,
    pub openstatus: bool,
    pub weight: String,
    pub weight_int: Option<i64>,
    pub start_time: NaiveDateTime,
}

/// Entity/snapshot counts for the stats view
#[derive(Debug, Clone, Default)]
pub struct StorageCounts {
    pub channels: u64,
    pub valid_channels: u64,
    pub rooms: u64,
    pub open_rooms: u64,
    pub channel_snapshots: u64,
    pub room_snapshots: u64,
}

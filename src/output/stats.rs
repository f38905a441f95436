//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! entity and snapshot counts from the storage layer.

use crate::storage::{Storage, StorageCounts};
use crate::LivetideError;
use chrono::{DateTime, Utc};

/// Database statistics summary
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    /// Entity and snapshot counts
    pub counts: StorageCounts,

    /// When the site's channel list was last refreshed
    pub last_crawl: Option<DateTime<Utc>>,
}

/// Loads statistics from storage
pub fn load_statistics(
    storage: &dyn Storage,
    site_code: &str,
) -> Result<DatabaseStats, LivetideError> {
    let counts = storage.counts()?;
    let last_crawl = storage.get_site(site_code)?.and_then(|site| site.crawl_date);

    Ok(DatabaseStats { counts, last_crawl })
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &DatabaseStats) {
    println!("=== Livetide Database Statistics ===\n");

    match stats.last_crawl {
        Some(when) => println!("Last channel discovery: {}", when.to_rfc3339()),
        None => println!("Last channel discovery: never"),
    }

    println!(
        "Channels: {} ({} valid)",
        stats.counts.channels, stats.counts.valid_channels
    );
    println!(
        "Rooms: {} ({} open)",
        stats.counts.rooms, stats.counts.open_rooms
    );
    println!("Channel snapshots: {}", stats.counts.channel_snapshots);
    println!("Room snapshots: {}", stats.counts.room_snapshots);
}

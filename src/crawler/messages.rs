//! Typed result messages for the crawl queue
//!
//! Worker tasks never touch the record store; everything they learn is
//! sent through the shared queue as one of these variants and applied by
//! the draining loop. The enum replaces an ambiguous tuple-tagged queue
//! with an exhaustively matched type.

use crate::storage::{RoomDetailUpdate, RoomObserved};

/// One result produced by a crawl task
#[derive(Debug)]
pub enum CrawlMessage {
    /// One page of rooms discovered under a channel by the list scan
    RoomList {
        channel_id: i64,
        rooms: Vec<RoomObserved>,
    },

    /// A channel's post-scan counters; always sent once per finished scan,
    /// even when the channel had zero rooms
    Channel {
        channel_id: i64,
        room_total: i64,
        room_range: i64,
    },

    /// A single room's refreshed detail
    Room { update: RoomDetailUpdate },

    /// A task-level failure, recorded for observability only
    Error { subject: String, message: String },
}

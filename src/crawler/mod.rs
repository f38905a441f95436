//! Crawl orchestration engine
//!
//! This module contains the concurrent crawl machinery:
//! - A bounded task pool that fans paginated, retry-prone API scans out
//!   across channels and rooms
//! - A typed result queue funneling every task's output back to a single
//!   aggregation point
//! - The pagination heuristic for the platform's room list endpoint
//! - Field normalization for room detail payloads

mod coordinator;
mod detail;
mod discovery;
mod messages;
mod normalize;
mod pool;
mod scanner;

pub use coordinator::{run_crawl, Coordinator, CycleStats};
pub use detail::crawl_room_detail;
pub use discovery::discover_channels;
pub use messages::CrawlMessage;
pub use normalize::{
    normalize_detail, observe_room, parse_followers, parse_start_time, parse_weight,
    NormalizeError,
};
pub use pool::TaskPool;
pub use scanner::{scan_channel_rooms, TaskContext};

//! Room list scanner
//!
//! One scan task per channel walks the paginated room list endpoint,
//! pushing each page into the result queue as it arrives and finishing
//! with the channel's updated counters.

use crate::api::{fetch_envelope, room_list_url, RoomEntry};
use crate::config::{Config, SiteConfig};
use crate::crawler::messages::CrawlMessage;
use crate::crawler::normalize::observe_room;
use crate::storage::ChannelRecord;
use crate::LivetideError;
use reqwest::Client;
use tokio::sync::mpsc::UnboundedSender;

/// Everything a spawned crawl task needs, passed explicitly at spawn time
#[derive(Clone)]
pub struct TaskContext {
    pub client: Client,
    pub site: SiteConfig,
    pub page_limit: usize,
    pub fetch_retries: usize,
}

impl TaskContext {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            site: config.site.clone(),
            page_limit: config.crawler.page_limit,
            fetch_retries: config.crawler.fetch_retries,
        }
    }
}

/// Scans every room list page of one channel
///
/// # Pagination
///
/// The endpoint's termination condition is a heuristic on page length `n`
/// versus the requested `limit`:
/// - `n == limit`: full page, advance by `limit`
/// - `n + 1 == limit`: the endpoint has a known off-by-one boundary where
///   a genuinely full page comes back one row short; advance by
///   `limit - 1` (re-fetching one overlapping row) instead of stopping
/// - anything shorter: final page, stop
///
/// On stop the channel's counters are computed against its previous total
/// and pushed as a `Channel` message, even if the channel had zero rooms.
pub async fn scan_channel_rooms(
    ctx: TaskContext,
    channel: ChannelRecord,
    queue: UnboundedSender<CrawlMessage>,
) -> crate::Result<()> {
    tracing::info!(
        "scanning rooms for channel {} ({})",
        channel.name,
        channel.office_id
    );

    let limit = ctx.page_limit;
    let mut offset = 0usize;
    let mut crawl_room_count: i64 = 0;

    loop {
        let rooms = fetch_page(&ctx, &channel, offset, limit, &queue).await?;
        let page_len = rooms.len();
        crawl_room_count += page_len as i64;

        let observed = rooms
            .iter()
            .map(|entry| observe_room(entry, &ctx.site.url))
            .collect();
        let _ = queue.send(CrawlMessage::RoomList {
            channel_id: channel.id,
            rooms: observed,
        });

        if page_len == limit {
            offset += limit;
        } else if page_len + 1 == limit {
            offset += limit - 1;
        } else {
            break;
        }
    }

    let _ = queue.send(CrawlMessage::Channel {
        channel_id: channel.id,
        room_total: crawl_room_count,
        room_range: crawl_room_count - channel.room_total,
    });

    tracing::info!(
        "finished scanning channel {} ({}): {} rooms",
        channel.name,
        channel.office_id,
        crawl_room_count
    );
    Ok(())
}

/// Fetches one page, retrying each failure independently
///
/// Transport failures, bad statuses, parse failures, and application
/// error codes are all logged and retried the same way. Exhausting the
/// attempts pushes an `Error` message and fails the task.
async fn fetch_page(
    ctx: &TaskContext,
    channel: &ChannelRecord,
    offset: usize,
    limit: usize,
    queue: &UnboundedSender<CrawlMessage>,
) -> crate::Result<Vec<RoomEntry>> {
    let url = room_list_url(&ctx.site, &channel.office_id, offset, limit);

    for attempt in 1..=ctx.fetch_retries {
        match fetch_envelope::<Vec<RoomEntry>>(&ctx.client, &url).await {
            Ok(rooms) => return Ok(rooms),
            Err(e) => {
                tracing::warn!(
                    "attempt {}/{} failed for {}: {}",
                    attempt,
                    ctx.fetch_retries,
                    url,
                    e
                );
            }
        }
    }

    let message = format!(
        "room list scan exceeded {} attempts for channel {} ({})",
        ctx.fetch_retries, channel.name, channel.office_id
    );
    tracing::error!("{}", message);
    let _ = queue.send(CrawlMessage::Error {
        subject: format!("channel {}", channel.office_id),
        message: message.clone(),
    });
    Err(LivetideError::TaskFailed(message))
}

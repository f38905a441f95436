//! Room detail crawler
//!
//! One task per currently open room refreshes the room's live attributes
//! from the detail endpoint. A single fetch, no retry loop: a room that
//! fails stays stale until the next cycle.

use crate::api::{fetch_envelope, room_detail_url, RoomDetail};
use crate::crawler::messages::CrawlMessage;
use crate::crawler::normalize::normalize_detail;
use crate::crawler::scanner::TaskContext;
use crate::storage::RoomRecord;
use tokio::sync::mpsc::UnboundedSender;

/// Fetches and normalizes one room's detail
pub async fn crawl_room_detail(
    ctx: TaskContext,
    room: RoomRecord,
    queue: UnboundedSender<CrawlMessage>,
) -> crate::Result<()> {
    let url = room_detail_url(&ctx.site, &room.office_id);
    tracing::debug!("fetching room detail: {}", url);

    let detail: RoomDetail = match fetch_envelope(&ctx.client, &url).await {
        Ok(detail) => detail,
        Err(e) => {
            let message = format!("room detail fetch failed for {}: {}", room.office_id, e);
            tracing::error!("{}", message);
            let _ = queue.send(CrawlMessage::Error {
                subject: format!("room {}", room.office_id),
                message,
            });
            return Err(e.into());
        }
    };

    let update = match normalize_detail(&room.office_id, &detail) {
        Ok(update) => update,
        Err(e) => {
            let message = format!("room detail rejected for {}: {}", room.office_id, e);
            tracing::error!("{}", message);
            let _ = queue.send(CrawlMessage::Error {
                subject: format!("room {}", room.office_id),
                message,
            });
            return Err(e.into());
        }
    };

    let _ = queue.send(CrawlMessage::Room { update });
    Ok(())
}

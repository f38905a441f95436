//! Channel discovery
//!
//! One-shot fetch of the full channel list. There is no retry and no
//! partial success here: the channel set is small and everything
//! downstream depends on it, so any failure propagates and fails the
//! whole cycle.

use crate::api::{fetch_envelope, ChannelEntry};
use crate::config::SiteConfig;
use crate::storage::{ChannelUpsert, Storage};
use chrono::Utc;
use reqwest::Client;

/// Fetches the channel list and replaces the site's channel set
///
/// Channels absent from the response are left invalid (soft delete);
/// every channel present is re-validated with refreshed attributes. The
/// whole pass commits as one unit, including the site's crawl timestamp.
///
/// Returns the number of channels in the response.
pub async fn discover_channels(
    client: &Client,
    site: &SiteConfig,
    site_id: i64,
    storage: &mut dyn Storage,
) -> crate::Result<usize> {
    tracing::info!("fetching channel list: {}", site.channel_list_url);

    let entries: Vec<ChannelEntry> = fetch_envelope(client, &site.channel_list_url).await?;

    let upserts: Vec<ChannelUpsert> = entries
        .iter()
        .map(|entry| ChannelUpsert {
            office_id: entry.cate_id.clone(),
            name: entry.game_name.clone(),
            code: entry.short_name.clone(),
            url: entry.game_url.clone(),
            image_url: entry.game_src.clone(),
            icon_url: entry.game_icon.clone(),
        })
        .collect();

    let count = storage.replace_channel_list(site_id, &upserts, Utc::now())?;
    tracing::info!("channel discovery updated {} channels", count);

    Ok(count)
}

//! Field normalization for platform payloads
//!
//! The platform reports numbers as strings with quirks: follower counts
//! may be placeholder text, the owner "weight" score carries a unit
//! suffix, and the stream start time is a fixed local-time format.

use crate::api::{RoomDetail, RoomEntry};
use crate::storage::{RoomDetailUpdate, RoomObserved};
use chrono::NaiveDateTime;
use thiserror::Error;
use url::Url;

const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Sentinel value the detail endpoint uses for a currently live room
const LIVE_STATUS: &str = "1";

/// Normalization failures that fail the producing task
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("unparseable start time '{value}': {source}")]
    StartTime {
        value: String,
        source: chrono::format::ParseError,
    },
}

/// Parses a follower count from a numeric-looking string
///
/// Placeholder text like "N/A" normalizes to 0 rather than failing.
pub fn parse_followers(raw: &str) -> i64 {
    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        raw.parse().unwrap_or(0)
    } else {
        0
    }
}

/// Converts a weight string with a unit suffix into grams
///
/// `t` is a metric ton, `kg` a kilogram, `g` a bare gram count. An
/// unrecognized suffix (or a malformed number) yields `None`; no default
/// unit is guessed.
pub fn parse_weight(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Some(tons) = raw.strip_suffix('t') {
        tons.parse::<f64>().ok().map(|v| (v * 1_000_000.0) as i64)
    } else if let Some(kilos) = raw.strip_suffix("kg") {
        kilos.parse::<f64>().ok().map(|v| (v * 1_000.0) as i64)
    } else if let Some(grams) = raw.strip_suffix('g') {
        grams.parse::<i64>().ok()
    } else {
        None
    }
}

/// Parses the stream start time; malformed input is a hard failure
pub fn parse_start_time(raw: &str) -> Result<NaiveDateTime, NormalizeError> {
    NaiveDateTime::parse_from_str(raw, START_TIME_FORMAT).map_err(|source| {
        NormalizeError::StartTime {
            value: raw.to_string(),
            source,
        }
    })
}

/// Converts one room list entry into its observed form
///
/// When the entry carries a `fans` field its `url` is site-relative and
/// must be resolved against the site base; otherwise the url is absolute
/// and the stored follower count is left untouched.
pub fn observe_room(entry: &RoomEntry, site_url: &str) -> RoomObserved {
    let (followers, url) = match &entry.fans {
        Some(fans) => {
            let resolved = Url::parse(site_url)
                .and_then(|base| base.join(&entry.url))
                .map(String::from)
                .unwrap_or_else(|_| entry.url.clone());
            (Some(parse_followers(fans)), resolved)
        }
        None => (None, entry.url.clone()),
    };

    RoomObserved {
        office_id: entry.room_id.clone(),
        name: entry.room_name.clone(),
        url,
        image_url: entry.room_src.clone(),
        owner_name: entry.nickname.clone(),
        owner_uid: entry.owner_uid.clone(),
        owner_avatar: entry.avatar.clone(),
        spectators: entry.online,
        followers,
    }
}

/// Normalizes a room detail payload into a storable update
pub fn normalize_detail(
    office_id: &str,
    detail: &RoomDetail,
) -> Result<RoomDetailUpdate, NormalizeError> {
    let weight_int = parse_weight(&detail.owner_weight);
    if weight_int.is_none() {
        tracing::warn!(
            "unrecognized weight '{}' for room {}, leaving weight_int unset",
            detail.owner_weight,
            office_id
        );
    }

    Ok(RoomDetailUpdate {
        office_id: office_id.to_string(),
        name: detail.room_name.clone(),
        image_url: detail.room_thumb.clone(),
        owner_name: detail.owner_name.clone(),
        owner_avatar: detail.avatar.clone(),
        spectators: detail.online,
        followers: parse_followers(&detail.fans_num),
        openstatus: detail.room_status == LIVE_STATUS,
        weight: detail.owner_weight.clone(),
        weight_int,
        start_time: parse_start_time(&detail.start_time)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fans: Option<&str>, url: &str) -> RoomEntry {
        serde_json::from_value(serde_json::json!({
            "room_id": "90001",
            "room_name": "hello",
            "room_src": "s.png",
            "nickname": "owner",
            "owner_uid": "7",
            "avatar": "a.png",
            "online": 321,
            "fans": fans,
            "url": url,
        }))
        .unwrap()
    }

    fn detail(weight: &str, fans_num: &str, start_time: &str) -> RoomDetail {
        serde_json::from_value(serde_json::json!({
            "room_name": "hello",
            "room_thumb": "t.png",
            "owner_name": "owner",
            "avatar": "a.png",
            "online": 55,
            "room_status": "1",
            "fans_num": fans_num,
            "owner_weight": weight,
            "start_time": start_time,
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_followers_numeric() {
        assert_eq!(parse_followers("1234"), 1234);
    }

    #[test]
    fn test_parse_followers_non_numeric() {
        assert_eq!(parse_followers("N/A"), 0);
        assert_eq!(parse_followers(""), 0);
        assert_eq!(parse_followers("12.5"), 0);
    }

    #[test]
    fn test_parse_weight_units() {
        assert_eq!(parse_weight("2.5t"), Some(2_500_000));
        assert_eq!(parse_weight("300kg"), Some(300_000));
        assert_eq!(parse_weight("500g"), Some(500));
    }

    #[test]
    fn test_parse_weight_unrecognized_suffix() {
        assert_eq!(parse_weight("500lbs"), None);
        assert_eq!(parse_weight(""), None);
        assert_eq!(parse_weight("heavy"), None);
    }

    #[test]
    fn test_parse_start_time_strict() {
        assert!(parse_start_time("2026-08-29 12:00").is_ok());
        assert!(parse_start_time("2026/08/29 12:00").is_err());
        assert!(parse_start_time("not a date").is_err());
    }

    #[test]
    fn test_observe_room_with_fans_resolves_relative_url() {
        let observed = observe_room(&entry(Some("1234"), "/90001"), "https://www.example.com");
        assert_eq!(observed.followers, Some(1234));
        assert_eq!(observed.url, "https://www.example.com/90001");
    }

    #[test]
    fn test_observe_room_without_fans_keeps_absolute_url() {
        let observed = observe_room(&entry(None, "https://other.example.com/90001"), "https://www.example.com");
        assert_eq!(observed.followers, None);
        assert_eq!(observed.url, "https://other.example.com/90001");
    }

    #[test]
    fn test_normalize_detail_live_room() {
        let update = normalize_detail("90001", &detail("2.5t", "1234", "2026-08-29 12:00")).unwrap();
        assert!(update.openstatus);
        assert_eq!(update.followers, 1234);
        assert_eq!(update.weight, "2.5t");
        assert_eq!(update.weight_int, Some(2_500_000));
    }

    #[test]
    fn test_normalize_detail_bad_start_time_fails() {
        let result = normalize_detail("90001", &detail("500g", "0", "soon"));
        assert!(matches!(result, Err(NormalizeError::StartTime { .. })));
    }

    #[test]
    fn test_normalize_detail_unrecognized_weight_left_unset() {
        let update = normalize_detail("90001", &detail("??", "0", "2026-08-29 12:00")).unwrap();
        assert_eq!(update.weight, "??");
        assert_eq!(update.weight_int, None);
    }
}

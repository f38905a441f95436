//! Wire models for the platform's JSON APIs
//!
//! Office ids arrive as a JSON number from some endpoints and as a string
//! from others, so id fields accept both and normalize to `String`.

use serde::{Deserialize, Deserializer};

/// One entry from the channel list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub cate_id: String,
    pub game_name: String,
    pub game_url: String,
    pub short_name: String,
    pub game_src: String,
    pub game_icon: String,
}

/// One entry from the paginated room list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RoomEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub room_id: String,
    pub room_name: String,
    pub room_src: String,
    pub nickname: String,
    #[serde(deserialize_with = "string_or_number")]
    pub owner_uid: String,
    pub avatar: String,
    #[serde(default)]
    pub online: i64,
    /// Optional; when present the url field is site-relative
    #[serde(default)]
    pub fans: Option<String>,
    pub url: String,
}

/// Payload from the room detail endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RoomDetail {
    pub room_name: String,
    pub room_thumb: String,
    pub owner_name: String,
    pub avatar: String,
    #[serde(default)]
    pub online: i64,
    pub room_status: String,
    pub fans_num: String,
    pub owner_weight: String,
    pub start_time: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

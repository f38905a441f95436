//! Remote API client module
//!
//! This module owns all HTTP traffic against the platform's JSON APIs:
//! - Building a reqwest client with the fixed header bundle plus the
//!   per-site Host/Referer overrides
//! - Fetching and unwrapping the `{error, data}` response envelope
//! - Classifying failures (transport, status, parse, application)

mod client;
mod types;

pub use client::{
    build_http_client, fetch_envelope, room_detail_url, room_list_url, ApiError,
};
pub use types::{ChannelEntry, RoomDetail, RoomEntry};

//! HTTP client implementation
//!
//! All platform endpoints share the same shape: an HTTP GET that returns a
//! JSON envelope `{error: <code>, data: <payload>}` where a zero error code
//! means the payload can be trusted. This module builds the shared client
//! and unwraps that envelope, classifying every way a fetch can go wrong.

use crate::config::SiteConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, HOST, REFERER, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";

/// Errors from a single API fetch
///
/// A connection-level failure is kept distinct from a well-formed
/// error-status response; callers that retry treat every variant the same,
/// but logs and tests care about the difference.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport failure for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("unexpected status {status} from {url}")]
    BadStatus { url: String, status: u16 },

    #[error("failed to parse response from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("API returned error code {code} from {url}")]
    Application { url: String, code: i64 },
}

/// Builds the HTTP client used for every outbound call
///
/// The header bundle is fixed for the whole crawl: a browser-like
/// User-Agent plus `Host` and `Referer` taken from the configured site,
/// which some platform endpoints require before they will answer.
pub fn build_http_client(site: &SiteConfig) -> crate::Result<Client> {
    let base = Url::parse(&site.url)?;

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.5"));
    if let Some(host) = base.host_str() {
        if let Ok(value) = HeaderValue::from_str(host) {
            headers.insert(HOST, value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(&site.url) {
        headers.insert(REFERER, value);
    }

    let client = Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Fetches a URL and unwraps the platform's response envelope
///
/// # Failure classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | Connection refused, timeout, TLS error | `ApiError::Transport` |
/// | Non-2xx status | `ApiError::BadStatus` |
/// | Body is not JSON, or lacks an `error` field | `ApiError::Parse` |
/// | `error != 0` in the envelope | `ApiError::Application` |
/// | `data` does not match the expected payload | `ApiError::Parse` |
pub async fn fetch_envelope<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, ApiError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::BadStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body: serde_json::Value = response.json().await.map_err(|e| ApiError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    // The error code is checked before the payload shape so that an error
    // response with a differently-shaped data field is reported as an
    // application failure, not a parse failure.
    let code = body
        .get("error")
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| ApiError::Parse {
            url: url.to_string(),
            message: "missing numeric 'error' field in envelope".to_string(),
        })?;

    if code != 0 {
        return Err(ApiError::Application {
            url: url.to_string(),
            code,
        });
    }

    let data = body.get("data").cloned().unwrap_or(serde_json::Value::Null);
    serde_json::from_value(data).map_err(|e| ApiError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Formats the paginated room list URL for one page of one channel
pub fn room_list_url(site: &SiteConfig, channel_office_id: &str, offset: usize, limit: usize) -> String {
    let base = site.room_list_url.replace("{channel}", channel_office_id);
    match Url::parse(&base) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("offset", &offset.to_string())
                .append_pair("limit", &limit.to_string());
            url.to_string()
        }
        // Config validation guarantees the template parses; fall back to
        // naive appending rather than panicking if it somehow does not.
        Err(_) => format!("{}?offset={}&limit={}", base, offset, limit),
    }
}

/// Formats the room detail URL for one room
pub fn room_detail_url(site: &SiteConfig, room_office_id: &str) -> String {
    site.room_detail_url.replace("{room}", room_office_id)
}

use crate::config::types::{Config, CrawlerConfig, OutputConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates site identity and endpoint templates
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.code.is_empty() {
        return Err(ConfigError::Validation(
            "site code cannot be empty".to_string(),
        ));
    }

    if !config
        .code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "site code must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.code
        )));
    }

    for (field, value) in [
        ("site url", &config.url),
        ("channel-list-url", &config.channel_list_url),
        ("room-list-url", &config.room_list_url),
        ("room-detail-url", &config.room_detail_url),
    ] {
        // The placeholder is not valid URL syntax on its own, so check the
        // template with placeholders substituted out.
        let candidate = value.replace("{channel}", "0").replace("{room}", "0");
        Url::parse(&candidate)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;
    }

    if !config.room_list_url.contains("{channel}") {
        return Err(ConfigError::Validation(
            "room-list-url must contain a {channel} placeholder".to_string(),
        ));
    }

    if !config.room_detail_url.contains("{room}") {
        return Err(ConfigError::Validation(
            "room-detail-url must contain a {room} placeholder".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    // The short-by-one boundary rule needs at least two rows per page.
    if config.page_limit < 2 {
        return Err(ConfigError::Validation(format!(
            "page-limit must be >= 2, got {}",
            config.page_limit
        )));
    }

    if config.fetch_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch-retries must be >= 1, got {}",
            config.fetch_retries
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

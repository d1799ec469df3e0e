// src/core/target.rs

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

static RE_HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9_](?:[a-z0-9_-]{0,61}[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").unwrap()
});

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid domain: {0:?}")]
pub struct InvalidDomain(pub String);

/// Turns user input into a bare, lowercase host name.
///
/// Accepts a URL as well (`https://example.com/path`), keeping only its host.
pub fn normalize_domain(input: &str) -> Result<String, InvalidDomain> {
    let trimmed = input.trim();
    let host = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Url::parse(trimmed)
            .ok()
            .and_then(|url| url.host_str().map(String::from))
            .ok_or_else(|| InvalidDomain(input.to_string()))?
    } else {
        trimmed.to_string()
    };

    let host = host.trim_end_matches('.').to_lowercase();
    if host.len() > 253 || !RE_HOSTNAME.is_match(&host) {
        return Err(InvalidDomain(input.to_string()));
    }
    Ok(host)
}

// src/core/scanner/http_scanner.rs

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::models::{ForwardingInfo, ProbeOutcome};
use crate::core::probe::ProbeError;

const USER_AGENT: &str = concat!("DomainRecon/", env!("CARGO_PKG_VERSION"));

/// The two HTTP clients the probes share: one follows redirects, the other
/// reports them.
#[derive(Debug, Clone)]
pub struct HttpClients {
    pub following: Client,
    pub manual: Client,
}

impl HttpClients {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            following: Client::builder().user_agent(USER_AGENT).build()?,
            manual: Client::builder()
                .user_agent(USER_AGENT)
                .redirect(Policy::none())
                .build()?,
        })
    }
}

fn transport_error(error: reqwest::Error) -> ProbeError {
    if error.is_timeout() {
        ProbeError::Timeout
    } else if error.is_connect() || error.is_request() {
        ProbeError::Connection(error.to_string())
    } else {
        ProbeError::Malformed(error.to_string())
    }
}

/// Plain HTTP counts as supported when the final response is `200 OK`.
pub async fn check_http_support(
    client: &Client,
    domain: &str,
    timeout: Duration,
) -> Result<ProbeOutcome<bool>, ProbeError> {
    let url = format!("http://{domain}");
    let response = client.head(&url).timeout(timeout).send().await.map_err(transport_error)?;
    let status = response.status();
    debug!(url = %url, status = %status, "HTTP support response.");
    match status {
        StatusCode::OK => Ok(ProbeOutcome::Success(true)),
        StatusCode::METHOD_NOT_ALLOWED => {
            warn!(url = %url, "HEAD not allowed.");
            Ok(ProbeOutcome::Success(false))
        }
        other => {
            debug!(url = %url, status = %other, "Unexpected status.");
            Ok(ProbeOutcome::Success(false))
        }
    }
}

/// HTTPS counts as supported when the handshake succeeds and the final
/// response is any 2xx.
pub async fn check_https_support(
    client: &Client,
    domain: &str,
    timeout: Duration,
) -> Result<ProbeOutcome<bool>, ProbeError> {
    let url = format!("https://{domain}");
    let response = client.head(&url).timeout(timeout).send().await.map_err(transport_error)?;
    let status = response.status();
    debug!(url = %url, status = %status, "HTTPS support response.");
    Ok(ProbeOutcome::Success(https_accepts(status)))
}

fn https_accepts(status: StatusCode) -> bool {
    status.is_success()
}

/// Issues a single GET without following redirects and reports where a
/// 301/302 points.
pub async fn check_forwarding(
    client: &Client,
    domain: &str,
    timeout: Duration,
) -> Result<ProbeOutcome<ForwardingInfo>, ProbeError> {
    let url = format!("http://{domain}");
    let response = client.get(&url).timeout(timeout).send().await.map_err(transport_error)?;
    let status = response.status();

    if status != StatusCode::MOVED_PERMANENTLY && status != StatusCode::FOUND {
        debug!(url = %url, status = %status, "No redirect.");
        return Ok(ProbeOutcome::Success(ForwardingInfo::default()));
    }

    match response.headers().get(LOCATION).map(|value| value.to_str()) {
        Some(Ok(location)) => {
            debug!(url = %url, location, "Domain forwards.");
            Ok(ProbeOutcome::Success(ForwardingInfo {
                is_forwarding: true,
                forwarding_to: Some(location.to_string()),
            }))
        }
        Some(Err(_)) => Err(ProbeError::Malformed("Location header is not valid UTF-8".to_string())),
        None => {
            debug!(url = %url, status = %status, "Redirect status without Location header.");
            Ok(ProbeOutcome::Success(ForwardingInfo::default()))
        }
    }
}

// src/config.rs

//! Runtime configuration, read once from the environment at startup.

use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

use crate::logging::PROJECT_NAME;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Upper bounds for each family of probes.
///
/// WHOIS and the blocklist walks get the longest bounds since they are the
/// slowest and least reliable collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTimeouts {
    pub dns: Duration,
    pub http: Duration,
    pub forwarding: Duration,
    pub whois: Duration,
    pub blocklist: Duration,
    pub subdomains: Duration,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            dns: Duration::from_millis(3000),
            http: Duration::from_millis(1500),
            forwarding: Duration::from_millis(1000),
            whois: Duration::from_millis(3000),
            blocklist: Duration::from_millis(6000),
            subdomains: Duration::from_millis(20_000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Maximum number of domains scanned at the same time within one batch.
    pub concurrency: usize,
    pub timeouts: ProbeTimeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 3030,
            concurrency: 32,
            timeouts: ProbeTimeouts::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let prefixed = |name: &str| format!("{}_{}", PROJECT_NAME.as_str(), name);

        let millis = |name: &str, default: Duration| -> Result<Duration, ConfigError> {
            let key = prefixed(name);
            Ok(parse_var::<u64>(&lookup, &key)?
                .map(Duration::from_millis)
                .unwrap_or(default))
        };

        let concurrency_key = prefixed("CONCURRENCY");
        let concurrency = parse_var::<usize>(&lookup, &concurrency_key)?.unwrap_or(defaults.concurrency);
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: concurrency_key,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            host: parse_var(&lookup, "HOST")?.unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            concurrency,
            timeouts: ProbeTimeouts {
                dns: millis("DNS_TIMEOUT_MS", defaults.timeouts.dns)?,
                http: millis("HTTP_TIMEOUT_MS", defaults.timeouts.http)?,
                forwarding: millis("FORWARD_TIMEOUT_MS", defaults.timeouts.forwarding)?,
                whois: millis("WHOIS_TIMEOUT_MS", defaults.timeouts.whois)?,
                blocklist: millis("BLOCKLIST_TIMEOUT_MS", defaults.timeouts.blocklist)?,
                subdomains: millis("SUBDOMAIN_TIMEOUT_MS", defaults.timeouts.subdomains)?,
            },
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

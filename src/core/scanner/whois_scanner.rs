// src/core/scanner/whois_scanner.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::core::models::{DomainAge, ProbeOutcome};
use crate::core::probe::ProbeError;

const WHOIS_PORT: u16 = 43;
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Error)]
pub enum WhoisError {
    #[error("invalid domain: {0}")]
    InvalidDomain(String),
    #[error("connection reset while talking to {server}: {source}")]
    ConnectionReset { server: String, source: std::io::Error },
    #[error("WHOIS I/O error with {server}: {source}")]
    Io { server: String, source: std::io::Error },
}

impl From<WhoisError> for ProbeError {
    fn from(error: WhoisError) -> Self {
        match error {
            WhoisError::InvalidDomain(domain) => ProbeError::Malformed(domain),
            other => ProbeError::Connection(other.to_string()),
        }
    }
}

/// Something that answers a WHOIS query with the raw response text.
#[async_trait]
pub trait WhoisBackend: Send + Sync {
    async fn query(&self, domain: &str) -> Result<String, WhoisError>;
}

/// Speaks the port-43 protocol directly to the registry of the domain's TLD.
#[derive(Debug, Default, Clone)]
pub struct TcpWhois;

impl TcpWhois {
    pub fn server_for(domain: &str) -> Result<String, WhoisError> {
        let tld = domain
            .trim_end_matches('.')
            .rsplit('.')
            .next()
            .filter(|tld| !tld.is_empty())
            .map(str::to_lowercase)
            .ok_or_else(|| WhoisError::InvalidDomain(domain.to_string()))?;

        let server = match tld.as_str() {
            "com" | "net" => "whois.verisign-grs.com".to_string(),
            "org" => "whois.pir.org".to_string(),
            "io" => "whois.nic.io".to_string(),
            "dev" | "app" => "whois.nic.google".to_string(),
            "ai" => "whois.nic.ai".to_string(),
            "co" => "whois.nic.co".to_string(),
            "me" => "whois.nic.me".to_string(),
            other => format!("{other}.whois-servers.net"),
        };
        Ok(server)
    }
}

#[async_trait]
impl WhoisBackend for TcpWhois {
    async fn query(&self, domain: &str) -> Result<String, WhoisError> {
        let server = Self::server_for(domain)?;
        let io_error = |source: std::io::Error| {
            if source.kind() == std::io::ErrorKind::ConnectionReset {
                WhoisError::ConnectionReset { server: server.clone(), source }
            } else {
                WhoisError::Io { server: server.clone(), source }
            }
        };

        debug!(domain, server = %server, "Querying WHOIS.");
        let mut stream = TcpStream::connect((server.as_str(), WHOIS_PORT)).await.map_err(io_error)?;
        stream
            .write_all(format!("{domain}\r\n").as_bytes())
            .await
            .map_err(io_error)?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.map_err(io_error)?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

const REGISTRAR_KEYS: &[&str] = &["registrar", "sponsoring registrar", "registrar name"];
const CREATION_KEYS: &[&str] = &["creation date", "created", "registered on", "registration time", "created on"];

fn field<'a>(response: &'a str, keys: &[&str]) -> Option<&'a str> {
    response.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        let key = key.trim().to_lowercase();
        let value = value.trim();
        (keys.contains(&key.as_str()) && !value.is_empty()).then_some(value)
    })
}

/// Parses the date formats registries commonly use.
pub fn parse_creation_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(date.and_utc());
    }
    let date_part = raw.split_whitespace().next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%d-%b-%Y"))
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}

/// Extracts registrar and age from a WHOIS response. Anything missing or
/// unparseable yields `Empty`, which renders as blank fields.
pub fn parse_domain_age(response: &str, now: DateTime<Utc>) -> ProbeOutcome<DomainAge> {
    let (Some(registrar), Some(created_raw)) = (field(response, REGISTRAR_KEYS), field(response, CREATION_KEYS)) else {
        return ProbeOutcome::Empty;
    };
    let Some(created) = parse_creation_date(created_raw) else {
        debug!(created = created_raw, "Unrecognised WHOIS creation date.");
        return ProbeOutcome::Empty;
    };

    ProbeOutcome::Success(DomainAge {
        registrar: registrar.to_string(),
        creation_date: created_raw.to_string(),
        age_in_days: Some(now.signed_duration_since(created).num_seconds().div_euclid(SECONDS_PER_DAY)),
    })
}

pub async fn lookup_domain_age(whois: &dyn WhoisBackend, domain: &str) -> Result<ProbeOutcome<DomainAge>, ProbeError> {
    let response = whois.query(domain).await?;
    Ok(parse_domain_age(&response, Utc::now()))
}

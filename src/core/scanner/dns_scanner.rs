// src/core/scanner/dns_scanner.rs

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::TokioAsyncResolver;
use std::time::Duration;
use tracing::debug;

use crate::core::models::{DkimRecord, MxRecord, ProbeOutcome, TagMap};
use crate::core::probe::ProbeError;

/// Selectors tried when the caller does not name any.
pub const COMMON_DKIM_SELECTORS: &[&str] = &["google", "selector1", "selector2", "default", "dkim"];

pub const SPF_MARKER: &str = "v=spf1";
pub const DMARC_MARKER: &str = "v=DMARC1";
pub const DKIM_MARKER: &str = "v=DKIM1";
pub const BIMI_MARKER: &str = "v=BIMI1;";
pub const MTA_STS_MARKER: &str = "v=STSv1;";
pub const TLS_RPT_MARKER: &str = "v=TLSRPTv1;";

/// The record queries the probes need from a resolver.
///
/// Every method performs exactly one query and reports failures through
/// [`ProbeError`], so probes can be exercised against an in-memory zone.
#[async_trait]
pub trait DnsBackend: Send + Sync {
    /// TXT records at `name`, with the character strings of each record joined.
    async fn txt(&self, name: &str) -> Result<Vec<String>, ProbeError>;
    async fn mx(&self, name: &str) -> Result<Vec<MxRecord>, ProbeError>;
    async fn ns(&self, name: &str) -> Result<Vec<String>, ProbeError>;
    async fn ipv4(&self, name: &str) -> Result<Vec<String>, ProbeError>;
    async fn ipv6(&self, name: &str) -> Result<Vec<String>, ProbeError>;
}

/// [`DnsBackend`] backed by the system-independent hickory resolver.
pub struct HickoryDns {
    resolver: TokioAsyncResolver,
}

impl HickoryDns {
    /// One attempt per query; the probe layer owns the overall deadline.
    pub fn new(query_timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = query_timeout;
        opts.attempts = 1;
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
        }
    }
}

fn classify(error: ResolveError) -> ProbeError {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::ServFail => ProbeError::ServerFailure(error.to_string()),
            _ => ProbeError::NotFound,
        },
        ResolveErrorKind::Timeout => ProbeError::Timeout,
        ResolveErrorKind::Io(_) | ResolveErrorKind::NoConnections => ProbeError::Connection(error.to_string()),
        ResolveErrorKind::Proto(_) => ProbeError::Malformed(error.to_string()),
        _ => ProbeError::ServerFailure(error.to_string()),
    }
}

fn trim_root(name: String) -> String {
    name.trim_end_matches('.').to_string()
}

#[async_trait]
impl DnsBackend for HickoryDns {
    async fn txt(&self, name: &str) -> Result<Vec<String>, ProbeError> {
        let lookup = self.resolver.txt_lookup(name).await.map_err(classify)?;
        Ok(lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                    .collect::<String>()
            })
            .collect())
    }

    async fn mx(&self, name: &str) -> Result<Vec<MxRecord>, ProbeError> {
        let lookup = self.resolver.mx_lookup(name).await.map_err(classify)?;
        Ok(lookup
            .iter()
            .map(|mx| MxRecord {
                exchange: trim_root(mx.exchange().to_string()),
                priority: mx.preference(),
            })
            .collect())
    }

    async fn ns(&self, name: &str) -> Result<Vec<String>, ProbeError> {
        let lookup = self.resolver.ns_lookup(name).await.map_err(classify)?;
        Ok(lookup.iter().map(|ns| trim_root(ns.to_string())).collect())
    }

    async fn ipv4(&self, name: &str) -> Result<Vec<String>, ProbeError> {
        let lookup = self.resolver.ipv4_lookup(name).await.map_err(classify)?;
        Ok(lookup.iter().map(|a| a.0.to_string()).collect())
    }

    async fn ipv6(&self, name: &str) -> Result<Vec<String>, ProbeError> {
        let lookup = self.resolver.ipv6_lookup(name).await.map_err(classify)?;
        Ok(lookup.iter().map(|aaaa| aaaa.0.to_string()).collect())
    }
}

// --- TXT record parsing ---

fn has_marker(record: &str, marker: &str) -> bool {
    record.trim_start().starts_with(marker)
}

/// Splits `k=v; k=v` into a map. Values keep everything after the first `=`,
/// so base64 padding in DKIM keys survives.
pub fn parse_tags(record: &str) -> TagMap {
    record
        .split(';')
        .filter_map(|segment| {
            let (key, value) = segment.trim().split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

// --- Probe bodies ---

pub async fn lookup_mx(dns: &dyn DnsBackend, domain: &str) -> Result<ProbeOutcome<Vec<MxRecord>>, ProbeError> {
    let mut records = dns.mx(domain).await?;
    records.sort_by_key(|mx| mx.priority);
    Ok(ProbeOutcome::from_vec(records))
}

/// SPF lives in the apex TXT set, mixed with unrelated verification records.
pub async fn lookup_spf(dns: &dyn DnsBackend, domain: &str) -> Result<ProbeOutcome<Vec<String>>, ProbeError> {
    let records = dns.txt(domain).await?;
    let spf: Vec<String> = records
        .into_iter()
        .filter(|record| has_marker(record, SPF_MARKER))
        .collect();
    debug!(domain, count = spf.len(), "SPF records filtered.");
    Ok(ProbeOutcome::from_vec(spf))
}

/// Looks up a policy TXT record at `name` and parses the ones carrying `marker`.
pub async fn lookup_policy(
    dns: &dyn DnsBackend,
    name: &str,
    marker: &str,
) -> Result<ProbeOutcome<Vec<TagMap>>, ProbeError> {
    let records = dns.txt(name).await?;
    let total = records.len();
    let parsed: Vec<TagMap> = records
        .iter()
        .filter(|record| has_marker(record, marker))
        .map(|record| parse_tags(record))
        .collect();
    if parsed.len() < total {
        debug!(name, marker, dropped = total - parsed.len(), "Dropped records without version marker.");
    }
    Ok(ProbeOutcome::from_vec(parsed))
}

pub async fn lookup_dkim(
    dns: &dyn DnsBackend,
    domain: &str,
    selector: &str,
) -> Result<ProbeOutcome<Vec<DkimRecord>>, ProbeError> {
    let name = format!("{selector}._domainkey.{domain}");
    let records = lookup_policy(dns, &name, DKIM_MARKER).await?.into_value();
    Ok(ProbeOutcome::from_vec(
        records
            .into_iter()
            .map(|tags| DkimRecord { selector: selector.to_string(), tags })
            .collect(),
    ))
}

pub async fn lookup_ns(dns: &dyn DnsBackend, domain: &str) -> Result<ProbeOutcome<Vec<String>>, ProbeError> {
    Ok(ProbeOutcome::from_vec(dns.ns(domain).await?))
}

pub async fn lookup_a(dns: &dyn DnsBackend, name: &str) -> Result<ProbeOutcome<Vec<String>>, ProbeError> {
    Ok(ProbeOutcome::from_vec(dns.ipv4(name).await?))
}

pub async fn lookup_aaaa(dns: &dyn DnsBackend, name: &str) -> Result<ProbeOutcome<Vec<String>>, ProbeError> {
    Ok(ProbeOutcome::from_vec(dns.ipv6(name).await?))
}

pub fn dmarc_name(domain: &str) -> String {
    format!("_dmarc.{domain}")
}

pub fn bimi_name(domain: &str) -> String {
    format!("default._bimi.{domain}")
}

pub fn mta_sts_name(domain: &str) -> String {
    format!("_mta-sts.{domain}")
}

pub fn tls_rpt_name(domain: &str) -> String {
    format!("_smtp._tls.{domain}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::testing::FakeDns;

    #[test]
    fn tags_keep_base64_padding() {
        let tags = parse_tags("v=DKIM1; k=rsa; p=MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQ==");
        assert_eq!(tags["v"], "DKIM1");
        assert_eq!(tags["k"], "rsa");
        assert_eq!(tags["p"], "MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQ==");
    }

    #[test]
    fn tags_skip_empty_and_bare_segments() {
        let tags = parse_tags("v=BIMI1; l=https://example.com/logo.svg; ;junk;");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags["l"], "https://example.com/logo.svg");
    }

    #[tokio::test]
    async fn spf_keeps_only_marked_records() {
        let dns = FakeDns::default()
            .with_txt("example.com", &[
                "google-site-verification=abc123",
                "v=spf1 include:_spf.example.com ~all",
                "MS=ms12345",
            ]);

        let outcome = lookup_spf(&dns, "example.com").await.unwrap();
        assert_eq!(outcome, ProbeOutcome::Success(vec!["v=spf1 include:_spf.example.com ~all".to_string()]));
    }

    #[tokio::test]
    async fn spf_without_marker_is_empty() {
        let dns = FakeDns::default().with_txt("example.com", &["google-site-verification=abc123"]);
        assert!(lookup_spf(&dns, "example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bimi_requires_version_marker() {
        let dns = FakeDns::default()
            .with_txt("default._bimi.good.example", &["v=BIMI1; l=https://example.com/logo.svg;"])
            .with_txt("default._bimi.bad.example", &["l=https://example.com/logo.svg;"]);

        let good = lookup_policy(&dns, &bimi_name("good.example"), BIMI_MARKER).await.unwrap().into_value();
        assert_eq!(good.len(), 1);
        assert_eq!(good[0]["l"], "https://example.com/logo.svg");

        let bad = lookup_policy(&dns, &bimi_name("bad.example"), BIMI_MARKER).await.unwrap();
        assert!(bad.is_empty());
    }

    #[tokio::test]
    async fn dkim_records_carry_their_selector() {
        let dns = FakeDns::default().with_txt("google._domainkey.example.com", &["v=DKIM1; k=rsa; p=KEY="]);
        let records = lookup_dkim(&dns, "example.com", "google").await.unwrap().into_value();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].selector, "google");
        assert_eq!(records[0].tags["p"], "KEY=");
    }

    #[tokio::test]
    async fn mx_is_sorted_by_priority() {
        let dns = FakeDns::default().with_mx("example.com", &[("mx2.example.com", 20), ("mx1.example.com", 10)]);
        let records = lookup_mx(&dns, "example.com").await.unwrap().into_value();
        assert_eq!(records[0].exchange, "mx1.example.com");
        assert_eq!(records[1].priority, 20);
    }

    #[tokio::test]
    async fn missing_mx_is_not_found() {
        let dns = FakeDns::default().with_a("example.com", &["93.184.216.34"]);
        assert_eq!(lookup_mx(&dns, "example.com").await, Err(ProbeError::NotFound));
    }
}

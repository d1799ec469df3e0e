// src/core/probe.rs

//! The contract shared by every probe: one bounded attempt, with every
//! failure absorbed into [`ProbeOutcome::Empty`].

use std::future::Future;
use std::time::Duration;

use strum::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ProbeTimeouts;
use crate::core::models::ProbeOutcome;

/// Every signal the scanner knows how to collect for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ProbeKind {
    Mx,
    Spf,
    Dmarc,
    Dkim,
    Bimi,
    MtaSts,
    TlsRpt,
    Ns,
    A,
    Aaaa,
    Http,
    Https,
    Forwarding,
    Whois,
    Blacklist,
    Blocklist,
    Subdomains,
}

impl ProbeKind {
    /// The catalog run by the full domain scan.
    pub const FULL: &'static [ProbeKind] = &[
        ProbeKind::Mx,
        ProbeKind::Spf,
        ProbeKind::Dmarc,
        ProbeKind::Dkim,
        ProbeKind::Bimi,
        ProbeKind::MtaSts,
        ProbeKind::TlsRpt,
        ProbeKind::Ns,
        ProbeKind::A,
        ProbeKind::Aaaa,
        ProbeKind::Http,
        ProbeKind::Https,
        ProbeKind::Forwarding,
        ProbeKind::Whois,
        ProbeKind::Blacklist,
        ProbeKind::Blocklist,
        ProbeKind::Subdomains,
    ];

    pub fn timeout(self, timeouts: &ProbeTimeouts) -> Duration {
        match self {
            ProbeKind::Http | ProbeKind::Https => timeouts.http,
            ProbeKind::Forwarding => timeouts.forwarding,
            ProbeKind::Whois => timeouts.whois,
            ProbeKind::Blacklist | ProbeKind::Blocklist => timeouts.blocklist,
            ProbeKind::Subdomains => timeouts.subdomains,
            _ => timeouts.dns,
        }
    }
}

/// Why a probe came back without a payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("no record found")]
    NotFound,
    #[error("server failure: {0}")]
    ServerFailure(String),
    #[error("transport timed out")]
    Timeout,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Runs one probe body under `bound` and converges every failure to `Empty`.
///
/// Losing the race drops the probe future, which cancels the in-flight
/// query or request instead of leaving it running in the background.
pub async fn guard<T, F>(kind: ProbeKind, domain: &str, bound: Duration, probe: F) -> ProbeOutcome<T>
where
    F: Future<Output = Result<ProbeOutcome<T>, ProbeError>>,
{
    match tokio::time::timeout(bound, probe).await {
        Ok(Ok(outcome)) => {
            debug!(probe = %kind, domain, empty = outcome.is_empty(), "Probe finished.");
            outcome
        }
        Ok(Err(ProbeError::NotFound)) => {
            debug!(probe = %kind, domain, "No record found.");
            ProbeOutcome::Empty
        }
        Ok(Err(e)) => {
            warn!(probe = %kind, domain, error = %e, "Probe failed.");
            ProbeOutcome::Empty
        }
        Err(_) => {
            warn!(probe = %kind, domain, bound_ms = bound.as_millis() as u64, "Probe timed out.");
            ProbeOutcome::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn hanging_probe_yields_empty_at_the_bound() {
        let started = Instant::now();
        let outcome: ProbeOutcome<Vec<String>> = guard(
            ProbeKind::Mx,
            "example.com",
            Duration::from_millis(1500),
            std::future::pending(),
        )
        .await;

        assert!(outcome.is_empty());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500));
        assert!(elapsed < Duration::from_millis(1600));
    }

    #[tokio::test]
    async fn errors_are_absorbed() {
        for error in [
            ProbeError::NotFound,
            ProbeError::ServerFailure("SERVFAIL".into()),
            ProbeError::Connection("refused".into()),
            ProbeError::Malformed("garbage".into()),
            ProbeError::Timeout,
        ] {
            let outcome: ProbeOutcome<bool> =
                guard(ProbeKind::Http, "example.com", Duration::from_secs(1), async move { Err(error) }).await;
            assert_eq!(outcome, ProbeOutcome::Empty);
        }
    }

    #[tokio::test]
    async fn success_passes_through() {
        let outcome = guard(ProbeKind::Https, "example.com", Duration::from_secs(1), async {
            Ok(ProbeOutcome::Success(true))
        })
        .await;
        assert_eq!(outcome, ProbeOutcome::Success(true));
    }

    #[tokio::test]
    async fn payloads_without_a_default_are_guarded_too() {
        #[derive(Debug, PartialEq)]
        struct Banner(&'static str);

        let outcome = guard(ProbeKind::Whois, "example.com", Duration::from_secs(1), async {
            Ok(ProbeOutcome::Success(Banner("whois.example")))
        })
        .await;
        assert!(!outcome.is_empty());
        assert_eq!(outcome, ProbeOutcome::Success(Banner("whois.example")));
    }

    #[test]
    fn full_catalog_covers_every_probe() {
        use strum::IntoEnumIterator;
        assert_eq!(ProbeKind::iter().count(), ProbeKind::FULL.len());
        assert!(ProbeKind::iter().all(|kind| ProbeKind::FULL.contains(&kind)));
    }

    #[test]
    fn kinds_have_snake_case_names() {
        assert_eq!(ProbeKind::MtaSts.to_string(), "mta_sts");
        assert_eq!(ProbeKind::from_str("tls_rpt").unwrap(), ProbeKind::TlsRpt);
    }

    #[test]
    fn slow_collaborators_get_the_longest_bounds() {
        let timeouts = ProbeTimeouts::default();
        assert!(ProbeKind::Whois.timeout(&timeouts) >= ProbeKind::Mx.timeout(&timeouts));
        assert!(ProbeKind::Blacklist.timeout(&timeouts) > ProbeKind::Http.timeout(&timeouts));
    }
}

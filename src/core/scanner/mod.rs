// src/core/scanner/mod.rs

// One module per probe family; this file ties them together into the
// per-domain aggregator.
pub mod blocklist_scanner;
pub mod dns_scanner;
pub mod http_scanner;
pub mod subdomain_scanner;
pub mod whois_scanner;

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{Config, ProbeTimeouts};
use crate::core::models::{
    DkimRecord, DomainAge, DomainReport, ForwardingInfo, MxRecord, ProbeOutcome, ProbeValue, TagMap, ZoneReport,
};
use crate::core::probe::{guard, ProbeKind};
use crate::core::target::normalize_domain;

use self::blocklist_scanner::{check_zones, BLACKLIST_ZONES, BLOCKLIST_ZONES};
use self::dns_scanner::{
    bimi_name, dmarc_name, lookup_a, lookup_aaaa, lookup_dkim, lookup_mx, lookup_ns, lookup_policy, lookup_spf,
    mta_sts_name, tls_rpt_name, DnsBackend, HickoryDns, BIMI_MARKER, COMMON_DKIM_SELECTORS, DMARC_MARKER,
    MTA_STS_MARKER, TLS_RPT_MARKER,
};
use self::http_scanner::{check_forwarding, check_http_support, check_https_support, HttpClients};
use self::subdomain_scanner::discover_subdomains;
use self::whois_scanner::{lookup_domain_age, TcpWhois, WhoisBackend};

/// Optional per-request knobs for individual probes.
#[derive(Debug, Clone, Default)]
pub struct ProbeParams {
    /// DKIM selectors to try instead of the common ones.
    pub selectors: Option<Vec<String>>,
    /// Overrides the configured WHOIS bound.
    pub whois_timeout: Option<Duration>,
}

/// The probe set and the per-domain aggregator built on it.
///
/// Every probe method returns a [`ProbeOutcome`] and never an error; the
/// bound for each comes from [`ProbeTimeouts`].
pub struct Scanner {
    dns: Arc<dyn DnsBackend>,
    whois: Arc<dyn WhoisBackend>,
    http: HttpClients,
    timeouts: ProbeTimeouts,
}

impl Scanner {
    pub fn new(
        dns: Arc<dyn DnsBackend>,
        whois: Arc<dyn WhoisBackend>,
        http: HttpClients,
        timeouts: ProbeTimeouts,
    ) -> Self {
        Self { dns, whois, http, timeouts }
    }

    /// Wires the production backends: hickory for DNS, port 43 for WHOIS.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            Arc::new(HickoryDns::new(config.timeouts.dns)),
            Arc::new(TcpWhois),
            HttpClients::new()?,
            config.timeouts.clone(),
        ))
    }

    fn bound(&self, kind: ProbeKind) -> Duration {
        kind.timeout(&self.timeouts)
    }

    pub async fn mx(&self, domain: &str) -> ProbeOutcome<Vec<MxRecord>> {
        guard(ProbeKind::Mx, domain, self.bound(ProbeKind::Mx), lookup_mx(self.dns.as_ref(), domain)).await
    }

    pub async fn spf(&self, domain: &str) -> ProbeOutcome<Vec<String>> {
        guard(ProbeKind::Spf, domain, self.bound(ProbeKind::Spf), lookup_spf(self.dns.as_ref(), domain)).await
    }

    async fn policy(&self, kind: ProbeKind, domain: &str, name: &str, marker: &str) -> ProbeOutcome<Vec<TagMap>> {
        guard(kind, domain, self.bound(kind), lookup_policy(self.dns.as_ref(), name, marker)).await
    }

    pub async fn dmarc(&self, domain: &str) -> ProbeOutcome<Vec<TagMap>> {
        self.policy(ProbeKind::Dmarc, domain, &dmarc_name(domain), DMARC_MARKER).await
    }

    pub async fn bimi(&self, domain: &str) -> ProbeOutcome<Vec<TagMap>> {
        self.policy(ProbeKind::Bimi, domain, &bimi_name(domain), BIMI_MARKER).await
    }

    pub async fn mta_sts(&self, domain: &str) -> ProbeOutcome<Vec<TagMap>> {
        self.policy(ProbeKind::MtaSts, domain, &mta_sts_name(domain), MTA_STS_MARKER).await
    }

    pub async fn tls_rpt(&self, domain: &str) -> ProbeOutcome<Vec<TagMap>> {
        self.policy(ProbeKind::TlsRpt, domain, &tls_rpt_name(domain), TLS_RPT_MARKER).await
    }

    /// One query per selector, all in flight together.
    pub async fn dkim(&self, domain: &str, selectors: Option<&[String]>) -> ProbeOutcome<Vec<DkimRecord>> {
        let selectors: Vec<&str> = match selectors {
            Some(selectors) if !selectors.is_empty() => selectors.iter().map(String::as_str).collect(),
            _ => COMMON_DKIM_SELECTORS.to_vec(),
        };
        let bound = self.bound(ProbeKind::Dkim);
        let per_selector = join_all(
            selectors
                .into_iter()
                .map(|selector| guard(ProbeKind::Dkim, domain, bound, lookup_dkim(self.dns.as_ref(), domain, selector))),
        )
        .await;

        ProbeOutcome::from_vec(per_selector.into_iter().flat_map(ProbeOutcome::into_value).collect())
    }

    pub async fn ns(&self, domain: &str) -> ProbeOutcome<Vec<String>> {
        guard(ProbeKind::Ns, domain, self.bound(ProbeKind::Ns), lookup_ns(self.dns.as_ref(), domain)).await
    }

    pub async fn a(&self, domain: &str) -> ProbeOutcome<Vec<String>> {
        guard(ProbeKind::A, domain, self.bound(ProbeKind::A), lookup_a(self.dns.as_ref(), domain)).await
    }

    pub async fn aaaa(&self, domain: &str) -> ProbeOutcome<Vec<String>> {
        guard(ProbeKind::Aaaa, domain, self.bound(ProbeKind::Aaaa), lookup_aaaa(self.dns.as_ref(), domain)).await
    }

    pub async fn http_support(&self, domain: &str) -> ProbeOutcome<bool> {
        let bound = self.bound(ProbeKind::Http);
        guard(ProbeKind::Http, domain, bound, check_http_support(&self.http.following, domain, bound)).await
    }

    pub async fn https_support(&self, domain: &str) -> ProbeOutcome<bool> {
        let bound = self.bound(ProbeKind::Https);
        guard(ProbeKind::Https, domain, bound, check_https_support(&self.http.following, domain, bound)).await
    }

    pub async fn forwarding(&self, domain: &str) -> ProbeOutcome<ForwardingInfo> {
        let bound = self.bound(ProbeKind::Forwarding);
        guard(ProbeKind::Forwarding, domain, bound, check_forwarding(&self.http.manual, domain, bound)).await
    }

    pub async fn whois(&self, domain: &str, bound: Option<Duration>) -> ProbeOutcome<DomainAge> {
        let bound = bound.unwrap_or_else(|| self.bound(ProbeKind::Whois));
        guard(ProbeKind::Whois, domain, bound, lookup_domain_age(self.whois.as_ref(), domain)).await
    }

    pub async fn blacklist(&self, domain: &str) -> ProbeOutcome<ZoneReport> {
        let bound = self.bound(ProbeKind::Blacklist);
        guard(ProbeKind::Blacklist, domain, bound, check_zones(self.dns.as_ref(), domain, BLACKLIST_ZONES)).await
    }

    pub async fn blocklist(&self, domain: &str) -> ProbeOutcome<ZoneReport> {
        let bound = self.bound(ProbeKind::Blocklist);
        guard(ProbeKind::Blocklist, domain, bound, check_zones(self.dns.as_ref(), domain, BLOCKLIST_ZONES)).await
    }

    pub async fn subdomains(&self, domain: &str) -> ProbeOutcome<Vec<String>> {
        let walk_bound = self.bound(ProbeKind::Subdomains);
        discover_subdomains(self.dns.as_ref(), domain, self.timeouts.dns, walk_bound).await
    }

    /// Runs a single probe and returns its payload, or its empty value.
    pub async fn probe(&self, kind: ProbeKind, domain: &str, params: &ProbeParams) -> ProbeValue {
        match kind {
            ProbeKind::Mx => ProbeValue::Mx(self.mx(domain).await.into_value()),
            ProbeKind::Spf => ProbeValue::Records(self.spf(domain).await.into_value()),
            ProbeKind::Dmarc => ProbeValue::Tags(self.dmarc(domain).await.into_value()),
            ProbeKind::Dkim => ProbeValue::Dkim(self.dkim(domain, params.selectors.as_deref()).await.into_value()),
            ProbeKind::Bimi => ProbeValue::Tags(self.bimi(domain).await.into_value()),
            ProbeKind::MtaSts => ProbeValue::Tags(self.mta_sts(domain).await.into_value()),
            ProbeKind::TlsRpt => ProbeValue::Tags(self.tls_rpt(domain).await.into_value()),
            ProbeKind::Ns => ProbeValue::Records(self.ns(domain).await.into_value()),
            ProbeKind::A => ProbeValue::Records(self.a(domain).await.into_value()),
            ProbeKind::Aaaa => ProbeValue::Records(self.aaaa(domain).await.into_value()),
            ProbeKind::Http => ProbeValue::Flag(self.http_support(domain).await.into_value()),
            ProbeKind::Https => ProbeValue::Flag(self.https_support(domain).await.into_value()),
            ProbeKind::Forwarding => ProbeValue::Forwarding(self.forwarding(domain).await.into_value()),
            ProbeKind::Whois => ProbeValue::Whois(self.whois(domain, params.whois_timeout).await.into_value()),
            ProbeKind::Blacklist => ProbeValue::Zones(self.blacklist(domain).await.into_value()),
            ProbeKind::Blocklist => ProbeValue::Zones(self.blocklist(domain).await.into_value()),
            ProbeKind::Subdomains => ProbeValue::Records(self.subdomains(domain).await.into_value()),
        }
    }

    /// Runs every probe in `catalog` concurrently against one domain and
    /// merges whatever they return into a report.
    ///
    /// All probes are awaited; a probe that fails or times out only leaves
    /// its own field at the empty value. Input that is not a host name skips
    /// the probes and is reported through the report's `error` field.
    pub async fn scan_domain(&self, domain: &str, catalog: &[ProbeKind], params: &ProbeParams) -> DomainReport {
        let mut report = DomainReport::new(domain);
        let target = match normalize_domain(domain) {
            Ok(target) => target,
            Err(e) => {
                warn!(domain, error = %e, "Skipping domain.");
                report.error = Some(e.to_string());
                return report;
            }
        };

        info!(domain = %target, probes = catalog.len(), "Starting domain scan.");
        let target = target.as_str();
        let results = join_all(
            catalog
                .iter()
                .map(|&kind| async move { (kind, self.probe(kind, target, params).await) }),
        )
        .await;

        for (kind, value) in results {
            report.apply(kind, value);
        }
        info!(domain = %target, "Domain scan finished.");
        report
    }
}

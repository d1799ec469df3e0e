// src/core/scanner/blocklist_scanner.rs

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::core::models::{ProbeOutcome, ZoneListing, ZoneReport};
use crate::core::probe::ProbeError;
use crate::core::scanner::dns_scanner::DnsBackend;

/// General-purpose reputation zones.
pub const BLACKLIST_ZONES: &[&str] = &[
    "all.s5h.net",
    "blacklist.woody.ch",
    "bogons.cymru.com",
    "cbl.abuseat.org",
    "combined.abuse.ch",
    "db.wpbl.info",
    "dnsbl-1.uceprotect.net",
    "dnsbl-2.uceprotect.net",
    "dnsbl-3.uceprotect.net",
    "dnsbl.dronebl.org",
    "dnsbl.sorbs.net",
    "drone.abuse.ch",
    "duinv.aupads.org",
    "dul.dnsbl.sorbs.net",
    "http.dnsbl.sorbs.net",
    "ips.backscatterer.org",
    "ix.dnsbl.manitu.net",
    "korea.services.net",
    "misc.dnsbl.sorbs.net",
    "orvedb.aupads.org",
    "proxy.bl.gweep.ca",
    "psbl.surriel.com",
    "relays.bl.gweep.ca",
    "relays.nether.net",
    "singular.ttk.pte.hu",
    "smtp.dnsbl.sorbs.net",
    "socks.dnsbl.sorbs.net",
    "spam.abuse.ch",
    "spam.dnsbl.anonmails.de",
    "spam.dnsbl.sorbs.net",
    "spambot.bls.digibase.ca",
    "spamrbl.imp.ch",
    "spamsources.fabel.dk",
    "ubl.lashback.com",
    "ubl.unsubscore.com",
    "virus.rbl.jp",
    "web.dnsbl.sorbs.net",
    "wormrbl.imp.ch",
    "z.mailspike.net",
    "zombie.dnsbl.sorbs.net",
];

/// Spamhaus-class zones.
pub const BLOCKLIST_ZONES: &[&str] = &[
    "pbl.spamhaus.org",
    "sbl.spamhaus.org",
    "xbl.spamhaus.org",
    "zen.spamhaus.org",
    "b.barracudacentral.org",
    "bl.spamcop.net",
];

async fn check_zone(dns: &dyn DnsBackend, domain: &str, zone: &str) -> Option<(String, ZoneListing)> {
    let query = format!("{domain}.{zone}");
    match dns.ipv4(&query).await {
        Ok(addresses) if !addresses.is_empty() => {
            debug!(domain, zone, ?addresses, "Listed.");
            Some((zone.to_string(), ZoneListing::listed(addresses)))
        }
        Ok(_) | Err(ProbeError::NotFound) => Some((zone.to_string(), ZoneListing::not_listed())),
        Err(e) => {
            warn!(domain, zone, error = %e, "Blocklist zone check failed.");
            None
        }
    }
}

/// Queries every zone of one list concurrently. Zones that error are left
/// out of the report; the check as a whole never fails.
pub async fn check_zones(
    dns: &dyn DnsBackend,
    domain: &str,
    zones: &[&str],
) -> Result<ProbeOutcome<ZoneReport>, ProbeError> {
    let report: ZoneReport = join_all(zones.iter().map(|zone| check_zone(dns, domain, zone)))
        .await
        .into_iter()
        .flatten()
        .collect();

    let listed = report.values().filter(|listing| listing.is_listed()).count();
    info!(domain, zones = zones.len(), answered = report.len(), listed, "Blocklist check finished.");

    if report.is_empty() {
        Ok(ProbeOutcome::Empty)
    } else {
        Ok(ProbeOutcome::Success(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ListingStatus;
    use crate::core::scanner::testing::FakeDns;

    #[test]
    fn lists_have_expected_sizes() {
        assert_eq!(BLACKLIST_ZONES.len(), 40);
        assert_eq!(BLOCKLIST_ZONES.len(), 6);
    }

    #[tokio::test]
    async fn per_zone_errors_are_tolerated() {
        let dns = FakeDns::default()
            .with_a("bad.example.zen.spamhaus.org", &["127.0.0.2"])
            .with_servfail("bad.example.sbl.spamhaus.org");

        let report = check_zones(&dns, "bad.example", BLOCKLIST_ZONES).await.unwrap().into_value();

        assert_eq!(report.len(), BLOCKLIST_ZONES.len() - 1);
        assert!(!report.contains_key("sbl.spamhaus.org"));
        assert_eq!(report["zen.spamhaus.org"].status, ListingStatus::Listed);
        assert_eq!(report["zen.spamhaus.org"].addresses, vec!["127.0.0.2".to_string()]);
        assert_eq!(report["pbl.spamhaus.org"].status, ListingStatus::NotListed);
    }
}

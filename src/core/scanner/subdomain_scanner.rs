// src/core/scanner/subdomain_scanner.rs

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::models::ProbeOutcome;
use crate::core::probe::{guard, ProbeKind};
use crate::core::scanner::dns_scanner::{lookup_a, lookup_aaaa, DnsBackend};

/// Candidate labels, checked in this order.
pub const SUBDOMAIN_CANDIDATES: &[&str] = &["shop", "www", "mail", "ftp", "blog", "test", "status", "link", "remote"];

/// Walks the candidate list one name at a time, keeping every name that has
/// an A or AAAA record. Output order follows the candidate order.
///
/// Each lookup gets `lookup_bound`, cut short so the walk never runs past
/// `walk_bound`. Once that deadline passes the walk stops and returns what
/// it has found so far.
pub async fn discover_subdomains(
    dns: &dyn DnsBackend,
    domain: &str,
    lookup_bound: Duration,
    walk_bound: Duration,
) -> ProbeOutcome<Vec<String>> {
    let deadline = Instant::now() + walk_bound;
    let mut discovered: Vec<String> = Vec::new();

    'walk: for candidate in SUBDOMAIN_CANDIDATES {
        let name = format!("{candidate}.{domain}");

        for kind in [ProbeKind::A, ProbeKind::Aaaa] {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(domain, found = discovered.len(), "Subdomain walk hit its deadline, keeping partial results.");
                break 'walk;
            }

            let bound = lookup_bound.min(remaining);
            let addresses = match kind {
                ProbeKind::A => guard(kind, &name, bound, lookup_a(dns, &name)).await,
                _ => guard(kind, &name, bound, lookup_aaaa(dns, &name)).await,
            };
            if !addresses.is_empty() && !discovered.contains(&name) {
                debug!(name = %name, record = %kind, "Subdomain resolves.");
                discovered.push(name.clone());
            }
        }
    }

    info!(domain, found = discovered.len(), "Subdomain discovery finished.");
    ProbeOutcome::from_vec(discovered)
}

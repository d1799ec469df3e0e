// src/core/models.rs

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::warn;

use crate::core::probe::ProbeKind;

// --- Reusable Result Types ---

// The outcome of a single probe. `Empty` covers "no record" as well as every
// absorbed failure; callers resolve it to the payload's `Default` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome<T> {
    Success(T),
    Empty,
}

impl<T: Default> ProbeOutcome<T> {
    /// Returns the payload, or the probe's defined empty value.
    pub fn into_value(self) -> T {
        match self {
            ProbeOutcome::Success(value) => value,
            ProbeOutcome::Empty => T::default(),
        }
    }
}

impl<T> ProbeOutcome<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, ProbeOutcome::Empty)
    }
}

impl<T> ProbeOutcome<Vec<T>> {
    // A lookup that succeeded but kept nothing after filtering is still empty.
    pub fn from_vec(values: Vec<T>) -> Self {
        if values.is_empty() {
            ProbeOutcome::Empty
        } else {
            ProbeOutcome::Success(values)
        }
    }
}

// Key/value tags of a policy TXT record (`v=DKIM1; k=rsa; p=...`).
pub type TagMap = BTreeMap<String, String>;

// --- DNS Probe Models ---

// A mail exchanger host and its preference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MxRecord {
    pub exchange: String,
    pub priority: u16,
}

// A DKIM record found under one selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DkimRecord {
    pub selector: String,
    #[serde(flatten)]
    pub tags: TagMap,
}

// --- HTTP Probe Models ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingInfo {
    pub is_forwarding: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarding_to: Option<String>,
}

// --- WHOIS Models ---

// Registration metadata. The empty value has blank strings in every field,
// including `ageInDays`, which is otherwise a number.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DomainAge {
    pub registrar: String,
    pub creation_date: String,
    #[serde(serialize_with = "blank_when_none")]
    pub age_in_days: Option<i64>,
}

fn blank_when_none<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(days) => serializer.serialize_i64(*days),
        None => serializer.serialize_str(""),
    }
}

// --- Blocklist Models ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Listed,
    NotListed,
}

// What one blocklist zone answered for a domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneListing {
    pub status: ListingStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
}

impl ZoneListing {
    pub fn listed(addresses: Vec<String>) -> Self {
        Self { status: ListingStatus::Listed, addresses }
    }

    pub fn not_listed() -> Self {
        Self { status: ListingStatus::NotListed, addresses: Vec::new() }
    }

    pub fn is_listed(&self) -> bool {
        self.status == ListingStatus::Listed
    }
}

// Zone name -> listing, ordered by zone name for stable output.
pub type ZoneReport = BTreeMap<String, ZoneListing>;

// --- Single Probe Payloads ---

// The payload of any probe, used by the single-probe endpoints and when a
// domain report is assembled from an arbitrary catalog of probes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ProbeValue {
    Mx(Vec<MxRecord>),
    Records(Vec<String>),
    Tags(Vec<TagMap>),
    Dkim(Vec<DkimRecord>),
    Flag(bool),
    Forwarding(ForwardingInfo),
    Whois(DomainAge),
    Zones(ZoneReport),
}

// --- Main Report ---

// Everything learned about one domain. Every field is always present; a
// probe that failed, timed out or was not requested holds its empty value.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DomainReport {
    pub domain: String,
    pub mx_records: Vec<MxRecord>,
    pub spf_records: Vec<String>,
    pub dmarc_records: Vec<TagMap>,
    #[serde(flatten)]
    pub domain_info: DomainAge,
    pub name_servers: Vec<String>,
    pub http_supported: bool,
    pub https_supported: bool,
    pub tls_rpt_records: Vec<TagMap>,
    pub mta_sts_records: Vec<TagMap>,
    pub a_records: Vec<String>,
    pub aaaa_records: Vec<String>,
    pub discovered_subdomains: Vec<String>,
    pub blacklist_result: ZoneReport,
    pub blocklist_result: ZoneReport,
    pub bimi_record: Vec<TagMap>,
    pub dkim_records: Vec<DkimRecord>,
    pub forwarded_domain: ForwardingInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DomainReport {
    pub fn new(domain: &str) -> Self {
        Self { domain: domain.to_string(), ..Default::default() }
    }

    /// Stores one probe's payload in the field it belongs to.
    pub fn apply(&mut self, kind: ProbeKind, value: ProbeValue) {
        match (kind, value) {
            (ProbeKind::Mx, ProbeValue::Mx(records)) => self.mx_records = records,
            (ProbeKind::Spf, ProbeValue::Records(records)) => self.spf_records = records,
            (ProbeKind::Dmarc, ProbeValue::Tags(records)) => self.dmarc_records = records,
            (ProbeKind::Dkim, ProbeValue::Dkim(records)) => self.dkim_records = records,
            (ProbeKind::Bimi, ProbeValue::Tags(records)) => self.bimi_record = records,
            (ProbeKind::MtaSts, ProbeValue::Tags(records)) => self.mta_sts_records = records,
            (ProbeKind::TlsRpt, ProbeValue::Tags(records)) => self.tls_rpt_records = records,
            (ProbeKind::Ns, ProbeValue::Records(hosts)) => self.name_servers = hosts,
            (ProbeKind::A, ProbeValue::Records(addresses)) => self.a_records = addresses,
            (ProbeKind::Aaaa, ProbeValue::Records(addresses)) => self.aaaa_records = addresses,
            (ProbeKind::Http, ProbeValue::Flag(supported)) => self.http_supported = supported,
            (ProbeKind::Https, ProbeValue::Flag(supported)) => self.https_supported = supported,
            (ProbeKind::Forwarding, ProbeValue::Forwarding(info)) => self.forwarded_domain = info,
            (ProbeKind::Whois, ProbeValue::Whois(age)) => self.domain_info = age,
            (ProbeKind::Blacklist, ProbeValue::Zones(zones)) => self.blacklist_result = zones,
            (ProbeKind::Blocklist, ProbeValue::Zones(zones)) => self.blocklist_result = zones,
            (ProbeKind::Subdomains, ProbeValue::Records(names)) => self.discovered_subdomains = names,
            (kind, value) => warn!(probe = %kind, ?value, "Payload does not match probe, ignoring."),
        }
    }

    /// Takes the payload of one probe back out of the report.
    pub fn into_value(self, kind: ProbeKind) -> ProbeValue {
        match kind {
            ProbeKind::Mx => ProbeValue::Mx(self.mx_records),
            ProbeKind::Spf => ProbeValue::Records(self.spf_records),
            ProbeKind::Dmarc => ProbeValue::Tags(self.dmarc_records),
            ProbeKind::Dkim => ProbeValue::Dkim(self.dkim_records),
            ProbeKind::Bimi => ProbeValue::Tags(self.bimi_record),
            ProbeKind::MtaSts => ProbeValue::Tags(self.mta_sts_records),
            ProbeKind::TlsRpt => ProbeValue::Tags(self.tls_rpt_records),
            ProbeKind::Ns => ProbeValue::Records(self.name_servers),
            ProbeKind::A => ProbeValue::Records(self.a_records),
            ProbeKind::Aaaa => ProbeValue::Records(self.aaaa_records),
            ProbeKind::Http => ProbeValue::Flag(self.http_supported),
            ProbeKind::Https => ProbeValue::Flag(self.https_supported),
            ProbeKind::Forwarding => ProbeValue::Forwarding(self.forwarded_domain),
            ProbeKind::Whois => ProbeValue::Whois(self.domain_info),
            ProbeKind::Blacklist => ProbeValue::Zones(self.blacklist_result),
            ProbeKind::Blocklist => ProbeValue::Zones(self.blocklist_result),
            ProbeKind::Subdomains => ProbeValue::Records(self.discovered_subdomains),
        }
    }
}

// One row of a single-probe endpoint response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DomainProbe {
    pub domain: String,
    pub result: ProbeValue,
}

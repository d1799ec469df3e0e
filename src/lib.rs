// src/lib.rs

//! Bulk domain reconnaissance: DNS email-authentication records, web
//! reachability, WHOIS age, blocklist listings and common subdomains,
//! collected concurrently per domain and served over a JSON API.

pub mod api;
pub mod config;
pub mod core;
pub mod logging;

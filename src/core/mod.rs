// src/core/mod.rs

/// Data structures shared across the crate: probe outcomes, payloads and
/// the per-domain report.
pub mod models;

/// The bounded, error-absorbing probe contract.
pub mod probe;

/// Individual probes grouped by family, and the per-domain aggregator.
pub mod scanner;

/// Batch fan-out with ordered fan-in.
pub mod orchestrator;

/// Input normalization for domain names.
pub mod target;

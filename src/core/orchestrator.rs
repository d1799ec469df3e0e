// src/core/orchestrator.rs

//! Runs per-domain work for a whole batch with a bounded number of domains
//! in flight, returning results in input order.

use futures::stream::{self, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use crate::core::models::{DomainProbe, DomainReport};
use crate::core::probe::ProbeKind;
use crate::core::scanner::{ProbeParams, Scanner};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("domain task aborted: {0}")]
    TaskAborted(#[from] JoinError),
}

// A spawned domain task that is aborted when its handle is dropped, so a
// batch abandoned by its caller stops probing.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    scanner: Arc<Scanner>,
    concurrency: usize,
}

impl Orchestrator {
    pub fn new(scanner: Arc<Scanner>, concurrency: usize) -> Self {
        Self { scanner, concurrency: concurrency.max(1) }
    }

    /// Applies `work` to every domain, each on its own task, with at most
    /// `concurrency` tasks alive. Output is index-aligned with `domains`.
    ///
    /// A task that panics fails the whole batch; there is no partial result.
    /// Dropping the returned future aborts every task still running.
    pub async fn run<T, F, Fut>(&self, domains: Vec<String>, work: F) -> Result<Vec<T>, BatchError>
    where
        F: Fn(Arc<Scanner>, String) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let total = domains.len();
        info!(domains = total, concurrency = self.concurrency, "Starting batch.");

        let results: Vec<Result<T, JoinError>> = stream::iter(domains)
            .map(|domain| AbortOnDrop(tokio::spawn(work(Arc::clone(&self.scanner), domain))))
            .buffered(self.concurrency)
            .collect()
            .await;

        let results = results.into_iter().collect::<Result<Vec<T>, _>>().map_err(|e| {
            error!(error = %e, "Domain task failed, abandoning batch.");
            BatchError::from(e)
        })?;

        info!(domains = total, "Batch finished.");
        Ok(results)
    }

    /// The full report for every domain.
    pub async fn scan_all(&self, domains: Vec<String>, params: ProbeParams) -> Result<Vec<DomainReport>, BatchError> {
        let params = Arc::new(params);
        self.run(domains, move |scanner, domain| {
            let params = Arc::clone(&params);
            async move { scanner.scan_domain(&domain, ProbeKind::FULL, &params).await }
        })
        .await
    }

    /// A single probe for every domain, paired with the domain it ran for.
    pub async fn probe_all(
        &self,
        kind: ProbeKind,
        domains: Vec<String>,
        params: ProbeParams,
    ) -> Result<Vec<DomainProbe>, BatchError> {
        let params = Arc::new(params);
        self.run(domains, move |scanner, domain| {
            let params = Arc::clone(&params);
            async move {
                let result = scanner.scan_domain(&domain, &[kind], &params).await.into_value(kind);
                DomainProbe { domain, result }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ProbeValue;
    use crate::core::scanner::testing::{scanner, FakeDns, FakeWhois};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn orchestrator(dns: FakeDns, concurrency: usize) -> Orchestrator {
        Orchestrator::new(Arc::new(scanner(dns, FakeWhois::default())), concurrency)
    }

    #[tokio::test(start_paused = true)]
    async fn output_follows_input_order() {
        let orchestrator = orchestrator(FakeDns::default(), 8);
        let domains: Vec<String> = (0..20).map(|i| format!("d{i}.example")).collect();

        // Earlier domains finish later.
        let results = orchestrator
            .run(domains.clone(), |_, domain| async move {
                let index: u64 = domain[1..domain.find('.').unwrap()].parse().unwrap();
                tokio::time::sleep(Duration::from_millis(100 * (20 - index))).await;
                domain
            })
            .await
            .unwrap();

        assert_eq!(results, domains);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_bounded() {
        let orchestrator = orchestrator(FakeDns::default(), 2);
        let domains: Vec<String> = (0..6).map(|i| format!("d{i}.example")).collect();

        let started = Instant::now();
        orchestrator
            .run(domains, |_, _| async { tokio::time::sleep(Duration::from_secs(1)).await })
            .await
            .unwrap();

        // Six one-second jobs, two at a time.
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn a_panicking_domain_fails_the_batch() {
        let orchestrator = orchestrator(FakeDns::default(), 4);
        let domains = vec!["ok.example".to_string(), "boom.example".to_string()];

        let result = orchestrator
            .run(domains, |_, domain| async move {
                if domain.starts_with("boom") {
                    panic!("probe glue exploded");
                }
                domain
            })
            .await;

        assert!(matches!(result, Err(BatchError::TaskAborted(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_batch_aborts_running_domains() {
        let orchestrator = orchestrator(FakeDns::default(), 4);
        let finished = Arc::new(AtomicUsize::new(0));
        let domains: Vec<String> = (0..4).map(|i| format!("d{i}.example")).collect();

        let counter = Arc::clone(&finished);
        let batch = orchestrator.run(domains, move |_, _| {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        // The caller gives up (client disconnect) long before the tasks finish.
        assert!(tokio::time::timeout(Duration::from_secs(1), batch).await.is_err());
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn duplicates_and_failures_keep_their_slots() {
        let dns = FakeDns::default()
            .with_mx("good.example", &[("mx.good.example", 5)])
            .with_servfail("flaky.example");
        let orchestrator = orchestrator(dns, 4);
        let domains = vec![
            "good.example".to_string(),
            "flaky.example".to_string(),
            "good.example".to_string(),
            "???".to_string(),
        ];

        let rows = orchestrator
            .probe_all(ProbeKind::Mx, domains.clone(), ProbeParams::default())
            .await
            .unwrap();

        assert_eq!(rows.len(), domains.len());
        for (row, domain) in rows.iter().zip(&domains) {
            assert_eq!(&row.domain, domain);
        }
        assert!(matches!(&rows[0].result, ProbeValue::Mx(records) if records.len() == 1));
        assert_eq!(rows[1].result, ProbeValue::Mx(Vec::new()));
        assert_eq!(rows[3].result, ProbeValue::Mx(Vec::new()));
    }
}

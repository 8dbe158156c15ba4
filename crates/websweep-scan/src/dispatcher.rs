//! Bounded probe dispatch.
//!
//! Spawns one tokio task per target. A semaphore permit is acquired before
//! each spawn and moved into the task, so at most `max_concurrency` probes
//! are in flight and enumeration stalls while the pool is saturated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use websweep_core::{ProbeOutcome, ScanConfig, ScanTarget};

use crate::error::Result;
use crate::probe::{probe_host, Probe};

/// What a single `dispatch` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Targets handed to a probe task.
    pub dispatched: usize,
    /// Outcomes written to the result stream.
    pub emitted: usize,
    /// Probe tasks that panicked instead of producing an outcome.
    pub panicked: usize,
    /// Most unfinished probe tasks held at once.
    pub peak_pending: usize,
    pub duration: Duration,
}

impl DispatchReport {
    fn record(&mut self, joined: std::result::Result<bool, JoinError>) {
        match joined {
            Ok(true) => self.emitted += 1,
            Ok(false) => {}
            Err(e) => {
                self.panicked += 1;
                tracing::error!(error = %e, "Probe task panicked");
            }
        }
    }
}

/// Runs probes with bounded parallelism and writes outcomes to a stream.
pub struct Dispatcher {
    probe: Arc<dyn Probe>,
    config: Arc<ScanConfig>,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(probe: Arc<dyn Probe>, config: Arc<ScanConfig>) -> Result<Self> {
        config.validate()?;
        let permits = Arc::new(Semaphore::new(config.max_concurrency));
        Ok(Self {
            probe,
            config,
            permits,
        })
    }

    /// Probe every target exactly once.
    ///
    /// Returns only after every spawned task has finished and released its
    /// permit. Failed targets are written to `results` only when the
    /// configuration asks for them.
    pub async fn dispatch<I>(
        &self,
        targets: I,
        results: &UnboundedSender<ProbeOutcome>,
    ) -> DispatchReport
    where
        I: IntoIterator<Item = ScanTarget>,
    {
        let start = Instant::now();
        let mut tasks = JoinSet::new();
        let mut report = DispatchReport::default();

        for target in targets {
            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                tracing::error!(%target, "Permit pool closed, stopping dispatch");
                break;
            };

            let probe = self.probe.clone();
            let config = self.config.clone();
            let results = results.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let outcome = probe_host(probe.as_ref(), target, &config).await;

                if !outcome.success && !config.emit_failures() {
                    return false;
                }
                match results.send(outcome) {
                    Ok(()) => true,
                    Err(unsent) => {
                        tracing::warn!(target = %unsent.0.target, "Result stream closed, outcome lost");
                        false
                    }
                }
            });
            report.dispatched += 1;

            // Reap finished tasks as we go so a /16 never holds every task.
            while let Some(joined) = tasks.try_join_next() {
                report.record(joined);
            }
            report.peak_pending = report.peak_pending.max(tasks.len());
        }

        while let Some(joined) = tasks.join_next().await {
            report.record(joined);
        }

        report.duration = start.elapsed();
        report
    }

    /// Permits currently free. Equals `max_concurrency` whenever no
    /// dispatch is running.
    #[cfg(test)]
    fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use websweep_core::{NetworkPrefix, Protocol};

    use super::*;
    use crate::enumerate::default_range;
    use crate::probe::ProbeFailure;

    /// Tracks how many attempts overlap and how often each target is seen.
    #[derive(Default)]
    struct CountingProbe {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
        seen: Mutex<HashMap<ScanTarget, usize>>,
        reachable_octet: Option<u8>,
    }

    #[async_trait]
    impl Probe for CountingProbe {
        async fn attempt(
            &self,
            target: ScanTarget,
            _protocol: Protocol,
        ) -> std::result::Result<(), ProbeFailure> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap().entry(target).or_default() += 1;

            tokio::time::sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.reachable_octet {
                Some(octet) if target.addr().octets()[3] != octet => {
                    Err(ProbeFailure::Connect("refused".to_string()))
                }
                _ => Ok(()),
            }
        }
    }

    fn single_protocol(max_concurrency: usize, debug: bool) -> Arc<ScanConfig> {
        Arc::new(ScanConfig {
            max_concurrency,
            debug,
            protocols: vec![Protocol::Http],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn never_exceeds_max_concurrency() {
        let probe = Arc::new(CountingProbe::default());
        let dispatcher = Dispatcher::new(probe.clone(), single_protocol(8, false)).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let range = default_range(NetworkPrefix::TwentyFour([10, 0, 0]));
        let report = dispatcher.dispatch(range.iter(), &tx).await;
        drop(tx);

        assert_eq!(report.dispatched, 254);
        assert_eq!(report.emitted, 254);
        assert_eq!(report.panicked, 0);
        assert!(probe.peak.load(Ordering::SeqCst) <= 8);

        let seen = probe.seen.lock().unwrap();
        assert_eq!(seen.len(), 254);
        assert!(seen.values().all(|&n| n == 1));
        drop(seen);

        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 254);
    }

    #[tokio::test]
    async fn finished_tasks_are_reaped_while_dispatching() {
        let probe = Arc::new(CountingProbe::default());
        let dispatcher = Dispatcher::new(probe, single_protocol(8, false)).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        let targets = (1..=10u8)
            .flat_map(|c| (1..=254u8).map(move |d| ScanTarget(Ipv4Addr::new(10, 1, c, d))));
        let report = dispatcher.dispatch(targets, &tx).await;

        assert_eq!(report.dispatched, 10 * 254);
        assert_eq!(report.emitted, 10 * 254);
        assert!(report.peak_pending <= 8, "held {} tasks", report.peak_pending);
    }

    #[tokio::test]
    async fn single_permit_runs_sequentially() {
        let probe = Arc::new(CountingProbe::default());
        let dispatcher = Dispatcher::new(probe.clone(), single_protocol(1, false)).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        let targets = (1..=10).map(|d| ScanTarget(Ipv4Addr::new(10, 0, 0, d)));
        let report = dispatcher.dispatch(targets, &tx).await;

        assert_eq!(report.dispatched, 10);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 10);
        assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permits_all_returned_after_dispatch() {
        let probe = Arc::new(CountingProbe::default());
        let dispatcher = Dispatcher::new(probe, single_protocol(4, true)).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        let targets = (1..=20).map(|d| ScanTarget(Ipv4Addr::new(10, 0, 1, d)));
        dispatcher.dispatch(targets, &tx).await;

        assert_eq!(dispatcher.available_permits(), 4);
    }

    #[tokio::test]
    async fn failures_only_emitted_in_debug() {
        let quiet = Arc::new(CountingProbe {
            reachable_octet: Some(5),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(quiet, single_protocol(16, false)).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let report = dispatcher
            .dispatch(default_range(NetworkPrefix::TwentyFour([10, 0, 0])).iter(), &tx)
            .await;
        assert_eq!(report.emitted, 1);

        let verbose = Arc::new(CountingProbe {
            reachable_octet: Some(5),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(verbose, single_protocol(16, true)).unwrap();
        let report = dispatcher
            .dispatch(default_range(NetworkPrefix::TwentyFour([10, 0, 0])).iter(), &tx)
            .await;
        assert_eq!(report.emitted, 254);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let probe: Arc<dyn Probe> = Arc::new(CountingProbe::default());
        assert!(Dispatcher::new(probe, single_protocol(0, false)).is_err());
    }
}

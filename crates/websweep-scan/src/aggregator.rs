//! Result stream consumer.
//!
//! Exactly one aggregator drains the outcome channel while probes are still
//! running. It stops when every sender has been dropped and the buffer is
//! empty, so closing the channel is the only termination signal.

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use websweep_core::ProbeOutcome;

use crate::error::Result;
use crate::sink::ResultSink;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateSummary {
    /// Outcomes taken off the stream.
    pub received: usize,
    /// Outcomes that passed the display filter and reached the sink.
    pub displayed: usize,
    /// Received outcomes with `success == true`.
    pub reachable: usize,
}

/// Non-debug runs only surface reachable hosts.
pub fn is_visible(outcome: &ProbeOutcome, debug: bool) -> bool {
    debug || outcome.success
}

/// Drain `results` into `sink` until the stream closes.
///
/// A sink error does not stop the drain: the remaining outcomes are still
/// counted, and the first error is returned once the stream is empty.
pub async fn aggregate<S: ResultSink>(
    mut results: UnboundedReceiver<ProbeOutcome>,
    mut sink: S,
    debug: bool,
) -> Result<AggregateSummary> {
    let mut summary = AggregateSummary::default();
    let mut first_error = None;

    while let Some(outcome) = results.recv().await {
        summary.received += 1;
        if outcome.success {
            summary.reachable += 1;
        }
        if !is_visible(&outcome, debug) || first_error.is_some() {
            continue;
        }

        match sink.emit(&outcome) {
            Ok(()) => summary.displayed += 1,
            Err(e) => {
                tracing::error!(error = %e, "Result sink failed, further output suppressed");
                first_error = Some(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    sink.flush()?;

    tracing::debug!(
        received = summary.received,
        displayed = summary.displayed,
        reachable = summary.reachable,
        "Result stream drained"
    );
    Ok(summary)
}

/// Run [`aggregate`] on its own task.
pub fn spawn_aggregator<S>(
    results: UnboundedReceiver<ProbeOutcome>,
    sink: S,
    debug: bool,
) -> JoinHandle<Result<AggregateSummary>>
where
    S: ResultSink + 'static,
{
    tokio::spawn(aggregate(results, sink, debug))
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::net::Ipv4Addr;

    use tokio::sync::mpsc;

    use websweep_core::{Protocol, ScanTarget};

    use super::*;
    use crate::error::ScanError;
    use crate::sink::MemorySink;

    fn outcome(last: u8, success: bool) -> ProbeOutcome {
        let target = ScanTarget(Ipv4Addr::new(10, 0, 0, last));
        if success {
            ProbeOutcome::reachable(target, Protocol::Http)
        } else {
            ProbeOutcome::unreachable(target, Protocol::Https, "refused")
        }
    }

    #[tokio::test]
    async fn non_debug_surfaces_only_successes() {
        let (tx, rx) = mpsc::unbounded_channel();
        for last in 1..=10 {
            tx.send(outcome(last, last % 2 == 0)).unwrap();
        }
        drop(tx);

        let sink = MemorySink::default();
        let summary = aggregate(rx, sink.clone(), false).await.unwrap();

        assert_eq!(summary.received, 10);
        assert_eq!(summary.displayed, 5);
        assert_eq!(summary.reachable, 5);
        assert!(sink.outcomes().iter().all(|o| o.success));
    }

    #[tokio::test]
    async fn debug_surfaces_everything() {
        let (tx, rx) = mpsc::unbounded_channel();
        for last in 1..=10 {
            tx.send(outcome(last, last == 3)).unwrap();
        }
        drop(tx);

        let sink = MemorySink::default();
        let summary = aggregate(rx, sink.clone(), true).await.unwrap();

        assert_eq!(summary.displayed, 10);
        assert_eq!(sink.outcomes().len(), 10);
    }

    #[tokio::test]
    async fn drains_buffer_after_senders_close() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_aggregator(rx, MemorySink::default(), false);

        let producers: Vec<_> = (1..=50)
            .map(|last| {
                let tx = tx.clone();
                tokio::spawn(async move { tx.send(outcome(last, true)).unwrap() })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }
        drop(tx);

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.received, 50);
        assert_eq!(summary.displayed, 50);
    }

    struct BrokenSink;

    impl ResultSink for BrokenSink {
        fn emit(&mut self, _outcome: &ProbeOutcome) -> Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed").into())
        }
    }

    #[tokio::test]
    async fn sink_failure_still_drains_stream() {
        let (tx, rx) = mpsc::unbounded_channel();
        for last in 1..=5 {
            tx.send(outcome(last, true)).unwrap();
        }
        drop(tx);

        let result = aggregate(rx, BrokenSink, false).await;
        assert!(matches!(result, Err(ScanError::Io(_))));
    }
}

//! Sweep orchestration: enumerate → dispatch → aggregate.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use websweep_core::{ScanConfig, SweepError};

use crate::aggregator::{spawn_aggregator, AggregateSummary};
use crate::dispatcher::Dispatcher;
use crate::enumerate::AddressRange;
use crate::error::Result;
use crate::probe::Probe;
use crate::sink::ResultSink;

/// Totals for one sweep across all of its ranges.
#[derive(Debug, Clone)]
pub struct SweepSummary {
    pub scan_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ranges: usize,
    pub targets: usize,
    pub panicked: usize,
    pub results: AggregateSummary,
    pub duration: std::time::Duration,
}

/// Sweep every range in order, streaming outcomes into `sink`.
///
/// The result stream is closed only after the last range has been fully
/// dispatched, and this returns only after the aggregator has drained it.
pub async fn run_sweep<S>(
    ranges: &[AddressRange],
    config: ScanConfig,
    probe: Arc<dyn Probe>,
    sink: S,
) -> Result<SweepSummary>
where
    S: ResultSink + 'static,
{
    if ranges.is_empty() {
        return Err(SweepError::NoPrefixes.into());
    }
    config.validate()?;

    let scan_id = Uuid::new_v4();
    let started_at = Utc::now();
    let start = Instant::now();
    let debug = config.debug;
    let dispatcher = Dispatcher::new(probe, Arc::new(config))?;

    tracing::info!(
        scan_id = %scan_id,
        started_at = %started_at.to_rfc3339(),
        ranges = ranges.len(),
        "Sweep started"
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let aggregator = spawn_aggregator(rx, sink, debug);

    let mut targets = 0;
    let mut panicked = 0;
    for range in ranges {
        tracing::info!(
            scan_id = %scan_id,
            prefix = %range.prefix(),
            targets = range.len(),
            "Scanning local IP range"
        );

        let report = dispatcher.dispatch(range.iter(), &tx).await;
        targets += report.dispatched;
        panicked += report.panicked;

        tracing::info!(
            scan_id = %scan_id,
            prefix = %range.prefix(),
            probed = report.dispatched,
            emitted = report.emitted,
            duration_ms = report.duration.as_millis(),
            "Range complete"
        );
    }

    drop(tx);
    let results = aggregator.await??;

    let summary = SweepSummary {
        scan_id,
        started_at,
        ranges: ranges.len(),
        targets,
        panicked,
        results,
        duration: start.elapsed(),
    };

    tracing::info!(
        scan_id = %scan_id,
        targets = summary.targets,
        reachable = summary.results.reachable,
        duration_ms = summary.duration.as_millis(),
        "Sweep complete"
    );

    Ok(summary)
}

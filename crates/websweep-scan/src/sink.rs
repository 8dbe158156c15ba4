//! Destinations for displayed probe outcomes.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use websweep_core::ProbeOutcome;

use crate::error::Result;

/// Receives every outcome that passes the display filter, in arrival order.
pub trait ResultSink: Send {
    fn emit(&mut self, outcome: &ProbeOutcome) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// ── Terminal ──────────────────────────────────────────────────────

/// Colorized `<ip> [✓] (<protocol>)` lines.
pub struct TerminalSink<W> {
    out: W,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ResultSink for TerminalSink<W> {
    fn emit(&mut self, outcome: &ProbeOutcome) -> Result<()> {
        writeln!(self.out, "{}", format_line(outcome))?;
        self.out.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

pub fn format_line(outcome: &ProbeOutcome) -> String {
    if outcome.success {
        format!("{} [{}] ({})", outcome.target, "✓".green(), outcome.protocol)
    } else {
        let mut line = format!("{} [{}] ({})", outcome.target, "X".red(), outcome.protocol);
        if let Some(detail) = &outcome.detail {
            line.push_str(" - ");
            line.push_str(detail);
        }
        line
    }
}

// ── JSON lines ────────────────────────────────────────────────────

#[derive(Serialize)]
struct Record<'a> {
    #[serde(flatten)]
    outcome: &'a ProbeOutcome,
    observed_at: DateTime<Utc>,
}

/// One JSON object per line, for piping into other tools.
pub struct JsonLinesSink<W> {
    out: W,
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ResultSink for JsonLinesSink<W> {
    fn emit(&mut self, outcome: &ProbeOutcome) -> Result<()> {
        let record = Record {
            outcome,
            observed_at: Utc::now(),
        };
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

// ── Memory ────────────────────────────────────────────────────────

/// Collects outcomes in memory. Clones share the same buffer, so a handle
/// kept by the caller sees what the aggregator wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    outcomes: Arc<Mutex<Vec<ProbeOutcome>>>,
}

impl MemorySink {
    pub fn outcomes(&self) -> Vec<ProbeOutcome> {
        self.outcomes
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default()
    }
}

impl ResultSink for MemorySink {
    fn emit(&mut self, outcome: &ProbeOutcome) -> Result<()> {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push(outcome.clone());
        }
        Ok(())
    }
}

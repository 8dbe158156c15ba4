//! CLI entry point for the websweep web-host scanner.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use websweep_core::{NetworkPrefix, Protocol};

use websweep_scan::config::{self, OutputFormat, SweepSettings};
use websweep_scan::engine::run_sweep;
use websweep_scan::enumerate::{default_range, AddressRange};
use websweep_scan::interfaces::discover_prefixes;
use websweep_scan::nmap::NmapScanner;
use websweep_scan::probe::HttpProbe;
use websweep_scan::sink::{JsonLinesSink, TerminalSink};

#[derive(Parser)]
#[command(name = "websweep")]
#[command(about = "Find live web servers on local IPv4 networks")]
struct Cli {
    /// Show unreachable hosts and probe errors.
    #[arg(long)]
    debug: bool,

    /// Maximum concurrent probes.
    #[arg(long, alias = "maxconcurrent")]
    max_concurrency: Option<usize>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Prefix to sweep instead of discovering local ones (e.g. 192.168, 10.0.0/24). Repeatable.
    #[arg(short, long = "prefix")]
    prefixes: Vec<NetworkPrefix>,

    /// Protocol to try, in order. Repeatable. Defaults to http then https.
    #[arg(long = "protocol")]
    protocols: Vec<Protocol>,

    /// Write results as JSON lines.
    #[arg(long)]
    json: bool,

    /// Write logs as JSON.
    #[arg(long)]
    log_json: bool,

    /// Port-scan localhost with nmap before sweeping.
    #[arg(long)]
    nmap_localhost: bool,

    /// Config file prefix (default: websweep).
    #[arg(short, long, default_value = "websweep")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut settings = config::load(&cli.config)?;
    apply_overrides(&mut settings, &cli);
    let scan_config = settings.scan_config()?;

    let prefixes = if settings.prefixes.is_empty() {
        tracing::info!("Determining local IP ranges");
        discover_prefixes(&settings).await?
    } else {
        settings.prefixes.clone()
    };
    let ranges: Vec<AddressRange> = prefixes.into_iter().map(default_range).collect();

    if cli.nmap_localhost {
        scan_localhost(&settings.nmap_path).await;
    }

    let probe = Arc::new(HttpProbe::new(scan_config.request_timeout)?);
    let summary = match settings.output {
        OutputFormat::Text => run_sweep(&ranges, scan_config, probe, TerminalSink::stdout()).await?,
        OutputFormat::Json => run_sweep(&ranges, scan_config, probe, JsonLinesSink::stdout()).await?,
    };

    if summary.panicked > 0 {
        tracing::warn!(panicked = summary.panicked, "Some probe tasks panicked");
    }

    Ok(())
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn apply_overrides(settings: &mut SweepSettings, cli: &Cli) {
    settings.debug |= cli.debug;
    if let Some(max) = cli.max_concurrency {
        settings.max_concurrency = max;
    }
    if let Some(secs) = cli.timeout {
        settings.request_timeout_secs = secs;
    }
    if !cli.prefixes.is_empty() {
        settings.prefixes = cli.prefixes.clone();
    }
    if !cli.protocols.is_empty() {
        settings.protocols = cli.protocols.clone();
    }
    if cli.json {
        settings.output = OutputFormat::Json;
    }
}

async fn scan_localhost(nmap_path: &str) {
    let scanner = NmapScanner::new(nmap_path);
    match scanner.verify_installation().await {
        Ok(version) => tracing::info!(nmap_version = %version.lines().next().unwrap_or_default(), "Nmap verified"),
        Err(e) => {
            tracing::warn!(error = %e, "Skipping localhost port scan");
            return;
        }
    }

    match scanner.scan_localhost().await {
        Ok(report) => {
            for port in report.open_ports {
                println!(
                    "localhost:{}/{} open {}",
                    port.port,
                    port.protocol,
                    port.service.as_deref().unwrap_or("unknown")
                );
            }
        }
        Err(e) => tracing::error!(error = %e, "Error running nmap"),
    }
}

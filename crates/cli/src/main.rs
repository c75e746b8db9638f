mod config;
mod telemetry;

use std::io::{self, Write};
use std::process;

use clap::{Parser, ValueEnum};
use sieve_core::{reconcile, Report};
use sieve_etcd::{EtcdV2Client, EtcdV3Client, Transport};
use tracing::info;

use crate::config::{RunArgs, Settings};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Deletes etcd v3 keys that have no counterpart in the etcd v2 key tree.
#[derive(Parser)]
#[command(
    name = "sieve-v3keys",
    version,
    about = "Delete etcd v3 keys that are not present in etcd v2"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Only log errors; fatal errors are still printed
    #[arg(long, global = true)]
    quiet: bool,

    /// Log filter, e.g. "info" or "sieve_core=debug" (RUST_LOG takes precedence)
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(flatten)]
    run: RunArgs,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "error" } else { "warn" };
    telemetry::init(cli.log_level.as_deref().unwrap_or(default_level));

    let settings = match Settings::load(&cli.run) {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("error: {e}"), cli.output);
            process::exit(1);
        }
    };

    let report = match run(&settings) {
        Ok(report) => report,
        Err(msg) => {
            report_error(&msg, cli.output);
            process::exit(1);
        }
    };

    if let Err(e) = print_report(&report, cli.output) {
        report_error(&format!("error: could not write report: {e}"), cli.output);
        process::exit(1);
    }
}

/// Build the clients and drive one reconciliation on a current-thread runtime.
fn run(settings: &Settings) -> Result<Report, String> {
    let transport = Transport::connect(&settings.client).map_err(|e| format!("error: {e}"))?;
    let v2 = EtcdV2Client::new(transport.clone());
    let v3 = EtcdV3Client::new(transport);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("error: could not start runtime: {e}"))?;

    let report = runtime
        .block_on(reconcile(&v2, &v3, &settings.run))
        .map_err(|e| format!("error: {e}"))?;

    info!(
        orphans = report.orphan_count(),
        deleted = report.deleted_count(),
        failed = report.failed_count(),
        dry_run = report.dry_run,
        "run complete"
    );
    Ok(report)
}

fn print_report(report: &Report, output: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match output {
        OutputFormat::Text => report.render_text(&mut out)?,
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
            writeln!(out, "{json}")?;
        }
    }
    out.flush()
}

/// Print a fatal error to stderr in the requested output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat) {
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

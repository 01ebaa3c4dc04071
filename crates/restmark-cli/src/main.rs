use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use restmark_core::orchestrator::{RunConfig, RunContext};
use restmark_core::report::{chart, export, ComparisonReport};
use restmark_core::target::Target;
use restmark_core::RestmarkError;

const EXIT_CONFIG: u8 = 2;
const EXIT_UNREACHABLE: u8 = 3;

/// Comparative CRUD benchmark for identical REST backends.
#[derive(Debug, Parser)]
#[command(name = "restmark", version, about)]
struct Args {
    /// Backend under test as NAME=URL; repeat once per target.
    #[arg(short, long = "target", value_name = "NAME=URL", required = true)]
    targets: Vec<String>,

    /// Requests per target for full-volume phases.
    #[arg(short, long, default_value_t = 1000)]
    requests: usize,

    /// Maximum simultaneously in-flight requests per batch.
    #[arg(short, long, default_value_t = 50)]
    concurrency: usize,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Path for the persisted JSON comparison report.
    #[arg(short, long, default_value = "comparison_report.json")]
    output: PathBuf,

    /// Optional path for a CSV rendition of the per-phase results.
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Optional path for a PNG chart of RPS per phase per target.
    #[arg(long, value_name = "PATH")]
    chart: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = std::env::var("RESTMARK_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| {
                if verbose {
                    EnvFilter::new("debug")
                } else {
                    EnvFilter::new("info")
                }
            },
            |value| EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new("info")),
        );

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {err}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    run(args).await
}

async fn run(args: Args) -> ExitCode {
    let timeout = Duration::from_secs(args.timeout_secs);

    let mut targets = Vec::with_capacity(args.targets.len());
    for spec in &args.targets {
        match Target::from_spec(spec, timeout) {
            Ok(target) => targets.push(target),
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::from(EXIT_CONFIG);
            }
        }
    }

    let config = RunConfig {
        requests: args.requests,
        concurrency: args.concurrency,
        timeout,
    };

    let context = match RunContext::new(targets, config) {
        Ok(context) => context,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // Ctrl-C stops admission of new requests; in-flight calls finish or time
    // out on their own so their measurements stay valid.
    let cancel = context.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received — finishing in-flight requests and stopping");
            cancel.cancel();
        }
    });

    let outcome = match context.execute().await {
        Ok(outcome) => outcome,
        Err(err @ RestmarkError::NoReachableTargets) => {
            eprintln!("{err}");
            return ExitCode::from(EXIT_UNREACHABLE);
        }
        Err(err @ RestmarkError::Config(_)) => {
            eprintln!("{err}");
            return ExitCode::from(EXIT_CONFIG);
        }
        Err(err) => {
            eprintln!("benchmark run failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let report = ComparisonReport::from_outcome(&outcome);
    println!("{}", export::render_summary(&report));

    if let Err(err) = export::write_json(&report, &args.output) {
        eprintln!("failed to write report to {}: {err}", args.output.display());
        return ExitCode::FAILURE;
    }
    println!("Report written to {}", args.output.display());

    if let Some(csv_path) = &args.csv {
        match export::write_csv(&report, csv_path) {
            Ok(()) => println!("CSV written to {}", csv_path.display()),
            Err(err) => tracing::error!(error = %err, "failed to write CSV artifact"),
        }
    }

    if let Some(chart_path) = &args.chart {
        match chart::plot_rps_comparison(&report, chart_path) {
            Ok(()) => println!("Chart written to {}", chart_path.display()),
            Err(err) => tracing::error!(error = %err, "failed to render chart"),
        }
    }

    ExitCode::SUCCESS
}

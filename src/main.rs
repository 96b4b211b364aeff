mod config;
mod error;
mod launcher;
mod report;
mod tracker;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::QueryError;
use report::ReportOptions;
use tracker::{TrackerOrchestrator, TrackerRunner};

/// Query multiple slots for unchecked locations using Universal Tracker.
#[derive(Debug, Parser)]
#[command(name = "checks-mix", version)]
struct Cli {
    /// Archipelago server to connect to
    server: String,

    /// Password to use when connecting
    #[arg(short, long)]
    password: Option<String>,

    /// Slot to check. Can be passed multiple times.
    #[arg(short, long = "slot", required = true)]
    slots: Vec<String>,

    /// Path to the ArchipelagoLauncher executable. Autodetected by default.
    #[arg(short = 'a', long)]
    ap_launcher: Option<PathBuf>,

    /// Print the number of unchecked locations only
    #[arg(short, long)]
    count: bool,

    /// Print total number of unchecked locations
    #[arg(short, long)]
    total: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Per-slot timeout in seconds
    #[arg(long, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// Config file (default: <config dir>/checks-mix/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err("timeout must be positive".into());
    }
    Ok(Duration::from_secs_f64(secs))
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    debug!("using config {:?}", config);

    let launcher = launcher::resolve(cli.ap_launcher, config.launcher.clone())?;
    let runner = TrackerRunner::new(
        cli.timeout.unwrap_or_else(|| config.timeout()),
        config.noise_filter(),
    );

    let result = TrackerOrchestrator::new(runner)
        .query(&cli.server, cli.slots.as_slice(), &launcher, cli.password.as_deref())
        .await?;

    let options = ReportOptions {
        count_only: cli.count,
        print_total: cli.total,
    };
    if cli.json {
        println!("{}", report::render_json(&result, options)?);
    } else {
        print!("{}", report::render_text(&result, options));
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            if let Some(QueryError::Slot { source, .. }) = err.downcast_ref::<QueryError>() {
                if let Some(stderr) = source.stderr() {
                    eprintln!("tracker stderr:\n{}", stderr.trim_end());
                }
            }
            ExitCode::FAILURE
        }
    }
}

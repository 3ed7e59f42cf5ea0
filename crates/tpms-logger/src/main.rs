//! Desktop logger for BLE tyre pressure sensors.
//!
//! Runs a tpms-core session against a simulated sensor feed and the local
//! file system, and exposes the gap filler and payload decoder as standalone
//! commands.
//!
//! ```bash
//! # Record one simulated hour (instantly) into the configured log
//! tpms-logger run --duration-secs 3600
//!
//! # Same, but in real time and with a baseline over minutes 3..9
//! tpms-logger -v run --realtime --baseline 3 9
//!
//! # Let the baseline settle by itself after a minute without changes
//! tpms-logger run --stable-baseline 60
//!
//! # Interpolate gaps in an existing log
//! tpms-logger fill test.txt
//!
//! # Decode one manufacturer payload
//! tpms-logger decode 0001000000000000fd0c0300e8080000
//! ```

mod config;
mod display;
mod feed;
mod fs_store;
mod run;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use embassy_time::{Duration, Instant};
use log::info;

use tpms_core::config::BaselineSource;
use tpms_core::session::{DisplayLayout, Session};
use tpms_core::storage::{Record, Store, fill_gaps};

use feed::SimulatedFeed;
use fs_store::FsStore;
use run::{Clock, RunOptions};

#[derive(Parser)]
#[command(name = "tpms-logger")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a run from the simulated sensors
    Run {
        /// How long to record for
        #[arg(short, long, default_value = "3600")]
        duration_secs: u64,

        /// Follow the wall clock instead of simulating time
        #[arg(long)]
        realtime: bool,

        /// Replace a log file that already holds data
        #[arg(long)]
        overwrite: bool,

        /// Baseline interval in the configured time unit
        #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
        baseline: Option<Vec<f32>>,

        /// Take the baseline once readings hold still for this many seconds
        #[arg(long, value_name = "SECS", conflicts_with = "baseline")]
        stable_baseline: Option<u64>,

        /// Silence one sensor in every n-th dropout burst (0 disables)
        #[arg(long, default_value = "4")]
        dropout_every: u64,

        /// Fail every n-th scan (0 disables)
        #[arg(long, default_value = "97")]
        transport_error_every: u64,

        /// Log the charts every n windows (0 disables)
        #[arg(long, default_value = "5")]
        report_every: usize,
    },

    /// Fill interior gaps of an existing log
    Fill {
        /// Log file to rewrite in place
        #[arg(value_name = "LOG")]
        path: PathBuf,
    },

    /// Decode a manufacturer payload with the configured calibration
    Decode {
        /// Hex payload, at least 32 characters
        #[arg(value_name = "HEX")]
        payload: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            duration_secs,
            realtime,
            overwrite,
            baseline,
            stable_baseline,
            dropout_every,
            transport_error_every,
            report_every,
        } => {
            if let Some(hold_secs) = stable_baseline {
                config.baseline = BaselineSource::Stable { hold_secs };
                config
                    .validate()
                    .map_err(|e| anyhow!("Invalid --stable-baseline: {e}"))?;
            }
            let feed = SimulatedFeed::from_config(&config)
                .with_dropouts(dropout_every)
                .with_transport_errors(transport_error_every);
            let step = config.scan_window();
            let mut clock = if realtime {
                Clock::Realtime { step }
            } else {
                Clock::Simulated {
                    now: Instant::from_secs(0),
                    step,
                }
            };
            let options = RunOptions {
                duration: Duration::from_secs(duration_secs),
                overwrite,
                baseline: baseline.and_then(|bounds| match bounds[..] {
                    [from, to] => Some((from, to)),
                    _ => None,
                }),
                report_every,
            };

            let file_name = config.file_name.clone();
            let mut session = Session::new(config, feed, FsStore::new("."), DisplayLayout::default());
            let report = run::run(&mut session, &mut clock, &options)?;
            println!(
                "{}: {} rows, {} cells filled, {} left missing",
                file_name, report.rows, report.fill.filled, report.fill.unfilled
            );
        }

        Commands::Fill { path } => {
            let path = path.to_string_lossy();
            let mut store = FsStore::new(".");
            let text = store.read(&path).map_err(|e| anyhow!("{e}"))?;
            let mut record =
                Record::parse(&text, &config.filler).map_err(|e| anyhow!("{path}: {e}"))?;

            let report = fill_gaps(&mut record, &[]);
            store
                .write(&path, &record.to_text(&config.filler))
                .map_err(|e| anyhow!("{e}"))?;
            info!("Rewrote {}", path);
            println!(
                "{}: {} cells filled, {} left missing",
                path, report.filled, report.unfilled
            );
        }

        Commands::Decode { payload } => {
            let reading = config
                .calibration
                .decode_reading(payload.trim())
                .map_err(|e| anyhow!("{e}"))?;
            println!("{:.1} psi, {:.1} °C", reading.pressure, reading.temperature);
        }
    }

    Ok(())
}

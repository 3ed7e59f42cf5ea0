//! The `run` command: drive a session until its duration has elapsed

use anyhow::{Result, anyhow, bail};
use embassy_time::{Duration, Instant};
use log::{info, warn};

use tpms_core::graph::{DataPoint, Viewport};
use tpms_core::sensors::SensorFeed;
use tpms_core::session::{ClickOutcome, Overwrite, Session, SessionError, StopReport};
use tpms_core::storage::Store;

use crate::display::log_snapshot;

/// Where tick times come from
pub enum Clock {
    /// Each tick advances by one scan window without waiting
    Simulated { now: Instant, step: Duration },
    /// Wall clock; each tick sleeps out the scan window
    Realtime { step: Duration },
}

impl Clock {
    pub fn now(&self) -> Instant {
        match self {
            Self::Simulated { now, .. } => *now,
            Self::Realtime { .. } => Instant::now(),
        }
    }

    fn advance(&mut self) {
        match self {
            Self::Simulated { now, step } => *now += *step,
            Self::Realtime { step } => {
                std::thread::sleep(std::time::Duration::from_millis(step.as_millis()));
            }
        }
    }
}

pub struct RunOptions {
    pub duration: Duration,
    pub overwrite: bool,
    /// Time offsets bounding a baseline, picked once the run passes the later one
    pub baseline: Option<(f32, f32)>,
    /// Log a display snapshot every n windows; 0 disables
    pub report_every: usize,
}

/// Start, tick until `options.duration` has passed, then stop and gap-fill.
pub fn run<F: SensorFeed, S: Store>(
    session: &mut Session<F, S>,
    clock: &mut Clock,
    options: &RunOptions,
) -> Result<StopReport> {
    let overwrite = if options.overwrite {
        Overwrite::Confirmed
    } else {
        Overwrite::Ask
    };
    match session.start(clock.now(), overwrite) {
        Ok(()) => {}
        Err(SessionError::TargetNotEmpty { path }) => {
            bail!("{path} already holds data; pass --overwrite to replace it")
        }
        Err(e) => return Err(anyhow!("Failed to start run: {e}")),
    }

    let started = clock.now();
    let mut windows = 0usize;
    let mut baseline_pending = options.baseline;

    while clock.now().saturating_duration_since(started) < options.duration {
        clock.advance();
        let report = session
            .tick(clock.now())
            .map_err(|e| anyhow!("Tick failed: {e}"))?;
        if report.stable_baseline {
            info!("Readings held still; baseline set automatically");
        }

        let Some(offset) = report.window else {
            continue;
        };
        windows += 1;

        if let Some((lower, upper)) = baseline_pending
            && offset >= upper as f64
        {
            baseline_pending = None;
            pick_baseline(session, lower, upper)?;
        }

        if options.report_every != 0 && windows % options.report_every == 0 {
            log_snapshot(&session.snapshot());
        }
    }

    let report = session
        .stop(clock.now())
        .map_err(|e| anyhow!("Failed to stop run: {e}"))?;
    log_snapshot(&session.snapshot());
    Ok(report)
}

/// Click the raw chart at `lower` and `upper`, as an operator would.
fn pick_baseline<F: SensorFeed, S: Store>(
    session: &mut Session<F, S>,
    lower: f32,
    upper: f32,
) -> Result<()> {
    session
        .begin_baseline()
        .map_err(|e| anyhow!("Cannot pick a baseline: {e}"))?;

    let bounds = session.snapshot().raw.bounds;
    let viewport = Viewport::new(bounds, session.layout().raw_area);
    let y = bounds.y_min + bounds.y_range() / 2.0;

    for time in [lower, upper] {
        let Some(point) = viewport.data_to_screen(DataPoint::new(time, y)) else {
            session
                .cancel_baseline()
                .map_err(|e| anyhow!("{e}"))?;
            bail!("Baseline bound {time} is off the chart");
        };
        match session.click(point).map_err(|e| anyhow!("{e}"))? {
            ClickOutcome::Ignored => warn!("Baseline click at {point:?} missed the chart"),
            ClickOutcome::LowerBound(time) => info!("Baseline starts at {time:.2}"),
            ClickOutcome::Applied(outcome) => {
                let (from, to) = outcome.interval;
                info!("Baseline applied over {from:.2}..{to:.2}");
                for channel in outcome.empty_channels {
                    warn!("Channel {channel} had no samples in the baseline interval");
                }
            }
        }
    }
    Ok(())
}

//! Session controller
//!
//! A [`Session`] owns the configuration, the sensor feed, the store and the
//! state of the current run. The host drives it with one cooperative
//! [`Session::tick`] per loop iteration and forwards operator actions
//! (start, stop, baseline clicks, edits) as method calls.
//!
//! ```text
//!          start                 begin_baseline
//!   Idle ---------> Running ------------------> BaselineAcquisition
//!    ^  <---------    |   <------------------          |
//!    |     stop       |     second click / cancel      |
//!    v                |                                |
//!  Editing            +---------- tick ----------------+
//! ```
//!
//! Two deadlines are checked on every tick, independently of each other:
//!
//! - **window**: buffered readings are collapsed into one row, plotted and
//!   queued for saving
//! - **save**: queued rows are appended to the log file
//!
//! Time never comes from a clock inside this crate; every operation that
//! needs it takes the caller's `Instant`.

mod snapshot;
mod state;

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;
use core::str::FromStr;

use embassy_time::Instant;
use embedded_graphics::prelude::Point;
use log::{debug, error, info, warn};
use thiserror_no_std::Error;

pub use snapshot::{DisplayLayout, DisplaySnapshot, Readout, SCREEN_HEIGHT_PX, SCREEN_WIDTH_PX};
pub use state::{EditField, Mode, Overwrite, RunState};

use crate::baseline::{BaselineOutcome, compute_baseline};
use crate::channel::{ChannelConfig, ChannelId, ChannelMap, LABEL_CAPACITY, Label};
use crate::config::{ConfigError, SessionConfig};
use crate::graph::{ChartGeometry, ChartKind, GraphError, SeriesStore, Viewport};
use crate::round_to;
use crate::sensors::SensorFeed;
use crate::storage::{
    FillReport, Record, RecordError, RecordRow, Store, StoreError, ensure_parent, fill_gaps,
};

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Not allowed while {mode}")]
    Busy { mode: &'static str },

    #[error("No run in progress")]
    NotRunning,

    #[error("{path} already holds data; confirm to overwrite it")]
    TargetNotEmpty { path: String },

    #[error("No labeled channels to record")]
    NoActiveChannels,

    #[error("Baseline already set for this run")]
    BaselineAlreadySet,

    #[error("No baseline selection in progress")]
    NotSelecting,

    #[error("No edit in progress")]
    NotEditing,

    #[error("Label longer than {capacity} bytes")]
    LabelTooLong { capacity: usize },

    #[error("Spacing is not a number: {text}")]
    InvalidSpacing { text: String },

    #[error("Configuration error: {0}")]
    Config(ConfigError),

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("Log format error: {0}")]
    Record(RecordError),

    #[error("Graph error: {0}")]
    Graph(GraphError),
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<RecordError> for SessionError {
    fn from(e: RecordError) -> Self {
        Self::Record(e)
    }
}

impl From<GraphError> for SessionError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Readings decoded and buffered
    pub readings: usize,
    /// Advertisements from known sensors whose payload could not be decoded
    pub dropped: usize,
    /// The scan failed and the transport was reset
    pub transport_error: bool,
    /// Time offset of the window closed by this tick
    pub window: Option<f64>,
    /// Rows appended to the log by this tick
    pub saved: Option<usize>,
    /// The periodic save failed; its rows stay queued
    pub save_failed: bool,
    /// Readings held still long enough and became the baseline
    pub stable_baseline: bool,
}

/// Result of a baseline click
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Outside both plot areas
    Ignored,
    /// First bound picked, at this time offset
    LowerBound(f32),
    /// Interval complete and applied
    Applied(BaselineOutcome),
}

/// Summary of a stopped run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopReport {
    /// Data rows in the final log
    pub rows: usize,
    pub fill: FillReport,
}

pub struct Session<F: SensorFeed, S: Store> {
    config: SessionConfig,
    feed: F,
    store: S,
    layout: DisplayLayout,
    mode: Mode,
    /// Current run, or the last one after a stop so its charts stay visible
    run: Option<RunState>,
}

impl<F: SensorFeed, S: Store> Session<F, S> {
    pub fn new(config: SessionConfig, feed: F, store: S, layout: DisplayLayout) -> Self {
        Self {
            config,
            feed,
            store,
            layout,
            mode: Mode::Idle,
            run: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn run(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }

    pub fn layout(&self) -> DisplayLayout {
        self.layout
    }

    /// Channel table as currently configured
    pub fn channels(&self) -> ChannelMap<ChannelConfig> {
        self.config.channel_map()
    }

    fn running_state(&mut self) -> SessionResult<&mut RunState> {
        if !self.mode.is_running() {
            return Err(SessionError::NotRunning);
        }
        self.run.as_mut().ok_or(SessionError::NotRunning)
    }

    // -----------------------------------------------------------------------
    // Run lifecycle
    // -----------------------------------------------------------------------

    /// Begin a run at `now`.
    ///
    /// Writes the header row, replacing the target. A target that already
    /// holds data is only replaced with [`Overwrite::Confirmed`].
    pub fn start(&mut self, now: Instant, overwrite: Overwrite) -> SessionResult<()> {
        if self.mode != Mode::Idle {
            return Err(SessionError::Busy {
                mode: self.mode.name(),
            });
        }
        self.config.validate()?;

        let run = RunState::new(
            now,
            self.config.spacing_duration(),
            self.config.save_interval(),
            self.config.baseline.hold(),
            self.config.channel_map(),
        );
        if run.schema.channels().is_empty() {
            return Err(SessionError::NoActiveChannels);
        }

        let path = self.config.file_name.as_str();
        match self.store.read(path) {
            Ok(existing) if !existing.trim().is_empty() && overwrite == Overwrite::Ask => {
                return Err(SessionError::TargetNotEmpty {
                    path: String::from(path),
                });
            }
            Ok(_) | Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        ensure_parent(&mut self.store, path)?;
        self.store.write(path, &run.schema.header())?;

        info!(
            "Run started: {} channels, logging to {}",
            run.schema.channels().len(),
            path
        );
        self.run = Some(run);
        self.mode = Mode::Running;
        Ok(())
    }

    /// One cooperative step: scan, then check the window and save deadlines.
    ///
    /// Does nothing outside a run.
    pub fn tick(&mut self, now: Instant) -> SessionResult<TickReport> {
        let mut report = TickReport::default();
        if !self.mode.is_running() {
            return Ok(report);
        }
        let Some(run) = self.run.as_mut() else {
            return Ok(report);
        };

        match self.feed.scan(self.config.scan_window()) {
            Ok(advertisements) => {
                for advertisement in advertisements {
                    let Some(channel) = run.channel_for(&advertisement.address) else {
                        continue;
                    };
                    let Some(payload) = advertisement.manufacturer.as_deref() else {
                        continue;
                    };
                    match self.config.calibration.decode_reading(payload) {
                        Ok(reading) => {
                            if let Some(watch) = run.stability.as_mut() {
                                watch.observe(now, run.aggregator.latest(channel), reading);
                            }
                            run.aggregator.record_reading(channel, reading);
                            report.readings += 1;
                        }
                        Err(e) => {
                            debug!("Dropping payload from {}: {}", advertisement.address, e);
                            report.dropped += 1;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Scan failed: {}; resetting transport", e);
                report.transport_error = true;
                if let Err(e) = self.feed.reset() {
                    error!("Transport reset failed: {}", e);
                }
            }
        }

        if self.mode == Mode::Running
            && let Some(baselines) = run
                .stability
                .and_then(|watch| watch.settle(now, &run.aggregator, run.schema.channels()))
        {
            run.series.apply_baseline(&baselines);
            run.baseline_taken = true;
            run.stability = None;
            info!("Readings stable; baseline taken from the latest values");
            report.stable_baseline = true;
        }

        if now >= run.next_window_at {
            let elapsed = now.saturating_duration_since(run.started_at);
            let offset = round_to(self.config.time_unit.from_duration(elapsed), 2);
            let samples = run.aggregator.collapse_window(run.schema.channels());

            run.series.record_window(offset as f32, &samples)?;
            if run.series.rescale() {
                let bounds = run.series.bounds();
                debug!("Axes grown to x <= {}, y <= {}", bounds.x_max, bounds.y_max);
            }
            run.pending.push(RecordRow::from_window(offset, &samples));
            run.last_offset = Some(offset);
            run.next_window_at = now + self.config.spacing_duration();

            debug!("Window closed at {} {}", offset, self.config.time_unit.label());
            report.window = Some(offset);
        }

        if now >= run.next_save_at {
            run.next_save_at = now + self.config.save_interval();
            match self.save_pending() {
                Ok(rows) => report.saved = Some(rows),
                Err(e) => {
                    error!("Periodic save failed: {}", e);
                    report.save_failed = true;
                }
            }
        }

        Ok(report)
    }

    /// Append queued rows to the log, returning how many were written.
    ///
    /// A log that has disappeared is recreated with a fresh header. Rows stay
    /// queued when the write fails.
    pub fn save_pending(&mut self) -> SessionResult<usize> {
        let run = self.run.as_mut().ok_or(SessionError::NotRunning)?;
        if run.pending.is_empty() {
            return Ok(0);
        }

        let path = self.config.file_name.as_str();
        let mut text = match self.store.read(path) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) | Err(StoreError::NotFound(_)) => {
                warn!("{} is missing; writing a new header", path);
                ensure_parent(&mut self.store, path)?;
                run.schema.header()
            }
            Err(e) => return Err(e.into()),
        };
        while text.ends_with('\n') {
            text.pop();
        }

        for row in &run.pending {
            text.push('\n');
            row.write_to(&mut text, &self.config.filler);
        }
        self.store.write(path, &text)?;

        let rows = run.pending.len();
        run.rows_written += rows;
        run.pending.clear();
        debug!("Saved {} rows to {}", rows, path);
        Ok(rows)
    }

    /// End the run: flush queued rows, gap-fill the log and go idle.
    ///
    /// On failure the run stays active so the stop can be retried.
    pub fn stop(&mut self, now: Instant) -> SessionResult<StopReport> {
        if let Mode::BaselineAcquisition(_) = self.mode {
            return Err(SessionError::Busy {
                mode: self.mode.name(),
            });
        }
        self.running_state()?;
        self.save_pending()?;

        let path = self.config.file_name.as_str();
        let filler = self.config.filler.as_str();
        let text = self.store.read(path)?;
        let mut record = Record::parse(&text, filler)?;

        let seeds = match &self.run {
            Some(run) => run.schema.seeds(run.series.baselines()),
            None => Vec::new(),
        };
        let fill = fill_gaps(&mut record, &seeds);
        self.store.write(path, &record.to_text(filler))?;

        if let Some(run) = &self.run {
            let elapsed = now.saturating_duration_since(run.started_at);
            info!(
                "Run stopped after {} s: {} rows, {} cells filled, {} left missing",
                elapsed.as_secs(),
                record.rows.len(),
                fill.filled,
                fill.unfilled
            );
        }
        self.mode = Mode::Idle;
        Ok(StopReport {
            rows: record.rows.len(),
            fill,
        })
    }

    // -----------------------------------------------------------------------
    // Baseline selection
    // -----------------------------------------------------------------------

    /// Enter baseline acquisition; the next two chart clicks bound the interval.
    pub fn begin_baseline(&mut self) -> SessionResult<()> {
        match self.mode {
            Mode::Running => {}
            Mode::Idle => return Err(SessionError::NotRunning),
            mode => return Err(SessionError::Busy { mode: mode.name() }),
        }
        if self.running_state()?.baseline_taken {
            return Err(SessionError::BaselineAlreadySet);
        }
        self.mode = Mode::BaselineAcquisition(Default::default());
        Ok(())
    }

    pub fn cancel_baseline(&mut self) -> SessionResult<()> {
        if !matches!(self.mode, Mode::BaselineAcquisition(_)) {
            return Err(SessionError::NotSelecting);
        }
        self.mode = Mode::Running;
        Ok(())
    }

    /// Handle a screen click while acquiring a baseline.
    pub fn click(&mut self, point: Point) -> SessionResult<ClickOutcome> {
        let Mode::BaselineAcquisition(selection) = &mut self.mode else {
            return Err(SessionError::NotSelecting);
        };
        let run = self.run.as_mut().ok_or(SessionError::NotRunning)?;

        let series = &run.series;
        let time = [
            (ChartKind::Raw, self.layout.raw_area),
            (ChartKind::Normalized, self.layout.normalized_area),
        ]
        .into_iter()
        .find_map(|(kind, area)| {
            Viewport::new(series.chart_bounds(kind), area).screen_to_data(point)
        })
        .map(|data| data.x);
        let Some(time) = time else {
            return Ok(ClickOutcome::Ignored);
        };

        let Some((lower, upper)) = selection.click(time) else {
            debug!("Baseline lower bound at {}", time);
            return Ok(ClickOutcome::LowerBound(time));
        };

        let outcome = compute_baseline(&run.series, run.schema.channels(), lower, upper);
        run.series.apply_baseline(&outcome.baselines);
        run.baseline_taken = true;
        run.stability = None;
        self.mode = Mode::Running;

        info!(
            "Baseline taken over {}..{} ({} channels without samples)",
            lower,
            upper,
            outcome.empty_channels.len()
        );
        Ok(ClickOutcome::Applied(outcome))
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Start editing a setting. Only possible while idle.
    pub fn begin_edit(&mut self, field: EditField) -> SessionResult<()> {
        if self.mode != Mode::Idle {
            return Err(SessionError::Busy {
                mode: self.mode.name(),
            });
        }
        self.mode = Mode::Editing(field);
        Ok(())
    }

    pub fn cancel_edit(&mut self) -> SessionResult<()> {
        if !matches!(self.mode, Mode::Editing(_)) {
            return Err(SessionError::NotEditing);
        }
        self.mode = Mode::Idle;
        Ok(())
    }

    /// Apply `text` to the field being edited and return to idle.
    ///
    /// Invalid input leaves the session editing the same field.
    pub fn commit_edit(&mut self, text: &str) -> SessionResult<()> {
        let Mode::Editing(field) = self.mode else {
            return Err(SessionError::NotEditing);
        };
        let text = text.trim();

        match field {
            EditField::Label(channel) => {
                let label = Label::from_str(text).map_err(|_| SessionError::LabelTooLong {
                    capacity: LABEL_CAPACITY,
                })?;
                let slots = &mut self.config.channels;
                while slots.len() <= channel.index() {
                    if slots.push(ChannelConfig::default()).is_err() {
                        break;
                    }
                }
                if let Some(slot) = slots.get_mut(channel.index()) {
                    slot.label = label;
                }
                info!("Channel {} label set to {:?}", channel, text);
            }
            EditField::FilePath => {
                ensure_parent(&mut self.store, text)?;
                self.config.file_name = String::from(text);
                info!("Log file set to {}", text);
            }
            EditField::Spacing => {
                let spacing = text.parse::<f64>().map_err(|_| SessionError::InvalidSpacing {
                    text: String::from(text),
                })?;
                self.config.check_spacing(spacing)?;
                self.config.spacing = spacing;
                info!("Window spacing set to {} {}", spacing, self.config.time_unit.label());
            }
        }

        self.mode = Mode::Idle;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Display
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> DisplaySnapshot {
        let empty;
        let (series, channels, schema_channels, latest) = match &self.run {
            Some(run) => (
                &run.series,
                run.channels.clone(),
                run.schema.channels().to_vec(),
                Some(&run.aggregator),
            ),
            None => {
                empty = SeriesStore::new();
                let channels = self.config.channel_map();
                let active: Vec<ChannelId> = channels
                    .iter()
                    .filter(|(_, config)| config.is_active())
                    .map(|(id, _)| id)
                    .collect();
                (&empty, channels, active, None)
            }
        };

        let readouts = schema_channels
            .iter()
            .map(|&channel| Readout {
                channel,
                label: String::from(channels[channel].label.as_str()),
                color: channels[channel].color(),
                latest: latest.and_then(|aggregator| aggregator.latest(channel)),
                baseline: series.baselines()[channel],
            })
            .collect();

        let selection_marker = match &self.mode {
            Mode::BaselineAcquisition(selection) => selection.pending_bound(),
            _ => None,
        };

        DisplaySnapshot {
            mode: self.mode,
            raw: ChartGeometry::build(ChartKind::Raw, self.layout.raw_area, series, &schema_channels),
            normalized: ChartGeometry::build(
                ChartKind::Normalized,
                self.layout.normalized_area,
                series,
                &schema_channels,
            ),
            selection_marker,
            readouts,
        }
    }
}

//! Session modes and per-run state

extern crate alloc;
use alloc::vec::Vec;

use embassy_time::{Duration, Instant};

use crate::baseline::{BaselineSelection, StabilityWatch};
use crate::channel::{ChannelConfig, ChannelId, ChannelMap};
use crate::graph::SeriesStore;
use crate::sampling::ChannelAggregator;
use crate::storage::{RecordRow, RecordSchema};

/// What the session is doing
///
/// Baseline acquisition only exists inside a run and editing only outside
/// one, so neither can overlap the other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Idle,
    Running,
    /// Waiting for the two clicks that bound the baseline interval
    BaselineAcquisition(BaselineSelection),
    Editing(EditField),
}

impl Mode {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::BaselineAcquisition(_) => "baseline acquisition",
            Self::Editing(_) => "editing",
        }
    }

    /// Whether a run is in progress (including while picking a baseline)
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running | Self::BaselineAcquisition(_))
    }
}

/// Setting being edited from the idle screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Label(ChannelId),
    FilePath,
    Spacing,
}

/// How `start` treats a target file that already holds data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overwrite {
    /// Refuse and report the file so the operator can confirm
    #[default]
    Ask,
    Confirmed,
}

/// Everything that lives for exactly one run
///
/// Built fresh by `start`, so nothing leaks from a previous run.
#[derive(Debug)]
pub struct RunState {
    pub(crate) started_at: Instant,
    pub(crate) next_window_at: Instant,
    pub(crate) next_save_at: Instant,
    /// Channel table frozen at start
    pub(crate) channels: ChannelMap<ChannelConfig>,
    pub(crate) schema: RecordSchema,
    pub(crate) aggregator: ChannelAggregator,
    pub(crate) series: SeriesStore,
    /// Rows collapsed but not yet written
    pub(crate) pending: Vec<RecordRow>,
    pub(crate) rows_written: usize,
    pub(crate) last_offset: Option<f64>,
    pub(crate) baseline_taken: bool,
    /// Pending automatic baseline, dropped once any baseline is taken
    pub(crate) stability: Option<StabilityWatch>,
}

impl RunState {
    pub(crate) fn new(
        now: Instant,
        spacing: Duration,
        save_interval: Duration,
        stable_hold: Option<Duration>,
        channels: ChannelMap<ChannelConfig>,
    ) -> Self {
        let schema = RecordSchema::from_channels(&channels);
        Self {
            started_at: now,
            next_window_at: now + spacing,
            next_save_at: now + save_interval,
            channels,
            schema,
            aggregator: ChannelAggregator::new(),
            series: SeriesStore::new(),
            pending: Vec::new(),
            rows_written: 0,
            last_offset: None,
            baseline_taken: false,
            stability: stable_hold.map(|hold| StabilityWatch::new(now, hold)),
        }
    }

    /// Channel whose configured address matches `address`
    pub(crate) fn channel_for(&self, address: &str) -> Option<ChannelId> {
        self.channels
            .iter()
            .find(|(_, config)| config.is_active() && config.matches(address))
            .map(|(id, _)| id)
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn next_window_at(&self) -> Instant {
        self.next_window_at
    }

    pub fn next_save_at(&self) -> Instant {
        self.next_save_at
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn aggregator(&self) -> &ChannelAggregator {
        &self.aggregator
    }

    pub fn series(&self) -> &SeriesStore {
        &self.series
    }

    pub fn pending_rows(&self) -> &[RecordRow] {
        &self.pending
    }

    /// Rows already persisted to the log
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Time offset of the last collapsed window
    pub fn last_offset(&self) -> Option<f64> {
        self.last_offset
    }

    pub fn baseline_taken(&self) -> bool {
        self.baseline_taken
    }

    /// Whether an automatic baseline is still being waited for
    pub fn awaiting_stable_baseline(&self) -> bool {
        self.stability.is_some()
    }
}

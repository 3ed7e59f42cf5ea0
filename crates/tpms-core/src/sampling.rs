//! Windowed averaging of per-channel readings
//!
//! Every successful scan appends calibrated readings to the channel's raw
//! buffer. At each window boundary the buffers are collapsed to one value per
//! active channel and cleared.
//!
//! ## Window policy
//!
//! - A channel with no readings in the window yields `None` (missing), never 0.
//! - A channel with readings yields their mean, rounded to 1 decimal.
//! - Inactive channels are drained but never appear in the output.

extern crate alloc;
use alloc::vec::Vec;

use crate::channel::{ChannelId, ChannelMap};
use crate::round_to;
use crate::sensors::Reading;

/// Collapsed result of one window for one channel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowSample {
    pub pressure: Option<f64>,
    pub temperature: Option<f64>,
}

impl WindowSample {
    pub const MISSING: Self = Self {
        pressure: None,
        temperature: None,
    };
}

/// One collapsed window: a sample per active channel, in channel order
pub type WindowSamples = Vec<(ChannelId, WindowSample)>;

/// Raw readings gathered since the last window boundary
#[derive(Debug, Default)]
pub struct ChannelAggregator {
    pressures: ChannelMap<Vec<f64>>,
    temperatures: ChannelMap<Vec<f64>>,
    /// Most recent reading per channel, kept across windows for the readout
    latest: ChannelMap<Option<Reading>>,
}

impl ChannelAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading to the channel's buffer.
    pub fn record_reading(&mut self, channel: ChannelId, reading: Reading) {
        self.pressures[channel].push(reading.pressure);
        self.temperatures[channel].push(reading.temperature);
        self.latest[channel] = Some(reading);
    }

    /// Number of readings buffered for `channel` in the current window
    pub fn pending(&self, channel: ChannelId) -> usize {
        self.pressures[channel].len()
    }

    pub fn latest(&self, channel: ChannelId) -> Option<Reading> {
        self.latest[channel]
    }

    /// Collapse the current window for `active` channels and clear every buffer.
    pub fn collapse_window(&mut self, active: &[ChannelId]) -> WindowSamples {
        let samples = active
            .iter()
            .map(|&channel| {
                let sample = WindowSample {
                    pressure: average(&self.pressures[channel]),
                    temperature: average(&self.temperatures[channel]),
                };
                (channel, sample)
            })
            .collect();

        for buffer in self.pressures.values_mut() {
            buffer.clear();
        }
        for buffer in self.temperatures.values_mut() {
            buffer.clear();
        }

        samples
    }
}

/// Arithmetic mean rounded to 1 decimal, `None` for an empty window
pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let total: f64 = values.iter().sum();
    Some(round_to(total / values.len() as f64, 1))
}

//! Data series types for the pressure charts
//!
//! Every active channel owns three series that share timestamps:
//!
//! - **raw**: calibrated window averages
//! - **normalized**: raw minus the channel's pressure baseline
//! - **temperature**: calibrated temperature averages (not drawn, but needed
//!   for the temperature baseline)
//!
//! The store also tracks the furthest time and the highest pressure seen so
//! far, and grows the axis bounds when either is outgrown. Both charts share
//! the time axis. The normalized chart keeps its own value axis, which can
//! go below zero once a baseline is subtracted.

extern crate alloc;
use alloc::vec::Vec;

use super::constants::{AXIS_GROWTH_FACTOR, INITIAL_X_MAX, INITIAL_Y_MAX, NORMALIZED_Y_EXTENT};
use super::viewport::DataBounds;
use super::{ChartKind, GraphError, GraphResult};
use crate::baseline::Baseline;
use crate::channel::{ChannelId, ChannelMap};
use crate::sampling::WindowSamples;

/// A single data point with x and y coordinates
///
/// x is the time offset since run start, y the sensor value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    /// X-coordinate (time offset)
    pub x: f32,
    /// Y-coordinate (sensor value)
    pub y: f32,
}

impl DataPoint {
    /// Create a new data point
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Append-only sequence of points for one channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSeries {
    points: Vec<DataPoint>,
}

impl DataSeries {
    /// Create an empty data series
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a data point, rejecting points earlier than the last one
    pub fn push(&mut self, point: DataPoint) -> GraphResult<()> {
        if let Some(last) = self.points.last()
            && point.x < last.x
        {
            return Err(GraphError::TimeWentBackwards {
                time: point.x,
                last: last.x,
            });
        }
        self.points.push(point);
        Ok(())
    }

    /// Get reference to all points
    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn last(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shift every point's value by `-offset`
    fn shift(&mut self, offset: f32) {
        for point in self.points.iter_mut() {
            point.y -= offset;
        }
    }

    /// Points whose time lies in `[lower, upper]`
    pub fn in_range(&self, lower: f32, upper: f32) -> impl Iterator<Item = &DataPoint> {
        self.points
            .iter()
            .filter(move |p| p.x >= lower && p.x <= upper)
    }
}

/// Multi-channel time series with dynamic range tracking
#[derive(Debug, Clone)]
pub struct SeriesStore {
    raw: ChannelMap<DataSeries>,
    normalized: ChannelMap<DataSeries>,
    temperature: ChannelMap<DataSeries>,
    baselines: ChannelMap<Baseline>,
    /// Displayable range of the raw chart
    bounds: DataBounds,
    /// Displayable range of the normalized chart; x follows `bounds`
    normalized_bounds: DataBounds,
    /// Furthest time offset observed
    latest_time: f32,
    /// Highest pressure observed across all channels
    high_point: f32,
    /// Extremes of the normalized values across all channels
    normalized_low: f32,
    normalized_high: f32,
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesStore {
    pub fn new() -> Self {
        Self {
            raw: ChannelMap::new(),
            normalized: ChannelMap::new(),
            temperature: ChannelMap::new(),
            baselines: ChannelMap::new(),
            bounds: DataBounds::new(0.0, INITIAL_X_MAX, 0.0, INITIAL_Y_MAX),
            normalized_bounds: DataBounds::new(0.0, INITIAL_X_MAX, 0.0, INITIAL_Y_MAX),
            latest_time: 0.0,
            high_point: 0.0,
            normalized_low: 0.0,
            normalized_high: 0.0,
        }
    }

    /// Append a pressure value to a channel's raw and normalized series.
    pub fn append(&mut self, channel: ChannelId, time_offset: f32, value: f32) -> GraphResult<()> {
        self.raw[channel].push(DataPoint::new(time_offset, value))?;
        let normalized = value - self.baselines[channel].pressure as f32;
        self.normalized[channel].push(DataPoint::new(time_offset, normalized))?;

        self.advance_time(time_offset);
        if value > self.high_point {
            self.high_point = value;
        }
        self.normalized_low = self.normalized_low.min(normalized);
        self.normalized_high = self.normalized_high.max(normalized);
        Ok(())
    }

    /// Append a temperature value to a channel's temperature series.
    pub fn append_temperature(
        &mut self,
        channel: ChannelId,
        time_offset: f32,
        value: f32,
    ) -> GraphResult<()> {
        self.temperature[channel].push(DataPoint::new(time_offset, value))?;
        self.advance_time(time_offset);
        Ok(())
    }

    /// Record that time has reached `time_offset`, even if no channel reported.
    pub fn advance_time(&mut self, time_offset: f32) {
        if time_offset > self.latest_time {
            self.latest_time = time_offset;
        }
    }

    /// Add one collapsed window; missing values are not plotted.
    pub fn record_window(&mut self, time_offset: f32, samples: &WindowSamples) -> GraphResult<()> {
        self.advance_time(time_offset);
        for (channel, sample) in samples {
            if let Some(pressure) = sample.pressure {
                self.append(*channel, time_offset, pressure as f32)?;
            }
            if let Some(temperature) = sample.temperature {
                self.append_temperature(*channel, time_offset, temperature as f32)?;
            }
        }
        Ok(())
    }

    /// `(xMax, yMax)`: furthest time and highest value observed so far
    pub fn current_bounds(&self) -> (f32, f32) {
        (self.latest_time, self.high_point)
    }

    /// Grow whichever axis has been outgrown to 1.5x the exceeding quantity.
    ///
    /// The normalized value axis grows the same way in both directions.
    /// Returns `true` when any bound changed.
    pub fn rescale(&mut self) -> bool {
        let mut changed = false;
        if self.latest_time > self.bounds.x_max {
            self.bounds.x_max = self.latest_time * AXIS_GROWTH_FACTOR;
            changed = true;
        }
        if self.high_point > self.bounds.y_max {
            self.bounds.y_max = self.high_point * AXIS_GROWTH_FACTOR;
            changed = true;
        }
        self.normalized_bounds.x_max = self.bounds.x_max;
        self.grow_normalized() || changed
    }

    fn grow_normalized(&mut self) -> bool {
        let mut changed = false;
        if self.normalized_high > self.normalized_bounds.y_max {
            self.normalized_bounds.y_max = self.normalized_high * AXIS_GROWTH_FACTOR;
            changed = true;
        }
        if self.normalized_low < self.normalized_bounds.y_min {
            self.normalized_bounds.y_min = self.normalized_low * AXIS_GROWTH_FACTOR;
            changed = true;
        }
        changed
    }

    /// Subtract each channel's pressure baseline from its normalized points.
    ///
    /// Already-plotted points are corrected retroactively and later appends
    /// are normalized against the stored baseline. The normalized value axis
    /// is refitted around zero to the shifted points.
    pub fn apply_baseline(&mut self, baselines: &ChannelMap<Baseline>) {
        for (channel, baseline) in baselines.iter() {
            self.normalized[channel].shift(baseline.pressure as f32);
            self.baselines[channel] = *baseline;
        }

        let (low, high) = self
            .normalized
            .iter()
            .flat_map(|(_, series)| series.points())
            .fold((0.0f32, 0.0f32), |(low, high), p| (low.min(p.y), high.max(p.y)));
        self.normalized_low = low;
        self.normalized_high = high;
        self.normalized_bounds.y_min = -NORMALIZED_Y_EXTENT;
        self.normalized_bounds.y_max = NORMALIZED_Y_EXTENT;
        self.grow_normalized();
    }

    /// Range of the raw chart
    pub fn bounds(&self) -> DataBounds {
        self.bounds
    }

    /// Range of the normalized chart
    pub fn normalized_bounds(&self) -> DataBounds {
        self.normalized_bounds
    }

    pub fn chart_bounds(&self, kind: ChartKind) -> DataBounds {
        match kind {
            ChartKind::Raw => self.bounds,
            ChartKind::Normalized => self.normalized_bounds,
        }
    }

    pub fn baselines(&self) -> &ChannelMap<Baseline> {
        &self.baselines
    }

    pub fn raw(&self, channel: ChannelId) -> &DataSeries {
        &self.raw[channel]
    }

    pub fn normalized(&self, channel: ChannelId) -> &DataSeries {
        &self.normalized[channel]
    }

    pub fn temperature(&self, channel: ChannelId) -> &DataSeries {
        &self.temperature[channel]
    }

    /// Check if no channel has any plotted point
    pub fn is_empty(&self) -> bool {
        self.raw.iter().all(|(_, series)| series.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::WindowSample;
    use alloc::vec;

    fn ch(index: usize) -> ChannelId {
        ChannelId::new(index).unwrap()
    }

    #[test]
    fn test_append_tracks_high_point_and_time() {
        let mut store = SeriesStore::new();
        store.append(ch(0), 3.0, 30.5).unwrap();
        store.append(ch(1), 3.0, 31.5).unwrap();
        store.append(ch(0), 6.0, 29.0).unwrap();

        assert_eq!(store.current_bounds(), (6.0, 31.5));
        assert_eq!(store.raw(ch(0)).len(), 2);
        assert_eq!(store.normalized(ch(0)).points(), store.raw(ch(0)).points());
    }

    #[test]
    fn test_append_rejects_backwards_time() {
        let mut store = SeriesStore::new();
        store.append(ch(0), 6.0, 30.0).unwrap();
        assert_eq!(
            store.append(ch(0), 3.0, 30.0),
            Err(GraphError::TimeWentBackwards { time: 3.0, last: 6.0 })
        );
    }

    #[test]
    fn test_rescale_touches_only_exceeded_axis() {
        let mut store = SeriesStore::new();
        store.append(ch(0), 3.0, 30.0).unwrap();

        assert!(store.rescale());
        let bounds = store.bounds();
        assert_eq!(bounds.x_max, INITIAL_X_MAX, "x was not exceeded");
        assert_eq!(bounds.y_max, 45.0);

        store.append(ch(0), 120.0, 10.0).unwrap();
        assert!(store.rescale());
        let bounds = store.bounds();
        assert_eq!(bounds.x_max, 180.0);
        assert_eq!(bounds.y_max, 45.0, "y was not exceeded");
    }

    #[test]
    fn test_rescale_is_idempotent() {
        let mut store = SeriesStore::new();
        store.append(ch(0), 150.0, 40.0).unwrap();

        store.rescale();
        let first = store.bounds();
        assert!(!store.rescale());
        assert_eq!(store.bounds(), first);
    }

    #[test]
    fn test_apply_baseline_shifts_existing_points() {
        let mut store = SeriesStore::new();
        store.append(ch(0), 3.0, 30.5).unwrap();
        store.append(ch(0), 6.0, 31.0).unwrap();

        let mut baselines = ChannelMap::new();
        baselines[ch(0)] = Baseline {
            pressure: 30.0,
            temperature: 21.0,
        };
        store.apply_baseline(&baselines);
        store.append(ch(0), 9.0, 32.0).unwrap();

        let raw = store.raw(ch(0)).points();
        let normalized = store.normalized(ch(0)).points();
        for (r, n) in raw.iter().zip(normalized) {
            assert_eq!(n.x, r.x);
            assert_eq!(n.y, r.y - 30.0);
        }
    }

    #[test]
    fn test_normalized_axis_covers_values_below_baseline() {
        let mut store = SeriesStore::new();
        for (time, value) in [(10.0, 30.0), (20.0, 31.0), (30.0, 29.0), (40.0, 28.0)] {
            store.append(ch(0), time, value).unwrap();
        }
        store.rescale();

        let mut baselines: ChannelMap<Baseline> = ChannelMap::new();
        baselines[ch(0)].pressure = 30.0;
        store.apply_baseline(&baselines);

        let ys: Vec<f32> = store.normalized(ch(0)).points().iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![0.0, 1.0, -1.0, -2.0]);
        let bounds = store.normalized_bounds();
        assert_eq!((bounds.y_min, bounds.y_max), (-NORMALIZED_Y_EXTENT, NORMALIZED_Y_EXTENT));
        assert_eq!(bounds.x_max, store.bounds().x_max);
        assert_eq!(store.bounds().y_min, 0.0, "raw axis untouched");
    }

    #[test]
    fn test_normalized_axis_grows_downwards() {
        let mut store = SeriesStore::new();
        store.append(ch(0), 10.0, 30.0).unwrap();
        let mut baselines: ChannelMap<Baseline> = ChannelMap::new();
        baselines[ch(0)].pressure = 30.0;
        store.apply_baseline(&baselines);

        store.append(ch(0), 20.0, 18.0).unwrap();
        assert!(store.rescale());
        assert_eq!(store.normalized_bounds().y_min, -18.0);
        assert_eq!(store.normalized_bounds().y_max, NORMALIZED_Y_EXTENT);
        assert!(!store.rescale());
    }

    #[test]
    fn test_zero_baseline_is_noop() {
        let mut store = SeriesStore::new();
        store.append(ch(0), 3.0, 30.5).unwrap();
        let before = store.normalized(ch(0)).clone();

        store.apply_baseline(&ChannelMap::new());

        assert_eq!(store.normalized(ch(0)), &before);
    }

    #[test]
    fn test_record_window_skips_missing_values() {
        let mut store = SeriesStore::new();
        let samples = vec![
            (
                ch(0),
                WindowSample {
                    pressure: Some(30.0),
                    temperature: Some(20.0),
                },
            ),
            (ch(1), WindowSample::MISSING),
        ];

        store.record_window(3.0, &samples).unwrap();

        assert_eq!(store.raw(ch(0)).len(), 1);
        assert_eq!(store.temperature(ch(0)).len(), 1);
        assert!(store.raw(ch(1)).is_empty());
        assert_eq!(store.current_bounds().0, 3.0);
    }
}

//! Chart data for the raw and normalized pressure graphs
//!
//! This module owns everything the display needs that involves arithmetic:
//!
//! - [`SeriesStore`]: per-channel raw, normalized and temperature series with
//!   growing axis bounds
//! - [`Viewport`]: data space to screen space transforms (and back, for
//!   baseline clicks)
//! - [`ChartGeometry`]: projected points and axis ticks ready to draw
//!
//! The display itself only draws what it is handed.

use thiserror_no_std::Error;

mod axis;
pub mod constants;
pub mod series;
pub mod viewport;

extern crate alloc;
use alloc::vec::Vec;

use embedded_graphics::prelude::Point;
use embedded_graphics::primitives::Rectangle;

pub use axis::axis_ticks;
pub use series::{DataPoint, DataSeries, SeriesStore};
pub use viewport::{DataBounds, PlotInsets, Viewport};

use crate::channel::ChannelId;
use constants::AXIS_TICK_COUNT;

/// Error types for graph operations
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    /// Time offsets must not run backwards within a series
    #[error("Time offset {time} precedes the last point at {last}")]
    TimeWentBackwards {
        /// Rejected time offset
        time: f32,
        /// Time of the last stored point
        last: f32,
    },
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Which of the two charts a series belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Raw,
    Normalized,
}

impl ChartKind {
    pub const fn title(self) -> &'static str {
        match self {
            Self::Raw => "Raw Data",
            Self::Normalized => "Normalized Data",
        }
    }
}

/// Screen points for one channel's series
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedSeries {
    pub channel: ChannelId,
    pub points: Vec<Point>,
}

/// Everything needed to draw one chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartGeometry {
    pub kind: ChartKind,
    /// Full chart area including axis padding
    pub area: Rectangle,
    /// Plot rectangle the points are drawn into
    pub plot_area: Rectangle,
    pub bounds: DataBounds,
    pub x_ticks: Vec<f32>,
    pub y_ticks: Vec<f32>,
    pub series: Vec<ProjectedSeries>,
}

impl ChartGeometry {
    /// Project `channels` of `store` into `area` for the given chart.
    pub fn build(kind: ChartKind, area: Rectangle, store: &SeriesStore, channels: &[ChannelId]) -> Self {
        let bounds = store.chart_bounds(kind);
        let viewport = Viewport::new(bounds, area);

        let series = channels
            .iter()
            .map(|&channel| {
                let source = match kind {
                    ChartKind::Raw => store.raw(channel),
                    ChartKind::Normalized => store.normalized(channel),
                };
                ProjectedSeries {
                    channel,
                    points: source
                        .points()
                        .iter()
                        .filter_map(|p| viewport.data_to_screen(*p))
                        .collect(),
                }
            })
            .collect();

        Self {
            kind,
            area,
            plot_area: viewport.plot_area(),
            bounds,
            x_ticks: axis_ticks(bounds.x_min, bounds.x_max, AXIS_TICK_COUNT),
            y_ticks: axis_ticks(bounds.y_min, bounds.y_max, AXIS_TICK_COUNT),
            series,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::Baseline;
    use crate::channel::ChannelMap;
    use embedded_graphics::prelude::Size;

    fn ch(index: usize) -> ChannelId {
        ChannelId::new(index).unwrap()
    }

    fn area() -> Rectangle {
        Rectangle::new(Point::zero(), Size::new(400, 300))
    }

    #[test]
    fn test_normalized_chart_draws_points_below_baseline() {
        let mut store = SeriesStore::new();
        for (time, value) in [(10.0, 30.0), (20.0, 31.0), (30.0, 29.0), (40.0, 28.0)] {
            store.append(ch(0), time, value).unwrap();
        }
        store.rescale();
        let mut baselines = ChannelMap::new();
        baselines[ch(0)] = Baseline {
            pressure: 30.0,
            temperature: 20.0,
        };
        store.apply_baseline(&baselines);

        let chart = ChartGeometry::build(ChartKind::Normalized, area(), &store, &[ch(0)]);
        assert_eq!(chart.series[0].points.len(), 4);
        assert!(chart.bounds.y_min < 0.0);
        assert!(chart.y_ticks.iter().any(|&tick| tick < 0.0));

        let raw = ChartGeometry::build(ChartKind::Raw, area(), &store, &[ch(0)]);
        assert_eq!(raw.series[0].points.len(), 4);
        assert_eq!(raw.bounds, store.bounds());
    }

    #[test]
    fn test_charts_share_time_axis() {
        let mut store = SeriesStore::new();
        store.append(ch(0), 250.0, 30.0).unwrap();
        store.rescale();

        let raw = ChartGeometry::build(ChartKind::Raw, area(), &store, &[ch(0)]);
        let normalized = ChartGeometry::build(ChartKind::Normalized, area(), &store, &[ch(0)]);
        assert_eq!(raw.x_ticks, normalized.x_ticks);
        assert_eq!(raw.series[0].points[0].x, normalized.series[0].points[0].x);
    }
}

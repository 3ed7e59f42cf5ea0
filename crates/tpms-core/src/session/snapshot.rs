//! What the display is handed each frame

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::{Point, Size};
use embedded_graphics::primitives::Rectangle;

use super::state::Mode;
use crate::baseline::Baseline;
use crate::channel::ChannelId;
use crate::graph::ChartGeometry;
use crate::sensors::Reading;

/// Default screen the layout is computed for
pub const SCREEN_WIDTH_PX: u32 = 1600;
pub const SCREEN_HEIGHT_PX: u32 = 800;

/// Gap between the charts and the screen edges
const CHART_MARGIN_PX: u32 = 20;

/// Height reserved below the charts for buttons and readouts
const CONTROLS_HEIGHT_PX: u32 = 200;

/// Width reserved left of the raw chart and right of the normalized chart
const SIDE_PANEL_WIDTH_PX: u32 = 120;

/// Screen areas of the two charts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayLayout {
    pub raw_area: Rectangle,
    pub normalized_area: Rectangle,
}

impl DisplayLayout {
    /// Two charts side by side inside a `width` x `height` screen.
    pub fn side_by_side(width: u32, height: u32) -> Self {
        let chart_height = height.saturating_sub(CONTROLS_HEIGHT_PX + CHART_MARGIN_PX);
        let usable = width.saturating_sub(2 * SIDE_PANEL_WIDTH_PX + CHART_MARGIN_PX);
        let chart_width = usable / 2;
        let top = CHART_MARGIN_PX as i32;
        let left = SIDE_PANEL_WIDTH_PX as i32;

        Self {
            raw_area: Rectangle::new(Point::new(left, top), Size::new(chart_width, chart_height)),
            normalized_area: Rectangle::new(
                Point::new(left + (chart_width + CHART_MARGIN_PX) as i32, top),
                Size::new(chart_width, chart_height),
            ),
        }
    }
}

impl Default for DisplayLayout {
    fn default() -> Self {
        Self::side_by_side(SCREEN_WIDTH_PX, SCREEN_HEIGHT_PX)
    }
}

/// Latest values shown next to a channel's legend entry
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    pub channel: ChannelId,
    pub label: String,
    pub color: Rgb565,
    pub latest: Option<Reading>,
    pub baseline: Baseline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    pub mode: Mode,
    pub raw: ChartGeometry,
    pub normalized: ChartGeometry,
    /// Time picked by the first baseline click, drawn as a vertical marker
    pub selection_marker: Option<f32>,
    pub readouts: Vec<Readout>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_fits_screen() {
        let layout = DisplayLayout::default();
        assert_eq!(layout.raw_area.top_left, Point::new(120, 20));
        assert_eq!(layout.raw_area.size, Size::new(670, 580));
        assert_eq!(layout.normalized_area.top_left, Point::new(810, 20));

        let right_edge = layout.normalized_area.top_left.x + layout.normalized_area.size.width as i32;
        assert!(right_edge <= SCREEN_WIDTH_PX as i32);
        assert!(
            layout.raw_area.top_left.x + (layout.raw_area.size.width as i32)
                < layout.normalized_area.top_left.x,
            "charts must not overlap"
        );
    }
}

//! Mapping between chart data and screen pixels
//!
//! Points go one way for drawing; clicks come back the other way so a baseline
//! bound can be picked on either chart. The plot rectangle is the chart area
//! minus [`PlotInsets`], which leave room for axis labels. Both edges of each
//! axis land on pixels inside the plot rectangle.

use embedded_graphics::prelude::{Point, Size};
use embedded_graphics::primitives::{ContainsPoint, Rectangle};

use super::constants::{
    PLOT_INSET_BOTTOM_PX, PLOT_INSET_LEFT_PX, PLOT_INSET_RIGHT_PX, PLOT_INSET_TOP_PX,
};
use super::series::DataPoint;

/// Visible range of both axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataBounds {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl DataBounds {
    pub const fn new(x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    pub fn x_range(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn y_range(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Position of `point` as fractions of each range, `(0, 0)` at the minima.
    ///
    /// Empty ranges give non-finite fractions, so nothing is inside them.
    fn fraction(&self, point: DataPoint) -> Option<(f32, f32)> {
        let fx = (point.x - self.x_min) / self.x_range();
        let fy = (point.y - self.y_min) / self.y_range();
        let inside = |f: f32| f.is_finite() && (0.0..=1.0).contains(&f);
        (inside(fx) && inside(fy)).then_some((fx, fy))
    }
}

/// Space kept free around the plot rectangle, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotInsets {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Default for PlotInsets {
    fn default() -> Self {
        Self {
            left: PLOT_INSET_LEFT_PX,
            top: PLOT_INSET_TOP_PX,
            right: PLOT_INSET_RIGHT_PX,
            bottom: PLOT_INSET_BOTTOM_PX,
        }
    }
}

impl PlotInsets {
    pub const fn uniform(px: u32) -> Self {
        Self {
            left: px,
            top: px,
            right: px,
            bottom: px,
        }
    }

    fn shrink(&self, area: Rectangle) -> Rectangle {
        let width = area.size.width.saturating_sub(self.left + self.right);
        let height = area.size.height.saturating_sub(self.top + self.bottom);
        Rectangle::new(
            area.top_left + Point::new(self.left as i32, self.top as i32),
            Size::new(width, height),
        )
    }
}

/// Projection of one chart's data range onto its plot rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    bounds: DataBounds,
    plot: Rectangle,
}

impl Viewport {
    /// Viewport over `area` with the default insets.
    pub fn new(bounds: DataBounds, area: Rectangle) -> Self {
        Self::with_insets(bounds, area, PlotInsets::default())
    }

    pub fn with_insets(bounds: DataBounds, area: Rectangle, insets: PlotInsets) -> Self {
        Self {
            bounds,
            plot: insets.shrink(area),
        }
    }

    pub fn plot_area(&self) -> Rectangle {
        self.plot
    }

    pub fn contains(&self, point: Point) -> bool {
        self.plot.contains(point)
    }

    /// Last pixel offset along each axis
    fn span(&self) -> Option<(f32, f32)> {
        let w = self.plot.size.width.checked_sub(1)?;
        let h = self.plot.size.height.checked_sub(1)?;
        (w > 0 && h > 0).then_some((w as f32, h as f32))
    }

    /// Pixel for `point`, or `None` when it lies outside the visible range.
    pub fn data_to_screen(&self, point: DataPoint) -> Option<Point> {
        let (fx, fy) = self.bounds.fraction(point)?;
        let (w, h) = self.span()?;
        // Screen y grows downwards
        Some(
            self.plot.top_left
                + Point::new(libm::roundf(fx * w) as i32, libm::roundf((1.0 - fy) * h) as i32),
        )
    }

    /// Data coordinates under a pixel, or `None` outside the plot rectangle.
    pub fn screen_to_data(&self, point: Point) -> Option<DataPoint> {
        if !self.contains(point) {
            return None;
        }
        let (w, h) = self.span()?;
        let offset = point - self.plot.top_left;
        let fx = offset.x as f32 / w;
        let fy = 1.0 - offset.y as f32 / h;

        Some(DataPoint::new(
            self.bounds.x_min + fx * self.bounds.x_range(),
            self.bounds.y_min + fy * self.bounds.y_range(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 101x101 plot rectangle at (10, 10), so one pixel is one x unit
    fn viewport() -> Viewport {
        Viewport::with_insets(
            DataBounds::new(0.0, 100.0, 0.0, 20.0),
            Rectangle::new(Point::zero(), Size::new(121, 121)),
            PlotInsets::uniform(10),
        )
    }

    #[test]
    fn test_axis_ends_land_inside_plot() {
        let vp = viewport();
        let origin = vp.data_to_screen(DataPoint::new(0.0, 0.0)).unwrap();
        let far = vp.data_to_screen(DataPoint::new(100.0, 20.0)).unwrap();
        assert_eq!(origin, Point::new(10, 110));
        assert_eq!(far, Point::new(110, 10));
        assert!(vp.contains(origin) && vp.contains(far));
    }

    #[test]
    fn test_points_outside_range_are_not_drawn() {
        let vp = viewport();
        assert_eq!(vp.data_to_screen(DataPoint::new(101.0, 5.0)), None);
        assert_eq!(vp.data_to_screen(DataPoint::new(50.0, -0.5)), None);
    }

    #[test]
    fn test_click_maps_back_to_data() {
        let vp = viewport();
        assert_eq!(
            vp.screen_to_data(Point::new(35, 60)),
            Some(DataPoint::new(25.0, 10.0))
        );

        let point = vp.data_to_screen(DataPoint::new(42.0, 4.0)).unwrap();
        let back = vp.screen_to_data(point).unwrap();
        assert!((back.x - 42.0).abs() < 1e-3, "{back:?}");
    }

    #[test]
    fn test_click_in_insets_is_ignored() {
        let vp = viewport();
        assert_eq!(vp.screen_to_data(Point::new(5, 60)), None);
        assert_eq!(vp.screen_to_data(Point::new(111, 60)), None);
        assert!(!vp.contains(Point::new(60, 111)));
    }

    #[test]
    fn test_default_insets_leave_label_room() {
        let area = Rectangle::new(Point::new(100, 50), Size::new(400, 300));
        let plot = Viewport::new(DataBounds::new(0.0, 1.0, 0.0, 1.0), area).plot_area();
        assert_eq!(plot.top_left, Point::new(100 + PLOT_INSET_LEFT_PX as i32, 50 + PLOT_INSET_TOP_PX as i32));
        assert_eq!(
            plot.size,
            Size::new(
                400 - PLOT_INSET_LEFT_PX - PLOT_INSET_RIGHT_PX,
                300 - PLOT_INSET_TOP_PX - PLOT_INSET_BOTTOM_PX
            )
        );
    }

    #[test]
    fn test_degenerate_bounds_draw_nothing() {
        let flat = Viewport::new(
            DataBounds::new(0.0, 0.0, 0.0, 1.0),
            Rectangle::new(Point::zero(), Size::new(200, 200)),
        );
        assert_eq!(flat.data_to_screen(DataPoint::new(0.0, 0.5)), None);
        assert_eq!(
            Viewport::new(DataBounds::new(5.0, 5.0, 0.0, 1.0), Rectangle::zero())
                .data_to_screen(DataPoint::new(5.0, 0.5)),
            None
        );
    }
}

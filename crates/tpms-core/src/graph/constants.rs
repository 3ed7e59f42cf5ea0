//! Constants for chart geometry
//!
//! Names carry their unit where one applies.

/// Initial x-axis upper bound, in time units
pub const INITIAL_X_MAX: f32 = 100.0;

/// Initial y-axis upper bound, in psi
pub const INITIAL_Y_MAX: f32 = 16.0;

/// Normalized y-axis half range right after a baseline is taken, in psi
pub const NORMALIZED_Y_EXTENT: f32 = INITIAL_Y_MAX / 2.0;

/// Headroom factor applied when an axis is outgrown
///
/// An exceeded bound is reset to this multiple of the exceeding quantity so
/// the chart does not rescale on every new point.
pub const AXIS_GROWTH_FACTOR: f32 = 1.5;

/// Number of labelled grid lines per axis
pub const AXIS_TICK_COUNT: usize = 5;

/// Room above the plot, in pixels
pub const PLOT_INSET_TOP_PX: u32 = 20;

/// Room right of the plot, in pixels
pub const PLOT_INSET_RIGHT_PX: u32 = 20;

/// Room below the plot for x tick labels and the axis title, in pixels
pub const PLOT_INSET_BOTTOM_PX: u32 = 60;

/// Room left of the plot for y tick labels, in pixels
pub const PLOT_INSET_LEFT_PX: u32 = 60;

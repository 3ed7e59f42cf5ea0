//! Post-run gap filling
//!
//! After a run stops, every data column of the finished log is walked in time
//! order and missing cells are replaced by linear interpolation between the
//! last known value before them (`lb`) and the first known value after them
//! (`ub`).
//!
//! - `lb` starts as `(time 0, seed)`, the column's baseline, so a leading gap
//!   interpolates up from the baseline.
//! - A gap with no later value (a terminal gap) is left missing. Data is never
//!   extrapolated past the last real reading.
//! - Interpolated values are rounded to 2 decimals.

use log::debug;

use super::record::{Cell, Record};
use crate::round_to;

/// Counts of what a fill pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillReport {
    /// Cells replaced by an interpolated value
    pub filled: usize,
    /// Missing cells left in terminal gaps
    pub unfilled: usize,
}

/// A known `(time, value)` point in one column
#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    time: f64,
    value: Cell,
}

/// Linear interpolation between two anchors at `time`, rounded to 2 decimals.
///
/// A missing endpoint value makes the result missing too.
fn interpolate(lb: Anchor, ub: Anchor, time: f64) -> Cell {
    let (lb_value, ub_value) = (lb.value?, ub.value?);
    let span = ub.time - lb.time;
    if span == 0.0 {
        return Some(ub_value);
    }
    Some(round_to(
        lb_value + (time - lb.time) * (ub_value - lb_value) / span,
        2,
    ))
}

/// Fill interior gaps of every data column of `record` in place.
///
/// `seeds[j]` is the starting value for data column `j` (column `j + 1` of
/// the file); columns without a seed start from 0.
pub fn fill_gaps(record: &mut Record, seeds: &[f64]) -> FillReport {
    let mut report = FillReport::default();
    let data_columns = record.column_count().saturating_sub(1);

    for column in 0..data_columns {
        let seed = seeds.get(column).copied().unwrap_or_default();
        let column_report = fill_column(record, column, seed);
        report.filled += column_report.filled;
        report.unfilled += column_report.unfilled;
    }

    debug!(
        "Gap fill: {} cells filled, {} left in terminal gaps",
        report.filled, report.unfilled
    );
    report
}

fn fill_column(record: &mut Record, column: usize, seed: f64) -> FillReport {
    let rows = &mut record.rows;
    let mut report = FillReport::default();
    let mut lb = Anchor {
        time: 0.0,
        value: Some(seed),
    };
    let mut ub: Option<Anchor> = None;

    for i in 0..rows.len() {
        let time = rows[i].time;
        if let Some(value) = rows[i].cells[column] {
            lb = Anchor {
                time,
                value: Some(value),
            };
            ub = None;
            continue;
        }

        let upper = match ub {
            Some(upper) => upper,
            None => {
                let next = rows[i + 1..].iter().find_map(|row| {
                    row.cells[column].map(|value| Anchor {
                        time: row.time,
                        value: Some(value),
                    })
                });
                match next {
                    Some(upper) => {
                        ub = Some(upper);
                        upper
                    }
                    None => {
                        // Terminal gap: nothing later to interpolate towards
                        report.unfilled = rows[i..]
                            .iter()
                            .filter(|row| row.cells[column].is_none())
                            .count();
                        break;
                    }
                }
            }
        };

        rows[i].cells[column] = interpolate(lb, upper, time);
        report.filled += 1;
    }

    report
}

//! Text rendering of display snapshots
//!
//! Stands in for the chart screen: the same [`DisplaySnapshot`] a graphical
//! front end would draw is summarised into log lines.

use log::info;

use tpms_core::graph::ChartGeometry;
use tpms_core::session::{DisplaySnapshot, Mode, Readout};

pub fn readout_line(readout: &Readout) -> String {
    let values = match readout.latest {
        Some(reading) => format!("{:.1} psi {:.1} °C", reading.pressure, reading.temperature),
        None => String::from("no reading"),
    };
    if readout.baseline.pressure == 0.0 {
        format!("{}: {}", readout.label, values)
    } else {
        let delta = readout
            .latest
            .map(|reading| reading.pressure - readout.baseline.pressure);
        match delta {
            Some(delta) => format!("{}: {} ({:+.1} psi from baseline)", readout.label, values, delta),
            None => format!("{}: {}", readout.label, values),
        }
    }
}

fn chart_line(chart: &ChartGeometry) -> String {
    let points: usize = chart.series.iter().map(|series| series.points.len()).sum();
    format!(
        "{}: x {:.1}..{:.1}, y {:.1}..{:.1}, {} points",
        chart.kind.title(),
        chart.bounds.x_min,
        chart.bounds.x_max,
        chart.bounds.y_min,
        chart.bounds.y_max,
        points
    )
}

pub fn log_snapshot(snapshot: &DisplaySnapshot) {
    let mode = match snapshot.mode {
        Mode::BaselineAcquisition(_) => "picking baseline",
        Mode::Running => "recording",
        Mode::Idle => "idle",
        Mode::Editing(_) => "editing",
    };
    info!("[{}] {}", mode, chart_line(&snapshot.raw));
    info!("[{}] {}", mode, chart_line(&snapshot.normalized));
    if let Some(marker) = snapshot.selection_marker {
        info!("Baseline lower bound at {:.2}", marker);
    }
    for readout in &snapshot.readouts {
        info!("  {}", readout_line(readout));
    }
}

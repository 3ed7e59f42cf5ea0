//! The persisted pressure log
//!
//! Format (comma separated, `\n` between rows, no trailing newline):
//!
//! ```text
//! Time,<label1>,Temp,<label2>,Temp,...
//! <t0>,<p1_0>,<temp1_0>,<p2_0>,<temp2_0>,...
//! ```
//!
//! A missing reading is written as the filler token (`None` by default),
//! never as an empty cell or `0`. The column set is fixed when a run starts
//! and every row carries exactly as many cells as the header.

extern crate alloc;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use thiserror_no_std::Error;

use crate::baseline::Baseline;
use crate::channel::{ChannelConfig, ChannelId, ChannelMap};
use crate::sampling::WindowSamples;

/// Token written in place of a missing value
pub const DEFAULT_FILLER: &str = "None";

/// Name of the first header column
pub const TIME_COLUMN: &str = "Time";

/// Header name of every temperature column
pub const TEMP_COLUMN: &str = "Temp";

/// A data cell: `None` is a missing reading
pub type Cell = Option<f64>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Record is empty")]
    Empty,

    #[error("Row {line} has {found} columns, header has {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {line}, column {column}: not a number")]
    InvalidNumber { line: usize, column: usize },
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Format a number the way the log has always written them: integral
/// values keep one decimal (`11.0`), others use the shortest exact form.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value == libm::trunc(value) && libm::fabs(value) < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Column layout of a run, frozen when the run starts
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSchema {
    channels: Vec<ChannelId>,
    labels: Vec<String>,
}

impl RecordSchema {
    /// Take the labeled channels, in index order.
    pub fn from_channels(channels: &ChannelMap<ChannelConfig>) -> Self {
        let (channels, labels) = channels
            .iter()
            .filter(|(_, config)| config.is_active())
            .map(|(id, config)| (id, String::from(config.label.as_str())))
            .unzip();
        Self { channels, labels }
    }

    /// Active channels in column order
    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    /// `1 + 2 × active channels`
    pub fn column_count(&self) -> usize {
        1 + 2 * self.channels.len()
    }

    pub fn header(&self) -> String {
        let mut header = String::from(TIME_COLUMN);
        for label in &self.labels {
            header.push(',');
            header.push_str(label);
            header.push(',');
            header.push_str(TEMP_COLUMN);
        }
        header
    }

    /// Gap filler seeds per data column: pressure then temperature baseline.
    pub fn seeds(&self, baselines: &ChannelMap<Baseline>) -> Vec<f64> {
        self.channels
            .iter()
            .flat_map(|&channel| {
                let baseline = baselines[channel];
                [baseline.pressure, baseline.temperature]
            })
            .collect()
    }
}

/// One row of the log
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub time: f64,
    pub cells: Vec<Cell>,
}

impl RecordRow {
    /// Build a row from a collapsed window, pressure then temperature per channel.
    pub fn from_window(time: f64, samples: &WindowSamples) -> Self {
        let cells = samples
            .iter()
            .flat_map(|(_, sample)| [sample.pressure, sample.temperature])
            .collect();
        Self { time, cells }
    }

    pub fn write_to(&self, out: &mut String, filler: &str) {
        out.push_str(&format_number(self.time));
        for cell in &self.cells {
            out.push(',');
            match cell {
                Some(value) => out.push_str(&format_number(*value)),
                None => out.push_str(filler),
            }
        }
    }
}

/// A parsed log: header names and rows
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub header: Vec<String>,
    pub rows: Vec<RecordRow>,
}

impl Record {
    pub fn parse(text: &str, filler: &str) -> RecordResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RecordError::Empty);
        }

        let mut lines = text.split('\n').map(|line| line.trim_end_matches('\r'));
        let header: Vec<String> = lines
            .next()
            .unwrap_or_default()
            .split(',')
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        for (index, line) in lines.enumerate() {
            // Line numbers are 1-based and the header is line 1
            let line_no = index + 2;
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != header.len() {
                return Err(RecordError::RaggedRow {
                    line: line_no,
                    expected: header.len(),
                    found: fields.len(),
                });
            }

            let time = fields[0]
                .trim()
                .parse::<f64>()
                .map_err(|_| RecordError::InvalidNumber {
                    line: line_no,
                    column: 0,
                })?;
            let cells = fields[1..]
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    let field = field.trim();
                    if field == filler {
                        Ok(None)
                    } else {
                        field.parse::<f64>().map(Some).map_err(|_| RecordError::InvalidNumber {
                            line: line_no,
                            column: i + 1,
                        })
                    }
                })
                .collect::<RecordResult<Vec<Cell>>>()?;

            rows.push(RecordRow { time, cells });
        }

        Ok(Self { header, rows })
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn to_text(&self, filler: &str) -> String {
        let mut text = self.header.join(",");
        for row in &self.rows {
            text.push('\n');
            row.write_to(&mut text, filler);
        }
        text
    }
}

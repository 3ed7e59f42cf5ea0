//! Hardware-independent core library for tpms-rs
//!
//! This crate contains the platform-agnostic logic of the BLE pressure logger:
//! payload calibration, windowed averaging of sensor readings, the raw and
//! normalized chart series, baseline selection, the persisted pressure log and
//! the post-run gap filler, all driven by a single [`session::Session`].
//!
//! It is `#![no_std]` with `extern crate alloc` so the same code runs on a
//! Raspberry Pi host, in the desktop logger and in tests. The BLE transport,
//! the file system and the screen are reached only through the
//! [`sensors::SensorFeed`] and [`storage::Store`] traits and the
//! [`session::DisplaySnapshot`] value.

#![no_std]

extern crate alloc;

pub mod baseline;
pub mod channel;
pub mod config;
pub mod graph;
pub mod sampling;
pub mod sensors;
pub mod session;
pub mod storage;

/// Round `value` to `decimals` decimal places, half away from zero.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = libm::pow(10.0, decimals as f64);
    libm::round(value * factor) / factor
}

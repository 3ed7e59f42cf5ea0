//! Sensor feed abstraction
//!
//! The BLE transport lives outside this crate. A [`SensorFeed`] performs one
//! bounded scan per tick and hands back the advertisements it saw; the
//! session maps each advertisement's address to a channel and decodes its
//! manufacturer payload with [`calibration`].

pub mod calibration;

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

use embassy_time::Duration;
use thiserror_no_std::Error;

pub use calibration::{Calibration, CalibrationError, LinearMap, Reading};

/// One advertisement observed during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// BLE address as reported by the transport
    pub address: String,
    /// Manufacturer-specific data as a hex string, if the packet carried any
    pub manufacturer: Option<String>,
}

impl Advertisement {
    pub fn new(address: &str, manufacturer: Option<&str>) -> Self {
        Self {
            address: String::from(address),
            manufacturer: manufacturer.map(String::from),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("BLE transport error: {0}")]
    Transport(String),

    #[error("BLE adapter unavailable")]
    AdapterUnavailable,
}

pub type FeedResult<T> = Result<T, FeedError>;

/// Source of BLE advertisements
///
/// `scan` may block for up to `window`. A failed scan is never fatal to the
/// session: it calls [`SensorFeed::reset`] and carries on with the next tick.
pub trait SensorFeed {
    /// Scan for advertisements for at most `window`.
    fn scan(&mut self, window: Duration) -> FeedResult<Vec<Advertisement>>;

    /// Reset the underlying transport after a failed scan.
    fn reset(&mut self) -> FeedResult<()>;
}

impl<F: SensorFeed + ?Sized> SensorFeed for &mut F {
    fn scan(&mut self, window: Duration) -> FeedResult<Vec<Advertisement>> {
        (**self).scan(window)
    }

    fn reset(&mut self) -> FeedResult<()> {
        (**self).reset()
    }
}

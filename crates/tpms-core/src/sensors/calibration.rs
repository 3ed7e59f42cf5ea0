//! Manufacturer payload decoding and linear calibration
//!
//! Sensors advertise little-endian words inside their manufacturer data. The
//! transport hands those over as a hex string, so the byte pairs are read
//! from the end of the field to the front before the integer is formed.
//!
//! Payload layout (hex character offsets):
//! - `16..24`: pressure word (4 bytes)
//! - `24..32`: temperature word (4 bytes)

use core::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::round_to;

/// Hex character range of the pressure word
pub const PRESSURE_FIELD: Range<usize> = 16..24;

/// Hex character range of the temperature word
pub const TEMPERATURE_FIELD: Range<usize> = 24..32;

/// Longest hex string that still fits a `u64`
const MAX_HEX_DIGITS: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("Empty payload")]
    Empty,

    #[error("Odd payload length: {len}")]
    OddLength { len: usize },

    #[error("Invalid hex digit at offset {offset}")]
    InvalidHex { offset: usize },

    #[error("Payload field too wide: {len} hex digits")]
    Overflow { len: usize },

    #[error("Payload truncated: need {needed} hex digits, got {len}")]
    Truncated { needed: usize, len: usize },
}

pub type CalibrationResult<T> = Result<T, CalibrationError>;

/// Decode a byte-reversed hex string into an integer.
///
/// `decode("0102")` reads the pairs `02`, `01` and yields `0x0201`.
pub fn decode(payload_hex: &str) -> CalibrationResult<u64> {
    let bytes = payload_hex.as_bytes();
    if bytes.is_empty() {
        return Err(CalibrationError::Empty);
    }
    if bytes.len() % 2 != 0 {
        return Err(CalibrationError::OddLength { len: bytes.len() });
    }
    if let Some(offset) = bytes.iter().position(|b| !b.is_ascii_hexdigit()) {
        return Err(CalibrationError::InvalidHex { offset });
    }
    if bytes.len() > MAX_HEX_DIGITS {
        return Err(CalibrationError::Overflow { len: bytes.len() });
    }

    let value = bytes
        .chunks_exact(2)
        .rev()
        .fold(0u64, |acc, pair| (acc << 8) | u64::from(hex_pair(pair)));
    Ok(value)
}

fn hex_pair(pair: &[u8]) -> u8 {
    (hex_digit(pair[0]) << 4) | hex_digit(pair[1])
}

fn hex_digit(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}

/// `value = round(raw * slope + intercept, 1)`
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LinearMap {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearMap {
    pub const fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    pub fn apply(&self, raw: u64) -> f64 {
        round_to(raw as f64 * self.slope + self.intercept, 1)
    }
}

/// Per-deployment calibration for both advertised quantities
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Calibration {
    /// Raw word to psi
    pub pressure: LinearMap,
    /// Raw word to degrees Celsius
    pub temperature: LinearMap,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            pressure: LinearMap::new(0.000146885, 0.626175),
            temperature: LinearMap::new(0.00977033, 0.0214060),
        }
    }
}

/// A calibrated pressure/temperature pair
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading {
    pub pressure: f64,
    pub temperature: f64,
}

impl Calibration {
    pub fn to_pressure(&self, raw: u64) -> f64 {
        self.pressure.apply(raw)
    }

    pub fn to_temp(&self, raw: u64) -> f64 {
        self.temperature.apply(raw)
    }

    /// Decode a full manufacturer payload into a calibrated reading.
    pub fn decode_reading(&self, manufacturer_hex: &str) -> CalibrationResult<Reading> {
        let needed = TEMPERATURE_FIELD.end;
        // `get` also rejects slices that would split a multi-byte character
        let (Some(pressure_hex), Some(temperature_hex)) = (
            manufacturer_hex.get(PRESSURE_FIELD),
            manufacturer_hex.get(TEMPERATURE_FIELD),
        ) else {
            if manufacturer_hex.len() < needed {
                return Err(CalibrationError::Truncated {
                    needed,
                    len: manufacturer_hex.len(),
                });
            }
            return Err(CalibrationError::InvalidHex {
                offset: PRESSURE_FIELD.start,
            });
        };

        Ok(Reading {
            pressure: self.to_pressure(decode(pressure_hex)?),
            temperature: self.to_temp(decode(temperature_hex)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reverses_byte_order() {
        assert_eq!(decode("0102"), Ok(513), "0102 must decode as 0x0201");
        assert_eq!(decode("ff"), Ok(255));
        assert_eq!(decode("A0860100"), Ok(100_000));
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert_eq!(decode("012"), Err(CalibrationError::OddLength { len: 3 }));
    }

    #[test]
    fn test_decode_rejects_non_hex() {
        assert_eq!(decode("01zz"), Err(CalibrationError::InvalidHex { offset: 2 }));
        assert_eq!(decode("+1"), Err(CalibrationError::InvalidHex { offset: 0 }));
        assert_eq!(decode(""), Err(CalibrationError::Empty));
    }

    #[test]
    fn test_decode_rejects_overflow() {
        assert_eq!(
            decode("000000000000000000"),
            Err(CalibrationError::Overflow { len: 18 })
        );
    }

    #[test]
    fn test_calibration_is_monotonic() {
        let calibration = Calibration::default();
        let mut previous = calibration.to_pressure(0);
        for raw in (10_000..400_000).step_by(10_000) {
            let current = calibration.to_pressure(raw);
            assert!(current > previous, "pressure must rise with raw ({raw})");
            previous = current;
        }
    }

    #[test]
    fn test_linear_map_rounds_to_one_decimal() {
        let map = LinearMap::new(0.5, 0.04);
        assert_eq!(map.apply(3), 1.5);
        assert_eq!(map.apply(0), 0.0);
    }

    #[test]
    fn test_decode_reading_uses_payload_fields() {
        let calibration = Calibration {
            pressure: LinearMap::new(1.0, 0.0),
            temperature: LinearMap::new(1.0, 0.0),
        };
        // pressure word 0x00000102 = 258, temperature word 0x0000001e = 30
        let payload = alloc::format!("{}{}{}", "0001020304050607", "02010000", "1e000000");
        let reading = calibration.decode_reading(&payload).unwrap();
        assert_eq!(reading.pressure, 258.0);
        assert_eq!(reading.temperature, 30.0);
    }

    #[test]
    fn test_decode_reading_rejects_short_payload() {
        let calibration = Calibration::default();
        assert_eq!(
            calibration.decode_reading("0001020304"),
            Err(CalibrationError::Truncated { needed: 32, len: 10 })
        );
    }
}

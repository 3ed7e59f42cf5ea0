//! Session configuration
//!
//! Everything a deployment may change without touching the algorithms:
//! output path, window spacing, save cadence, calibration constants and the
//! sensor-to-channel assignment.

extern crate alloc;
use alloc::string::String;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::channel::{ChannelConfig, ChannelId, ChannelMap, MAX_CHANNELS};
use crate::sensors::calibration::Calibration;
use crate::storage::record::DEFAULT_FILLER;

/// Default output file
pub const DEFAULT_FILE_NAME: &str = "test.txt";

/// Default spacing between averaged samples, in [`TimeUnit`]s
pub const DEFAULT_SPACING: f64 = 3.0;

/// Default interval between durable saves of the pressure log
pub const DEFAULT_SAVE_INTERVAL_SECS: u64 = 5 * 60;

/// Default BLE scan window per tick
pub const DEFAULT_SCAN_WINDOW_SECS: u64 = 2;

/// How long readings must stay unchanged before an automatic baseline
pub const DEFAULT_STABLE_HOLD_SECS: u64 = 60;

/// Unit used for window spacing and for the `Time` column
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    #[default]
    Minutes,
}

impl TimeUnit {
    pub const fn millis(self) -> u64 {
        match self {
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
        }
    }

    /// Convert an elapsed duration into this unit.
    pub fn from_duration(self, duration: Duration) -> f64 {
        duration.as_millis() as f64 / self.millis() as f64
    }

    /// Convert an amount of this unit into a duration.
    pub fn to_duration(self, amount: f64) -> Duration {
        Duration::from_millis(libm::round(amount * self.millis() as f64) as u64)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Minutes => "min",
        }
    }
}

/// Where a run's baseline comes from
///
/// The operator can always pick one by clicking the chart; a stable source
/// also takes one automatically. Either way a run gets at most one.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase", tag = "source")]
pub enum BaselineSource {
    #[default]
    Manual,
    /// Latest readings, once every labeled channel has held them for `hold_secs`
    Stable { hold_secs: u64 },
}

impl BaselineSource {
    pub const fn stable() -> Self {
        Self::Stable {
            hold_secs: DEFAULT_STABLE_HOLD_SECS,
        }
    }

    /// Hold time for the automatic baseline, if there is one
    pub fn hold(self) -> Option<Duration> {
        match self {
            Self::Manual => None,
            Self::Stable { hold_secs } => Some(Duration::from_secs(hold_secs)),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Window spacing must be positive (got {spacing})")]
    NonPositiveSpacing { spacing: f64 },

    #[error("Window spacing of {spacing_ms} ms is shorter than the {scan_ms} ms scan window")]
    SpacingShorterThanScan { spacing_ms: u64, scan_ms: u64 },

    #[error("Save interval must be non-zero")]
    ZeroSaveInterval,

    #[error("Filler token must not be a number or empty")]
    InvalidFiller,

    #[error("Stable baseline hold must be non-zero")]
    ZeroStableHold,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Path of the pressure log, relative folders are created on demand
    pub file_name: String,
    /// Spacing between averaged samples, in `time_unit`s
    pub spacing: f64,
    pub time_unit: TimeUnit,
    pub save_interval_secs: u64,
    pub scan_window_secs: u64,
    /// Token written in place of a missing reading
    pub filler: String,
    pub calibration: Calibration,
    pub baseline: BaselineSource,
    /// Channel slots in index order; slots past the end are unused
    pub channels: heapless::Vec<ChannelConfig, MAX_CHANNELS>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        const SENSORS: [(&str, &str, [u8; 3]); 4] = [
            ("80:ea:ca:10:02:dd", "one", [0x3C, 0xA4, 0xBB]),
            ("81:ea:ca:20:00:b3", "two", [0xBE, 0x1E, 0x1E]),
            ("82:ea:ca:30:01:ee", "three", [0xE9, 0xE6, 0x10]),
            ("83:ea:ca:40:01:00", "four", [0x09, 0xBB, 0x0C]),
        ];

        let mut channels = heapless::Vec::new();
        for (address, label, color) in SENSORS {
            if let Some(channel) = ChannelConfig::new(address, label, color) {
                let _ = channels.push(channel);
            }
        }

        Self {
            file_name: String::from(DEFAULT_FILE_NAME),
            spacing: DEFAULT_SPACING,
            time_unit: TimeUnit::default(),
            save_interval_secs: DEFAULT_SAVE_INTERVAL_SECS,
            scan_window_secs: DEFAULT_SCAN_WINDOW_SECS,
            filler: String::from(DEFAULT_FILLER),
            calibration: Calibration::default(),
            baseline: BaselineSource::default(),
            channels,
        }
    }
}

impl SessionConfig {
    pub fn spacing_duration(&self) -> Duration {
        self.time_unit.to_duration(self.spacing)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    pub fn scan_window(&self) -> Duration {
        Duration::from_secs(self.scan_window_secs)
    }

    /// Spread the configured slots over a full channel table.
    pub fn channel_map(&self) -> ChannelMap<ChannelConfig> {
        ChannelMap::from_fn(|id: ChannelId| {
            self.channels.get(id.index()).cloned().unwrap_or_default()
        })
    }

    /// Check a candidate spacing against the scan window.
    pub fn check_spacing(&self, spacing: f64) -> Result<(), ConfigError> {
        if !(spacing > 0.0) || !spacing.is_finite() {
            return Err(ConfigError::NonPositiveSpacing { spacing });
        }
        let spacing_ms = self.time_unit.to_duration(spacing).as_millis();
        let scan_ms = self.scan_window().as_millis();
        if spacing_ms < scan_ms {
            return Err(ConfigError::SpacingShorterThanScan {
                spacing_ms,
                scan_ms,
            });
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_spacing(self.spacing)?;
        if self.save_interval_secs == 0 {
            return Err(ConfigError::ZeroSaveInterval);
        }
        if self.filler.is_empty() || self.filler.contains(',') || self.filler.parse::<f64>().is_ok()
        {
            return Err(ConfigError::InvalidFiller);
        }
        if self.baseline == (BaselineSource::Stable { hold_secs: 0 }) {
            return Err(ConfigError::ZeroStableHold);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.channels.len(), 4);
        assert_eq!(config.spacing_duration(), Duration::from_secs(180));
    }

    #[test]
    fn test_spacing_must_cover_scan_window() {
        let mut config = SessionConfig::default();
        config.time_unit = TimeUnit::Seconds;
        config.spacing = 1.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::SpacingShorterThanScan {
                spacing_ms: 1_000,
                scan_ms: 2_000
            })
        );
    }

    #[test]
    fn test_non_positive_spacing_rejected() {
        let config = SessionConfig::default();
        assert!(config.check_spacing(0.0).is_err());
        assert!(config.check_spacing(-3.0).is_err());
        assert!(config.check_spacing(f64::NAN).is_err());
    }

    #[test]
    fn test_numeric_filler_rejected() {
        let mut config = SessionConfig::default();
        config.filler = String::from("0");
        assert_eq!(config.validate(), Err(ConfigError::InvalidFiller));
    }

    #[test]
    fn test_stable_baseline_needs_a_hold() {
        let mut config = SessionConfig::default();
        assert_eq!(config.baseline.hold(), None);

        config.baseline = BaselineSource::stable();
        assert_eq!(config.baseline.hold(), Some(Duration::from_secs(60)));
        assert_eq!(config.validate(), Ok(()));

        config.baseline = BaselineSource::Stable { hold_secs: 0 };
        assert_eq!(config.validate(), Err(ConfigError::ZeroStableHold));
    }

    #[test]
    fn test_channel_map_pads_unused_slots() {
        let config = SessionConfig::default();
        let map = config.channel_map();
        let active = map.iter().filter(|(_, c)| c.is_active()).count();
        assert_eq!(active, 4);
    }

    #[test]
    fn test_time_unit_conversion() {
        assert_eq!(TimeUnit::Minutes.from_duration(Duration::from_secs(90)), 1.5);
        assert_eq!(TimeUnit::Seconds.to_duration(2.5), Duration::from_millis(2_500));
    }
}

//! Synthetic BLE advertisements for running without an adapter
//!
//! Each configured sensor reports a slowly varying pressure and temperature,
//! encoded back through the inverse calibration into the same payload layout
//! real sensors advertise. Sensors go silent in bursts long enough to leave
//! missing windows, and the transport fails every so often, so the recovery
//! and gap-filling paths get exercised.

use embassy_time::Duration;

use tpms_core::config::SessionConfig;
use tpms_core::sensors::{Advertisement, Calibration, FeedError, FeedResult, LinearMap, SensorFeed};

/// Manufacturer bytes ahead of the pressure word
const PAYLOAD_PREFIX: &str = "0001000000000000";

/// Scans a silent burst lasts; at 2 s per scan this spans several minutes
const DROPOUT_BURST_SCANS: u64 = 120;

/// Nominal tyre pressure, psi
const BASE_PRESSURE: f64 = 30.0;

/// Nominal sensor temperature, °C
const BASE_TEMPERATURE: f64 = 21.0;

struct SimulatedSensor {
    address: String,
    /// Offset so the sensors do not move in lockstep
    phase: f64,
}

pub struct SimulatedFeed {
    sensors: Vec<SimulatedSensor>,
    calibration: Calibration,
    /// Simulated seconds covered by all scans so far
    elapsed_secs: f64,
    scans: u64,
    /// Every n-th burst a sensor is silent; 0 disables dropouts
    dropout_every: u64,
    /// Every n-th scan fails; 0 disables transport errors
    transport_error_every: u64,
    resets: u64,
}

impl SimulatedFeed {
    pub fn new(addresses: &[&str], calibration: Calibration) -> Self {
        let sensors = addresses
            .iter()
            .enumerate()
            .map(|(i, address)| SimulatedSensor {
                address: address.to_string(),
                phase: i as f64 * 1.7,
            })
            .collect();

        Self {
            sensors,
            calibration,
            elapsed_secs: 0.0,
            scans: 0,
            dropout_every: 0,
            transport_error_every: 0,
            resets: 0,
        }
    }

    /// Build a feed for every labeled sensor in `config`.
    pub fn from_config(config: &SessionConfig) -> Self {
        let addresses: Vec<&str> = config
            .channels
            .iter()
            .filter(|channel| channel.is_active() && !channel.address.is_empty())
            .map(|channel| channel.address.as_str())
            .collect();
        Self::new(&addresses, config.calibration)
    }

    pub fn with_dropouts(mut self, every: u64) -> Self {
        self.dropout_every = every;
        self
    }

    pub fn with_transport_errors(mut self, every: u64) -> Self {
        self.transport_error_every = every;
        self
    }

    pub fn resets(&self) -> u64 {
        self.resets
    }

    fn is_silent(&self, index: usize) -> bool {
        if self.dropout_every == 0 {
            return false;
        }
        let burst = self.scans / DROPOUT_BURST_SCANS;
        // Only one sensor drops per cycle, and never in the first burst
        burst > 0 && (burst + index as u64) % self.dropout_every == 0
    }

    fn payload(&self, sensor: &SimulatedSensor) -> String {
        let t = self.elapsed_secs + sensor.phase * 100.0;
        let pressure = BASE_PRESSURE + 1.5 * (t / 900.0).sin() + 0.2 * (t / 47.0).cos();
        let temperature = BASE_TEMPERATURE + 4.0 * (t / 1800.0).sin() + 0.3 * (t / 61.0).cos();

        format!(
            "{PAYLOAD_PREFIX}{:08x}{:08x}",
            raw_word(&self.calibration.pressure, pressure).swap_bytes(),
            raw_word(&self.calibration.temperature, temperature).swap_bytes()
        )
    }
}

/// Raw sensor word that calibrates to roughly `value`
fn raw_word(map: &LinearMap, value: f64) -> u32 {
    if map.slope == 0.0 {
        return 0;
    }
    ((value - map.intercept) / map.slope).round().clamp(0.0, u32::MAX as f64) as u32
}

impl SensorFeed for SimulatedFeed {
    fn scan(&mut self, window: Duration) -> FeedResult<Vec<Advertisement>> {
        self.scans += 1;
        self.elapsed_secs += window.as_millis() as f64 / 1000.0;

        if self.transport_error_every != 0 && self.scans % self.transport_error_every == 0 {
            return Err(FeedError::Transport(format!(
                "simulated HCI failure on scan {}",
                self.scans
            )));
        }

        Ok(self
            .sensors
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.is_silent(*i))
            .map(|(_, sensor)| Advertisement::new(&sensor.address, Some(&self.payload(sensor))))
            .collect())
    }

    fn reset(&mut self) -> FeedResult<()> {
        self.resets += 1;
        log::debug!("Simulated transport reset #{}", self.resets);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "80:ea:ca:10:02:dd";

    #[test]
    fn test_payload_decodes_near_nominal_values() {
        let calibration = Calibration::default();
        let mut feed = SimulatedFeed::new(&[ADDRESS], calibration);
        let advertisements = feed.scan(Duration::from_secs(2)).unwrap();
        assert_eq!(advertisements.len(), 1);
        assert_eq!(advertisements[0].address, ADDRESS);

        let payload = advertisements[0].manufacturer.as_deref().unwrap();
        assert_eq!(payload.len(), 32);
        let reading = calibration.decode_reading(payload).unwrap();
        assert!((reading.pressure - BASE_PRESSURE).abs() < 2.0, "{reading:?}");
        assert!((reading.temperature - BASE_TEMPERATURE).abs() < 5.0, "{reading:?}");
    }

    #[test]
    fn test_transport_errors_follow_schedule() {
        let mut feed = SimulatedFeed::new(&[ADDRESS], Calibration::default()).with_transport_errors(3);
        let window = Duration::from_secs(2);
        assert!(feed.scan(window).is_ok());
        assert!(feed.scan(window).is_ok());
        assert!(matches!(feed.scan(window), Err(FeedError::Transport(_))));
        assert!(feed.scan(window).is_ok());
    }

    #[test]
    fn test_dropouts_silence_one_sensor_per_burst() {
        let addresses = ["a", "b"];
        let mut feed = SimulatedFeed::new(&addresses, Calibration::default()).with_dropouts(2);
        let window = Duration::from_secs(2);

        let mut silent_scans = 0;
        for _ in 0..(DROPOUT_BURST_SCANS * 4) {
            let seen = feed.scan(window).unwrap().len();
            assert!(seen >= 1, "only one sensor drops at a time");
            if seen == 1 {
                silent_scans += 1;
            }
        }
        assert!(silent_scans > 0);
    }
}

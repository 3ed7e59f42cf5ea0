//! Baseline selection and computation
//!
//! A baseline is picked after data has started accumulating: the operator
//! clicks twice on a chart to bound a time interval, and every channel's
//! baseline becomes the mean of its raw points inside that interval.
//!
//! A channel with no points in the interval keeps a zero baseline and is
//! reported back in [`BaselineOutcome::empty_channels`] so the caller can warn
//! about it; the action as a whole still succeeds.
//!
//! Alternatively a [`StabilityWatch`] takes the baseline on its own once no
//! channel's reading has changed for a hold time.

extern crate alloc;
use alloc::vec::Vec;

use embassy_time::{Duration, Instant};
use log::warn;

use crate::channel::{ChannelId, ChannelMap};
use crate::graph::{DataPoint, SeriesStore};
use crate::sampling::ChannelAggregator;
use crate::sensors::Reading;

/// Pressure and temperature offsets for one channel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Baseline {
    pub pressure: f64,
    pub temperature: f64,
}

/// Result of a baseline computation
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineOutcome {
    pub baselines: ChannelMap<Baseline>,
    /// Channels that had no samples in the interval and kept a zero baseline
    pub empty_channels: Vec<ChannelId>,
    /// Interval actually used, lower bound first
    pub interval: (f32, f32),
}

/// Two-click interval selection
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BaselineSelection {
    lower: Option<f32>,
}

impl BaselineSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time picked by the first click, if any
    pub fn pending_bound(&self) -> Option<f32> {
        self.lower
    }

    /// Register a click at `time`.
    ///
    /// The first click only records a bound. The second returns the interval
    /// with its bounds in ascending order.
    pub fn click(&mut self, time: f32) -> Option<(f32, f32)> {
        match self.lower.take() {
            None => {
                self.lower = Some(time);
                None
            }
            Some(first) if time < first => Some((time, first)),
            Some(first) => Some((first, time)),
        }
    }
}

/// Waits for every channel's readings to hold still
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityWatch {
    hold: Duration,
    stable_since: Instant,
}

impl StabilityWatch {
    pub fn new(now: Instant, hold: Duration) -> Self {
        Self {
            hold,
            stable_since: now,
        }
    }

    pub fn stable_since(&self) -> Instant {
        self.stable_since
    }

    /// Note a new reading. Any change from the channel's previous one
    /// restarts the hold; a channel's first reading does not.
    pub fn observe(&mut self, now: Instant, previous: Option<Reading>, reading: Reading) {
        if previous.is_some_and(|previous| previous != reading) {
            self.stable_since = now;
        }
    }

    /// Baselines from the latest readings, once every channel in `channels`
    /// has one and the hold has fully elapsed.
    pub fn settle(
        &self,
        now: Instant,
        aggregator: &ChannelAggregator,
        channels: &[ChannelId],
    ) -> Option<ChannelMap<Baseline>> {
        if now.saturating_duration_since(self.stable_since) <= self.hold {
            return None;
        }
        let mut baselines = ChannelMap::new();
        for &channel in channels {
            let reading = aggregator.latest(channel)?;
            baselines[channel] = Baseline {
                pressure: reading.pressure,
                temperature: reading.temperature,
            };
        }
        Some(baselines)
    }
}

fn mean(points: impl Iterator<Item = DataPoint>) -> Option<f64> {
    let (sum, count) = points.fold((0.0f64, 0usize), |(sum, count), p| {
        (sum + p.y as f64, count + 1)
    });
    (count > 0).then(|| sum / count as f64)
}

/// Average each channel's raw points with time in `[lower, upper]`.
pub fn compute_baseline(
    store: &SeriesStore,
    channels: &[ChannelId],
    lower: f32,
    upper: f32,
) -> BaselineOutcome {
    let (lower, upper) = if upper < lower { (upper, lower) } else { (lower, upper) };
    let mut baselines = ChannelMap::new();
    let mut empty_channels = Vec::new();

    for &channel in channels {
        let pressure = mean(store.raw(channel).in_range(lower, upper).copied());
        let temperature = mean(store.temperature(channel).in_range(lower, upper).copied());

        match pressure {
            Some(pressure) => {
                baselines[channel] = Baseline {
                    pressure,
                    temperature: temperature.unwrap_or_default(),
                };
            }
            None => {
                warn!(
                    "Channel {} has no samples between {} and {}; baseline left at 0",
                    channel, lower, upper
                );
                empty_channels.push(channel);
            }
        }
    }

    BaselineOutcome {
        baselines,
        empty_channels,
        interval: (lower, upper),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(index: usize) -> ChannelId {
        ChannelId::new(index).unwrap()
    }

    fn store() -> SeriesStore {
        let mut store = SeriesStore::new();
        for (t, p) in [(3.0, 30.0), (6.0, 31.0), (9.0, 32.0), (12.0, 40.0)] {
            store.append(ch(0), t, p).unwrap();
            store.append_temperature(ch(0), t, 20.0).unwrap();
        }
        store
    }

    #[test]
    fn test_selection_orders_bounds() {
        let mut selection = BaselineSelection::new();
        assert_eq!(selection.click(9.0), None);
        assert_eq!(selection.pending_bound(), Some(9.0));
        assert_eq!(selection.click(3.0), Some((3.0, 9.0)), "reversed clicks swap");
        assert_eq!(selection.pending_bound(), None);

        assert_eq!(selection.click(1.0), None);
        assert_eq!(selection.click(2.0), Some((1.0, 2.0)));
    }

    #[test]
    fn test_interval_is_inclusive() {
        let outcome = compute_baseline(&store(), &[ch(0)], 3.0, 9.0);
        assert_eq!(outcome.baselines[ch(0)].pressure, 31.0);
        assert_eq!(outcome.baselines[ch(0)].temperature, 20.0);
        assert!(outcome.empty_channels.is_empty());
    }

    #[test]
    fn test_empty_interval_keeps_zero_baseline() {
        let outcome = compute_baseline(&store(), &[ch(0), ch(1)], 4.0, 5.0);
        assert_eq!(outcome.baselines[ch(0)], Baseline::default());
        assert_eq!(outcome.baselines[ch(1)], Baseline::default());
        assert_eq!(outcome.empty_channels, alloc::vec![ch(0), ch(1)]);
    }

    fn reading(pressure: f64) -> Reading {
        Reading {
            pressure,
            temperature: 20.0,
        }
    }

    #[test]
    fn test_watch_settles_after_hold() {
        let start = Instant::from_secs(0);
        let mut watch = StabilityWatch::new(start, Duration::from_secs(60));
        let mut aggregator = ChannelAggregator::new();

        aggregator.record_reading(ch(0), reading(30.0));
        assert_eq!(watch.settle(Instant::from_secs(61), &aggregator, &[ch(0), ch(1)]), None);

        watch.observe(Instant::from_secs(5), None, reading(31.0));
        aggregator.record_reading(ch(1), reading(31.0));
        assert_eq!(watch.stable_since(), start, "first reading starts no hold");
        assert_eq!(watch.settle(Instant::from_secs(60), &aggregator, &[ch(0), ch(1)]), None);

        let baselines = watch
            .settle(Instant::from_secs(61), &aggregator, &[ch(0), ch(1)])
            .unwrap();
        assert_eq!(baselines[ch(0)].pressure, 30.0);
        assert_eq!(baselines[ch(1)].pressure, 31.0);
        assert_eq!(baselines[ch(1)].temperature, 20.0);
    }

    #[test]
    fn test_watch_restarts_on_change() {
        let mut watch = StabilityWatch::new(Instant::from_secs(0), Duration::from_secs(60));
        watch.observe(Instant::from_secs(10), Some(reading(30.0)), reading(30.0));
        assert_eq!(watch.stable_since(), Instant::from_secs(0));

        watch.observe(Instant::from_secs(40), Some(reading(30.0)), reading(30.1));
        assert_eq!(watch.stable_since(), Instant::from_secs(40));

        let mut aggregator = ChannelAggregator::new();
        aggregator.record_reading(ch(0), reading(30.1));
        assert_eq!(watch.settle(Instant::from_secs(90), &aggregator, &[ch(0)]), None);
        assert!(watch.settle(Instant::from_secs(101), &aggregator, &[ch(0)]).is_some());
    }

    #[test]
    fn test_reversed_bounds_are_swapped() {
        let outcome = compute_baseline(&store(), &[ch(0)], 12.0, 9.0);
        assert_eq!(outcome.interval, (9.0, 12.0));
        assert_eq!(outcome.baselines[ch(0)].pressure, 36.0);
    }
}

//! Channel identities and per-channel storage
//!
//! A channel is one physical sensor slot. Slots are addressed by a
//! [`ChannelId`] in `0..MAX_CHANNELS`, and per-channel data lives in a
//! [`ChannelMap`] so out-of-range indices cannot be expressed.

use core::ops::{Index, IndexMut};
use core::str::FromStr;

use embedded_graphics::pixelcolor::{Rgb565, Rgb888};
use serde::{Deserialize, Serialize};

/// Number of sensor slots tracked by a session
pub const MAX_CHANNELS: usize = 16;

/// Maximum length of a channel label in bytes
pub const LABEL_CAPACITY: usize = 24;

/// Length of a textual BLE address (`aa:bb:cc:dd:ee:ff`)
pub const ADDRESS_CAPACITY: usize = 17;

pub type Label = heapless::String<LABEL_CAPACITY>;
pub type Address = heapless::String<ADDRESS_CAPACITY>;

/// Index of a sensor slot, always in `0..MAX_CHANNELS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Create a channel id, returning `None` when `index` is out of range.
    pub const fn new(index: usize) -> Option<Self> {
        if index < MAX_CHANNELS {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterate over every channel in index order.
    pub fn all() -> impl Iterator<Item = ChannelId> {
        (0..MAX_CHANNELS as u8).map(ChannelId)
    }
}

impl core::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Channels are shown 1-based on screen
        write!(f, "{}", self.0 + 1)
    }
}

/// Fixed-size table holding one `T` per channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMap<T> {
    slots: [T; MAX_CHANNELS],
}

impl<T: Default> ChannelMap<T> {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| T::default()),
        }
    }
}

impl<T: Default> Default for ChannelMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChannelMap<T> {
    pub fn from_fn(mut f: impl FnMut(ChannelId) -> T) -> Self {
        Self {
            slots: core::array::from_fn(|i| f(ChannelId(i as u8))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (ChannelId(i as u8), slot))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ChannelId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .map(|(i, slot)| (ChannelId(i as u8), slot))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut()
    }
}

impl<T> Index<ChannelId> for ChannelMap<T> {
    type Output = T;

    fn index(&self, id: ChannelId) -> &T {
        &self.slots[id.index()]
    }
}

impl<T> IndexMut<ChannelId> for ChannelMap<T> {
    fn index_mut(&mut self, id: ChannelId) -> &mut T {
        &mut self.slots[id.index()]
    }
}

/// Per-slot configuration: which sensor feeds it and how it is shown
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ChannelConfig {
    /// BLE address of the sensor; empty when the slot has no sensor
    pub address: Address,
    /// Column name in the pressure log; empty means the slot is inactive
    pub label: Label,
    /// Legend colour as 8-bit RGB
    pub color: [u8; 3],
}

impl ChannelConfig {
    /// Build a channel config, failing when a string exceeds its capacity.
    pub fn new(address: &str, label: &str, color: [u8; 3]) -> Option<Self> {
        Some(Self {
            address: Address::from_str(address).ok()?,
            label: Label::from_str(label).ok()?,
            color,
        })
    }

    /// A channel with an empty label is never aggregated, plotted or persisted.
    pub fn is_active(&self) -> bool {
        !self.label.is_empty()
    }

    /// Whether an advertisement from `address` belongs to this slot.
    pub fn matches(&self, address: &str) -> bool {
        !self.address.is_empty() && self.address.eq_ignore_ascii_case(address)
    }

    pub fn color(&self) -> Rgb565 {
        let [r, g, b] = self.color;
        Rgb565::from(Rgb888::new(r, g, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_id_range() {
        assert_eq!(ChannelId::new(0).map(ChannelId::index), Some(0));
        assert_eq!(ChannelId::new(15).map(ChannelId::index), Some(15));
        assert!(ChannelId::new(MAX_CHANNELS).is_none());
        assert_eq!(ChannelId::all().count(), MAX_CHANNELS);
    }

    #[test]
    fn test_channel_map_indexing() {
        let mut map: ChannelMap<u32> = ChannelMap::new();
        let id = ChannelId::new(3).unwrap();
        map[id] = 7;
        assert_eq!(map[id], 7);
        assert_eq!(map.iter().filter(|(_, v)| **v == 7).count(), 1);
    }

    #[test]
    fn test_address_matching_ignores_case() {
        let config = ChannelConfig::new("80:ea:ca:10:02:dd", "one", [0, 0, 0]).unwrap();
        assert!(config.matches("80:EA:CA:10:02:DD"));
        assert!(!config.matches("81:ea:ca:20:00:b3"));
    }

    #[test]
    fn test_empty_slot_matches_nothing() {
        let config = ChannelConfig::default();
        assert!(!config.matches(""));
        assert!(!config.is_active());
    }

    #[test]
    fn test_label_capacity_enforced() {
        let long = "a-label-that-is-far-too-long-for-a-slot";
        assert!(ChannelConfig::new("", long, [0, 0, 0]).is_none());
    }
}

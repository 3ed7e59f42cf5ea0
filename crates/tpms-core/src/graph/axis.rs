//! Axis tick generation

extern crate alloc;
use alloc::vec::Vec;

/// Evenly spaced tick values from `min` to `max` inclusive, rounded to 2 decimals.
pub fn axis_ticks(min: f32, max: f32, count: usize) -> Vec<f32> {
    match count {
        0 => Vec::new(),
        1 => alloc::vec![round2(min)],
        _ => {
            let step = (max - min) / (count - 1) as f32;
            (0..count).map(|i| round2(min + step * i as f32)).collect()
        }
    }
}

fn round2(value: f32) -> f32 {
    libm::roundf(value * 100.0) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_cover_range() {
        assert_eq!(axis_ticks(0.0, 100.0, 5), alloc::vec![0.0, 25.0, 50.0, 75.0, 100.0]);
    }

    #[test]
    fn test_ticks_round_to_two_decimals() {
        let ticks = axis_ticks(0.0, 1.0, 4);
        assert_eq!(ticks, alloc::vec![0.0, 0.33, 0.67, 1.0]);
    }

    #[test]
    fn test_degenerate_counts() {
        assert!(axis_ticks(0.0, 1.0, 0).is_empty());
        assert_eq!(axis_ticks(3.0, 9.0, 1), alloc::vec![3.0]);
    }
}

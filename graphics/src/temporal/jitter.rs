//! Sub-pixel camera jitter.
//!
//! Offsets come from the two-dimensional golden-ratio recurrence
//! `offset_k(n) = frac(0.5 + a_k * (n + 1)) - 0.5` with `a_1 = 1/g` and
//! `a_2 = 1/g^2`, where `g` is the plastic number. The counter wraps every
//! [`JITTER_PERIOD`] frames.

use stratus_core::math::{Mat4, Vec2, fract};

use crate::types::Extent3d;

/// Number of distinct jitter offsets before the sequence repeats.
pub const JITTER_PERIOD: u32 = 32;

/// The plastic number, root of `x^3 = x + 1`.
const PLASTIC_NUMBER: f64 = 1.324_717_957_244_746_025_96;

/// Offset `n` of the sequence, in `[-0.5, 0.5)` pixels.
pub fn sequence_offset(n: u32) -> Vec2 {
    let a1 = 1.0 / PLASTIC_NUMBER;
    let a2 = 1.0 / (PLASTIC_NUMBER * PLASTIC_NUMBER);
    let step = f64::from(n) + 1.0;
    Vec2::new(
        (fract(0.5 + a1 * step) - 0.5) as f32,
        (fract(0.5 + a2 * step) - 0.5) as f32,
    )
}

/// Add a jitter offset to a projection's x/y translation terms.
pub fn apply_jitter(projection: &mut Mat4, jitter: Vec2) {
    projection[(0, 3)] += jitter.x;
    projection[(1, 3)] += jitter.y;
}

/// Frame counter driving the jitter sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JitterSequence {
    counter: u32,
}

impl JitterSequence {
    /// Start at the beginning of the sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the offset the next call to [`advance`](Self::advance) returns.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Return this frame's offset scaled to `extent` and step the counter.
    pub fn advance(&mut self, extent: Extent3d) -> Vec2 {
        let offset = sequence_offset(self.counter);
        self.counter = (self.counter + 1) % JITTER_PERIOD;
        Vec2::new(
            offset.x / extent.width.max(1) as f32,
            offset.y / extent.height.max(1) as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_distinct_and_bounded() {
        let offsets: Vec<Vec2> = (0..JITTER_PERIOD).map(sequence_offset).collect();
        for (i, a) in offsets.iter().enumerate() {
            assert!(a.x >= -0.5 && a.x < 0.5);
            assert!(a.y >= -0.5 && a.y < 0.5);
            for b in &offsets[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_first_offset() {
        let offset = sequence_offset(0);
        let expected_x = (0.5 + 1.0 / PLASTIC_NUMBER).fract() - 0.5;
        assert!((f64::from(offset.x) - expected_x).abs() < 1e-6);
    }

    #[test]
    fn test_sequence_period() {
        let extent = Extent3d::new_2d(1920, 1080);
        let mut sequence = JitterSequence::new();
        let first: Vec<Vec2> = (0..JITTER_PERIOD).map(|_| sequence.advance(extent)).collect();
        let second: Vec<Vec2> = (0..JITTER_PERIOD).map(|_| sequence.advance(extent)).collect();
        assert_eq!(first, second);
        assert_eq!(sequence.counter(), 0);
    }

    #[test]
    fn test_offset_is_scaled_by_inverse_resolution() {
        let mut sequence = JitterSequence::new();
        let jitter = sequence.advance(Extent3d::new_2d(200, 100));
        let raw = sequence_offset(0);
        assert_eq!(jitter, Vec2::new(raw.x / 200.0, raw.y / 100.0));
    }

    #[test]
    fn test_apply_jitter_touches_translation_terms() {
        let mut projection = Mat4::identity();
        apply_jitter(&mut projection, Vec2::new(0.25, -0.5));
        assert_eq!(projection[(0, 3)], 0.25);
        assert_eq!(projection[(1, 3)], -0.5);
        assert_eq!(projection[(2, 3)], 0.0);
        assert_eq!(projection[(0, 0)], 1.0);
    }
}

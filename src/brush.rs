// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Brush falloff sampling
//!
//! The host supplies a 1D falloff curve sampled at evenly spaced points.
//! Index 0 is the rim of the brush (distance = radius), the last index is the
//! center (distance = 0). Sampling is nearest-index, not interpolated.

use crate::error::{Error, Result};
use crate::math::clamp01;

/// Borrowed view over a host-supplied falloff table
#[derive(Debug, Clone, Copy)]
pub struct BrushFalloff<'a> {
    samples: &'a [f32],
}

impl<'a> BrushFalloff<'a> {
    pub fn new(samples: &'a [f32]) -> Result<Self> {
        if samples.len() < 2 {
            return Err(Error::FalloffTooShort(samples.len()));
        }
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Table index for a distance within the brush radius.
    /// Distance 0 maps to the last sample, distance >= radius to sample 0.
    pub fn sample_index(&self, distance: f32, radius: f32) -> usize {
        (clamp01(1.0 - distance / radius) * (self.samples.len() - 1) as f32) as usize
    }

    /// Intensity at a distance from the brush center
    pub fn sample(&self, distance: f32, radius: f32) -> f32 {
        self.samples[self.sample_index(distance, radius)]
    }

    /// Curve slope at a table index, by central difference over the normalized
    /// domain (one-sided at the ends). Directional painting follows steep
    /// sections of the curve across the surface.
    pub fn slope_at(&self, index: usize) -> f32 {
        let n = self.samples.len();
        let dx = 1.0 / (n - 1) as f32;
        if index == 0 {
            (self.samples[1] - self.samples[0]) / dx
        } else if index == n - 1 {
            (self.samples[n - 1] - self.samples[n - 2]) / dx
        } else {
            (self.samples[index + 1] - self.samples[index - 1]) / (dx * 2.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TABLE: [f32; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

    #[test]
    fn test_sample_mapping() {
        let falloff = BrushFalloff::new(&TABLE).unwrap();
        // center of the brush -> last sample, full strength
        assert_eq!(falloff.sample_index(0.0, 1.0), 4);
        assert_relative_eq!(falloff.sample(0.0, 1.0), 1.0);
        // rim -> sample 0
        assert_eq!(falloff.sample_index(1.0, 1.0), 0);
        assert_relative_eq!(falloff.sample(1.0, 1.0), 0.0);
        // halfway
        assert_eq!(falloff.sample_index(0.5, 1.0), 2);
        assert_relative_eq!(falloff.sample(0.5, 1.0), 0.5);
    }

    #[test]
    fn test_sample_beyond_radius_clamps_to_rim() {
        let falloff = BrushFalloff::new(&TABLE).unwrap();
        assert_eq!(falloff.sample_index(5.0, 1.0), 0);
    }

    #[test]
    fn test_slope_linear_ramp() {
        let falloff = BrushFalloff::new(&TABLE).unwrap();
        // the table is a straight ramp, slope 1.0 everywhere
        for i in 0..TABLE.len() {
            assert_relative_eq!(falloff.slope_at(i), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_too_short_table_is_rejected() {
        assert!(BrushFalloff::new(&[1.0]).is_err());
        assert!(BrushFalloff::new(&[]).is_err());
    }
}

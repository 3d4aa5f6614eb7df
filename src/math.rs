// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Scalar and vector helpers shared by every operator

use nalgebra::{Point3, Vector3};

/// Epsilon used for float equality and degenerate-length checks
pub const EPSILON: f32 = 1e-5;

/// Clamp a value to [0, 1]
#[inline]
pub fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Clamp a value to [-1, 1]
#[inline]
pub fn clamp11(v: f32) -> f32 {
    v.clamp(-1.0, 1.0)
}

/// Check if two floats are approximately equal
#[inline]
pub fn near_equal(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Check if a value is approximately zero
#[inline]
pub fn near_zero(v: f32) -> bool {
    v.abs() < EPSILON
}

/// Signed distance of a point to the plane through the origin with the given normal
#[inline]
pub fn plane_distance(p: &Point3<f32>, plane_normal: &Vector3<f32>) -> f32 {
    p.coords.dot(plane_normal)
}

/// Mirror a direction across the plane through the origin with the given normal
#[inline]
pub fn plane_mirror(v: &Vector3<f32>, plane_normal: &Vector3<f32>) -> Vector3<f32> {
    v - plane_normal * (2.0 * v.dot(plane_normal))
}

/// Reflect a point across the plane through the origin with the given normal
#[inline]
pub fn plane_reflect(p: &Point3<f32>, plane_normal: &Vector3<f32>) -> Point3<f32> {
    p - plane_normal * (2.0 * plane_distance(p, plane_normal))
}

/// Normalize a vector, or return `None` when its length is degenerate
#[inline]
pub fn try_normalize(v: &Vector3<f32>) -> Option<Vector3<f32>> {
    v.try_normalize(EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clamp01() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(0.5), 0.5);
        assert_eq!(clamp01(1.5), 1.0);
    }

    #[test]
    fn test_near_equal() {
        assert!(near_equal(1.0, 1.0 + 1e-6));
        assert!(!near_equal(1.0, 1.1));
    }

    #[test]
    fn test_plane_distance_and_mirror() {
        let n = Vector3::x();
        let p = Point3::new(2.0, 1.0, 0.0);
        assert_relative_eq!(plane_distance(&p, &n), 2.0);

        let mirrored = plane_reflect(&p, &n);
        assert_relative_eq!(mirrored.x, -2.0);
        assert_relative_eq!(mirrored.y, 1.0);

        let v = Vector3::new(1.0, 1.0, 0.0);
        let mv = plane_mirror(&v, &n);
        assert_relative_eq!(mv.x, -1.0);
        assert_relative_eq!(mv.y, 1.0);
    }

    #[test]
    fn test_try_normalize_degenerate() {
        assert!(try_normalize(&Vector3::new(1e-8, 0.0, 0.0)).is_none());
        let n = try_normalize(&Vector3::new(0.0, 3.0, 0.0)).unwrap();
        assert_relative_eq!(n.y, 1.0);
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Ray/triangle intersection
//!
//! Nearest-hit queries against a whole mesh, a transformed-ray wrapper that
//! reports distance in the caller's space, and an SoA-packed triangle buffer
//! for batched casts (normal projection fires one ray per target vertex).

use super::MeshTopology;
use crate::error::{Error, Result};
use crate::math;
use nalgebra::{Matrix4, Point3, Vector3};
use rayon::prelude::*;

const RAY_EPSILON: f32 = 1e-8;

/// Nearest intersection of a ray with a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub triangle: usize,
    pub distance: f32,
}

/// Möller–Trumbore ray/triangle test. Returns the ray parameter of the hit.
pub fn ray_triangle(
    origin: &Point3<f32>,
    dir: &Vector3<f32>,
    p0: &Point3<f32>,
    p1: &Point3<f32>,
    p2: &Point3<f32>,
) -> Option<f32> {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let pvec = dir.cross(&e2);
    let det = e1.dot(&pvec);
    if det.abs() < RAY_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = origin - p0;
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(&e1);
    let v = dir.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(&qvec) * inv_det;
    if t > RAY_EPSILON {
        Some(t)
    } else {
        None
    }
}

/// Tie-break on equal distance: the smaller triangle index wins. Keeps the
/// parallel reduction deterministic under any work split.
fn nearer(a: RayHit, b: RayHit) -> RayHit {
    if a.distance < b.distance || (a.distance == b.distance && a.triangle < b.triangle) {
        a
    } else {
        b
    }
}

/// Cast a ray against every triangle of a mesh, returning the nearest hit
pub fn raycast(origin: &Point3<f32>, dir: &Vector3<f32>, mesh: &MeshTopology) -> Option<RayHit> {
    (0..mesh.triangle_count())
        .into_par_iter()
        .filter_map(|ti| {
            let [p0, p1, p2] = mesh.triangle_points(ti);
            ray_triangle(origin, dir, &p0, &p1, &p2).map(|t| RayHit {
                triangle: ti,
                distance: t,
            })
        })
        .reduce_with(nearer)
}

/// Cast a caller-space ray against a transformed mesh.
///
/// The ray is mapped into mesh-local space first; the reported distance is
/// measured in the caller's space.
pub fn raycast_transformed(
    origin: &Point3<f32>,
    dir: &Vector3<f32>,
    mesh: &MeshTopology,
    trans: &Matrix4<f32>,
) -> Result<Option<RayHit>> {
    let itrans = trans.try_inverse().ok_or(Error::SingularTransform)?;
    let lpos = itrans.transform_point(origin);
    let ldir = match math::try_normalize(&itrans.transform_vector(dir)) {
        Some(d) => d,
        None => return Ok(None),
    };

    Ok(raycast(&lpos, &ldir, mesh).map(|hit| {
        let hpos = lpos + ldir * hit.distance;
        RayHit {
            triangle: hit.triangle,
            distance: (trans.transform_point(&hpos) - origin).norm(),
        }
    }))
}

/// Barycentric coordinates of `p` relative to a triangle.
/// Falls back to the first corner for degenerate triangles.
pub fn barycentric(
    p: &Point3<f32>,
    a: &Point3<f32>,
    b: &Point3<f32>,
    c: &Point3<f32>,
) -> (f32, f32, f32) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < RAY_EPSILON {
        return (1.0, 0.0, 0.0);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    (1.0 - v - w, v, w)
}

/// Interpolate per-corner attributes at a point on a triangle
pub fn interpolate_attribute(
    p: &Point3<f32>,
    corners: &[Point3<f32>; 3],
    values: &[Vector3<f32>; 3],
) -> Vector3<f32> {
    let (u, v, w) = barycentric(p, &corners[0], &corners[1], &corners[2]);
    values[0] * u + values[1] * v + values[2] * w
}

/// Triangle corner positions flattened into structure-of-arrays layout.
///
/// Nine parallel streams (three corners × three axes). Building one of these
/// pre-applies a transform exactly once per triangle, which pays off when a
/// caller fires one ray per target vertex against the same mesh.
pub struct TriangleSoa {
    lanes: [Vec<f32>; 9],
    triangle_count: usize,
}

impl TriangleSoa {
    /// Flatten an indexed mesh, transforming every corner by `mat`
    pub fn build(mesh: &MeshTopology, mat: &Matrix4<f32>) -> Self {
        let triangle_count = mesh.triangle_count();
        let mut lanes: [Vec<f32>; 9] = Default::default();
        for lane in lanes.iter_mut() {
            lane.resize(triangle_count, 0.0);
        }
        for ti in 0..triangle_count {
            let corners = mesh.triangle_points(ti);
            for (ci, corner) in corners.iter().enumerate() {
                let p = mat.transform_point(corner);
                lanes[ci * 3][ti] = p.x;
                lanes[ci * 3 + 1][ti] = p.y;
                lanes[ci * 3 + 2][ti] = p.z;
            }
        }
        Self {
            lanes,
            triangle_count,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Corner `ci` of triangle `ti`
    pub fn corner(&self, ti: usize, ci: usize) -> Point3<f32> {
        Point3::new(
            self.lanes[ci * 3][ti],
            self.lanes[ci * 3 + 1][ti],
            self.lanes[ci * 3 + 2][ti],
        )
    }

    pub fn corners(&self, ti: usize) -> [Point3<f32>; 3] {
        [self.corner(ti, 0), self.corner(ti, 1), self.corner(ti, 2)]
    }

    /// Nearest hit of a single ray against the packed triangles.
    /// Sequential on purpose: callers parallelize over rays, not triangles.
    pub fn raycast(&self, origin: &Point3<f32>, dir: &Vector3<f32>) -> Option<RayHit> {
        let mut nearest: Option<RayHit> = None;
        for ti in 0..self.triangle_count {
            let [p0, p1, p2] = self.corners(ti);
            if let Some(t) = ray_triangle(origin, dir, &p0, &p1, &p2) {
                let hit = RayHit {
                    triangle: ti,
                    distance: t,
                };
                nearest = Some(match nearest {
                    Some(best) => nearer(best, hit),
                    None => hit,
                });
            }
        }
        nearest
    }
}

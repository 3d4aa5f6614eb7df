// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Brush painting operators
//!
//! All four operators are scoped to the vertices within the brush radius of a
//! world-space position; each vertex contributes a strength of
//! `falloff.sample(d) * strength * selection[v]`. Returned counts are the
//! number of vertices inside the radius. An empty hit set is a silent no-op.

use crate::brush::BrushFalloff;
use crate::error::{Error, Result};
use crate::math::{clamp01, clamp11, plane_distance, try_normalize};
use nalgebra::{Matrix4, Point3, Vector3};
use rayon::prelude::*;

fn weight_of(selection: Option<&[f32]>, vi: usize) -> f32 {
    selection.map_or(1.0, |sel| sel[vi])
}

/// Additive directional push, brush-scoped. `amount` is an object-local
/// offset added to each normal in proportion to the brush weight.
pub fn brush_replace(
    vertices: &[Point3<f32>],
    selection: Option<&[f32]>,
    trans: &Matrix4<f32>,
    pos: &Point3<f32>,
    radius: f32,
    strength: f32,
    falloff: &BrushFalloff,
    amount: &Vector3<f32>,
    normals: &mut [Vector3<f32>],
) -> usize {
    let radius_sq = radius * radius;
    normals
        .par_iter_mut()
        .enumerate()
        .map(|(vi, n)| {
            let p = trans.transform_point(&vertices[vi]);
            let dist_sq = (p - pos).norm_squared();
            if dist_sq > radius_sq {
                return 0usize;
            }
            let s = falloff.sample(dist_sq.sqrt(), radius) * strength * weight_of(selection, vi);
            if s != 0.0 {
                if let Some(pushed) = try_normalize(&(*n + amount * s)) {
                    *n = pushed;
                }
            }
            1
        })
        .sum()
}

/// Curve-following directional paint.
///
/// The painted direction blends between the brush normal and the radial
/// tangent (the in-surface direction away from the brush center, projected
/// onto the plane perpendicular to the brush normal). The blend factor comes
/// from the falloff curve's local slope: steep curve regions flow across the
/// surface, flat regions align with the brush normal. Negative slope or
/// strength flips the tangent to keep the stroke consistent.
pub fn brush_paint(
    vertices: &[Point3<f32>],
    selection: Option<&[f32]>,
    trans: &Matrix4<f32>,
    pos: &Point3<f32>,
    radius: f32,
    strength: f32,
    falloff: &BrushFalloff,
    paint_normal: &Vector3<f32>,
    normals: &mut [Vector3<f32>],
) -> Result<usize> {
    let itrans = trans.try_inverse().ok_or(Error::SingularTransform)?;
    let brush_normal = match try_normalize(&trans.transform_vector(paint_normal)) {
        Some(n) => n,
        None => return Ok(0),
    };
    // foot of the brush center on the plane through the origin
    let center_foot = pos - brush_normal * plane_distance(pos, &brush_normal);

    let radius_sq = radius * radius;
    let affected = normals
        .par_iter_mut()
        .enumerate()
        .map(|(vi, n)| {
            let p = trans.transform_point(&vertices[vi]);
            let dist_sq = (p - pos).norm_squared();
            if dist_sq > radius_sq {
                return 0usize;
            }
            let index = falloff.sample_index(dist_sq.sqrt(), radius);
            let mut s =
                clamp11(falloff.sample(dist_sq.sqrt(), radius) * strength * 2.0)
                    * weight_of(selection, vi);
            let mut slope = falloff.slope_at(index);

            let sample_foot = p - brush_normal * plane_distance(&p, &brush_normal);
            // at the brush center the radial offset degenerates; fall back to
            // the brush normal so the center vertex is still painted
            let mut tangent =
                try_normalize(&(sample_foot - center_foot)).unwrap_or(brush_normal);
            if slope < 0.0 {
                tangent = -tangent;
                slope = -slope;
            }
            if s < 0.0 {
                tangent = -tangent;
                s = -s;
            }
            if s == 0.0 {
                return 1;
            }

            let blended = brush_normal.lerp(&tangent, clamp01(slope * 0.5));
            let local = match try_normalize(&itrans.transform_vector(&blended)) {
                Some(v) => v,
                None => return 1,
            };
            let steered = n.lerp(&local, s);
            if let Some(painted) = try_normalize(&(*n + steered * s)) {
                *n = painted;
            }
            1
        })
        .sum();
    Ok(affected)
}

/// Blend brush-scoped normals toward a snapshot buffer, sign-flipped when
/// `strength` is negative.
pub fn brush_lerp(
    vertices: &[Point3<f32>],
    selection: Option<&[f32]>,
    trans: &Matrix4<f32>,
    pos: &Point3<f32>,
    radius: f32,
    strength: f32,
    falloff: &BrushFalloff,
    base: &[Vector3<f32>],
    normals: &mut [Vector3<f32>],
) -> usize {
    let sign = if strength < 0.0 { -1.0 } else { 1.0 };
    let radius_sq = radius * radius;
    normals
        .par_iter_mut()
        .enumerate()
        .map(|(vi, n)| {
            let p = trans.transform_point(&vertices[vi]);
            let dist_sq = (p - pos).norm_squared();
            if dist_sq > radius_sq {
                return 0usize;
            }
            let s = falloff.sample(dist_sq.sqrt(), radius) * strength * weight_of(selection, vi);
            if s != 0.0 {
                if let Some(blended) = try_normalize(&n.lerp(&(base[vi] * sign), s)) {
                    *n = blended;
                }
            }
            1
        })
        .sum()
}

/// Two-pass local smoothing: gather every vertex inside the brush and average
/// their current normals into one target, then pull each gathered vertex
/// toward it by its own falloff weight. The average is computed before any
/// write, so results are independent of traversal order.
pub fn brush_smooth(
    vertices: &[Point3<f32>],
    selection: Option<&[f32]>,
    trans: &Matrix4<f32>,
    pos: &Point3<f32>,
    radius: f32,
    strength: f32,
    falloff: &BrushFalloff,
    normals: &mut [Vector3<f32>],
) -> usize {
    let radius_sq = radius * radius;
    let inside: Vec<(usize, f32)> = (0..vertices.len())
        .into_par_iter()
        .filter_map(|vi| {
            let p = trans.transform_point(&vertices[vi]);
            let dist_sq = (p - pos).norm_squared();
            if dist_sq <= radius_sq {
                Some((vi, dist_sq.sqrt()))
            } else {
                None
            }
        })
        .collect();
    if inside.is_empty() {
        return 0;
    }

    let mut average = Vector3::zeros();
    for &(vi, _) in &inside {
        average += normals[vi];
    }
    let average = match try_normalize(&average) {
        Some(a) => a,
        None => return 0,
    };

    for &(vi, distance) in &inside {
        let s = falloff.sample(distance, radius) * strength * weight_of(selection, vi);
        if s == 0.0 {
            continue;
        }
        if let Some(smoothed) = try_normalize(&(normals[vi] + average * s)) {
            normals[vi] = smoothed;
        }
    }
    inside.len()
}

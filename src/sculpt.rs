// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Selection-weighted normal transform operators
//!
//! Every operator reads the selection mask and blends its effect per vertex by
//! the vertex weight. Touched normals are renormalized; zero-weight vertices
//! are never written. Degenerate inputs (zero/NaN rotation angle, empty
//! selection for a pivot-dependent operator) make the whole call a no-op.

use crate::error::{Error, Result};
use crate::math::{near_zero, try_normalize, EPSILON};
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use rayon::prelude::*;

/// Blend every selected normal toward a world-space target direction
pub fn assign(
    selection: &[f32],
    trans: &Matrix4<f32>,
    target: &Vector3<f32>,
    normals: &mut [Vector3<f32>],
) -> Result<usize> {
    let itrans = trans.try_inverse().ok_or(Error::SingularTransform)?;
    let local_target = itrans.transform_vector(target);

    let affected = normals
        .par_iter_mut()
        .zip(selection.par_iter())
        .map(|(n, &s)| {
            if s == 0.0 {
                return 0usize;
            }
            match try_normalize(&n.lerp(&local_target, s)) {
                Some(blended) => {
                    *n = blended;
                    1
                }
                None => 0,
            }
        })
        .sum();
    Ok(affected)
}

/// Push every selected normal along a world-space offset
pub fn translate(
    selection: &[f32],
    trans: &Matrix4<f32>,
    amount: &Vector3<f32>,
    normals: &mut [Vector3<f32>],
) -> Result<usize> {
    let itrans = trans.try_inverse().ok_or(Error::SingularTransform)?;
    let local_amount = itrans.transform_vector(amount);

    let affected = normals
        .par_iter_mut()
        .zip(selection.par_iter())
        .map(|(n, &s)| {
            if s == 0.0 {
                return 0usize;
            }
            match try_normalize(&(*n + local_amount * s)) {
                Some(moved) => {
                    *n = moved;
                    1
                }
                None => 0,
            }
        })
        .sum();
    Ok(affected)
}

/// Rigidly rotate selected normals about the pivot orientation.
///
/// The rotation delta is applied in the pivot frame: local normal -> world ->
/// pivot, rotate, then back. A near-zero or NaN angle is a no-op.
pub fn rotate(
    selection: &[f32],
    trans: &Matrix4<f32>,
    amount: &UnitQuaternion<f32>,
    pivot_rot: &UnitQuaternion<f32>,
    normals: &mut [Vector3<f32>],
) -> Result<usize> {
    let angle = amount.angle();
    if near_zero(angle) || angle.is_nan() {
        return Ok(0);
    }
    let itrans = trans.try_inverse().ok_or(Error::SingularTransform)?;
    let to_local = itrans
        * pivot_rot.to_homogeneous()
        * amount.to_homogeneous()
        * pivot_rot.inverse().to_homogeneous()
        * trans;

    let affected = normals
        .par_iter_mut()
        .zip(selection.par_iter())
        .map(|(n, &s)| {
            if s == 0.0 {
                return 0usize;
            }
            let rotated = match try_normalize(&to_local.transform_vector(n)) {
                Some(v) => v,
                None => return 0,
            };
            match try_normalize(&n.lerp(&rotated, s)) {
                Some(blended) => {
                    *n = blended;
                    1
                }
                None => 0,
            }
        })
        .sum();
    Ok(affected)
}

/// Rotate-about-pivot with angular falloff.
///
/// Each selected normal receives an additive correction along the direction
/// its *position* would orbit under the rotation, scaled by the vertex's
/// distance from the pivot relative to the furthest selected vertex. This is a
/// brush-like angular falloff, not a rigid rotation of the normal.
pub fn rotate_pivot(
    vertices: &[Point3<f32>],
    selection: &[f32],
    trans: &Matrix4<f32>,
    amount: &UnitQuaternion<f32>,
    pivot_pos: &Point3<f32>,
    pivot_rot: &UnitQuaternion<f32>,
    normals: &mut [Vector3<f32>],
) -> Result<usize> {
    let angle = amount.angle();
    if near_zero(angle) || angle.is_nan() {
        return Ok(0);
    }
    let itrans = trans.try_inverse().ok_or(Error::SingularTransform)?;
    let furthest = match furthest_from_pivot(vertices, selection, pivot_pos, trans, &itrans) {
        Some((_, distance)) => distance,
        None => return Ok(0),
    };

    let world_to_pivot =
        pivot_rot.inverse().to_homogeneous() * Matrix4::new_translation(&-pivot_pos.coords);
    let to_pivot = world_to_pivot * trans;
    let pivot_to_local = itrans
        * Matrix4::new_translation(&pivot_pos.coords)
        * pivot_rot.to_homogeneous();
    let rot = amount.to_rotation_matrix();

    let affected = normals
        .par_iter_mut()
        .enumerate()
        .map(|(vi, n)| {
            let s = selection[vi];
            if s == 0.0 {
                return 0usize;
            }
            let vpos = to_pivot.transform_point(&vertices[vi]);
            let distance = vpos.coords.norm();
            // orbit-tangent direction of the position under the rotation
            let swing = vpos.coords - rot * vpos.coords;
            if near_zero(swing.norm()) {
                return 0;
            }
            let dir = match try_normalize(&pivot_to_local.transform_vector(&swing)) {
                Some(v) => v,
                None => return 0,
            };
            match try_normalize(&(*n + dir * (distance / furthest * angle * s))) {
                Some(blended) => {
                    *n = blended;
                    1
                }
                None => 0,
            }
        })
        .sum();
    Ok(affected)
}

/// Scale-about-pivot: additive correction along the per-axis scale applied to
/// the vertex's pivot-relative position, with the same furthest-vertex
/// normalization as [`rotate_pivot`].
pub fn scale(
    vertices: &[Point3<f32>],
    selection: &[f32],
    trans: &Matrix4<f32>,
    amount: &Vector3<f32>,
    pivot_pos: &Point3<f32>,
    pivot_rot: &UnitQuaternion<f32>,
    normals: &mut [Vector3<f32>],
) -> Result<usize> {
    let itrans = trans.try_inverse().ok_or(Error::SingularTransform)?;
    let furthest = match furthest_from_pivot(vertices, selection, pivot_pos, trans, &itrans) {
        Some((_, distance)) => distance,
        None => return Ok(0),
    };

    let world_to_pivot =
        pivot_rot.inverse().to_homogeneous() * Matrix4::new_translation(&-pivot_pos.coords);
    let to_pivot = world_to_pivot * trans;
    let pivot_to_local = itrans
        * Matrix4::new_translation(&pivot_pos.coords)
        * pivot_rot.to_homogeneous();

    let affected = normals
        .par_iter_mut()
        .enumerate()
        .map(|(vi, n)| {
            let s = selection[vi];
            if s == 0.0 {
                return 0usize;
            }
            let vpos = to_pivot.transform_point(&vertices[vi]);
            let distance = vpos.coords.norm();
            if near_zero(distance) {
                return 0;
            }
            let stretched = (vpos.coords / distance).component_mul(amount);
            let dir = pivot_to_local.transform_vector(&stretched);
            match try_normalize(&(*n + dir * (distance / furthest * s))) {
                Some(blended) => {
                    *n = blended;
                    1
                }
                None => 0,
            }
        })
        .sum();
    Ok(affected)
}

/// Radius-based smoothing.
///
/// For each selected vertex, averages the normals of all vertices within
/// `radius` of it in world space (each weighted by its own selection weight)
/// and blends toward the average. The gather is brute-force O(V²). World
/// positions and source normals are snapshotted before any write, so results
/// do not depend on traversal order.
pub fn smooth(
    vertices: &[Point3<f32>],
    selection: Option<&[f32]>,
    trans: &Matrix4<f32>,
    radius: f32,
    strength: f32,
    normals: &mut [Vector3<f32>],
) -> usize {
    let world: Vec<Point3<f32>> = vertices
        .par_iter()
        .map(|v| trans.transform_point(v))
        .collect();
    let source: Vec<Vector3<f32>> = normals.to_vec();
    let weight_of = |vi: usize| selection.map_or(1.0, |sel| sel[vi]);

    let radius_sq = radius * radius;
    let affected = normals
        .par_iter_mut()
        .enumerate()
        .map(|(vi, n)| {
            let s = weight_of(vi);
            if s == 0.0 {
                return 0usize;
            }
            let p = world[vi];
            let mut average = Vector3::zeros();
            for i in 0..world.len() {
                if (world[i] - p).norm_squared() <= radius_sq {
                    average += source[i] * weight_of(i);
                }
            }
            let average = match try_normalize(&average) {
                Some(a) => a,
                None => return 0,
            };
            match try_normalize(&(*n + average * (strength * s))) {
                Some(blended) => {
                    *n = blended;
                    1
                }
                None => 0,
            }
        })
        .sum();

    log::trace!("smooth: radius {radius}, {affected} vertices touched");
    affected
}

/// Unify normals across coincident vertices.
///
/// Every group of vertices sharing an exact position gets one normal: the
/// seed's, or the normalized group average when `smoothing` is set. Returns
/// the number of merged groups. A visited mask keeps the O(V²) coincidence
/// scan single-pass.
pub fn weld(
    vertices: &[Point3<f32>],
    selection: Option<&[f32]>,
    normals: &mut [Vector3<f32>],
    smoothing: bool,
) -> usize {
    let mut checked = vec![false; vertices.len()];
    let mut shared: Vec<usize> = Vec::new();
    let mut groups = 0;

    for vi in 0..vertices.len() {
        if checked[vi] {
            continue;
        }
        if selection.map_or(1.0, |sel| sel[vi]) == 0.0 {
            continue;
        }

        let p = vertices[vi];
        let mut n = normals[vi];
        shared.clear();
        for i in 0..vertices.len() {
            if i != vi && !checked[i] && near_zero((vertices[i] - p).norm()) {
                if smoothing {
                    n += normals[i];
                }
                shared.push(i);
                checked[i] = true;
            }
        }

        if !shared.is_empty() {
            let n = match try_normalize(&n) {
                Some(n) => n,
                None => continue,
            };
            normals[vi] = n;
            for &si in &shared {
                normals[si] = n;
            }
            groups += 1;
        }
    }

    log::debug!("weld: merged {groups} coincident groups");
    groups
}

/// Deterministic furthest-selected-vertex reduction.
///
/// Distances compare in pivot-local space; ties break toward the smaller
/// vertex index so parallel splits cannot change the winner. Returns the
/// winning index and its world-space distance from the pivot, or `None` when
/// nothing is selected or everything sits on the pivot.
fn furthest_from_pivot(
    vertices: &[Point3<f32>],
    selection: &[f32],
    pivot_pos: &Point3<f32>,
    trans: &Matrix4<f32>,
    itrans: &Matrix4<f32>,
) -> Option<(usize, f32)> {
    let local_pivot = itrans.transform_point(pivot_pos);
    let best = (0..vertices.len())
        .into_par_iter()
        .filter_map(|vi| {
            if selection[vi] > 0.0 {
                Some((vi, (vertices[vi] - local_pivot).norm_squared()))
            } else {
                None
            }
        })
        .reduce_with(|a, b| {
            if b.1 > a.1 || (b.1 == a.1 && b.0 < a.0) {
                b
            } else {
                a
            }
        })?;

    if best.1 <= EPSILON * EPSILON {
        return None;
    }
    let distance = (trans.transform_point(&vertices[best.0]) - pivot_pos).norm();
    Some((best.0, distance))
}

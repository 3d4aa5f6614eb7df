// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Selection engine
//!
//! Raycast picking, screen-space rectangle/lasso region selection, radius
//! brush selection and topological expansion. The selection mask is a soft
//! per-vertex weight in [0, 1]; every selecting operation accumulates with
//! `clamp01(old + strength)` and never rewrites the mask wholesale unless the
//! caller asks for a clear.

use crate::brush::BrushFalloff;
use crate::error::{Error, Result};
use crate::geometry::{adjacency, raycast, MeshTopology};
use crate::math::{clamp01, near_equal, try_normalize};
use nalgebra::{Matrix4, Point2, Point3, Vector2, Vector3};
use rayon::prelude::*;

/// A vertex passing the self-occlusion test must sit within this distance of
/// the first surface the camera ray hits.
const VISIBILITY_EPSILON: f32 = 0.01;

/// Single-vertex picking keeps at most this many rect candidates; overflow is
/// dropped in vertex order. A documented approximation for pathologically
/// dense picks, not a correctness guarantee.
const MAX_PICK_CANDIDATES: usize = 64;

/// Camera/screen parameters shared by the projection-based selectors
#[derive(Debug, Clone, Copy)]
pub struct ViewParams {
    /// Model-view-projection matrix applied to object-local positions
    pub mvp: Matrix4<f32>,
    /// Object-local to world transform
    pub trans: Matrix4<f32>,
    /// Camera position in world space
    pub camera_pos: Point3<f32>,
    /// Reject vertices occluded by the mesh itself
    pub frontface_only: bool,
}

/// Project an object-local position to normalized screen coordinates.
/// Returns `None` behind the camera (clip z <= 0).
fn project(mvp: &Matrix4<f32>, p: &Point3<f32>) -> Option<Point2<f32>> {
    let clip = mvp * p.to_homogeneous();
    if clip.z <= 0.0 {
        return None;
    }
    Some(Point2::new(clip.x / clip.w, clip.y / clip.w))
}

/// Self-occlusion test: a vertex is visible when the ray from the local-space
/// camera position toward it strikes the mesh near the vertex itself.
fn visible_from(camera: &Point3<f32>, vertex: &Point3<f32>, mesh: &MeshTopology) -> bool {
    let dir = match try_normalize(&(vertex - camera)) {
        Some(d) => d,
        // vertex coincides with the camera
        None => return true,
    };
    match raycast::raycast(camera, &dir, mesh) {
        Some(hit) => {
            let hit_pos = camera + dir * hit.distance;
            (vertex - hit_pos).norm() < VISIBILITY_EPSILON
        }
        None => false,
    }
}

fn accumulate(selection: &mut f32, strength: f32) {
    *selection = clamp01(*selection + strength);
}

/// Pick the single vertex nearest the center of a screen rectangle.
///
/// Candidates are gathered in parallel (projected inside the rectangle, in
/// front of the camera, optionally passing the occlusion test), capped at
/// [`MAX_PICK_CANDIDATES`] in vertex order, then reduced to the nearest one.
/// On a near-equal screen distance the most camera-facing vertex wins, which
/// keeps picks on coincident vertices deterministic. At most one selection
/// weight changes; returns the number of affected vertices (0 or 1).
pub fn pick_vertex(
    mesh: &MeshTopology,
    normals: &[Vector3<f32>],
    selection: &mut [f32],
    strength: f32,
    view: &ViewParams,
    rect_min: Point2<f32>,
    rect_max: Point2<f32>,
) -> Result<usize> {
    let itrans = view.trans.try_inverse().ok_or(Error::SingularTransform)?;
    let local_camera = itrans.transform_point(&view.camera_pos);
    let rect_center = nalgebra::center(&rect_min, &rect_max);

    let mut candidates: Vec<(usize, f32)> = (0..mesh.vertex_count())
        .into_par_iter()
        .filter_map(|vi| {
            let sp = project(&view.mvp, &mesh.vertices[vi])?;
            let inside = sp.x >= rect_min.x
                && sp.x <= rect_max.x
                && sp.y >= rect_min.y
                && sp.y <= rect_max.y;
            if !inside {
                return None;
            }
            if view.frontface_only && !visible_from(&local_camera, &mesh.vertices[vi], mesh) {
                return None;
            }
            Some((vi, (sp - rect_center).norm()))
        })
        .collect();
    candidates.truncate(MAX_PICK_CANDIDATES);

    if candidates.is_empty() {
        return Ok(0);
    }

    let mut nearest_vi = candidates[0].0;
    let mut nearest_distance = f32::MAX;
    let mut nearest_facing = 1.0f32;
    for &(vi, distance) in &candidates {
        let facing = match try_normalize(&(mesh.vertices[vi] - local_camera)) {
            Some(dir) => normals[vi].dot(&dir),
            None => -1.0,
        };
        if near_equal(distance, nearest_distance) {
            // coincident on screen: prefer the camera-facing vertex
            if facing < nearest_facing {
                nearest_vi = vi;
                nearest_distance = distance;
                nearest_facing = facing;
            }
        } else if distance < nearest_distance {
            nearest_vi = vi;
            nearest_distance = distance;
            nearest_facing = facing;
        }
    }

    accumulate(&mut selection[nearest_vi], strength);
    Ok(1)
}

/// Raycast pick: on a hit, bump the weight of all three corner vertices
pub fn pick_triangle(
    mesh: &MeshTopology,
    selection: &mut [f32],
    strength: f32,
    trans: &Matrix4<f32>,
    origin: &Point3<f32>,
    dir: &Vector3<f32>,
) -> Result<usize> {
    match raycast::raycast_transformed(origin, dir, mesh, trans)? {
        Some(hit) => {
            for vi in mesh.triangle_indices(hit.triangle) {
                accumulate(&mut selection[vi], strength);
            }
            Ok(1)
        }
        None => Ok(0),
    }
}

/// Select every vertex projecting inside a screen rectangle
pub fn select_rect(
    mesh: &MeshTopology,
    selection: &mut [f32],
    strength: f32,
    view: &ViewParams,
    rect_min: Point2<f32>,
    rect_max: Point2<f32>,
) -> Result<usize> {
    let itrans = view.trans.try_inverse().ok_or(Error::SingularTransform)?;
    let local_camera = itrans.transform_point(&view.camera_pos);

    let affected = selection
        .par_iter_mut()
        .enumerate()
        .map(|(vi, weight)| {
            let sp = match project(&view.mvp, &mesh.vertices[vi]) {
                Some(sp) => sp,
                None => return 0usize,
            };
            let inside = sp.x >= rect_min.x
                && sp.x <= rect_max.x
                && sp.y >= rect_min.y
                && sp.y <= rect_max.y;
            if !inside {
                return 0;
            }
            if view.frontface_only && !visible_from(&local_camera, &mesh.vertices[vi], mesh) {
                return 0;
            }
            accumulate(weight, strength);
            1
        })
        .sum();
    Ok(affected)
}

/// Select every vertex projecting inside a screen-space lasso polygon.
/// Fewer than three polygon points selects nothing.
pub fn select_lasso(
    mesh: &MeshTopology,
    selection: &mut [f32],
    strength: f32,
    view: &ViewParams,
    polygon: &[Point2<f32>],
) -> Result<usize> {
    if polygon.len() < 3 {
        return Ok(0);
    }
    let itrans = view.trans.try_inverse().ok_or(Error::SingularTransform)?;
    let local_camera = itrans.transform_point(&view.camera_pos);

    let mut poly_min = polygon[0];
    let mut poly_max = polygon[0];
    for p in &polygon[1..] {
        poly_min = Point2::new(poly_min.x.min(p.x), poly_min.y.min(p.y));
        poly_max = Point2::new(poly_max.x.max(p.x), poly_max.y.max(p.y));
    }

    let affected = selection
        .par_iter_mut()
        .enumerate()
        .map(|(vi, weight)| {
            let sp = match project(&view.mvp, &mesh.vertices[vi]) {
                Some(sp) => sp,
                None => return 0usize,
            };
            if !point_in_polygon(&sp, polygon, &poly_min, &poly_max) {
                return 0;
            }
            if view.frontface_only && !visible_from(&local_camera, &mesh.vertices[vi], mesh) {
                return 0;
            }
            accumulate(weight, strength);
            1
        })
        .sum();
    Ok(affected)
}

/// Even-odd point-in-polygon test with a bounding-box precheck
fn point_in_polygon(
    p: &Point2<f32>,
    polygon: &[Point2<f32>],
    poly_min: &Point2<f32>,
    poly_max: &Point2<f32>,
) -> bool {
    if p.x < poly_min.x || p.x > poly_max.x || p.y < poly_min.y || p.y > poly_max.y {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > p.y) != (pj.y > p.y)
            && p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Add brush-falloff-weighted strength to every vertex within `radius` of a
/// world-space position. Returns the number of vertices inside the radius.
pub fn select_brush(
    vertices: &[Point3<f32>],
    selection: &mut [f32],
    trans: &Matrix4<f32>,
    pos: &Point3<f32>,
    radius: f32,
    strength: f32,
    falloff: &BrushFalloff,
) -> usize {
    let radius_sq = radius * radius;
    selection
        .par_iter_mut()
        .zip(vertices.par_iter())
        .map(|(weight, vertex)| {
            let p = trans.transform_point(vertex);
            let dist_sq = (p - pos).norm_squared();
            if dist_sq > radius_sq {
                return 0usize;
            }
            accumulate(weight, falloff.sample(dist_sq.sqrt(), radius) * strength);
            1
        })
        .sum()
}

/// Which topological expansion to delegate to the adjacency engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// Boundary of the selected region (or of the whole mesh if none selected)
    Edge,
    /// Open boundary loops of the mesh
    Hole,
    /// Everything connected to the seed set
    Connected,
}

/// Expand the current selection topologically.
///
/// Seeds are the vertices with weight > 0, or every vertex when nothing is
/// selected. With `clear` the mask is zeroed before the expanded set is
/// written; otherwise the expansion adds to the existing weights.
pub fn select_topology(
    mesh: &MeshTopology,
    selection: &mut [f32],
    strength: f32,
    expansion: Expansion,
    clear: bool,
) -> usize {
    let mut seeds: Vec<bool> = selection.iter().map(|&s| s > 0.0).collect();
    if !seeds.iter().any(|&s| s) {
        seeds.fill(true);
    }

    let expanded = match expansion {
        Expansion::Edge => adjacency::expand_edge(mesh, &seeds),
        Expansion::Hole => adjacency::expand_hole(mesh, &seeds),
        Expansion::Connected => adjacency::expand_connected(mesh, &seeds),
    };

    if clear {
        selection.fill(0.0);
    }
    for &vi in &expanded {
        accumulate(&mut selection[vi], strength);
    }
    expanded.len()
}

/// Aggregate of the current selection: weighted centroid and average normal
#[derive(Debug, Clone, Copy)]
pub struct SelectionSummary {
    /// Selection centroid in world space
    pub position: Point3<f32>,
    /// Average selected normal in world space, unit length
    pub normal: Vector3<f32>,
    /// Number of vertices with weight > 0
    pub count: usize,
}

/// Summarize the selected set for gizmo placement. `None` when nothing is
/// selected or the weighted average normal degenerates.
pub fn selection_summary(
    vertices: &[Point3<f32>],
    normals: &[Vector3<f32>],
    selection: &[f32],
    trans: &Matrix4<f32>,
) -> Option<SelectionSummary> {
    let mut total = 0.0f32;
    let mut count = 0usize;
    let mut position = Vector3::zeros();
    let mut normal = Vector3::zeros();
    for vi in 0..vertices.len() {
        let s = selection[vi];
        if s > 0.0 {
            position += vertices[vi].coords * s;
            normal += normals[vi] * s;
            total += s;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    let centroid = Point3::from(position / total);
    Some(SelectionSummary {
        position: trans.transform_point(&centroid),
        normal: try_normalize(&trans.transform_vector(&normal))?,
        count,
    })
}

/// Barycentric-interpolated world-space normal at a world position on a
/// triangle, for hover feedback after a raycast.
pub fn pick_normal(
    mesh: &MeshTopology,
    normals: &[Vector3<f32>],
    trans: &Matrix4<f32>,
    pos: &Point3<f32>,
    triangle: usize,
) -> Result<Vector3<f32>> {
    let itrans = trans.try_inverse().ok_or(Error::SingularTransform)?;
    let local = itrans.transform_point(pos);
    let corners = mesh.triangle_points(triangle);
    let [i0, i1, i2] = mesh.triangle_indices(triangle);
    let interpolated = raycast::interpolate_attribute(
        &local,
        &corners,
        &[normals[i0], normals[i1], normals[i2]],
    );
    let world = trans.transform_vector(&interpolated);
    Ok(try_normalize(&world).unwrap_or(world))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> (Vec<Point3<f32>>, Vec<u32>, Vec<Vector3<f32>>) {
        let vertices = vec![
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 1.0, 0.0),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        let normals = vec![Vector3::z(); 4];
        (vertices, indices, normals)
    }

    /// Orthographic-style view straight down the z axis. Screen x/y equal
    /// local x/y, clip z is the distance in front of the camera at z = +5.
    fn view() -> ViewParams {
        let mut mvp = Matrix4::identity();
        mvp[(2, 2)] = -1.0;
        mvp[(2, 3)] = 5.0;
        ViewParams {
            mvp,
            trans: Matrix4::identity(),
            camera_pos: Point3::new(0.0, 0.0, 5.0),
            frontface_only: false,
        }
    }

    #[test]
    fn test_select_rect_counts_and_clamps() {
        let (vertices, indices, _) = quad();
        let mesh = MeshTopology::new(&vertices, &indices);
        let mut selection = vec![0.0f32; 4];

        // rectangle covering only x >= 0
        let n = select_rect(
            &mesh,
            &mut selection,
            0.7,
            &view(),
            Point2::new(0.0, -2.0),
            Point2::new(2.0, 2.0),
        )
        .unwrap();
        assert_eq!(n, 2);
        assert_eq!(selection, vec![0.0, 0.7, 0.7, 0.0]);

        // accumulating again clamps at 1.0
        select_rect(
            &mesh,
            &mut selection,
            0.7,
            &view(),
            Point2::new(0.0, -2.0),
            Point2::new(2.0, 2.0),
        )
        .unwrap();
        assert_eq!(selection, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_select_lasso_triangle_region() {
        let (vertices, indices, _) = quad();
        let mesh = MeshTopology::new(&vertices, &indices);
        let mut selection = vec![0.0f32; 4];

        // triangle around the upper-right corner only
        let polygon = [
            Point2::new(0.5, 0.5),
            Point2::new(1.5, 0.5),
            Point2::new(1.0, 1.5),
        ];
        let n = select_lasso(&mesh, &mut selection, 1.0, &view(), &polygon).unwrap();
        assert_eq!(n, 1);
        assert_eq!(selection[2], 1.0);

        // degenerate polygon selects nothing
        let mut untouched = vec![0.0f32; 4];
        let n = select_lasso(&mesh, &mut untouched, 1.0, &view(), &polygon[..2]).unwrap();
        assert_eq!(n, 0);
        assert_eq!(untouched, vec![0.0; 4]);
    }

    #[test]
    fn test_pick_vertex_nearest_to_rect_center() {
        let (vertices, indices, normals) = quad();
        let mesh = MeshTopology::new(&vertices, &indices);
        let mut selection = vec![0.0f32; 4];

        // rect centered near vertex 2
        let n = pick_vertex(
            &mesh,
            &normals,
            &mut selection,
            1.0,
            &view(),
            Point2::new(0.8, 0.8),
            Point2::new(1.2, 1.2),
        )
        .unwrap();
        assert_eq!(n, 1);
        assert_eq!(selection, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_pick_vertex_facing_tiebreak_is_order_independent() {
        // two coincident vertices, one facing the camera, one facing away
        let vertices = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 0.0)];
        let indices: Vec<u32> = vec![];
        let mesh = MeshTopology::new(&vertices, &indices);

        let run = |normals: &[Vector3<f32>]| -> usize {
            let mut selection = vec![0.0f32; 2];
            pick_vertex(
                &mesh,
                normals,
                &mut selection,
                1.0,
                &view(),
                Point2::new(-0.5, -0.5),
                Point2::new(0.5, 0.5),
            )
            .unwrap();
            selection.iter().position(|&s| s > 0.0).unwrap()
        };

        // camera looks down -z, so the +z normal faces it (dot < 0 with the
        // view ray); that vertex must win regardless of buffer order
        let facing_first = run(&[Vector3::z(), -Vector3::z()]);
        let facing_second = run(&[-Vector3::z(), Vector3::z()]);
        assert_eq!(facing_first, 0);
        assert_eq!(facing_second, 1);
    }

    #[test]
    fn test_pick_triangle_selects_three_corners() {
        let (vertices, indices, _) = quad();
        let mesh = MeshTopology::new(&vertices, &indices);
        let mut selection = vec![0.0f32; 4];

        let n = pick_triangle(
            &mesh,
            &mut selection,
            1.0,
            &Matrix4::identity(),
            &Point3::new(0.5, -0.5, 2.0),
            &Vector3::new(0.0, 0.0, -1.0),
        )
        .unwrap();
        assert_eq!(n, 1);
        assert_eq!(selection.iter().filter(|&&s| s > 0.0).count(), 3);
    }

    #[test]
    fn test_select_brush_falloff_weights() {
        let (vertices, indices, _) = quad();
        let _ = indices;
        let table = [0.0, 0.5, 1.0];
        let falloff = BrushFalloff::new(&table).unwrap();
        let mut selection = vec![0.0f32; 4];

        // brush centered on vertex 0, radius reaching the adjacent corners
        let n = select_brush(
            &vertices,
            &mut selection,
            &Matrix4::identity(),
            &Point3::new(-1.0, -1.0, 0.0),
            2.5,
            1.0,
            &falloff,
        );
        assert_eq!(n, 3); // all but the far corner
        assert_relative_eq!(selection[0], 1.0);
        assert!(selection[1] > 0.0 && selection[1] < 1.0);
        assert_eq!(selection[2], 0.0);
    }

    #[test]
    fn test_select_topology_connected_with_clear() {
        let (vertices, indices, _) = quad();
        let mesh = MeshTopology::new(&vertices, &indices);
        let mut selection = vec![0.3, 0.0, 0.0, 0.0];

        let n = select_topology(&mesh, &mut selection, 1.0, Expansion::Connected, true);
        assert_eq!(n, 4);
        assert_eq!(selection, vec![1.0; 4]);
    }

    #[test]
    fn test_selection_summary() {
        let (vertices, _, normals) = quad();
        let selection = vec![1.0, 1.0, 0.0, 0.0];
        let summary =
            selection_summary(&vertices, &normals, &selection, &Matrix4::identity()).unwrap();
        assert_eq!(summary.count, 2);
        assert_relative_eq!(summary.position.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(summary.position.y, -1.0, epsilon = 1e-5);
        assert_relative_eq!(summary.normal.z, 1.0, epsilon = 1e-5);

        assert!(selection_summary(&vertices, &normals, &[0.0; 4], &Matrix4::identity()).is_none());
    }

    #[test]
    fn test_pick_normal_interpolates() {
        let (vertices, indices, mut normals) = quad();
        let mesh = MeshTopology::new(&vertices, &indices);
        normals[0] = Vector3::x();
        normals[1] = Vector3::y();
        normals[2] = Vector3::z();

        let n = pick_normal(
            &mesh,
            &normals,
            &Matrix4::identity(),
            &Point3::new(1.0, -1.0, 0.0), // exactly vertex 1
            0,
        )
        .unwrap();
        assert_relative_eq!(n.y, 1.0, epsilon = 1e-4);
    }
}

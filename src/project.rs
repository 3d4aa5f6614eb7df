// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Normal transfer between meshes
//!
//! For every target vertex, a ray is cast from its position along its normal
//! into a reference mesh. On a hit, the reference normals are barycentrically
//! interpolated across the hit triangle and blended into the target's
//! destination buffer by the target's selection weight. Rays that miss leave
//! their vertex untouched.

use crate::error::{Error, Result};
use crate::geometry::{raycast, MeshTopology, TriangleSoa};
use crate::math::try_normalize;
use nalgebra::{Matrix4, Point3, Vector3};
use rayon::prelude::*;

/// Reference mesh and its object-to-world transform
#[derive(Debug, Clone, Copy)]
pub struct ReferenceMesh<'a> {
    pub mesh: MeshTopology<'a>,
    pub normals: &'a [Vector3<f32>],
    pub trans: Matrix4<f32>,
}

/// Project reference normals onto the target along each target normal's ray.
///
/// Reference triangle corners are pre-transformed into target-local space
/// exactly once and packed structure-of-arrays; the per-vertex casts then run
/// in parallel over the target. Writes go to `dst`, which may alias a copy of
/// the target normals held by the host. Returns the number of rays that hit.
pub fn project_normals(
    vertices: &[Point3<f32>],
    normals: &[Vector3<f32>],
    selection: Option<&[f32]>,
    trans: &Matrix4<f32>,
    reference: &ReferenceMesh,
    dst: &mut [Vector3<f32>],
) -> Result<usize> {
    debug_assert_eq!(vertices.len(), normals.len());
    debug_assert_eq!(vertices.len(), dst.len());

    let itrans = trans.try_inverse().ok_or(Error::SingularTransform)?;
    // reference-local -> target-local
    let mat = itrans * reference.trans;
    let soa = TriangleSoa::build(&reference.mesh, &mat);

    let hits = dst
        .par_iter_mut()
        .enumerate()
        .map(|(ri, out)| {
            let origin = vertices[ri];
            let dir = normals[ri];
            let hit = match soa.raycast(&origin, &dir) {
                Some(hit) => hit,
                None => return 0usize,
            };

            let corners = soa.corners(hit.triangle);
            let [i0, i1, i2] = reference.mesh.triangle_indices(hit.triangle);
            let interpolated = raycast::interpolate_attribute(
                &(origin + dir * hit.distance),
                &corners,
                &[
                    reference.normals[i0],
                    reference.normals[i1],
                    reference.normals[i2],
                ],
            );
            let projected = match try_normalize(&mat.transform_vector(&interpolated)) {
                Some(n) => n,
                None => return 0,
            };

            let s = selection.map_or(1.0, |sel| sel[ri]);
            if s == 0.0 {
                return 0;
            }
            match try_normalize(&out.lerp(&projected, s)) {
                Some(blended) => {
                    *out = blended;
                    1
                }
                None => 0,
            }
        })
        .sum();

    log::debug!(
        "projected normals: {hits}/{} target rays hit the reference",
        vertices.len()
    );
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Reference: a large quad at z = 1 with a smooth normal gradient
    fn reference_buffers() -> (Vec<Point3<f32>>, Vec<u32>, Vec<Vector3<f32>>) {
        let vertices = vec![
            Point3::new(-2.0, -2.0, 1.0),
            Point3::new(2.0, -2.0, 1.0),
            Point3::new(2.0, 2.0, 1.0),
            Point3::new(-2.0, 2.0, 1.0),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        let normals = vec![
            Vector3::new(-0.5, -0.5, 1.0).normalize(),
            Vector3::new(0.5, -0.5, 1.0).normalize(),
            Vector3::new(0.5, 0.5, 1.0).normalize(),
            Vector3::new(-0.5, 0.5, 1.0).normalize(),
        ];
        (vertices, indices, normals)
    }

    #[test]
    fn test_project_transfers_interpolated_normals() {
        let (rverts, rindices, rnormals) = reference_buffers();
        let reference = ReferenceMesh {
            mesh: MeshTopology::new(&rverts, &rindices),
            normals: &rnormals,
            trans: Matrix4::identity(),
        };

        // target vertex under the reference corner 2, aiming straight up
        let vertices = vec![Point3::new(2.0, 2.0, 0.0)];
        let normals = vec![Vector3::z()];
        let mut dst = vec![Vector3::z()];

        let hits = project_normals(
            &vertices,
            &normals,
            None,
            &Matrix4::identity(),
            &reference,
            &mut dst,
        )
        .unwrap();
        assert_eq!(hits, 1);
        let expected = rnormals[2];
        assert_relative_eq!(dst[0].x, expected.x, epsilon = 1e-4);
        assert_relative_eq!(dst[0].y, expected.y, epsilon = 1e-4);
    }

    #[test]
    fn test_project_miss_leaves_vertex_untouched() {
        let (rverts, rindices, rnormals) = reference_buffers();
        let reference = ReferenceMesh {
            mesh: MeshTopology::new(&rverts, &rindices),
            normals: &rnormals,
            trans: Matrix4::identity(),
        };

        // aiming away from the reference
        let vertices = vec![Point3::new(0.0, 0.0, 0.0)];
        let normals = vec![-Vector3::z()];
        let mut dst = vec![Vector3::z()];

        let hits = project_normals(
            &vertices,
            &normals,
            None,
            &Matrix4::identity(),
            &reference,
            &mut dst,
        )
        .unwrap();
        assert_eq!(hits, 0);
        assert_eq!(dst[0], Vector3::z());
    }

    #[test]
    fn test_project_respects_selection_weight() {
        let (rverts, rindices, rnormals) = reference_buffers();
        let reference = ReferenceMesh {
            mesh: MeshTopology::new(&rverts, &rindices),
            normals: &rnormals,
            trans: Matrix4::identity(),
        };

        let vertices = vec![Point3::new(0.0, 0.0, 0.0)];
        let normals = vec![Vector3::z()];
        let selection = vec![0.0f32];
        let mut dst = vec![Vector3::z()];

        let hits = project_normals(
            &vertices,
            &normals,
            Some(&selection),
            &Matrix4::identity(),
            &reference,
            &mut dst,
        )
        .unwrap();
        assert_eq!(hits, 0);
        assert_eq!(dst[0], Vector3::z());
    }

    #[test]
    fn test_project_across_transforms() {
        let (rverts, rindices, rnormals) = reference_buffers();
        // reference shifted up one unit in world space
        let reference = ReferenceMesh {
            mesh: MeshTopology::new(&rverts, &rindices),
            normals: &rnormals,
            trans: Matrix4::new_translation(&Vector3::new(0.0, 0.0, 1.0)),
        };

        let vertices = vec![Point3::new(0.0, 0.0, 0.0)];
        let normals = vec![Vector3::z()];
        let mut dst = vec![Vector3::z()];

        let hits = project_normals(
            &vertices,
            &normals,
            None,
            &Matrix4::identity(),
            &reference,
            &mut dst,
        )
        .unwrap();
        assert_eq!(hits, 1);
        // dead-center sample: the four corner normals average to +z
        assert_relative_eq!(dst[0].z, 1.0, epsilon = 1e-4);
    }
}

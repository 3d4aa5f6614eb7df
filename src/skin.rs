// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Linear blend skinning of points, normals and tangents
//!
//! Bone influences per vertex are bounded at compile time (`SkinWeights4` is
//! the common case). A pose palette composes bind pose, current pose and
//! inverse root once per bone; forward palettes move bind-space data into
//! posed space, reverse palettes convert posed data back. The three attribute
//! streams are independent and run as parallel tasks.

use crate::error::{Error, Result};
use crate::math::try_normalize;
use nalgebra::{Matrix4, Point3, Vector3, Vector4};
use rayon::prelude::*;

/// Bounded bone influences for one vertex. Weights are expected, but not
/// enforced, to sum to roughly one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinWeights<const N: usize> {
    pub bones: [u32; N],
    pub weights: [f32; N],
}

/// The usual four-influence layout
pub type SkinWeights4 = SkinWeights<4>;

impl<const N: usize> SkinWeights<N> {
    pub fn new(bones: [u32; N], weights: [f32; N]) -> Self {
        Self { bones, weights }
    }

    /// Full weight on a single bone
    pub fn rigid(bone: u32) -> Self {
        let mut weights = [0.0; N];
        weights[0] = 1.0;
        let mut bones = [0; N];
        bones[0] = bone;
        Self { bones, weights }
    }
}

/// Per-bone composite pose matrices
pub struct SkinPalette {
    poses: Vec<Matrix4<f32>>,
}

impl SkinPalette {
    /// Bind-space -> posed-space palette: bind pose, then current pose, then
    /// inverse root, composed once per bone.
    pub fn forward(
        root: &Matrix4<f32>,
        bones: &[Matrix4<f32>],
        bindposes: &[Matrix4<f32>],
    ) -> Result<Self> {
        debug_assert_eq!(bones.len(), bindposes.len());
        let iroot = root.try_inverse().ok_or(Error::SingularTransform)?;
        let poses = bones
            .iter()
            .zip(bindposes.iter())
            .map(|(bone, bindpose)| iroot * bone * bindpose)
            .collect();
        Ok(Self { poses })
    }

    /// Posed-space -> bind-space palette (each forward composite inverted)
    pub fn reverse(
        root: &Matrix4<f32>,
        bones: &[Matrix4<f32>],
        bindposes: &[Matrix4<f32>],
    ) -> Result<Self> {
        debug_assert_eq!(bones.len(), bindposes.len());
        let iroot = root.try_inverse().ok_or(Error::SingularTransform)?;
        let poses = bones
            .iter()
            .zip(bindposes.iter())
            .map(|(bone, bindpose)| {
                (iroot * bone * bindpose)
                    .try_inverse()
                    .ok_or(Error::SingularTransform)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { poses })
    }

    pub fn bone_count(&self) -> usize {
        self.poses.len()
    }

    fn pose(&self, bone: u32) -> &Matrix4<f32> {
        &self.poses[bone as usize]
    }
}

/// Input/output buffer pairs for the three independent attribute streams.
/// Absent streams are skipped; present ones must match the weight count.
pub struct SkinStreams<'a> {
    pub points: Option<(&'a [Point3<f32>], &'a mut [Point3<f32>])>,
    pub normals: Option<(&'a [Vector3<f32>], &'a mut [Vector3<f32>])>,
    pub tangents: Option<(&'a [Vector4<f32>], &'a mut [Vector4<f32>])>,
}

/// Skin every supplied stream by the palette.
///
/// Points are plain weighted sums; normals are renormalized after summation;
/// tangents renormalize xyz and carry the w sign through the weighted sum.
/// The streams write disjoint buffers and run under a fork-join.
pub fn apply<const N: usize>(
    weights: &[SkinWeights<N>],
    palette: &SkinPalette,
    streams: SkinStreams,
) {
    let SkinStreams {
        points,
        normals,
        tangents,
    } = streams;

    rayon::join(
        || {
            if let Some((input, output)) = points {
                skin_points(weights, palette, input, output);
            }
        },
        || {
            rayon::join(
                || {
                    if let Some((input, output)) = normals {
                        skin_normals(weights, palette, input, output);
                    }
                },
                || {
                    if let Some((input, output)) = tangents {
                        skin_tangents(weights, palette, input, output);
                    }
                },
            );
        },
    );
}

fn skin_points<const N: usize>(
    weights: &[SkinWeights<N>],
    palette: &SkinPalette,
    input: &[Point3<f32>],
    output: &mut [Point3<f32>],
) {
    debug_assert_eq!(weights.len(), input.len());
    debug_assert_eq!(weights.len(), output.len());
    output
        .par_iter_mut()
        .enumerate()
        .for_each(|(vi, out)| {
            let w = &weights[vi];
            let p = input[vi];
            let mut sum = Vector3::zeros();
            for bi in 0..N {
                sum += palette.pose(w.bones[bi]).transform_point(&p).coords * w.weights[bi];
            }
            *out = Point3::from(sum);
        });
}

fn skin_normals<const N: usize>(
    weights: &[SkinWeights<N>],
    palette: &SkinPalette,
    input: &[Vector3<f32>],
    output: &mut [Vector3<f32>],
) {
    debug_assert_eq!(weights.len(), input.len());
    debug_assert_eq!(weights.len(), output.len());
    output
        .par_iter_mut()
        .enumerate()
        .for_each(|(vi, out)| {
            let w = &weights[vi];
            let n = input[vi];
            let mut sum = Vector3::zeros();
            for bi in 0..N {
                sum += palette.pose(w.bones[bi]).transform_vector(&n) * w.weights[bi];
            }
            *out = try_normalize(&sum).unwrap_or(sum);
        });
}

fn skin_tangents<const N: usize>(
    weights: &[SkinWeights<N>],
    palette: &SkinPalette,
    input: &[Vector4<f32>],
    output: &mut [Vector4<f32>],
) {
    debug_assert_eq!(weights.len(), input.len());
    debug_assert_eq!(weights.len(), output.len());
    output
        .par_iter_mut()
        .enumerate()
        .for_each(|(vi, out)| {
            let t = input[vi];
            let w = &weights[vi];
            let txyz = Vector3::new(t.x, t.y, t.z);
            let mut sum = Vector3::zeros();
            let mut sign = 0.0;
            for bi in 0..N {
                sum += palette.pose(w.bones[bi]).transform_vector(&txyz) * w.weights[bi];
                sign += t.w * w.weights[bi];
            }
            let xyz = try_normalize(&sum).unwrap_or(sum);
            *out = Vector4::new(xyz.x, xyz.y, xyz.z, sign);
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn identity_palette(bones: usize) -> SkinPalette {
        let mats = vec![Matrix4::identity(); bones];
        SkinPalette::forward(&Matrix4::identity(), &mats, &mats).unwrap()
    }

    #[test]
    fn test_identity_pose_is_passthrough() {
        let weights = vec![SkinWeights4::rigid(0); 2];
        let palette = identity_palette(1);

        let points = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-1.0, 0.0, 0.5)];
        let normals = vec![Vector3::z(), Vector3::x()];
        let tangents = vec![Vector4::new(1.0, 0.0, 0.0, -1.0); 2];
        let mut opoints = vec![Point3::origin(); 2];
        let mut onormals = vec![Vector3::zeros(); 2];
        let mut otangents = vec![Vector4::zeros(); 2];

        apply(
            &weights,
            &palette,
            SkinStreams {
                points: Some((&points, &mut opoints)),
                normals: Some((&normals, &mut onormals)),
                tangents: Some((&tangents, &mut otangents)),
            },
        );

        assert_eq!(opoints, points);
        assert_eq!(onormals, normals);
        assert_relative_eq!(otangents[0].x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(otangents[0].w, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_translation_moves_points_not_normals() {
        let weights = vec![SkinWeights4::rigid(0)];
        let bones = vec![Matrix4::new_translation(&Vector3::new(0.0, 3.0, 0.0))];
        let bindposes = vec![Matrix4::identity()];
        let palette = SkinPalette::forward(&Matrix4::identity(), &bones, &bindposes).unwrap();

        let points = vec![Point3::new(1.0, 0.0, 0.0)];
        let normals = vec![Vector3::z()];
        let mut opoints = vec![Point3::origin()];
        let mut onormals = vec![Vector3::zeros()];

        apply(
            &weights,
            &palette,
            SkinStreams {
                points: Some((&points, &mut opoints)),
                normals: Some((&normals, &mut onormals)),
                tangents: None,
            },
        );

        assert_relative_eq!(opoints[0].y, 3.0, epsilon = 1e-5);
        assert_eq!(onormals[0], Vector3::z());
    }

    #[test]
    fn test_blended_weights_average_positions() {
        // one bone stays, the other moves 2 units along +x; 50/50 blend
        let weights = vec![SkinWeights4::new([0, 1, 0, 0], [0.5, 0.5, 0.0, 0.0])];
        let bones = vec![
            Matrix4::identity(),
            Matrix4::new_translation(&Vector3::new(2.0, 0.0, 0.0)),
        ];
        let bindposes = vec![Matrix4::identity(); 2];
        let palette = SkinPalette::forward(&Matrix4::identity(), &bones, &bindposes).unwrap();

        let points = vec![Point3::origin()];
        let mut opoints = vec![Point3::origin()];
        apply(
            &weights,
            &palette,
            SkinStreams {
                points: Some((&points, &mut opoints)),
                normals: None,
                tangents: None,
            },
        );
        assert_relative_eq!(opoints[0].x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_reverse_undoes_forward() {
        let weights = vec![SkinWeights4::rigid(0)];
        let bones = vec![Matrix4::new_rotation(Vector3::new(0.0, 0.7, 0.0))
            * Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0))];
        let bindposes = vec![Matrix4::new_translation(&Vector3::new(0.0, -1.0, 0.0))];
        let root = Matrix4::new_translation(&Vector3::new(0.5, 0.0, 0.0));

        let forward = SkinPalette::forward(&root, &bones, &bindposes).unwrap();
        let reverse = SkinPalette::reverse(&root, &bones, &bindposes).unwrap();

        let points = vec![Point3::new(0.3, 0.4, 0.5)];
        let mut posed = vec![Point3::origin()];
        apply(
            &weights,
            &forward,
            SkinStreams {
                points: Some((&points, &mut posed)),
                normals: None,
                tangents: None,
            },
        );
        let mut unposed = vec![Point3::origin()];
        apply(
            &weights,
            &reverse,
            SkinStreams {
                points: Some((&posed, &mut unposed)),
                normals: None,
                tangents: None,
            },
        );
        assert_relative_eq!(unposed[0].x, points[0].x, epsilon = 1e-4);
        assert_relative_eq!(unposed[0].y, points[0].y, epsilon = 1e-4);
        assert_relative_eq!(unposed[0].z, points[0].z, epsilon = 1e-4);
    }

    #[test]
    fn test_singular_root_is_an_error() {
        let bones = vec![Matrix4::identity()];
        assert!(SkinPalette::forward(&Matrix4::zeros(), &bones, &bones).is_err());
    }
}

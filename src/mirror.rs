// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Mirror-symmetry correspondence
//!
//! A relation table maps each vertex on the negative side of a symmetry plane
//! to its reflected partner on the positive side. The table is built once per
//! mesh/plane choice (O(V²) all-pairs, parallel per source vertex), owned by
//! the host, and replayed after every edit on the source side. It must be
//! rebuilt whenever the normals or the plane change meaningfully.

use crate::math::{self, near_zero};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Two partners only relate when their reflected normals agree this closely.
/// Guards against pairing visually unrelated coincident geometry.
const NORMAL_AGREEMENT: f32 = 0.99;

/// Per-vertex mirror partner table. Directional: populated only for vertices
/// on the negative side of the plane, and not guaranteed bijective (the first
/// qualifying positive-side match wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorTable {
    partner: Vec<Option<u32>>,
}

impl MirrorTable {
    /// Build the correspondence for a plane through the origin.
    ///
    /// A negative-side vertex relates to positive-side vertex `i` when its
    /// position matches `vertices[i]` reflected across the plane within
    /// `epsilon` and its normal, reflected, agrees with `normals[i]`.
    pub fn build(
        vertices: &[Point3<f32>],
        normals: &[Vector3<f32>],
        plane_normal: &Vector3<f32>,
        epsilon: f32,
    ) -> Self {
        let distances: Vec<f32> = vertices
            .par_iter()
            .map(|v| math::plane_distance(v, plane_normal))
            .collect();

        let partner: Vec<Option<u32>> = (0..vertices.len())
            .into_par_iter()
            .map(|vi| {
                if distances[vi] >= 0.0 {
                    return None;
                }
                for i in 0..vertices.len() {
                    if distances[i] <= 0.0 {
                        continue;
                    }
                    let reflected = math::plane_reflect(&vertices[i], plane_normal);
                    if (vertices[vi] - reflected).norm() > epsilon {
                        continue;
                    }
                    let mirrored_normal = math::plane_mirror(&normals[i], plane_normal);
                    if normals[vi].dot(&mirrored_normal) >= NORMAL_AGREEMENT {
                        return Some(i as u32);
                    }
                }
                None
            })
            .collect();

        let related = partner.iter().flatten().count();
        log::debug!(
            "mirror relation built: {related} of {} vertices paired",
            vertices.len()
        );
        Self { partner }
    }

    pub fn len(&self) -> usize {
        self.partner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partner.is_empty()
    }

    /// Number of vertices with a partner
    pub fn related_count(&self) -> usize {
        self.partner.iter().flatten().count()
    }

    pub fn partner_of(&self, vi: usize) -> Option<usize> {
        self.partner[vi].map(|p| p as usize)
    }

    /// Propagate source-side normals to their partners, mirrored across the
    /// plane. One-way (source -> partner) and idempotent while the relation
    /// and the source normals are unchanged. Returns the number of partner
    /// normals written.
    pub fn apply(&self, plane_normal: &Vector3<f32>, normals: &mut [Vector3<f32>]) -> usize {
        debug_assert_eq!(self.partner.len(), normals.len());
        let mut written = 0;
        for vi in 0..self.partner.len() {
            if let Some(partner) = self.partner_of(vi) {
                let mirrored = math::plane_mirror(&normals[vi], plane_normal);
                if !near_zero(mirrored.norm()) {
                    normals[partner] = mirrored;
                    written += 1;
                }
            }
        }
        written
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Borrowed mesh views
//!
//! The host owns every buffer (positions, indices, normals, tangents,
//! selection) and lends them to the engine for exactly one call. These views
//! carry their bounds so no length is ever implied. Vertex and triangle
//! counts never change; operators only rewrite normals, tangents, points
//! (through skinning) and the selection mask.

use nalgebra::Point3;

/// Read-only position + index view used by ray and adjacency queries.
///
/// `indices` holds `3 * triangle_count` entries grouped in triples. Index
/// validity is a caller contract; it is checked with debug assertions only.
#[derive(Debug, Clone, Copy)]
pub struct MeshTopology<'a> {
    pub vertices: &'a [Point3<f32>],
    pub indices: &'a [u32],
}

impl<'a> MeshTopology<'a> {
    pub fn new(vertices: &'a [Point3<f32>], indices: &'a [u32]) -> Self {
        debug_assert!(indices.len() % 3 == 0, "index buffer must hold triples");
        Self { vertices, indices }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex indices of triangle `ti`
    pub fn triangle_indices(&self, ti: usize) -> [usize; 3] {
        [
            self.indices[ti * 3] as usize,
            self.indices[ti * 3 + 1] as usize,
            self.indices[ti * 3 + 2] as usize,
        ]
    }

    /// Corner positions of triangle `ti`
    pub fn triangle_points(&self, ti: usize) -> [Point3<f32>; 3] {
        let [i0, i1, i2] = self.triangle_indices(ti);
        [self.vertices[i0], self.vertices[i1], self.vertices[i2]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_accessors() {
        let vertices = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let indices = [0u32, 1, 2];
        let mesh = MeshTopology::new(&vertices, &indices);

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.triangle_indices(0), [0, 1, 2]);
        assert_eq!(mesh.triangle_points(0)[1], vertices[1]);
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Mesh adjacency queries for topological selection expansion
//!
//! Everything here is built on undirected edge-count maps: an edge referenced
//! by exactly one triangle is a boundary edge. Seed sets arrive as a per-vertex
//! membership mask; results come back as sorted vertex lists so downstream
//! selection updates are deterministic.

use super::MeshTopology;
use std::collections::HashMap;

/// Undirected edge, stored with the smaller index first for consistent hashing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Edge {
    v0: usize,
    v1: usize,
}

impl Edge {
    fn new(v0: usize, v1: usize) -> Self {
        if v0 < v1 {
            Self { v0, v1 }
        } else {
            Self { v0: v1, v1: v0 }
        }
    }
}

fn triangle_edges(corners: [usize; 3]) -> [Edge; 3] {
    [
        Edge::new(corners[0], corners[1]),
        Edge::new(corners[1], corners[2]),
        Edge::new(corners[2], corners[0]),
    ]
}

/// Vertices lying on the boundary of the region induced by `seeds`.
///
/// A triangle belongs to the region when all three corners are seeded; edges
/// referenced by exactly one region triangle form the region boundary. Seeding
/// the whole mesh therefore yields its open boundary.
pub fn expand_edge(mesh: &MeshTopology, seeds: &[bool]) -> Vec<usize> {
    let mut edge_counts: HashMap<Edge, u32> = HashMap::new();
    for ti in 0..mesh.triangle_count() {
        let corners = mesh.triangle_indices(ti);
        if corners.iter().all(|&vi| seeds[vi]) {
            for edge in triangle_edges(corners) {
                *edge_counts.entry(edge).or_insert(0) += 1;
            }
        }
    }

    collect_vertices(edge_counts.iter().filter(|(_, &c)| c == 1).map(|(e, _)| *e))
}

/// Seeded vertices lying on an open boundary loop of the whole mesh
pub fn expand_hole(mesh: &MeshTopology, seeds: &[bool]) -> Vec<usize> {
    let mut edge_counts: HashMap<Edge, u32> = HashMap::new();
    for ti in 0..mesh.triangle_count() {
        for edge in triangle_edges(mesh.triangle_indices(ti)) {
            *edge_counts.entry(edge).or_insert(0) += 1;
        }
    }

    let mut result = collect_vertices(
        edge_counts
            .iter()
            .filter(|(_, &c)| c == 1)
            .map(|(e, _)| *e),
    );
    result.retain(|&vi| seeds[vi]);
    result
}

/// All vertices reachable from the seed set through shared triangles
pub fn expand_connected(mesh: &MeshTopology, seeds: &[bool]) -> Vec<usize> {
    // vertex -> incident triangles
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); mesh.vertex_count()];
    for ti in 0..mesh.triangle_count() {
        for vi in mesh.triangle_indices(ti) {
            incident[vi].push(ti);
        }
    }

    let mut visited = vec![false; mesh.vertex_count()];
    let mut stack: Vec<usize> = (0..seeds.len()).filter(|&vi| seeds[vi]).collect();
    for &vi in &stack {
        visited[vi] = true;
    }

    while let Some(vi) = stack.pop() {
        for &ti in &incident[vi] {
            for corner in mesh.triangle_indices(ti) {
                if !visited[corner] {
                    visited[corner] = true;
                    stack.push(corner);
                }
            }
        }
    }

    (0..visited.len()).filter(|&vi| visited[vi]).collect()
}

fn collect_vertices(edges: impl Iterator<Item = Edge>) -> Vec<usize> {
    let mut vertices: Vec<usize> = edges.flat_map(|e| [e.v0, e.v1]).collect();
    vertices.sort_unstable();
    vertices.dedup();
    vertices
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Geometry module - mesh views, ray queries and adjacency primitives

pub mod adjacency;
mod mesh;
pub mod raycast;

pub use mesh::MeshTopology;
pub use raycast::{RayHit, TriangleSoa};

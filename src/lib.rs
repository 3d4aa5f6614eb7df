// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Normkit
//!
//! A batch geometry kernel for editing per-vertex surface normals of triangle
//! meshes: raycast picking, region/brush selection, rigid-space normal
//! transforms, brush sculpting, mirror-symmetry propagation, normal transfer
//! between meshes and linear-blend skinning.
//!
//! The host editor owns every buffer and lends it to the engine for exactly
//! one call; operators mutate normals, tangents, points and the selection
//! mask in place and return affected counts. The only artifacts that persist
//! across calls are the selection mask and the mirror relation table, both
//! host-owned. All heavy scans run as fork-join parallel loops over vertex or
//! triangle index and are invariant to traversal order.

pub mod brush;
pub mod error;
pub mod geometry;
pub mod math;
pub mod mirror;
pub mod paint;
pub mod pressure;
pub mod project;
pub mod sculpt;
pub mod select;
pub mod skin;

pub use brush::BrushFalloff;
pub use error::{Error, Result};
pub use geometry::{MeshTopology, RayHit, TriangleSoa};
pub use mirror::MirrorTable;
pub use project::{project_normals, ReferenceMesh};
pub use select::{Expansion, SelectionSummary, ViewParams};
pub use skin::{SkinPalette, SkinStreams, SkinWeights, SkinWeights4};

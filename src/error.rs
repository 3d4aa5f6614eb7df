// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Crate error type
//!
//! Errors are reserved for contract-level failures a caller can act on.
//! Degenerate inputs (zero rotation angle, empty selection, empty brush hit
//! set) are silent no-ops and never reach this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An object/world or pose transform could not be inverted
    #[error("transform matrix is not invertible")]
    SingularTransform,

    /// A brush falloff table must hold at least two samples
    #[error("brush falloff table needs at least 2 samples, got {0}")]
    FalloffTooShort(usize),
}

pub type Result<T> = std::result::Result<T, Error>;

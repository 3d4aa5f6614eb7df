// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Normkit Team

//! Process-wide pen pressure
//!
//! A single scalar in [0, 1] written by the host's pen-input backend and read
//! when the host scales brush strengths. Defaults to full strength so mouse
//! input behaves like a fully pressed pen. This is the only global mutable
//! state in the crate.

use crate::math::clamp01;
use std::sync::atomic::{AtomicU32, Ordering};

// bit pattern of 1.0f32
const FULL_PRESSURE_BITS: u32 = 0x3F80_0000;

static PRESSURE: AtomicU32 = AtomicU32::new(FULL_PRESSURE_BITS);

/// Current pen pressure in [0, 1]
pub fn get() -> f32 {
    f32::from_bits(PRESSURE.load(Ordering::Relaxed))
}

/// Record a pressure sample from the input backend, clamped to [0, 1]
pub fn set(pressure: f32) {
    PRESSURE.store(clamp01(pressure).to_bits(), Ordering::Relaxed);
}

/// Restore the full-strength default (pen lifted or backend shut down)
pub fn reset() {
    PRESSURE.store(FULL_PRESSURE_BITS, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_lifecycle() {
        reset();
        assert_eq!(get(), 1.0);

        set(0.25);
        assert_eq!(get(), 0.25);

        // samples clamp to the valid range
        set(7.0);
        assert_eq!(get(), 1.0);
        set(-1.0);
        assert_eq!(get(), 0.0);

        reset();
        assert_eq!(get(), 1.0);
    }
}

// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for vector arithmetic.

/// Errors produced by [`Vector`](crate::Vector) operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GeomError {
    /// Two operands (or an operand and a configured dimension) differ in length.
    #[error("dimension mismatch: expected {expected} components, found {found}")]
    DimensionMismatch {
        /// Length required by the receiver or configuration.
        expected: usize,
        /// Length actually supplied.
        found: usize,
    },
}

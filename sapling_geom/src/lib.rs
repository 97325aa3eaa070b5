// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sapling Geom: coordinate vectors for the Sapling spatial index.
//!
//! - [`Vector`] is a variable-length `f64` vector used as node coordinates.
//! - Binary operations are checked and return [`GeomError::DimensionMismatch`]
//!   when operand lengths differ.
//! - [`Vector::approx_eq`] compares with a fixed absolute tolerance of [`EPSILON`].
//!
//! It does not depend on any linear algebra crate.
//! Higher layers (like `sapling_tree`) store one `Vector` per node and only need
//! indexed access, subtraction and the Euclidean norm.
//!
//! # Example
//!
//! ```rust
//! use sapling_geom::{GeomError, Vector};
//!
//! let a = Vector::from([0.0, 3.0, 4.0]);
//! let b = Vector::zeros(3);
//! assert_eq!(a.distance(&b), Ok(5.0));
//!
//! let short = Vector::from([1.0, 2.0]);
//! assert_eq!(
//!     a.dot(&short),
//!     Err(GeomError::DimensionMismatch { expected: 3, found: 2 })
//! );
//! ```
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs in coordinates. Comparisons involving NaN are
//! never true, so NaN components make every tolerance check fail.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("sapling_geom requires either the `std` or `libm` feature");

extern crate alloc;

pub mod error;
pub mod vector;

pub use error::GeomError;
pub use vector::{EPSILON, Vector};

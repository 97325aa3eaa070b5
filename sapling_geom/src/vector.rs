// Copyright 2025 the Sapling Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinate vector type and numeric helpers.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::ops::{Index, IndexMut};

use crate::error::GeomError;

/// Absolute per-component tolerance used by [`Vector::approx_eq`].
pub const EPSILON: f64 = 1e-6;

/// A variable-length vector of `f64` components.
///
/// Arithmetic between two vectors is checked: operands of different lengths
/// produce [`GeomError::DimensionMismatch`] instead of panicking.
/// Indexing with `[]` behaves like a slice and panics when out of range;
/// use [`Vector::get`] for a fallible lookup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vector {
    components: Vec<f64>,
}

impl Vector {
    /// Create a vector from its components.
    pub const fn new(components: Vec<f64>) -> Self {
        Self { components }
    }

    /// A vector of `len` zeros.
    pub fn zeros(len: usize) -> Self {
        Self {
            components: vec![0.0; len],
        }
    }

    /// Number of components.
    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True if the vector has no components.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component `i`, or `None` when out of range.
    #[inline]
    pub fn get(&self, i: usize) -> Option<f64> {
        self.components.get(i).copied()
    }

    /// Borrow the components.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.components
    }

    /// Iterate over the components.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.components.iter().copied()
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        sqrt(self.components.iter().map(|c| c * c).sum())
    }

    /// Dot product.
    pub fn dot(&self, other: &Self) -> Result<f64, GeomError> {
        self.check_len(other)?;
        Ok(self
            .components
            .iter()
            .zip(&other.components)
            .map(|(a, b)| a * b)
            .sum())
    }

    /// Component-wise sum.
    pub fn checked_add(&self, other: &Self) -> Result<Self, GeomError> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Component-wise difference `self - other`.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, GeomError> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Every component multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        self.components.iter().map(|c| c * factor).collect()
    }

    /// Euclidean distance `‖self - other‖`.
    ///
    /// Computed without allocating the difference vector.
    pub fn distance(&self, other: &Self) -> Result<f64, GeomError> {
        self.check_len(other)?;
        let sum: f64 = self
            .components
            .iter()
            .zip(&other.components)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        Ok(sqrt(sum))
    }

    /// Equality with an absolute tolerance of [`EPSILON`] per component.
    ///
    /// Vectors of different lengths are never equal.
    pub fn approx_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| (a - b).abs() <= EPSILON)
    }

    fn check_len(&self, other: &Self) -> Result<(), GeomError> {
        if self.len() == other.len() {
            Ok(())
        } else {
            Err(GeomError::DimensionMismatch {
                expected: self.len(),
                found: other.len(),
            })
        }
    }

    fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Result<Self, GeomError> {
        self.check_len(other)?;
        Ok(self
            .components
            .iter()
            .zip(&other.components)
            .map(|(a, b)| f(*a, *b))
            .collect())
    }
}

impl Index<usize> for Vector {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.components[i]
    }
}

impl IndexMut<usize> for Vector {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.components[i]
    }
}

impl From<Vec<f64>> for Vector {
    fn from(components: Vec<f64>) -> Self {
        Self::new(components)
    }
}

impl<const N: usize> From<[f64; N]> for Vector {
    fn from(components: [f64; N]) -> Self {
        Self::new(components.to_vec())
    }
}

impl From<&[f64]> for Vector {
    fn from(components: &[f64]) -> Self {
        Self::new(components.to_vec())
    }
}

impl FromIterator<f64> for Vector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str(")")
    }
}

#[cfg(feature = "std")]
#[inline]
fn sqrt(v: f64) -> f64 {
    v.sqrt()
}

#[cfg(not(feature = "std"))]
#[inline]
fn sqrt(v: f64) -> f64 {
    libm::sqrt(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn norm_and_distance() {
        let a = Vector::from([3.0, 4.0, 0.0]);
        assert_eq!(a.norm(), 5.0);
        let b = Vector::from([0.0, 0.0, 0.0]);
        assert_eq!(a.distance(&b), Ok(5.0));
        assert_eq!(a.checked_sub(&b).map(|d| d.norm()), Ok(5.0));
    }

    #[test]
    fn mismatched_lengths_are_errors() {
        let a = Vector::from([1.0, 2.0, 3.0]);
        let b = Vector::from([1.0, 2.0]);
        let expected = GeomError::DimensionMismatch {
            expected: 3,
            found: 2,
        };
        assert_eq!(a.dot(&b), Err(expected.clone()));
        assert_eq!(a.checked_add(&b), Err(expected.clone()));
        assert_eq!(a.distance(&b), Err(expected));
        assert!(!a.approx_eq(&b), "different lengths never compare equal");
    }

    #[test]
    fn arithmetic() {
        let a = Vector::from([1.0, 2.0, 3.0]);
        let b = Vector::from([4.0, 5.0, 6.0]);
        assert_eq!(a.dot(&b), Ok(32.0));
        assert_eq!(a.checked_add(&b), Ok(Vector::from([5.0, 7.0, 9.0])));
        assert_eq!(b.checked_sub(&a), Ok(Vector::from([3.0, 3.0, 3.0])));
        assert_eq!(a.scaled(2.0), Vector::from([2.0, 4.0, 6.0]));
    }

    #[test]
    fn approx_eq_uses_absolute_tolerance() {
        let a = Vector::from([1.0, 1.0]);
        assert!(a.approx_eq(&Vector::from([1.0 + 5e-7, 1.0 - 5e-7])));
        assert!(!a.approx_eq(&Vector::from([1.0 + 5e-6, 1.0])));
    }

    #[test]
    fn indexing_and_display() {
        let mut v = Vector::zeros(3);
        v[1] = 2.5;
        assert_eq!(v.get(1), Some(2.5));
        assert_eq!(v.get(3), None);
        assert_eq!(v.to_string(), "(0, 2.5, 0)");
    }
}

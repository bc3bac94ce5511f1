//! Square-root-free Cholesky decomposition of symmetric matrices.
//!
//! A symmetric matrix `A` is factored as `A = L D Lᵗ`, where `L` is unit lower triangular and `D`
//! is diagonal. A single factorization can then be reused to solve `A x = b` for any number of
//! right-hand sides, to compute `A⁻¹` and to compute `det(A)`.
//!
//! ```
//! use cholesky::Cholesky;
//! use nalgebra::{matrix, vector};
//!
//! let chol = Cholesky::from_matrix(&matrix![4.0_f64, 2.0; 2.0, 3.0]).unwrap();
//! let x = chol.backsub(&vector![1.0, 1.0]).unwrap();
//! assert!((x[0] - 0.125).abs() < 1e-12 && (x[1] - 0.25).abs() < 1e-12);
//! assert!((chol.determinant() - 8.0).abs() < 1e-12);
//! ```
mod ldlt;
mod traits;

pub use ldlt::Cholesky;
pub use traits::LSolver;

use std::ops::Neg;

use nalgebra::Scalar;
use num_traits::NumAssign;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("A zero pivot was encountered during an LDLt factorization (col {col})")]
    ZeroPivot { col: usize },
}

/// Element type of the matrices being factored.
///
/// Only field arithmetic is needed: the decomposition takes no square roots and does no
/// pivoting, so anything with `+ - * /` and negation works, not just floating point.
pub trait Precision: Scalar + Copy + NumAssign + Neg<Output = Self> {}

impl<T> Precision for T where T: Scalar + Copy + NumAssign + Neg<Output = T> {}

/// Fail with [`Error::DimensionMismatch`] unless `found == expected`.
#[inline]
pub(crate) fn check_dim(expected: usize, found: usize) -> Result<(), Error> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected, found })
    }
}

//! LDLt decomposition of a symmetric matrix, without square roots.
//!
use nalgebra::{
    allocator::Allocator, DefaultAllocator, Dim, DimName, Dyn, Matrix, OMatrix, OVector, Storage,
    StorageMut, U1,
};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use crate::{check_dim, Error, LSolver, Precision};

/// Cholesky decomposition of a symmetric matrix.
///
/// Only the lower half of the matrix is considered. This is the non-sqrt version of the
/// decomposition, giving `M = L D Lᵗ` where `L` has ones on its diagonal.
///
/// The factors are packed into one square matrix: the multipliers of `L` below the diagonal,
/// the pivots of `D` on it, and the unscaled products `D[j] L[i][j]` above it, which are reused
/// while later columns are resolved. None of this storage is handed out; the accessors return
/// copies.
///
/// `D` is either a `Const<N>` for a statically sized decomposition or `Dyn`.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde-serialize",
    serde(bound(serialize = "OMatrix<T, D, D>: Serialize"))
)]
#[cfg_attr(
    feature = "serde-serialize",
    serde(bound(
        deserialize = "OMatrix<T, D, D>: Deserialize<'de>, DefaultAllocator: Allocator<T, D, D>"
    ))
)]
#[derive(Clone, Debug)]
pub struct Cholesky<T, D>
where
    D: Dim,
    DefaultAllocator: Allocator<T, D, D>,
{
    factor: OMatrix<T, D, D>,
}

impl<T, D> Cholesky<T, D>
where
    T: Precision,
    D: Dim,
    DefaultAllocator: Allocator<T, D, D>,
{
    /// Creates an empty, statically sized decomposition. Call [`Cholesky::compute`] before
    /// using it.
    pub fn new() -> Self
    where
        D: DimName,
    {
        Cholesky {
            factor: OMatrix::<T, D, D>::zeros(),
        }
    }

    /// Creates a decomposition of `m`, sized after it.
    pub fn from_matrix<S>(m: &Matrix<T, D, D, S>) -> Result<Self, Error>
    where
        S: Storage<T, D, D>,
    {
        let (nrows, ncols) = m.shape_generic();
        check_dim(m.nrows(), m.ncols())?;
        let mut chol = Cholesky {
            factor: OMatrix::zeros_generic(nrows, ncols),
        };
        chol.compute(m)?;
        Ok(chol)
    }

    /// The size `n` of the `n x n` matrix being decomposed.
    pub fn dim(&self) -> usize {
        self.factor.nrows()
    }

    /// Computes the decomposition of `m`, replacing any previous one.
    ///
    /// Only the lower triangle and the diagonal of `m` are read. `m` must be square and of the
    /// size of this decomposition, otherwise [`Error::DimensionMismatch`] is returned and the
    /// previous decomposition is kept.
    ///
    /// No pivoting is done. A zero pivot is not reported: it turns into infinities or NaNs in
    /// every later result. Use [`Cholesky::compute_checked`] to have it rejected.
    pub fn compute<R, C, S>(&mut self, m: &Matrix<T, R, C, S>) -> Result<(), Error>
    where
        R: Dim,
        C: Dim,
        S: Storage<T, R, C>,
    {
        check_dim(m.nrows(), m.ncols())?;
        check_dim(self.dim(), m.nrows())?;
        log::trace!("Cholesky::compute, n = {}", self.dim());

        copy_lower(&mut self.factor, m);
        if let Err(col) = ldlt_factor(&mut self.factor, false) {
            unreachable!("unchecked LDLt factorization rejected the pivot of col {col}");
        }
        Ok(())
    }

    /// Like [`Cholesky::compute`], but stops at the first pivot that is exactly zero and returns
    /// [`Error::ZeroPivot`] with its column. The previous decomposition is kept in that case.
    pub fn compute_checked<R, C, S>(&mut self, m: &Matrix<T, R, C, S>) -> Result<(), Error>
    where
        R: Dim,
        C: Dim,
        S: Storage<T, R, C>,
    {
        check_dim(m.nrows(), m.ncols())?;
        check_dim(self.dim(), m.nrows())?;
        log::trace!("Cholesky::compute_checked, n = {}", self.dim());

        let mut scratch = self.factor.clone();
        copy_lower(&mut scratch, m);
        ldlt_factor(&mut scratch, true).map_err(|col| {
            log::warn!("zero pivot in LDLt factorization at col {}", col);
            Error::ZeroPivot { col }
        })?;
        self.factor = scratch;
        Ok(())
    }

    /// Solves `A x = v` for `x`.
    pub fn backsub<R2, S2>(&self, v: &Matrix<T, R2, U1, S2>) -> Result<OVector<T, D>, Error>
    where
        R2: Dim,
        S2: Storage<T, R2>,
        DefaultAllocator: Allocator<T, D>,
    {
        self.backsub_matrix(v)
    }

    /// Solves `A X = M` for `X`, one column of `X` per column of `M`.
    pub fn backsub_matrix<R2, C2, S2>(
        &self,
        m: &Matrix<T, R2, C2, S2>,
    ) -> Result<OMatrix<T, D, C2>, Error>
    where
        R2: Dim,
        C2: Dim,
        S2: Storage<T, R2, C2>,
        DefaultAllocator: Allocator<T, D, C2>,
    {
        check_dim(self.dim(), m.nrows())?;
        log::trace!(
            "Cholesky::backsub, n = {}, rhs columns = {}",
            self.dim(),
            m.ncols()
        );

        let (nrows, _) = self.factor.shape_generic();
        let (_, ncols) = m.shape_generic();
        let mut x = OMatrix::from_fn_generic(nrows, ncols, |i, j| m[(i, j)]);
        ldlt_solve(&self.factor, &mut x);
        Ok(x)
    }

    /// Computes `A⁻¹` by solving against the identity.
    // easy way to get the inverse, could be made more efficient
    pub fn get_inverse(&self) -> OMatrix<T, D, D> {
        let (nrows, ncols) = self.factor.shape_generic();
        let mut inv = OMatrix::identity_generic(nrows, ncols);
        ldlt_solve(&self.factor, &mut inv);
        inv
    }

    /// `det(A)`, the product of the pivots. An empty matrix has determinant one.
    pub fn determinant(&self) -> T
    where
        DefaultAllocator: Allocator<T, D>,
    {
        self.factor.diagonal().product()
    }

    /// `vᵗ A⁻¹ v`
    pub fn mahalanobis<R2, S2>(&self, v: &Matrix<T, R2, U1, S2>) -> Result<T, Error>
    where
        R2: Dim,
        S2: Storage<T, R2>,
        DefaultAllocator: Allocator<T, D>,
    {
        let x = self.backsub(v)?;
        Ok((0..self.dim()).fold(T::zero(), |acc, i| acc + x[i] * v[i]))
    }

    /// The pivots, i.e. the diagonal of `D`.
    pub fn get_d(&self) -> OVector<T, D>
    where
        DefaultAllocator: Allocator<T, D>,
    {
        let (nrows, _) = self.factor.shape_generic();
        OVector::from_fn_generic(nrows, U1, |i, _| self.factor[(i, i)])
    }

    /// The unit lower triangular factor `L`.
    pub fn get_l(&self) -> OMatrix<T, D, D> {
        let (nrows, ncols) = self.factor.shape_generic();
        OMatrix::from_fn_generic(nrows, ncols, |i, j| {
            if i == j {
                T::one()
            } else if i > j {
                self.factor[(i, j)]
            } else {
                T::zero()
            }
        })
    }

    /// `L D`, lower triangular with the pivots on its diagonal.
    pub fn get_unscaled_l(&self) -> OMatrix<T, D, D> {
        let (nrows, ncols) = self.factor.shape_generic();
        OMatrix::from_fn_generic(nrows, ncols, |i, j| {
            if i >= j {
                // the unscaled values live in the upper half
                self.factor[(j, i)]
            } else {
                T::zero()
            }
        })
    }
}

impl<T> Cholesky<T, Dyn>
where
    T: Precision,
    DefaultAllocator: Allocator<T, Dyn, Dyn>,
{
    /// Creates an empty decomposition of a `size x size` matrix.
    pub fn new_dynamic(size: usize) -> Self {
        Cholesky {
            factor: OMatrix::<T, Dyn, Dyn>::zeros(size, size),
        }
    }
}

impl<T, D> LSolver<T, D> for Cholesky<T, D>
where
    T: Precision,
    D: Dim,
    DefaultAllocator: Allocator<T, D, D>,
{
    fn setup<S>(&mut self, mat_a: &Matrix<T, D, D, S>) -> Result<(), Error>
    where
        S: Storage<T, D, D>,
    {
        self.compute_checked(mat_a)
    }

    fn solve<SB, SC>(
        &self,
        x: &mut Matrix<T, D, U1, SB>,
        b: &Matrix<T, D, U1, SC>,
    ) -> Result<(), Error>
    where
        SB: StorageMut<T, D>,
        SC: Storage<T, D>,
    {
        check_dim(self.dim(), b.nrows())?;
        check_dim(self.dim(), x.nrows())?;

        // copy b into x
        x.copy_from(b);
        ldlt_solve(&self.factor, x);
        Ok(())
    }
}

/// Copies the lower triangle and diagonal of `src` into `dst`. Shapes must already agree.
fn copy_lower<T, D, R, C, SD, SS>(dst: &mut Matrix<T, D, D, SD>, src: &Matrix<T, R, C, SS>)
where
    T: Precision,
    D: Dim,
    R: Dim,
    C: Dim,
    SD: StorageMut<T, D, D>,
    SS: Storage<T, R, C>,
{
    for col in 0..dst.ncols() {
        for row in col..dst.nrows() {
            dst[(row, col)] = src[(row, col)];
        }
    }
}

/// Performs the LDLt factorization of the symmetric N by N matrix A in place.
///
/// Columns are resolved left to right. Each entry on or below the diagonal of column `col` is
/// corrected by the columns already resolved; the diagonal entry becomes the pivot `D[col]` and
/// the entries below it are divided by that pivot to give the multipliers `L[row][col]`. Before
/// dividing, the corrected value `D[col] L[row][col]` is cached in the mirrored upper entry
/// `(col, row)` so that later columns need one multiplication per term instead of two.
///
/// On return the strict lower triangle holds `L`, the diagonal holds `D` and the strict upper
/// triangle holds `L D` transposed.
///
/// When `reject_zero_pivot` is set, returns the column of the first pivot that is exactly zero,
/// leaving A partially factored.
fn ldlt_factor<T, D, S>(
    mat_a: &mut Matrix<T, D, D, S>,
    reject_zero_pivot: bool,
) -> Result<(), usize>
where
    T: Precision,
    D: Dim,
    S: StorageMut<T, D, D>,
{
    let n = mat_a.nrows();

    for col in 0..n {
        let mut inv_diag = T::zero();
        for row in col..n {
            // correct for the parts of the decomposition already computed
            let mut val = mat_a[(row, col)];
            for k in 0..col {
                val -= mat_a[(k, col)] * mat_a[(row, k)];
            }

            if row == col {
                if reject_zero_pivot && val == T::zero() {
                    return Err(col);
                }
                mat_a[(col, col)] = val;
                inv_diag = T::one() / val;
            } else {
                mat_a[(col, row)] = val;
                mat_a[(row, col)] = val * inv_diag;
            }
        }
    }

    Ok(())
}

/// Solves `L D Lᵗ X = B` in place, for the factorization computed by `ldlt_factor`. B holds the
/// solution on return. Each stage updates whole rows of B at a time, so any number of right-hand
/// sides share one pass over the factors.
///
/// Does NOT check the shapes!
fn ldlt_solve<T, D, C, SA, SB>(factor: &Matrix<T, D, D, SA>, b: &mut Matrix<T, D, C, SB>)
where
    T: Precision,
    D: Dim,
    C: Dim,
    SA: Storage<T, D, D>,
    SB: StorageMut<T, D, C>,
{
    let n = factor.nrows();
    let ncols = b.ncols();

    // Solve L y = b
    for i in 0..n {
        for j in 0..i {
            let l_ij = factor[(i, j)];
            for k in 0..ncols {
                let y_jk = b[(j, k)];
                b[(i, k)] -= l_ij * y_jk;
            }
        }
    }

    // Solve D z = y
    for i in 0..n {
        let d = factor[(i, i)];
        for k in 0..ncols {
            b[(i, k)] /= d;
        }
    }

    // Solve Lt x = z
    for i in (0..n).rev() {
        for j in (i + 1)..n {
            let l_ji = factor[(j, i)];
            for k in 0..ncols {
                let x_jk = b[(j, k)];
                b[(i, k)] -= l_ji * x_jk;
            }
        }
    }
}

use nalgebra::{Dim, Matrix, Storage, StorageMut, U1};

use crate::{Error, Precision};

/// A direct linear solver, factored once in `setup` and applied many times in `solve`.
pub trait LSolver<T, D>
where
    T: Precision,
    D: Dim,
{
    /// Performs any linear solver setup needed for the system matrix A. This may be called
    /// frequently (e.g. every Newton iteration) or infrequently, whenever A changes.
    fn setup<S>(&mut self, mat_a: &Matrix<T, D, D, S>) -> Result<(), Error>
    where
        S: Storage<T, D, D>;

    /// solves a linear system Ax = b, using the A given to the last `setup`.
    ///
    /// ## Arguments
    /// * `x` the solution to the linear system upon return.
    /// * `b` the linear system right-hand side.
    fn solve<SB, SC>(
        &self,
        x: &mut Matrix<T, D, U1, SB>,
        b: &Matrix<T, D, U1, SC>,
    ) -> Result<(), Error>
    where
        SB: StorageMut<T, D>,
        SC: Storage<T, D>;
}

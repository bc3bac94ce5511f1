//! Randomized checks of the LDLt decomposition against symmetric positive definite matrices.

use approx::assert_relative_eq;
use cholesky::{Cholesky, LSolver};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3, U3};
use rand::{rngs::StdRng, Rng, SeedableRng};

const MAX_SIZE: usize = 50;

/// `M Mᵗ + n I` with the entries of `M` uniform in [-1, 1].
fn random_spd(rng: &mut StdRng, n: usize) -> DMatrix<f64> {
    let m = DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0));
    &m * m.transpose() + DMatrix::identity(n, n) * n as f64
}

fn random_matrix(rng: &mut StdRng, nrows: usize, ncols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(nrows, ncols, |_, _| rng.gen_range(-1.0..1.0))
}

/// Rounding error allowed for a size `n` problem, `K n eps max|A|`.
fn tolerance(mat_a: &DMatrix<f64>) -> f64 {
    1e3 * mat_a.nrows() as f64 * f64::EPSILON * mat_a.amax()
}

#[test]
fn reconstruct() {
    for n in 1..=MAX_SIZE {
        let mut rng = StdRng::seed_from_u64(n as u64);
        let mat_a = random_spd(&mut rng, n);
        let chol = Cholesky::from_matrix(&mat_a).unwrap();

        let l = chol.get_l();
        let d = chol.get_d();
        let ldlt = &l * DMatrix::from_diagonal(&d) * l.transpose();
        assert!(
            (ldlt - &mat_a).amax() <= tolerance(&mat_a),
            "L D Lt differs from A for n = {n}"
        );

        let ld = chol.get_unscaled_l();
        assert_relative_eq!(ld, &l * DMatrix::from_diagonal(&d), epsilon = tolerance(&mat_a));
    }
}

#[test]
fn backsub_vector() {
    for n in 1..=MAX_SIZE {
        let mut rng = StdRng::seed_from_u64(1000 + n as u64);
        let mat_a = random_spd(&mut rng, n);
        let b = DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.0));

        let chol = Cholesky::from_matrix(&mat_a).unwrap();
        let x = chol.backsub(&b).unwrap();

        let tol = tolerance(&mat_a) * x.amax().max(1.0);
        assert!(
            (&mat_a * &x - &b).amax() <= tol,
            "A x differs from b for n = {n}"
        );
    }
}

#[test]
fn backsub_matrix() {
    for n in 1..=MAX_SIZE {
        let mut rng = StdRng::seed_from_u64(2000 + n as u64);
        let mat_a = random_spd(&mut rng, n);
        let cols = rng.gen_range(1..=6);
        let mat_b = random_matrix(&mut rng, n, cols);

        let chol = Cholesky::from_matrix(&mat_a).unwrap();
        let x = chol.backsub_matrix(&mat_b).unwrap();
        assert_eq!(x.shape(), (n, cols));

        let tol = tolerance(&mat_a) * x.amax().max(1.0);
        assert!(
            (&mat_a * &x - &mat_b).amax() <= tol,
            "A X differs from B for n = {n}"
        );
    }
}

#[test]
fn inverse() {
    for n in 1..=MAX_SIZE {
        let mut rng = StdRng::seed_from_u64(3000 + n as u64);
        let mat_a = random_spd(&mut rng, n);

        let chol = Cholesky::from_matrix(&mat_a).unwrap();
        let inv = chol.get_inverse();

        let tol = tolerance(&mat_a) * inv.amax().max(1.0);
        assert!(
            (&mat_a * &inv - DMatrix::identity(n, n)).amax() <= tol,
            "A A^-1 differs from I for n = {n}"
        );
    }
}

#[test]
fn determinant_matches_lu() {
    for n in 1..=10 {
        let mut rng = StdRng::seed_from_u64(4000 + n as u64);
        let mat_a = random_spd(&mut rng, n);

        let chol = Cholesky::from_matrix(&mat_a).unwrap();
        assert_relative_eq!(
            chol.determinant(),
            mat_a.clone().determinant(),
            max_relative = 1e-9
        );
    }
}

#[test]
fn mahalanobis_matches_inverse() {
    let mut rng = StdRng::seed_from_u64(5000);
    let mat_a = random_spd(&mut rng, 12);
    let v = DVector::from_fn(12, |_, _| rng.gen_range(-1.0..1.0));

    let chol = Cholesky::from_matrix(&mat_a).unwrap();
    let expected = v.dot(&(chol.get_inverse() * &v));
    assert_relative_eq!(chol.mahalanobis(&v).unwrap(), expected, max_relative = 1e-10);
}

#[test]
fn static_and_dynamic_agree() {
    let mut rng = StdRng::seed_from_u64(6000);
    let dynamic = random_spd(&mut rng, 3);
    let fixed = Matrix3::from_iterator(dynamic.iter().copied());

    let chol_dyn = Cholesky::from_matrix(&dynamic).unwrap();
    let mut chol_fixed = Cholesky::<f64, U3>::new();
    chol_fixed.compute(&fixed).unwrap();

    assert_eq!(chol_dyn.get_l().as_slice(), chol_fixed.get_l().as_slice());
    assert_eq!(chol_dyn.get_d().as_slice(), chol_fixed.get_d().as_slice());
    assert_eq!(chol_dyn.determinant(), chol_fixed.determinant());

    let b = Vector3::new(1.0, -2.0, 0.5);
    let mut x = Vector3::zeros();
    chol_fixed.solve(&mut x, &b).unwrap();
    let x_dyn = chol_dyn
        .backsub(&DVector::from_column_slice(b.as_slice()))
        .unwrap();
    assert_eq!(x.as_slice(), x_dyn.as_slice());
}

#[test]
fn refactor_replaces_previous() {
    let mut rng = StdRng::seed_from_u64(7000);
    let first = random_spd(&mut rng, 8);
    let second = random_spd(&mut rng, 8);

    let mut chol = Cholesky::from_matrix(&first).unwrap();
    chol.compute(&second).unwrap();
    let fresh = Cholesky::from_matrix(&second).unwrap();

    assert_eq!(chol.get_l(), fresh.get_l());
    assert_eq!(chol.get_d(), fresh.get_d());
}

//! Common test utilities
#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sparx::dtype::Element;
use sparx::value::{DenseData, SparseData, SparseFormat};

/// Deterministic RNG for fixture generation
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Read a dense value back as f64, whatever its dtype
///
/// Complex elements contribute their real part; the fixtures in this
/// suite are real-valued, so nothing is lost.
pub fn dense_to_f64(d: &DenseData) -> Vec<f64> {
    sparx::dispatch_dtype!(d.dtype(), T => {
        d.to_vec::<T>().iter().map(|&x| x.to_f64()).collect()
    })
}

/// Random sparse fixture: `n` values in [0, `max`) scattered at random
/// positions of a `shape` matrix, compressed into `format`
///
/// Positions may collide, in which case the later value overwrites (the
/// matrix then has fewer stored entries).
pub fn random_sparse(
    rng: &mut StdRng,
    shape: [usize; 2],
    n: usize,
    max: f64,
    format: SparseFormat,
) -> SparseData {
    let [rows, cols] = shape;
    let mut dense = vec![0.0f64; rows * cols];
    for _ in 0..n {
        let r = rng.gen_range(0..rows);
        let c = rng.gen_range(0..cols);
        // Floor keeps the value exactly representable in every dtype of
        // the lattice.
        dense[r * cols + c] = (rng.gen::<f64>() * max).floor();
    }
    let dense = DenseData::from_slice(&dense, &[rows, cols]).unwrap();
    SparseData::from_dense(&dense, format).unwrap()
}

/// Dense matrix product of a densified sparse operand with a dense
/// operand, computed independently in f64
pub fn reference_dot(sp_dense: &[f64], shape: [usize; 2], d: &[f64], n: usize) -> Vec<f64> {
    let [m, k] = shape;
    let mut out = vec![0.0f64; m * n];
    for i in 0..m {
        for j in 0..k {
            let v = sp_dense[i * k + j];
            if v != 0.0 {
                for c in 0..n {
                    out[i * n + c] += v * d[j * n + c];
                }
            }
        }
    }
    out
}

/// Central finite difference of a scalar-valued function
pub fn finite_diff(f: &mut dyn FnMut(&[f64]) -> f64, x: &[f64], eps: f64) -> Vec<f64> {
    let mut grad = vec![0.0f64; x.len()];
    let mut probe = x.to_vec();
    for i in 0..x.len() {
        probe[i] = x[i] + eps;
        let up = f(&probe);
        probe[i] = x[i] - eps;
        let down = f(&probe);
        probe[i] = x[i];
        grad[i] = (up - down) / (2.0 * eps);
    }
    grad
}

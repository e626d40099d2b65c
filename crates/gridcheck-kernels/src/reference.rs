//! Sequential host oracle.
//!
//! Straightforward re-implementations of the kernels, run entirely on the
//! host and used purely for verification. Deliberately unoptimised; do not
//! assume these are fast for large problems.

use gridcheck_common::{Element, MatmulProblem};

/// `out[i] = a[i] + b[i]`.
pub fn vector_add_ref<E: Element>(a: &[E], b: &[E]) -> Vec<E> {
    a.iter().zip(b).map(|(&x, &y)| x.add(y)).collect()
}

/// Elementwise matrix sum; identical to the vector case for row-major
/// contiguous storage.
pub fn matrix_add_ref<E: Element>(a: &[E], b: &[E]) -> Vec<E> {
    vector_add_ref(a, b)
}

/// Triple-nested-loop row-major matrix product.
pub fn matmul_ref<E: Element>(a: &[E], b: &[E], problem: MatmulProblem) -> Vec<E> {
    let (m, n, k) = (problem.m(), problem.n(), problem.k());
    let mut out = vec![E::ZERO; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut acc = E::ZERO;
            for l in 0..k {
                acc = acc.add(a[i * k + l].mul(b[l * n + j]));
            }
            out[i * n + j] = acc;
        }
    }
    out
}

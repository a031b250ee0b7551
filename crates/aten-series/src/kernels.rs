// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Single-coefficient recursion kernels.
//!
//! Each function computes the `k`-th coefficient of an operation result from
//! input coefficients of index `<= k` (and, for the self-referential
//! recursions, from result coefficients of index `< k`). The full-series
//! operations in [`Series`](crate::Series) loop over these kernels, and the
//! recorded-program integration mode replays them one order at a time, so both
//! paths share a single source of truth for the recursions.

use crate::Scalar;

/// Cauchy product: `(ab)_k = sum_j a_j b_{k-j}`.
pub fn mul_coeff<R: Scalar>(a: &[R], b: &[R], k: usize) -> R {
    let mut acc = a[0].clone() * b[k].clone();
    for j in 1..=k {
        acc += a[j].clone() * b[k - j].clone();
    }
    acc
}

/// Quotient recursion; `quo[..k]` must hold the already computed coefficients.
pub fn div_coeff<R: Scalar>(num: &[R], den: &[R], quo: &[R], k: usize) -> R {
    let mut acc = num[k].clone();
    for j in 0..k {
        acc -= quo[j].clone() * den[k - j].clone();
    }
    acc / den[0].clone()
}

/// Square-root recursion; `root[..k]` must hold the already computed
/// coefficients. Requires a non-zero constant term.
pub fn sqrt_coeff<R: Scalar>(f: &[R], root: &[R], k: usize) -> R {
    if k == 0 {
        return f[0].sqrt();
    }
    let mut acc = f[k].clone();
    for j in 1..k {
        acc -= root[j].clone() * root[k - j].clone();
    }
    acc / root[0].scale(2.0)
}

/// Exponential recursion; `g[..k]` must hold the already computed
/// coefficients.
pub fn exp_coeff<R: Scalar>(f: &[R], g: &[R], k: usize) -> R {
    if k == 0 {
        return f[0].exp();
    }
    let mut acc = f[k].scale(k as f64) * g[0].clone();
    for j in 1..k {
        acc += f[k - j].scale((k - j) as f64) * g[j].clone();
    }
    acc.scale(1.0 / k as f64)
}

/// Logarithm recursion; `g[..k]` must hold the already computed coefficients.
pub fn ln_coeff<R: Scalar>(f: &[R], g: &[R], k: usize) -> R {
    if k == 0 {
        return f[0].ln();
    }
    let mut acc = f[k].clone();
    for j in 1..k {
        acc -= g[j].scale(j as f64 / k as f64) * f[k - j].clone();
    }
    acc / f[0].clone()
}

/// Coupled sine/cosine recursion; `s[..k]` and `c[..k]` must hold the already
/// computed coefficients.
pub fn sin_cos_coeff<R: Scalar>(f: &[R], s: &[R], c: &[R], k: usize) -> (R, R) {
    if k == 0 {
        return f[0].sin_cos();
    }
    let mut sk = f[0].lift(0.0);
    let mut ck = f[0].lift(0.0);
    for j in 1..=k {
        let jfj = f[j].scale(j as f64);
        sk += jfj.clone() * c[k - j].clone();
        ck -= jfj * s[k - j].clone();
    }
    (sk.scale(1.0 / k as f64), ck.scale(1.0 / k as f64))
}

/// Arctangent recursion; `aux` holds the coefficients of `1 + f^2` and
/// `at[..k]` the already computed result coefficients.
pub fn atan_coeff<R: Scalar>(f: &[R], aux: &[R], at: &[R], k: usize) -> R {
    if k == 0 {
        return f[0].atan();
    }
    let mut acc = f[k].clone();
    for j in 1..k {
        acc -= at[j].scale(j as f64 / k as f64) * aux[k - j].clone();
    }
    acc / aux[0].clone()
}

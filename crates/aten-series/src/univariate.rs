// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Truncated univariate power series.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use crate::errors::SeriesError;
use crate::kernels;
use crate::scalar::Scalar;

/// A power series in one variable truncated at a fixed order.
///
/// The order is set at construction and preserved by every operation; mixing
/// orders in a binary operation is a programming error and panics. The
/// operator impls mirror `f64` semantics in degenerate cases (division by a
/// series with vanishing constant term yields non-finite coefficients rather
/// than panicking), while the `try_*` methods report
/// [`SeriesError`] for callers that want the diagnosis.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Series<R> {
    coeffs: Vec<R>,
}

impl<R: Scalar> Series<R> {
    /// A constant series of the given order.
    pub fn constant(value: R, order: usize) -> Self {
        let mut coeffs = vec![value.lift(0.0); order + 1];
        coeffs[0] = value;
        Self { coeffs }
    }

    /// The identity series `value + s` of the given order.
    pub fn variable(value: R, order: usize) -> Self {
        assert!(order >= 1, "the identity requires order >= 1");
        let one = value.lift(1.0);
        let mut series = Self::constant(value, order);
        series.coeffs[1] = one;
        series
    }

    pub fn from_coeffs(coeffs: Vec<R>) -> Self {
        assert!(!coeffs.is_empty(), "a series needs at least one coefficient");
        Self { coeffs }
    }

    pub fn order(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn coeff(&self, k: usize) -> &R {
        &self.coeffs[k]
    }

    pub fn coeffs(&self) -> &[R] {
        &self.coeffs
    }

    pub fn set_coeff(&mut self, k: usize, value: R) {
        self.coeffs[k] = value;
    }

    pub fn constant_term(&self) -> &R {
        &self.coeffs[0]
    }

    fn check_order(&self, rhs: &Self) -> Result<(), SeriesError> {
        if self.order() == rhs.order() {
            Ok(())
        } else {
            Err(SeriesError::OrderMismatch(self.order(), rhs.order()))
        }
    }

    /// Antiderivative with the given integration constant. The highest input
    /// coefficient drops out to preserve the order.
    pub fn integrate(&self, constant: R) -> Self {
        let n = self.order();
        let mut coeffs = Vec::with_capacity(n + 1);
        coeffs.push(constant);
        for k in 1..=n {
            let prev = &self.coeffs[k - 1];
            coeffs.push(prev.clone() / prev.lift(k as f64));
        }
        Self { coeffs }
    }

    /// Term-wise derivative; the highest output coefficient is zero.
    pub fn differentiate(&self) -> Self {
        let n = self.order();
        let mut coeffs = Vec::with_capacity(n + 1);
        for k in 1..=n {
            coeffs.push(self.coeffs[k].scale(k as f64));
        }
        coeffs.push(self.coeffs[0].lift(0.0));
        Self { coeffs }
    }

    /// Horner evaluation at a displacement of the independent variable.
    pub fn evaluate(&self, dt: f64) -> R {
        let n = self.order();
        let mut acc = self.coeffs[n].clone();
        for k in (0..n).rev() {
            acc = acc.scale(dt) + self.coeffs[k].clone();
        }
        acc
    }

    /// Exact polynomial shift: returns `p(s + offset)` as a series in `s`.
    pub fn translate(&self, offset: f64) -> Self {
        let n = self.order();
        let mut coeffs = vec![self.coeffs[0].lift(0.0); n + 1];
        coeffs[0] = self.coeffs[n].clone();
        for k in (0..n).rev() {
            for j in (1..=n).rev() {
                coeffs[j] = coeffs[j - 1].clone() + coeffs[j].scale(offset);
            }
            coeffs[0] = coeffs[0].scale(offset) + self.coeffs[k].clone();
        }
        Self { coeffs }
    }

    /// Series composition `self(inner(s))`. The inner series must have a
    /// vanishing constant term.
    pub fn try_compose(&self, inner: &Self) -> Result<Self, SeriesError> {
        self.check_order(inner)?;
        if *inner.constant_term() != inner.constant_term().lift(0.0) {
            return Err(SeriesError::NonZeroInnerConstant);
        }
        let n = self.order();
        let mut acc = Self::constant(self.coeffs[n].clone(), n);
        for k in (0..n).rev() {
            acc = &acc * inner;
            acc.coeffs[0] += self.coeffs[k].clone();
        }
        Ok(acc)
    }

    pub fn try_div(&self, rhs: &Self) -> Result<Self, SeriesError> {
        self.check_order(rhs)?;
        if rhs.constant_term().nominal() == 0.0 {
            return Err(SeriesError::ZeroDivisor);
        }
        Ok(self / rhs)
    }

    pub fn try_sqrt(&self) -> Result<Self, SeriesError> {
        let c0 = self.constant_term().nominal();
        if c0 <= 0.0 {
            return Err(SeriesError::NonPositiveConstantTerm("sqrt", c0));
        }
        Ok(Scalar::sqrt(self))
    }

    pub fn try_ln(&self) -> Result<Self, SeriesError> {
        let c0 = self.constant_term().nominal();
        if c0 <= 0.0 {
            return Err(SeriesError::NonPositiveConstantTerm("ln", c0));
        }
        Ok(Scalar::ln(self))
    }

    pub fn try_powf(&self, p: f64) -> Result<Self, SeriesError> {
        if p >= 0.0 && p.fract() == 0.0 && p <= i32::MAX as f64 {
            return Ok(Scalar::powi(self, p as i32));
        }
        let c0 = self.constant_term().nominal();
        if c0 <= 0.0 {
            return Err(SeriesError::NonPositiveConstantTerm("powf", c0));
        }
        Ok(Scalar::powf(self, p))
    }
}

impl Series<f64> {
    /// Horner evaluation in an arbitrary coefficient ring, lifting the plain
    /// coefficients into the ring of `x`.
    pub fn evaluate_in<S: Scalar>(&self, x: &S) -> S {
        let n = self.order();
        let mut acc = x.lift(self.coeffs[n]);
        for k in (0..n).rev() {
            acc = acc * x.clone() + x.lift(self.coeffs[k]);
        }
        acc
    }
}

impl<R: Scalar> Add for Series<R> {
    type Output = Series<R>;

    fn add(self, rhs: Self) -> Self::Output {
        &self + &rhs
    }
}

impl<R: Scalar> Add<&Series<R>> for &Series<R> {
    type Output = Series<R>;

    fn add(self, rhs: &Series<R>) -> Self::Output {
        assert_eq!(self.order(), rhs.order(), "series order mismatch");
        let coeffs = self
            .coeffs
            .iter()
            .zip(&rhs.coeffs)
            .map(|(a, b)| a.clone() + b.clone())
            .collect();
        Series { coeffs }
    }
}

impl<R: Scalar> Sub for Series<R> {
    type Output = Series<R>;

    fn sub(self, rhs: Self) -> Self::Output {
        &self - &rhs
    }
}

impl<R: Scalar> Sub<&Series<R>> for &Series<R> {
    type Output = Series<R>;

    fn sub(self, rhs: &Series<R>) -> Self::Output {
        assert_eq!(self.order(), rhs.order(), "series order mismatch");
        let coeffs = self
            .coeffs
            .iter()
            .zip(&rhs.coeffs)
            .map(|(a, b)| a.clone() - b.clone())
            .collect();
        Series { coeffs }
    }
}

impl<R: Scalar> Mul for Series<R> {
    type Output = Series<R>;

    fn mul(self, rhs: Self) -> Self::Output {
        &self * &rhs
    }
}

impl<R: Scalar> Mul<&Series<R>> for &Series<R> {
    type Output = Series<R>;

    fn mul(self, rhs: &Series<R>) -> Self::Output {
        assert_eq!(self.order(), rhs.order(), "series order mismatch");
        let n = self.order();
        let coeffs = (0..=n)
            .map(|k| kernels::mul_coeff(&self.coeffs, &rhs.coeffs, k))
            .collect();
        Series { coeffs }
    }
}

impl<R: Scalar> Div for Series<R> {
    type Output = Series<R>;

    fn div(self, rhs: Self) -> Self::Output {
        &self / &rhs
    }
}

impl<R: Scalar> Div<&Series<R>> for &Series<R> {
    type Output = Series<R>;

    fn div(self, rhs: &Series<R>) -> Self::Output {
        assert_eq!(self.order(), rhs.order(), "series order mismatch");
        let n = self.order();
        let mut coeffs = Vec::with_capacity(n + 1);
        for k in 0..=n {
            let ck = kernels::div_coeff(&self.coeffs, &rhs.coeffs, &coeffs, k);
            coeffs.push(ck);
        }
        Series { coeffs }
    }
}

impl<R: Scalar> Neg for Series<R> {
    type Output = Series<R>;

    fn neg(self) -> Self::Output {
        let coeffs = self.coeffs.into_iter().map(|c| -c).collect();
        Series { coeffs }
    }
}

impl<R: Scalar> Neg for &Series<R> {
    type Output = Series<R>;

    fn neg(self) -> Self::Output {
        let coeffs = self.coeffs.iter().map(|c| -c.clone()).collect();
        Series { coeffs }
    }
}

impl<R: Scalar> AddAssign for Series<R> {
    fn add_assign(&mut self, rhs: Self) {
        assert_eq!(self.order(), rhs.order(), "series order mismatch");
        for (a, b) in self.coeffs.iter_mut().zip(rhs.coeffs) {
            *a += b;
        }
    }
}

impl<R: Scalar> SubAssign for Series<R> {
    fn sub_assign(&mut self, rhs: Self) {
        assert_eq!(self.order(), rhs.order(), "series order mismatch");
        for (a, b) in self.coeffs.iter_mut().zip(rhs.coeffs) {
            *a -= b;
        }
    }
}

impl<R: Scalar> Scalar for Series<R> {
    fn lift(&self, value: f64) -> Self {
        Self::constant(self.coeffs[0].lift(value), self.order())
    }

    fn nominal(&self) -> f64 {
        self.coeffs[0].nominal()
    }

    fn inf_norm(&self) -> f64 {
        self.coeffs
            .iter()
            .map(Scalar::inf_norm)
            .fold(0.0, f64::max)
    }

    fn is_finite(&self) -> bool {
        self.coeffs.iter().all(Scalar::is_finite)
    }

    fn sqrt(&self) -> Self {
        let n = self.order();
        let mut coeffs = Vec::with_capacity(n + 1);
        for k in 0..=n {
            let ck = kernels::sqrt_coeff(&self.coeffs, &coeffs, k);
            coeffs.push(ck);
        }
        Self { coeffs }
    }

    fn exp(&self) -> Self {
        let n = self.order();
        let mut coeffs = Vec::with_capacity(n + 1);
        for k in 0..=n {
            let ck = kernels::exp_coeff(&self.coeffs, &coeffs, k);
            coeffs.push(ck);
        }
        Self { coeffs }
    }

    fn ln(&self) -> Self {
        let n = self.order();
        let mut coeffs = Vec::with_capacity(n + 1);
        for k in 0..=n {
            let ck = kernels::ln_coeff(&self.coeffs, &coeffs, k);
            coeffs.push(ck);
        }
        Self { coeffs }
    }

    fn sin_cos(&self) -> (Self, Self) {
        let n = self.order();
        let mut sin = Vec::with_capacity(n + 1);
        let mut cos = Vec::with_capacity(n + 1);
        for k in 0..=n {
            let (sk, ck) = kernels::sin_cos_coeff(&self.coeffs, &sin, &cos, k);
            sin.push(sk);
            cos.push(ck);
        }
        (Self { coeffs: sin }, Self { coeffs: cos })
    }

    fn atan(&self) -> Self {
        let aux = &(self * self) + &self.lift(1.0);
        let n = self.order();
        let mut coeffs = Vec::with_capacity(n + 1);
        for k in 0..=n {
            let ck = kernels::atan_coeff(&self.coeffs, &aux.coeffs, &coeffs, k);
            coeffs.push(ck);
        }
        Self { coeffs }
    }

    fn scale(&self, factor: f64) -> Self {
        let coeffs = self.coeffs.iter().map(|c| c.scale(factor)).collect();
        Self { coeffs }
    }
}

// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The coefficient ring abstraction shared by every numerical kernel.
//!
//! Dynamical models are written once against [`Scalar`] and instantiated with
//! plain `f64`, with [`Series`](crate::Series) over `f64` for Taylor
//! integration, or with [`Series`](crate::Series) over
//! [`MultiSeries`](crate::MultiSeries) for jet transport. Any additional
//! coefficient type (e.g. an extended-precision float) plugs into the same
//! trait.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A differential ring with the elementary functions needed by orbital
/// dynamics.
///
/// Implementations must guarantee that every binary operation computes the
/// result coefficients in a deterministic order, so that the value carried in
/// the constant slot of a structured scalar reproduces the plain `f64`
/// computation bit for bit.
pub trait Scalar:
    Clone
    + Debug
    + PartialEq
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
{
    /// Returns a constant with the same shape (order, variables) as `self`.
    fn lift(&self, value: f64) -> Self;

    /// The value at the expansion point (`t = 0`, `δ = 0`).
    fn nominal(&self) -> f64;

    /// The largest coefficient magnitude.
    fn inf_norm(&self) -> f64;

    fn is_finite(&self) -> bool;

    fn sqrt(&self) -> Self;

    fn exp(&self) -> Self;

    fn ln(&self) -> Self;

    fn sin_cos(&self) -> (Self, Self);

    fn atan(&self) -> Self;

    fn sin(&self) -> Self {
        self.sin_cos().0
    }

    fn cos(&self) -> Self {
        self.sin_cos().1
    }

    /// Multiplication by a plain constant.
    fn scale(&self, factor: f64) -> Self {
        self.clone() * self.lift(factor)
    }

    fn recip(&self) -> Self {
        self.lift(1.0) / self.clone()
    }

    fn square(&self) -> Self {
        self.clone() * self.clone()
    }

    /// Integer power by binary exponentiation.
    fn powi(&self, n: i32) -> Self {
        if n == 0 {
            return self.lift(1.0);
        }
        let mut base = if n < 0 { self.recip() } else { self.clone() };
        let mut exponent = n.unsigned_abs();
        let mut acc: Option<Self> = None;
        while exponent > 0 {
            if exponent & 1 == 1 {
                acc = Some(match acc {
                    Some(prod) => prod * base.clone(),
                    None => base.clone(),
                });
            }
            exponent >>= 1;
            if exponent > 0 {
                base = base.clone() * base.clone();
            }
        }
        acc.expect("non-zero exponent always yields a factor")
    }

    /// Real power. Non-negative integer exponents reduce to [`Scalar::powi`],
    /// everything else goes through `exp(p ln x)`.
    fn powf(&self, p: f64) -> Self {
        if p >= 0.0 && p.fract() == 0.0 && p <= i32::MAX as f64 {
            self.powi(p as i32)
        } else {
            self.ln().scale(p).exp()
        }
    }
}

impl Scalar for f64 {
    fn lift(&self, value: f64) -> Self {
        value
    }

    fn nominal(&self) -> f64 {
        *self
    }

    fn inf_norm(&self) -> f64 {
        self.abs()
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }

    fn sqrt(&self) -> Self {
        f64::sqrt(*self)
    }

    fn exp(&self) -> Self {
        f64::exp(*self)
    }

    fn ln(&self) -> Self {
        f64::ln(*self)
    }

    fn sin_cos(&self) -> (Self, Self) {
        f64::sin_cos(*self)
    }

    fn atan(&self) -> Self {
        f64::atan(*self)
    }

    fn sin(&self) -> Self {
        f64::sin(*self)
    }

    fn cos(&self) -> Self {
        f64::cos(*self)
    }

    fn scale(&self, factor: f64) -> Self {
        self * factor
    }

    fn recip(&self) -> Self {
        f64::recip(*self)
    }

    fn powi(&self, n: i32) -> Self {
        f64::powi(*self, n)
    }

    fn powf(&self, p: f64) -> Self {
        f64::powf(*self, p)
    }
}

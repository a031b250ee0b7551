// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Truncated power series algebra for the Aten ecosystem.
//!
//! Two polynomial types back every numerical kernel in Aten:
//!
//! - [`Series`], a univariate power series truncated at a fixed order, whose
//!   coefficients live in any [`Scalar`] ring;
//! - [`MultiSeries`], a polynomial in several variables truncated at a fixed
//!   total degree, used as the coefficient ring of [`Series`] for jet
//!   transport.
//!
//! Both types implement [`Scalar`] themselves, so `Series<MultiSeries>`, a
//! Taylor expansion in time whose coefficients carry the sensitivity to the
//! initial conditions, comes out of the same generic code paths.

mod errors;
pub mod kernels;
mod multivariate;
mod scalar;
mod univariate;

pub use errors::{SeriesError, MAX_DEGREE, MAX_VARS};
pub use multivariate::{MultiSeries, VarTable};
pub use scalar::Scalar;
pub use univariate::Series;

/// The jet-transport ring: a time expansion with sensitivity-carrying
/// coefficients.
pub type Jet = Series<MultiSeries>;

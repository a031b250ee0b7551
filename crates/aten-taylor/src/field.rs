// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

use aten_ephem::EphemerisError;
use aten_series::Scalar;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),
}

/// The right-hand side of an autonomous-in-form ODE `dx/dt = f(t, x)`.
///
/// Implementations must be written once over the abstract [`Scalar`] ring:
/// the integrator instantiates the same code with plain `f64`, with
/// univariate series for Taylor stepping, with series over
/// [`MultiSeries`](aten_series::MultiSeries) for jet transport, and with a
/// tracing scalar to record the fused coefficient program.
pub trait VectorField {
    /// Dimension of the state vector.
    fn dim(&self) -> usize;

    fn evaluate<S: Scalar>(&self, t: &S, x: &[S], dx: &mut [S]) -> Result<(), FieldError>;
}

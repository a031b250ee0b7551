// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

use aten_series::{Scalar, Series};

use crate::errors::EphemerisError;

/// A piecewise-polynomial time series.
///
/// Knots are relative to the epoch offset `t0` (days past J2000); piece `k`
/// expands the coordinates over the half-open interval `[t_k, t_{k+1})` in
/// the local variable `s = t - t0 - t_k`. The right endpoint of the last
/// interval is accepted; everything else outside the knot range is an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interpolant<R> {
    t0: f64,
    knots: Vec<f64>,
    pieces: Vec<Vec<Series<R>>>,
}

impl<R: Scalar> Interpolant<R> {
    pub fn try_new(
        t0: f64,
        knots: Vec<f64>,
        pieces: Vec<Vec<Series<R>>>,
    ) -> Result<Self, EphemerisError> {
        if knots.len() < 2 || pieces.is_empty() {
            return Err(EphemerisError::EmptyInterpolant);
        }
        if !knots.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(EphemerisError::NonMonotonicKnots);
        }
        if pieces.len() != knots.len() - 1 {
            return Err(EphemerisError::MismatchedPieces {
                knots: knots.len(),
                pieces: pieces.len(),
            });
        }
        let n_coords = pieces[0].len();
        if n_coords == 0 || pieces.iter().any(|piece| piece.len() != n_coords) {
            return Err(EphemerisError::MismatchedCoordinates);
        }
        Ok(Self { t0, knots, pieces })
    }

    pub fn epoch_offset(&self) -> f64 {
        self.t0
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn n_coords(&self) -> usize {
        self.pieces[0].len()
    }

    /// First valid time, in days past J2000.
    pub fn start(&self) -> f64 {
        self.t0 + self.knots[0]
    }

    /// Last valid time, in days past J2000.
    pub fn end(&self) -> f64 {
        self.t0 + self.knots[self.knots.len() - 1]
    }

    fn locate(&self, t: f64) -> Result<usize, EphemerisError> {
        let tau = t - self.t0;
        let first = self.knots[0];
        let last = self.knots[self.knots.len() - 1];
        if !(first..=last).contains(&tau) {
            return Err(EphemerisError::OutOfDomain {
                req: t,
                start: self.start(),
                end: self.end(),
            });
        }
        let idx = self.knots.partition_point(|&knot| knot <= tau) - 1;
        Ok(idx.min(self.pieces.len() - 1))
    }

    /// Evaluates all coordinates at a plain time, in the coefficient ring of
    /// the pieces.
    pub fn sample(&self, t: f64) -> Result<Vec<R>, EphemerisError> {
        let idx = self.locate(t)?;
        let local = t - self.t0 - self.knots[idx];
        Ok(self.pieces[idx]
            .iter()
            .map(|piece| piece.evaluate(local))
            .collect())
    }

    /// Term-wise derivative of every piece polynomial, e.g. to derive
    /// velocities and accelerations from a position interpolant.
    pub fn differentiate(&self) -> Self {
        let pieces = self
            .pieces
            .iter()
            .map(|piece| piece.iter().map(Series::differentiate).collect())
            .collect();
        Self {
            t0: self.t0,
            knots: self.knots.clone(),
            pieces,
        }
    }
}

impl Interpolant<f64> {
    /// Evaluates all coordinates at a time given in an arbitrary coefficient
    /// ring, substituting the local parameter in the algebra of the
    /// prototype. The enclosing piece is selected by the nominal value.
    ///
    /// When the argument is a series in time, the result captures how
    /// perturbations of the evaluation time propagate into the ephemeris
    /// value, which is what the integration recursion needs.
    pub fn evaluate<S: Scalar>(&self, t: &S) -> Result<Vec<S>, EphemerisError> {
        let idx = self.locate(t.nominal())?;
        let local = t.clone() - t.lift(self.t0 + self.knots[idx]);
        Ok(self.pieces[idx]
            .iter()
            .map(|piece| piece.evaluate_in(&local))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use rstest::rstest;

    use super::*;

    /// x(t) = t^2 over [0, 2], split at t = 1.
    fn parabola() -> Interpolant<f64> {
        let pieces = vec![
            vec![Series::from_coeffs(vec![0.0, 0.0, 1.0])],
            vec![Series::from_coeffs(vec![1.0, 2.0, 1.0])],
        ];
        Interpolant::try_new(10.0, vec![0.0, 1.0, 2.0], pieces).expect("should be valid")
    }

    #[rstest]
    #[case(10.0, 0.0)]
    #[case(10.5, 0.25)]
    #[case(11.0, 1.0)]
    #[case(11.5, 2.25)]
    #[case(12.0, 4.0)]
    fn test_interpolant_sample(#[case] t: f64, #[case] expected: f64) {
        let interp = parabola();
        let value = interp.sample(t).expect("should be in domain");
        assert_float_eq!(value[0], expected, abs <= 1e-14);
    }

    #[test]
    fn test_interpolant_out_of_domain() {
        let interp = parabola();
        assert!(matches!(
            interp.sample(9.999),
            Err(EphemerisError::OutOfDomain { .. })
        ));
        assert!(matches!(
            interp.sample(12.001),
            Err(EphemerisError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn test_interpolant_differentiate() {
        let velocity = parabola().differentiate();
        let value = velocity.sample(11.5).expect("should be in domain");
        assert_float_eq!(value[0], 3.0, abs <= 1e-14);
    }

    #[test]
    fn test_interpolant_evaluate_series_prototype() {
        let interp = parabola();
        let t = Series::variable(11.5_f64, 3);
        let value = &interp.evaluate(&t).expect("should be in domain")[0];
        // value and first two derivatives of t^2 at t = 1.5
        assert_float_eq!(*value.coeff(0), 2.25, abs <= 1e-14);
        assert_float_eq!(*value.coeff(1), 3.0, abs <= 1e-14);
        assert_float_eq!(*value.coeff(2), 1.0, abs <= 1e-14);
    }

    #[test]
    fn test_interpolant_validation() {
        let piece = vec![Series::from_coeffs(vec![0.0, 1.0])];
        assert!(matches!(
            Interpolant::<f64>::try_new(0.0, vec![0.0], vec![]),
            Err(EphemerisError::EmptyInterpolant)
        ));
        assert!(matches!(
            Interpolant::try_new(0.0, vec![0.0, 0.0], vec![piece.clone()]),
            Err(EphemerisError::NonMonotonicKnots)
        ));
        assert!(matches!(
            Interpolant::try_new(0.0, vec![0.0, 1.0, 2.0], vec![piece.clone()]),
            Err(EphemerisError::MismatchedPieces { .. })
        ));
        assert!(matches!(
            Interpolant::try_new(0.0, vec![0.0, 1.0, 2.0], vec![piece.clone(), vec![]]),
            Err(EphemerisError::MismatchedCoordinates)
        ));
    }
}

// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The single-step Taylor kernel: order-by-order jet coefficient generation
//! and truncation-error step-size selection.

use aten_series::{Scalar, Series};

use crate::field::{FieldError, VectorField};

/// Coefficient magnitudes below this floor are ignored by the step-size
/// rule; a vanishing top coefficient would otherwise suggest an infinite
/// step.
pub(crate) const MAGNITUDE_FLOOR: f64 = 1e-280;

/// Step sizes below this sentinel indicate a diverging truncation-error
/// estimate.
pub(crate) const MIN_STEP: f64 = 1e-12;

/// The independent variable as a jet: `t0 + s`.
pub(crate) fn time_jet<R: Scalar>(t: f64, proto: &R, order: usize) -> Series<R> {
    Series::variable(proto.lift(t), order)
}

/// Seeds constant jets from the current state.
pub(crate) fn seed_jets<R: Scalar>(state: &[R], order: usize) -> Vec<Series<R>> {
    state
        .iter()
        .map(|x| Series::constant(x.clone(), order))
        .collect()
}

/// Fills in the Taylor coefficients of the state jets by repeated evaluation
/// of the right-hand side.
///
/// After pass `k` the `(k+1)`-th coefficients are exact, because every series
/// operation computes its `k`-th output coefficient from input coefficients
/// of index `<= k` only.
pub(crate) fn jet_coeffs<F: VectorField, R: Scalar>(
    field: &F,
    t: f64,
    jets: &mut [Series<R>],
) -> Result<(), FieldError> {
    let order = jets[0].order();
    let proto = jets[0].coeff(0).clone();
    let time = time_jet(t, &proto, order);
    let mut dx = seed_jets(
        &vec![proto.lift(0.0); jets.len()],
        order,
    );
    for k in 0..order {
        field.evaluate(&time, jets, &mut dx)?;
        for (jet, derivative) in jets.iter_mut().zip(&dx) {
            let coeff = derivative.coeff(k);
            jet.set_coeff(k + 1, coeff.clone() / coeff.lift((k + 1) as f64));
        }
    }
    Ok(())
}

/// Truncation-error step size: the largest `dt` with
/// `max(||x_N|| dt^N, ||x_{N-1}|| dt^{N-1}) ~ abstol`, over all components,
/// scaled by the safety factor. Always positive; the driver applies the
/// integration direction. Returns infinity when every top coefficient sits
/// below the magnitude floor.
pub(crate) fn step_size<R: Scalar>(jets: &[Series<R>], abstol: f64, safety: f64) -> f64 {
    let order = jets[0].order();
    let mut dt = f64::INFINITY;
    for jet in jets {
        for k in [order - 1, order] {
            let norm = jet.coeff(k).inf_norm();
            if norm < MAGNITUDE_FLOOR {
                continue;
            }
            dt = dt.min((abstol / norm).powf(1.0 / k as f64));
        }
    }
    safety * dt
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    /// dx/dt = x.
    struct Exponential;

    impl VectorField for Exponential {
        fn dim(&self) -> usize {
            1
        }

        fn evaluate<S: Scalar>(&self, _t: &S, x: &[S], dx: &mut [S]) -> Result<(), FieldError> {
            dx[0] = x[0].clone();
            Ok(())
        }
    }

    /// dx/dt = t.
    struct Ramp;

    impl VectorField for Ramp {
        fn dim(&self) -> usize {
            1
        }

        fn evaluate<S: Scalar>(&self, t: &S, _x: &[S], dx: &mut [S]) -> Result<(), FieldError> {
            dx[0] = t.clone();
            Ok(())
        }
    }

    #[test]
    fn test_jet_coeffs_exponential() {
        let mut jets = seed_jets(&[1.0], 8);
        jet_coeffs(&Exponential, 0.0, &mut jets).expect("should succeed");
        let mut factorial = 1.0;
        for (k, c) in jets[0].coeffs().iter().enumerate() {
            if k > 0 {
                factorial *= k as f64;
            }
            assert_float_eq!(*c, 1.0 / factorial, rel <= 1e-15);
        }
    }

    #[test]
    fn test_jet_coeffs_time_dependent() {
        // x' = t from x(2) = 5 gives x(2 + s) = 5 + 2s + s^2/2
        let mut jets = seed_jets(&[5.0], 4);
        jet_coeffs(&Ramp, 2.0, &mut jets).expect("should succeed");
        assert_eq!(jets[0].coeffs()[..3], [5.0, 2.0, 0.5]);
    }

    #[test]
    fn test_jet_evaluation_at_zero_returns_state() {
        let mut jets = seed_jets(&[0.75], 10);
        jet_coeffs(&Exponential, 0.0, &mut jets).expect("should succeed");
        assert_eq!(jets[0].evaluate(0.0), 0.75);
    }

    #[test]
    fn test_step_size_scaling() {
        // top coefficients 1 with abstol eps give dt = min_k eps^(1/k)
        let jets = vec![Series::from_coeffs(vec![1.0; 11])];
        let dt = step_size(&jets, 1e-20, 1.0);
        let expected = (1e-20_f64).powf(1.0 / 9.0).min((1e-20_f64).powf(1.0 / 10.0));
        assert_float_eq!(dt, expected, rel <= 1e-12);
    }

    #[test]
    fn test_step_size_ignores_vanishing_components() {
        let constant = Series::constant(1.0, 10);
        let jets = vec![constant];
        assert!(step_size(&jets, 1e-20, 0.5).is_infinite());
    }
}

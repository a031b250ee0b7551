// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Finite-time Lyapunov spectra from the variational equations.
//!
//! The state is extended with the fundamental matrix J (dof x dof,
//! row-major). J evolves by dJ/dt = (df/dx) J; the sensitivity block either
//! comes from a user-supplied Jacobian function or from automatic
//! differentiation through degree-one multivariate jets, which propagates
//! the per-step flow map exactly. After every accepted step the columns of J
//! are re-orthonormalised by modified Gram-Schmidt and the logarithms of the
//! R diagonal accumulate into the running exponents.

use aten_math::orthonormal::modified_gram_schmidt;
use aten_series::{MultiSeries, Scalar, Series, VarTable};

use crate::driver::{Outcome, PropagationError};
use crate::field::VectorField;
use crate::step::{jet_coeffs, seed_jets, step_size, time_jet, MIN_STEP};

/// User-supplied Jacobian of the vector field along the current expansion,
/// as series in the step variable (row-major dof x dof).
pub trait JacobianFn {
    fn evaluate(&self, t: &Series<f64>, x: &[Series<f64>], jacobian: &mut [Series<f64>]);
}

#[derive(Clone, Debug)]
pub struct LyapunovSpectrum {
    /// Finite-time exponents, in inverse integration-time units.
    pub exponents: Vec<f64>,
    /// Integrated span `t - t0`.
    pub elapsed: f64,
    pub steps: usize,
    pub outcome: Outcome,
    pub final_state: Vec<f64>,
}

#[derive(Clone, Debug)]
pub struct LyapunovPropagator<F> {
    field: F,
    order: usize,
    abstol: f64,
    max_steps: usize,
    safety: f64,
}

impl<F: VectorField> LyapunovPropagator<F> {
    pub fn new(field: F, order: usize, abstol: f64) -> Self {
        assert!(order >= 2, "the step-size rule needs at least order 2");
        Self {
            field,
            order,
            abstol,
            max_steps: 10_000,
            safety: 0.8,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_safety_factor(mut self, safety: f64) -> Self {
        self.safety = safety;
        self
    }

    /// Spectrum with the sensitivity block obtained by automatic
    /// differentiation: the state is integrated in degree-one multivariate
    /// jets and the per-step flow map is read off the linear coefficients.
    pub fn propagate(
        &self,
        t0: f64,
        t_end: f64,
        x0: &[f64],
    ) -> Result<LyapunovSpectrum, PropagationError> {
        let dof = self.field.dim();
        let table = VarTable::new(&vec![1.0; dof], 1);
        self.run(t0, t_end, x0, |t, state, step| {
            let seeds: Vec<MultiSeries> = state
                .iter()
                .enumerate()
                .map(|(i, &value)| {
                    MultiSeries::constant(table.clone(), value)
                        + MultiSeries::variable(table.clone(), i)
                })
                .collect();
            let mut jets = seed_jets(&seeds, self.order);
            jet_coeffs(&self.field, t, &mut jets)?;
            if let Some(component) = jets.iter().position(|jet| !jet.is_finite()) {
                return Err(PropagationError::Divergent { t, step, component });
            }
            let dt = step_size(&jets, self.abstol, self.safety);
            Ok(StepResult {
                dt,
                evaluate: Box::new(move |dt| {
                    let values: Vec<MultiSeries> =
                        jets.iter().map(|jet| jet.evaluate(dt)).collect();
                    let state = values.iter().map(MultiSeries::constant_term).collect();
                    let mut flow = vec![0.0; dof * dof];
                    for (i, value) in values.iter().enumerate() {
                        for j in 0..dof {
                            flow[i * dof + j] = value.coeff(1 + j);
                        }
                    }
                    (state, flow)
                }),
            })
        })
    }

    /// Spectrum with a user-supplied Jacobian: the variational block is
    /// integrated order by order alongside the state jets.
    pub fn propagate_with_jacobian<J: JacobianFn>(
        &self,
        t0: f64,
        t_end: f64,
        x0: &[f64],
        jacobian: &J,
    ) -> Result<LyapunovSpectrum, PropagationError> {
        let dof = self.field.dim();
        self.run(t0, t_end, x0, |t, state, step| {
            let mut xjets = seed_jets(state, self.order);
            jet_coeffs(&self.field, t, &mut xjets)?;
            if let Some(component) = xjets.iter().position(|jet| !jet.is_finite()) {
                return Err(PropagationError::Divergent { t, step, component });
            }
            let time = time_jet(t, &state[0], self.order);
            let mut a = vec![Series::constant(0.0, self.order); dof * dof];
            jacobian.evaluate(&time, &xjets, &mut a);
            // fundamental-matrix jets from identity: dPhi/ds = A(s) Phi(s)
            let mut phi_jets: Vec<Series<f64>> = (0..dof * dof)
                .map(|idx| {
                    let seed = if idx % dof == idx / dof { 1.0 } else { 0.0 };
                    Series::constant(seed, self.order)
                })
                .collect();
            for k in 0..self.order {
                for i in 0..dof {
                    for j in 0..dof {
                        let mut coeff = 0.0;
                        for l in 0..dof {
                            coeff += aten_series::kernels::mul_coeff(
                                a[i * dof + l].coeffs(),
                                phi_jets[l * dof + j].coeffs(),
                                k,
                            );
                        }
                        phi_jets[i * dof + j].set_coeff(k + 1, coeff / (k + 1) as f64);
                    }
                }
            }
            let dt = step_size(&xjets, self.abstol, self.safety);
            Ok(StepResult {
                dt,
                evaluate: Box::new(move |dt| {
                    let state = xjets.iter().map(|jet| jet.evaluate(dt)).collect();
                    let flow = phi_jets.iter().map(|jet| jet.evaluate(dt)).collect();
                    (state, flow)
                }),
            })
        })
    }

    fn run<
        Step: FnMut(f64, &[f64], usize) -> Result<StepResult, PropagationError>,
    >(
        &self,
        t0: f64,
        t_end: f64,
        x0: &[f64],
        mut take_step: Step,
    ) -> Result<LyapunovSpectrum, PropagationError> {
        let dof = self.field.dim();
        assert_eq!(x0.len(), dof, "state dimension mismatch");
        let direction = (t_end - t0).signum();
        let mut t = t0;
        let mut state = x0.to_vec();
        let mut basis = vec![0.0; dof * dof];
        for i in 0..dof {
            basis[i * dof + i] = 1.0;
        }
        let mut sums = vec![0.0; dof];
        let mut step = 0;
        let mut outcome = Outcome::Complete;
        while direction * (t_end - t) > 0.0 {
            if step >= self.max_steps {
                log::warn!(
                    "step cap of {} reached at t = {t} in Lyapunov run",
                    self.max_steps
                );
                outcome = Outcome::StepCapReached;
                break;
            }
            let result = take_step(t, &state, step)?;
            let mut dt = direction * result.dt;
            if result.dt < MIN_STEP {
                return Err(PropagationError::StepSizeUnderflow {
                    t,
                    step,
                    dt: result.dt,
                });
            }
            if direction * (t + dt - t_end) > 0.0 {
                dt = t_end - t;
            }
            let (new_state, flow) = (result.evaluate)(dt);
            // advance the tangent basis through the step and re-orthonormalise
            basis = matmul(&flow, &basis, dof);
            let diagonal = modified_gram_schmidt(&mut basis, dof)?;
            for (sum, r) in sums.iter_mut().zip(&diagonal) {
                *sum += r.ln();
            }
            state = new_state;
            t += dt;
            step += 1;
        }
        let elapsed = t - t0;
        let exponents = if elapsed == 0.0 {
            vec![0.0; dof]
        } else {
            sums.iter().map(|sum| sum / elapsed).collect()
        };
        Ok(LyapunovSpectrum {
            exponents,
            elapsed,
            steps: step,
            outcome,
            final_state: state,
        })
    }
}

struct StepResult {
    /// Unsigned truncation-error step size.
    dt: f64,
    /// Evaluates state and flow map at the signed step.
    evaluate: Box<dyn FnOnce(f64) -> (Vec<f64>, Vec<f64>)>,
}

fn matmul(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            let mut acc = 0.0;
            for (l, bl) in b.iter().skip(j).step_by(n).enumerate() {
                acc += a[i * n + l] * bl;
            }
            out[i * n + j] = acc;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use crate::field::FieldError;

    use super::*;

    /// dx/dt = -x: single exponent -1.
    struct Decay;

    impl VectorField for Decay {
        fn dim(&self) -> usize {
            1
        }

        fn evaluate<S: Scalar>(&self, _t: &S, x: &[S], dx: &mut [S]) -> Result<(), FieldError> {
            dx[0] = -x[0].clone();
            Ok(())
        }
    }

    struct DecayJacobian;

    impl JacobianFn for DecayJacobian {
        fn evaluate(&self, t: &Series<f64>, _x: &[Series<f64>], jacobian: &mut [Series<f64>]) {
            jacobian[0] = t.lift(-1.0);
        }
    }

    struct Oscillator;

    impl VectorField for Oscillator {
        fn dim(&self) -> usize {
            2
        }

        fn evaluate<S: Scalar>(&self, _t: &S, x: &[S], dx: &mut [S]) -> Result<(), FieldError> {
            dx[0] = x[1].clone();
            dx[1] = -x[0].clone();
            Ok(())
        }
    }

    struct OscillatorJacobian;

    impl JacobianFn for OscillatorJacobian {
        fn evaluate(&self, t: &Series<f64>, _x: &[Series<f64>], jacobian: &mut [Series<f64>]) {
            jacobian[0] = t.lift(0.0);
            jacobian[1] = t.lift(1.0);
            jacobian[2] = t.lift(-1.0);
            jacobian[3] = t.lift(0.0);
        }
    }

    #[test]
    fn test_lyapunov_decay_autodiff() {
        let spectrum = LyapunovPropagator::new(Decay, 18, 1e-16)
            .propagate(0.0, 5.0, &[1.0])
            .expect("should succeed");
        assert_eq!(spectrum.outcome, Outcome::Complete);
        assert_float_eq!(spectrum.exponents[0], -1.0, abs <= 1e-9);
    }

    #[test]
    fn test_lyapunov_decay_jacobian() {
        let spectrum = LyapunovPropagator::new(Decay, 18, 1e-16)
            .propagate_with_jacobian(0.0, 5.0, &[1.0], &DecayJacobian)
            .expect("should succeed");
        assert_float_eq!(spectrum.exponents[0], -1.0, abs <= 1e-9);
    }

    #[test]
    fn test_lyapunov_oscillator_is_neutral() {
        let spectrum = LyapunovPropagator::new(Oscillator, 18, 1e-16)
            .propagate(0.0, 20.0, &[1.0, 0.0])
            .expect("should succeed");
        for exponent in &spectrum.exponents {
            assert_float_eq!(*exponent, 0.0, abs <= 1e-8);
        }
    }

    #[test]
    fn test_lyapunov_jacobian_matches_autodiff() {
        let ad = LyapunovPropagator::new(Oscillator, 18, 1e-16)
            .propagate(0.0, 10.0, &[0.5, 0.5])
            .expect("should succeed");
        let supplied = LyapunovPropagator::new(Oscillator, 18, 1e-16)
            .propagate_with_jacobian(0.0, 10.0, &[0.5, 0.5], &OscillatorJacobian)
            .expect("should succeed");
        for (a, b) in ad.exponents.iter().zip(&supplied.exponents) {
            assert_float_eq!(a, b, abs <= 1e-9);
        }
    }
}

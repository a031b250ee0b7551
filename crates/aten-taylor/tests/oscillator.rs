// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! End-to-end driver tests on the harmonic oscillator, whose exact solution
//! makes every property checkable in closed form.

use float_eq::assert_float_eq;

use aten_series::{MultiSeries, Scalar, VarTable};
use aten_taylor::{
    CancelToken, EventDetector, EventFunction, FieldError, Outcome, Propagator, StepMode, StepSink,
    VectorField,
};

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

#[test]
fn test_propagate_matches_analytic_solution() {
    let propagator = Propagator::new(Oscillator, 20, 1e-18);
    let result = propagator
        .propagate(0.0, 10.0, &[1.0, 0.0])
        .expect("should succeed");
    assert_eq!(result.outcome, Outcome::Complete);
    assert_eq!(result.final_time(), 10.0);
    let state = result.final_state();
    assert_float_eq!(state[0], 10.0_f64.cos(), abs <= 1e-12);
    assert_float_eq!(state[1], -(10.0_f64.sin()), abs <= 1e-12);
}

#[test]
fn test_generic_and_recorded_modes_agree() {
    let generic = Propagator::new(Oscillator, 20, 1e-18)
        .with_mode(StepMode::Generic)
        .propagate(0.0, 7.5, &[0.3, -0.4])
        .expect("should succeed");
    let recorded = Propagator::new(Oscillator, 20, 1e-18)
        .with_mode(StepMode::Recorded)
        .propagate(0.0, 7.5, &[0.3, -0.4])
        .expect("should succeed");
    assert_eq!(generic.n_steps(), recorded.n_steps());
    for (a, b) in generic.final_state().iter().zip(recorded.final_state()) {
        assert_float_eq!(a, b, abs <= 1e-13);
    }
}

#[test]
fn test_backward_forward_roundtrip() {
    let propagator = Propagator::new(Oscillator, 20, 1e-18);
    let x0 = [0.8, 0.25];
    let there = propagator
        .propagate(0.0, -15.0, &x0)
        .expect("should succeed");
    let back = propagator
        .propagate(-15.0, 0.0, there.final_state())
        .expect("should succeed");
    for (a, b) in back.final_state().iter().zip(&x0) {
        assert_float_eq!(a, b, abs <= 1e-11);
    }
}

#[test]
fn test_dense_output_interpolant() {
    let propagator = Propagator::new(Oscillator, 20, 1e-18);
    let dense = propagator
        .propagate_dense(0.0, 10.0, &[1.0, 0.0])
        .expect("should succeed");
    let interpolant = dense.to_interpolant().expect("should convert");
    for i in 0..=100 {
        let t = 0.1 * i as f64;
        let value = interpolant.sample(t).expect("should be in domain");
        assert_float_eq!(value[0], t.cos(), abs <= 1e-11);
        assert_float_eq!(value[1], -t.sin(), abs <= 1e-11);
    }
}

#[test]
fn test_dense_output_interpolant_backward() {
    let propagator = Propagator::new(Oscillator, 20, 1e-18);
    let dense = propagator
        .propagate_dense(0.0, -8.0, &[1.0, 0.0])
        .expect("should succeed");
    let interpolant = dense.to_interpolant().expect("should convert");
    for i in 0..=80 {
        let t = -0.1 * i as f64;
        let value = interpolant.sample(t).expect("should be in domain");
        assert_float_eq!(value[0], t.cos(), abs <= 1e-11);
    }
}

#[test]
fn test_step_cap_returns_partial_trajectory() {
    let result = Propagator::new(Oscillator, 20, 1e-18)
        .with_max_steps(3)
        .propagate(0.0, 1e6, &[1.0, 0.0])
        .expect("should succeed");
    assert_eq!(result.outcome, Outcome::StepCapReached);
    assert_eq!(result.n_steps(), 3);
    assert!(result.final_time() < 1e6);
}

struct CancelAfter {
    token: CancelToken,
    steps_left: usize,
}

impl<R> StepSink<R> for CancelAfter {
    fn accept(&mut self, _t: f64, _dt: f64, _jet: &[aten_series::Series<R>]) {
        self.steps_left -= 1;
        if self.steps_left == 0 {
            self.token.cancel();
        }
    }
}

#[test]
fn test_cancellation_between_steps() {
    let token = CancelToken::new();
    let propagator = Propagator::new(Oscillator, 20, 1e-18).with_cancel_token(token.clone());
    let mut sink = CancelAfter {
        token,
        steps_left: 100,
    };
    let cancelled = propagator
        .propagate_into(0.0, 1e6, &[1.0, 0.0], &mut sink)
        .expect("should succeed");
    assert_eq!(cancelled.outcome, Outcome::Cancelled);
    assert_eq!(cancelled.n_steps(), 100);

    // the cancelled trajectory matches a standalone capped run step for step
    let capped = Propagator::new(Oscillator, 20, 1e-18)
        .with_max_steps(100)
        .propagate(0.0, 1e6, &[1.0, 0.0])
        .expect("should succeed");
    assert_eq!(cancelled.times, capped.times);
    assert_eq!(cancelled.states.last(), capped.states.last());
}

struct RadialVelocity;

impl EventFunction for RadialVelocity {
    fn active(&self, _t: f64, _x: &[f64]) -> bool {
        true
    }

    /// g = x * v, zero at every turning point and zero crossing of the
    /// oscillator.
    fn value<S: Scalar>(&self, _t: &S, x: &[S]) -> S {
        x[0].clone() * x[1].clone()
    }
}

#[test]
fn test_event_detection_along_trajectory() {
    let propagator = Propagator::new(Oscillator, 25, 1e-18);
    let result = propagator
        .propagate_with_events(
            0.0,
            3.0,
            &[1.0, 0.0],
            &EventDetector::default(),
            &RadialVelocity,
        )
        .expect("should succeed");
    // x v = -cos sin vanishes at pi/2 within (0, 3); each crossing must be
    // refined below the Newton tolerance
    assert!(!result.events.is_empty());
    for event in &result.events {
        assert!(event.value.abs() < 1e-13);
        let expected = std::f64::consts::FRAC_PI_2;
        assert!((event.t - expected).abs() < 1e-9, "event at {}", event.t);
    }
}

#[test]
fn test_jet_transport_nominal_matches_plain_run() {
    let reference = Propagator::new(Oscillator, 20, 1e-18)
        .propagate(0.0, 5.0, &[1.0, 0.0])
        .expect("should succeed");

    let table = VarTable::new(&[1e-3, 1e-3], 3);
    let seeds = [
        MultiSeries::constant(table.clone(), 1.0) + MultiSeries::variable(table.clone(), 0),
        MultiSeries::constant(table.clone(), 0.0) + MultiSeries::variable(table.clone(), 1),
    ];
    let jet_run = Propagator::new(Oscillator, 20, 1e-18)
        .propagate_with_steps(0.0, &seeds, &reference.step_sizes)
        .expect("should succeed");

    // at delta = 0 the jet reproduces the plain double run bit for bit
    for (jet_state, plain) in jet_run.final_state().iter().zip(reference.final_state()) {
        assert_eq!(jet_state.constant_term(), *plain);
    }
}

#[test]
fn test_jet_transport_linearity() {
    let table = VarTable::new(&[1e-3, 1e-3], 5);
    let seeds = [
        MultiSeries::constant(table.clone(), 1.0) + MultiSeries::variable(table.clone(), 0),
        MultiSeries::constant(table.clone(), 0.0) + MultiSeries::variable(table.clone(), 1),
    ];
    let reference = Propagator::new(Oscillator, 20, 1e-18)
        .propagate(0.0, 5.0, &[1.0, 0.0])
        .expect("should succeed");
    let jet_run = Propagator::new(Oscillator, 20, 1e-18)
        .propagate_with_steps(0.0, &seeds, &reference.step_sizes)
        .expect("should succeed");

    // evaluate the jet at a physical perturbation of 1e-4 on x and compare
    // with an independently integrated perturbed initial condition
    let delta = [1e-4 / 1e-3, 0.0];
    let perturbed = Propagator::new(Oscillator, 20, 1e-18)
        .propagate_with_steps(0.0, &[1.0 + 1e-4, 0.0], &reference.step_sizes)
        .expect("should succeed");
    for (jet_state, direct) in jet_run.final_state().iter().zip(perturbed.final_state()) {
        assert_float_eq!(jet_state.evaluate(&delta), *direct, abs <= 1e-12);
    }
}

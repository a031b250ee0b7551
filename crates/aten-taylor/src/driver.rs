// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The adaptive integration driver: main loop, dense output, termination,
//! event dispatch and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::warn;

use aten_ephem::{EphemerisError, Interpolant};
use aten_series::{Scalar, Series};
use thiserror::Error;

use crate::events::{detect, EventDetector, EventFunction, EventRecord};
use crate::field::{FieldError, VectorField};
use crate::step::{jet_coeffs, seed_jets, step_size, MIN_STEP};
use crate::tape::Tape;

#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("step size underflow at t = {t} (step {step}: dt = {dt})")]
    StepSizeUnderflow { t: f64, step: usize, dt: f64 },
    #[error("state component {component} became non-finite at t = {t} (step {step})")]
    Divergent { t: f64, step: usize, component: usize },
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),
    #[error("variational basis degenerated: {0}")]
    DegenerateBasis(#[from] aten_math::orthonormal::DegenerateColumn),
}

/// How an integration ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The target time was reached; the final step is clipped so the last
    /// recorded time is exactly `t_end`.
    Complete,
    /// The step cap was reached before the target time.
    StepCapReached,
    /// Cancellation was observed between steps.
    Cancelled,
}

/// Cooperative cancellation token, checked by the driver between steps.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A streaming consumer of accepted steps, for callers that want the dense
/// polynomials without buffering them in memory.
pub trait StepSink<R> {
    fn accept(&mut self, t: f64, dt: f64, jet: &[Series<R>]);
}

/// Discards the dense output.
pub struct NullSink;

impl<R> StepSink<R> for NullSink {
    fn accept(&mut self, _t: f64, _dt: f64, _jet: &[Series<R>]) {}
}

/// Which step kernel to run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StepMode {
    /// Re-evaluate the right-hand side once per order.
    Generic,
    /// Record the right-hand side once per step and replay it per order.
    #[default]
    Recorded,
}

/// The integration result: accepted times, step sizes and states, the step
/// polynomials when dense output was requested, refined events, and the way
/// the run ended.
#[derive(Clone, Debug)]
pub struct Propagation<R> {
    pub times: Vec<f64>,
    pub step_sizes: Vec<f64>,
    pub states: Vec<Vec<R>>,
    pub jets: Option<Vec<Vec<Series<R>>>>,
    pub events: Vec<EventRecord<R>>,
    pub outcome: Outcome,
}

impl<R: Scalar> Propagation<R> {
    pub fn n_steps(&self) -> usize {
        self.step_sizes.len()
    }

    pub fn initial_time(&self) -> f64 {
        self.times[0]
    }

    pub fn final_time(&self) -> f64 {
        *self.times.last().expect("at least the epoch is recorded")
    }

    pub fn final_state(&self) -> &[R] {
        self.states.last().expect("at least the epoch is recorded")
    }

    /// Converts the dense output into an ephemeris interpolant. For backward
    /// runs the pieces are shifted onto an increasing knot vector.
    pub fn to_interpolant(&self) -> Result<Interpolant<R>, EphemerisError> {
        let jets = self.jets.as_ref().ok_or(EphemerisError::EmptyInterpolant)?;
        let backward = self.final_time() < self.initial_time();
        if !backward {
            return Interpolant::try_new(0.0, self.times.clone(), jets.clone());
        }
        let mut knots: Vec<f64> = self.times.clone();
        knots.reverse();
        let mut pieces: Vec<Vec<Series<R>>> = jets
            .iter()
            .zip(&self.step_sizes)
            .map(|(jet, &dt)| jet.iter().map(|series| series.translate(dt)).collect())
            .collect();
        pieces.reverse();
        Interpolant::try_new(0.0, knots, pieces)
    }
}

/// The adaptive Taylor-method propagator.
///
/// Integrates in either time direction, selecting each step from the
/// truncation error of the jet's top coefficients, and records a dense or
/// compact trajectory. One propagator is single-threaded per trajectory;
/// parallelism belongs to the right-hand side.
#[derive(Clone, Debug)]
pub struct Propagator<F> {
    field: F,
    order: usize,
    abstol: f64,
    max_steps: usize,
    safety: f64,
    mode: StepMode,
    cancel: Option<CancelToken>,
}

impl<F: VectorField> Propagator<F> {
    pub fn new(field: F, order: usize, abstol: f64) -> Self {
        assert!(order >= 2, "the step-size rule needs at least order 2");
        assert!(abstol > 0.0, "the truncation tolerance must be positive");
        Self {
            field,
            order,
            abstol,
            max_steps: 10_000,
            safety: 0.8,
            mode: StepMode::default(),
            cancel: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_safety_factor(mut self, safety: f64) -> Self {
        assert!((0.0..1.0).contains(&safety), "safety factor must be in (0, 1)");
        self.safety = safety;
        self
    }

    pub fn with_mode(mut self, mode: StepMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    /// Compact propagation: records evaluated states only.
    pub fn propagate<R: Scalar>(
        &self,
        t0: f64,
        t_end: f64,
        x0: &[R],
    ) -> Result<Propagation<R>, PropagationError> {
        self.run::<R, NullSink, NoEvent>(t0, x0, Target::Time(t_end), false, None, &mut NullSink)
    }

    /// Dense propagation: additionally records the jet polynomial of every
    /// accepted step.
    pub fn propagate_dense<R: Scalar>(
        &self,
        t0: f64,
        t_end: f64,
        x0: &[R],
    ) -> Result<Propagation<R>, PropagationError> {
        self.run::<R, NullSink, NoEvent>(t0, x0, Target::Time(t_end), true, None, &mut NullSink)
    }

    /// Dense propagation with event detection between steps.
    pub fn propagate_with_events<R: Scalar, E: EventFunction>(
        &self,
        t0: f64,
        t_end: f64,
        x0: &[R],
        detector: &EventDetector,
        event: &E,
    ) -> Result<Propagation<R>, PropagationError> {
        self.run(
            t0,
            x0,
            Target::Time(t_end),
            true,
            Some((detector, event)),
            &mut NullSink,
        )
    }

    /// Dense propagation along a prescribed step sequence, e.g. to replay a
    /// reference run in a different coefficient ring.
    pub fn propagate_with_steps<R: Scalar>(
        &self,
        t0: f64,
        x0: &[R],
        steps: &[f64],
    ) -> Result<Propagation<R>, PropagationError> {
        self.run::<R, NullSink, NoEvent>(t0, x0, Target::Steps(steps), true, None, &mut NullSink)
    }

    /// Compact propagation that streams every accepted step polynomial to a
    /// caller-supplied sink instead of buffering the dense output.
    pub fn propagate_into<R: Scalar, K: StepSink<R>>(
        &self,
        t0: f64,
        t_end: f64,
        x0: &[R],
        sink: &mut K,
    ) -> Result<Propagation<R>, PropagationError> {
        self.run::<R, K, NoEvent>(t0, x0, Target::Time(t_end), false, None, sink)
    }

    fn run<R: Scalar, K: StepSink<R>, E: EventFunction>(
        &self,
        t0: f64,
        x0: &[R],
        target: Target<'_>,
        dense: bool,
        events: Option<(&EventDetector, &E)>,
        sink: &mut K,
    ) -> Result<Propagation<R>, PropagationError>
    where
        F: VectorField,
    {
        assert_eq!(x0.len(), self.field.dim(), "state dimension mismatch");
        let direction = match target {
            Target::Time(t_end) => (t_end - t0).signum(),
            Target::Steps(steps) => steps.first().copied().unwrap_or(0.0).signum(),
        };

        let mut propagation = Propagation {
            times: vec![t0],
            step_sizes: Vec::new(),
            states: vec![x0.to_vec()],
            jets: dense.then(Vec::new),
            events: Vec::new(),
            outcome: Outcome::Complete,
        };
        let mut t = t0;
        let mut state = x0.to_vec();
        let mut step = 0;
        loop {
            if let Some(token) = &self.cancel {
                if token.is_cancelled() {
                    propagation.outcome = Outcome::Cancelled;
                    break;
                }
            }
            let done = match target {
                Target::Time(t_end) => direction * (t_end - t) <= 0.0,
                Target::Steps(steps) => step >= steps.len(),
            };
            if done {
                break;
            }
            if step >= self.max_steps {
                warn!(
                    "step cap of {} reached at t = {t}, returning partial trajectory",
                    self.max_steps
                );
                propagation.outcome = Outcome::StepCapReached;
                break;
            }

            let mut jets = seed_jets(&state, self.order);
            match self.mode {
                StepMode::Generic => jet_coeffs(&self.field, t, &mut jets)?,
                StepMode::Recorded => {
                    let nominal: Vec<f64> =
                        state.iter().map(Scalar::nominal).collect();
                    let tape = Tape::record(&self.field, t, &nominal)?;
                    tape.jet_coeffs(t, &mut jets);
                }
            }
            if let Some(component) = jets.iter().position(|jet| !jet.is_finite()) {
                return Err(PropagationError::Divergent { t, step, component });
            }

            let dt = match target {
                Target::Steps(steps) => steps[step],
                Target::Time(t_end) => {
                    let raw = step_size(&jets, self.abstol, self.safety);
                    if raw < MIN_STEP {
                        return Err(PropagationError::StepSizeUnderflow { t, step, dt: raw });
                    }
                    let mut dt = direction * raw;
                    // clip the final step so the trajectory lands on t_end
                    if direction * (t + dt - t_end) > 0.0 {
                        dt = t_end - t;
                    }
                    dt
                }
            };

            state = jets.iter().map(|jet| jet.evaluate(dt)).collect();

            if let Some((detector, event)) = events {
                if let Some(record) = detect(detector, event, t, dt, &jets) {
                    propagation.events.push(record);
                }
            }

            sink.accept(t, dt, &jets);
            if let Some(all) = propagation.jets.as_mut() {
                all.push(jets);
            }
            propagation.step_sizes.push(dt);
            t += dt;
            propagation.times.push(t);
            propagation.states.push(state.clone());
            step += 1;
        }
        Ok(propagation)
    }
}

#[derive(Clone, Copy)]
enum Target<'a> {
    Time(f64),
    Steps(&'a [f64]),
}

/// The event function of the event-free propagation paths; never armed.
struct NoEvent;

impl EventFunction for NoEvent {
    fn active(&self, _t: f64, _x: &[f64]) -> bool {
        false
    }

    fn value<S: Scalar>(&self, t: &S, _x: &[S]) -> S {
        t.lift(0.0)
    }
}

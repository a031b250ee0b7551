// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Zero-crossing detection between accepted integration steps.
//!
//! The event function is written over the abstract ring like the vector
//! field, so the detector can compose it with the step polynomials and
//! refine the crossing on the resulting series instead of re-integrating.

use aten_series::{Scalar, Series};

/// A scalar event function `g(t, x)`.
pub trait EventFunction {
    /// Whether the event is armed at this state; inactive sign changes are
    /// ignored.
    fn active(&self, t: f64, x: &[f64]) -> bool;

    fn value<S: Scalar>(&self, t: &S, x: &[S]) -> S;
}

/// Configuration of the between-steps root finder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EventDetector {
    /// Which derivative of the event function to process; order one finds
    /// extrema of `g` instead of zeros.
    pub event_order: usize,
    /// Newton iteration cap per detected crossing.
    pub newton_iter: usize,
    /// Residual below which the refinement stops.
    pub abs_tol: f64,
}

impl Default for EventDetector {
    fn default() -> Self {
        Self {
            event_order: 0,
            newton_iter: 10,
            abs_tol: 1e-14,
        }
    }
}

impl EventDetector {
    pub fn with_event_order(mut self, event_order: usize) -> Self {
        self.event_order = event_order;
        self
    }

    pub fn with_newton_iter(mut self, newton_iter: usize) -> Self {
        self.newton_iter = newton_iter;
        self
    }

    pub fn with_abs_tol(mut self, abs_tol: f64) -> Self {
        self.abs_tol = abs_tol;
        self
    }
}

/// A refined zero crossing: time, state and event-function residual.
#[derive(Clone, Debug, PartialEq)]
pub struct EventRecord<R> {
    pub t: f64,
    pub state: Vec<R>,
    pub value: f64,
}

/// Checks one accepted step for a crossing and refines it on the composed
/// series `g(x(s), t + s)`.
pub(crate) fn detect<R: Scalar, E: EventFunction>(
    detector: &EventDetector,
    event: &E,
    t: f64,
    dt: f64,
    jets: &[Series<R>],
) -> Option<EventRecord<R>> {
    let nominal: Vec<f64> = jets.iter().map(|jet| jet.coeff(0).nominal()).collect();
    if !event.active(t, &nominal) {
        return None;
    }
    let order = jets[0].order();
    let proto = jets[0].coeff(0);
    let time = Series::variable(proto.lift(t), order);
    let mut composed = event.value(&time, jets);
    for _ in 0..detector.event_order {
        composed = composed.differentiate();
    }
    let g_pre = composed.evaluate(0.0).nominal();
    let g_post = composed.evaluate(dt).nominal();
    if g_pre == 0.0 || g_pre.signum() == g_post.signum() {
        return None;
    }

    let derivative = composed.differentiate();
    let lower = dt.min(0.0);
    let upper = dt.max(0.0);
    // linear interpolation seed, then Newton on the composed series
    let mut s = (dt * g_pre / (g_pre - g_post)).clamp(lower, upper);
    let mut residual = composed.evaluate(s).nominal();
    for _ in 0..detector.newton_iter {
        if residual.abs() < detector.abs_tol {
            break;
        }
        let slope = derivative.evaluate(s).nominal();
        if slope == 0.0 {
            break;
        }
        let next = (s - residual / slope).clamp(lower, upper);
        let shrink = (next - s).abs();
        s = next;
        residual = composed.evaluate(s).nominal();
        if shrink < f64::EPSILON * dt.abs() {
            break;
        }
    }

    Some(EventRecord {
        t: t + s,
        state: jets.iter().map(|jet| jet.evaluate(s)).collect(),
        value: residual,
    })
}

// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Adaptive Taylor-method integration with jet transport.
//!
//! The right-hand side is written once over the abstract
//! [`Scalar`](aten_series::Scalar) ring ([`VectorField`]); the single-step
//! kernel grows the Taylor coefficients of the state order by order, either
//! by re-evaluating the field per order or by replaying a recorded
//! coefficient program, and the driver strings accepted steps into a dense
//! trajectory with event detection, cooperative cancellation and both
//! integration directions. A separate layer integrates the variational
//! equations for finite-time Lyapunov spectra.

mod driver;
mod events;
mod field;
mod lyapunov;
mod step;
pub mod tape;

pub use driver::{
    CancelToken, NullSink, Outcome, Propagation, PropagationError, Propagator, StepMode, StepSink,
};
pub use events::{EventDetector, EventFunction, EventRecord};
pub use field::{FieldError, VectorField};
pub use lyapunov::{JacobianFn, LyapunovPropagator, LyapunovSpectrum};

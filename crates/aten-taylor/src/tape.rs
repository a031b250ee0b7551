// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Recorded coefficient programs.
//!
//! The generic step kernel re-evaluates the whole right-hand side once per
//! Taylor order, which makes every multiplication cost the square of the
//! order again and again. The recorded mode instead runs the right-hand side
//! once per step over a tracing scalar, capturing the straight-line program
//! of ring operations, and then replays that program one coefficient order at
//! a time: each instruction updates exactly one coefficient of its cached
//! series register per order.
//!
//! The trace fixes every data-dependent branch taken during recording, in
//! particular the ephemeris piece enclosing the current time, which is why
//! the program is rebuilt at the start of every step rather than once per
//! integration.

use std::cell::RefCell;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use aten_series::{kernels, Scalar, Series};

use crate::field::{FieldError, VectorField};

thread_local! {
    static ACTIVE: RefCell<Option<TapeBuilder>> = const { RefCell::new(None) };
}

/// Whether a coefficient program is being recorded on this thread.
///
/// Ring-generic code with an optional thread-parallel path must fall back to
/// its serial variant while this returns true, because the tracing scalar
/// logs to thread-local state.
pub fn is_recording() -> bool {
    ACTIVE.with(|builder| builder.borrow().is_some())
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Instr {
    Const(f64),
    Time,
    State(u32),
    Add(u32, u32),
    Sub(u32, u32),
    Mul(u32, u32),
    Div(u32, u32),
    Neg(u32),
    AddConst(u32, f64),
    MulConst(u32, f64),
    Sqrt(u32),
    Exp(u32),
    Ln(u32),
    /// Sine half of a coupled pair; the cosine register is the next one.
    Sin(u32),
    /// Cosine half of a coupled pair; the sine register is the previous one.
    Cos(u32),
    Atan {
        arg: u32,
        aux: u32,
    },
}

#[derive(Default)]
struct TapeBuilder {
    instrs: Vec<Instr>,
}

impl TapeBuilder {
    fn push(&mut self, instr: Instr) -> u32 {
        let node = self.instrs.len() as u32;
        self.instrs.push(instr);
        node
    }
}

fn record_instr(instr: Instr) -> u32 {
    ACTIVE.with(|builder| {
        builder
            .borrow_mut()
            .as_mut()
            .expect("tracing scalar used outside an active recording")
            .push(instr)
    })
}

/// The tracing scalar: carries the nominal `f64` value for branch decisions
/// and logs every ring operation to the active thread-local recording.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Trace {
    value: f64,
    node: u32,
}

impl PartialEq for Trace {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Add for Trace {
    type Output = Trace;

    fn add(self, rhs: Self) -> Trace {
        Trace {
            value: self.value + rhs.value,
            node: record_instr(Instr::Add(self.node, rhs.node)),
        }
    }
}

impl Sub for Trace {
    type Output = Trace;

    fn sub(self, rhs: Self) -> Trace {
        Trace {
            value: self.value - rhs.value,
            node: record_instr(Instr::Sub(self.node, rhs.node)),
        }
    }
}

impl Mul for Trace {
    type Output = Trace;

    fn mul(self, rhs: Self) -> Trace {
        Trace {
            value: self.value * rhs.value,
            node: record_instr(Instr::Mul(self.node, rhs.node)),
        }
    }
}

impl Div for Trace {
    type Output = Trace;

    fn div(self, rhs: Self) -> Trace {
        Trace {
            value: self.value / rhs.value,
            node: record_instr(Instr::Div(self.node, rhs.node)),
        }
    }
}

impl Neg for Trace {
    type Output = Trace;

    fn neg(self) -> Trace {
        Trace {
            value: -self.value,
            node: record_instr(Instr::Neg(self.node)),
        }
    }
}

impl AddAssign for Trace {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Trace {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Scalar for Trace {
    fn lift(&self, value: f64) -> Self {
        Trace {
            value,
            node: record_instr(Instr::Const(value)),
        }
    }

    fn nominal(&self) -> f64 {
        self.value
    }

    fn inf_norm(&self) -> f64 {
        self.value.abs()
    }

    fn is_finite(&self) -> bool {
        self.value.is_finite()
    }

    fn sqrt(&self) -> Self {
        Trace {
            value: self.value.sqrt(),
            node: record_instr(Instr::Sqrt(self.node)),
        }
    }

    fn exp(&self) -> Self {
        Trace {
            value: self.value.exp(),
            node: record_instr(Instr::Exp(self.node)),
        }
    }

    fn ln(&self) -> Self {
        Trace {
            value: self.value.ln(),
            node: record_instr(Instr::Ln(self.node)),
        }
    }

    fn sin_cos(&self) -> (Self, Self) {
        let (sin, cos) = self.value.sin_cos();
        let sin_node = record_instr(Instr::Sin(self.node));
        let cos_node = record_instr(Instr::Cos(self.node));
        debug_assert_eq!(cos_node, sin_node + 1);
        (
            Trace {
                value: sin,
                node: sin_node,
            },
            Trace {
                value: cos,
                node: cos_node,
            },
        )
    }

    fn atan(&self) -> Self {
        let aux = record_instr(Instr::Mul(self.node, self.node));
        let aux = record_instr(Instr::AddConst(aux, 1.0));
        Trace {
            value: self.value.atan(),
            node: record_instr(Instr::Atan {
                arg: self.node,
                aux,
            }),
        }
    }

    fn scale(&self, factor: f64) -> Self {
        Trace {
            value: self.value * factor,
            node: record_instr(Instr::MulConst(self.node, factor)),
        }
    }
}

/// A recorded straight-line coefficient program, valid for a single step.
pub(crate) struct Tape {
    instrs: Vec<Instr>,
    outputs: Vec<u32>,
}

/// Clears the thread-local recording even on early exit.
struct RecordingGuard;

impl Drop for RecordingGuard {
    fn drop(&mut self) {
        ACTIVE.with(|builder| builder.borrow_mut().take());
    }
}

impl Tape {
    /// Records the field at the nominal expansion point of the current step.
    pub fn record<F: VectorField>(
        field: &F,
        t: f64,
        nominal_state: &[f64],
    ) -> Result<Self, FieldError> {
        ACTIVE.with(|builder| {
            let mut slot = builder.borrow_mut();
            assert!(slot.is_none(), "nested tape recordings are not supported");
            *slot = Some(TapeBuilder::default());
        });
        let _guard = RecordingGuard;
        let time = Trace {
            value: t,
            node: record_instr(Instr::Time),
        };
        let state: Vec<Trace> = nominal_state
            .iter()
            .enumerate()
            .map(|(i, &value)| Trace {
                value,
                node: record_instr(Instr::State(i as u32)),
            })
            .collect();
        let mut derivative: Vec<Trace> = (0..state.len()).map(|_| time.lift(0.0)).collect();
        field.evaluate(&time, &state, &mut derivative)?;
        let outputs = derivative.iter().map(|d| d.node).collect();
        let instrs = ACTIVE.with(|builder| {
            builder
                .borrow_mut()
                .take()
                .expect("recording still active")
                .instrs
        });
        Ok(Self { instrs, outputs })
    }

    /// Replays the program order by order, filling in the Taylor coefficients
    /// of the state jets exactly like the generic kernel, at one coefficient
    /// update per instruction and order.
    pub fn jet_coeffs<R: Scalar>(&self, t: f64, jets: &mut [Series<R>]) {
        let order = jets[0].order();
        let proto = jets[0].coeff(0).clone();
        let zero = proto.lift(0.0);
        let mut registers: Vec<Series<R>> =
            vec![Series::constant(zero.clone(), order); self.instrs.len()];
        for k in 0..=order {
            for (node, instr) in self.instrs.iter().enumerate() {
                let coeff = match *instr {
                    Instr::Const(c) => {
                        if k == 0 {
                            proto.lift(c)
                        } else {
                            continue;
                        }
                    }
                    Instr::Time => match k {
                        0 => proto.lift(t),
                        1 => proto.lift(1.0),
                        _ => continue,
                    },
                    Instr::State(i) => jets[i as usize].coeff(k).clone(),
                    Instr::Add(a, b) => {
                        registers[a as usize].coeff(k).clone()
                            + registers[b as usize].coeff(k).clone()
                    }
                    Instr::Sub(a, b) => {
                        registers[a as usize].coeff(k).clone()
                            - registers[b as usize].coeff(k).clone()
                    }
                    Instr::Mul(a, b) => kernels::mul_coeff(
                        registers[a as usize].coeffs(),
                        registers[b as usize].coeffs(),
                        k,
                    ),
                    Instr::Div(a, b) => kernels::div_coeff(
                        registers[a as usize].coeffs(),
                        registers[b as usize].coeffs(),
                        &registers[node].coeffs()[..k],
                        k,
                    ),
                    Instr::Neg(a) => -registers[a as usize].coeff(k).clone(),
                    Instr::AddConst(a, c) => {
                        let base = registers[a as usize].coeff(k).clone();
                        if k == 0 {
                            base + proto.lift(c)
                        } else {
                            base
                        }
                    }
                    Instr::MulConst(a, c) => registers[a as usize].coeff(k).scale(c),
                    Instr::Sqrt(a) => kernels::sqrt_coeff(
                        registers[a as usize].coeffs(),
                        &registers[node].coeffs()[..k],
                        k,
                    ),
                    Instr::Exp(a) => kernels::exp_coeff(
                        registers[a as usize].coeffs(),
                        &registers[node].coeffs()[..k],
                        k,
                    ),
                    Instr::Ln(a) => kernels::ln_coeff(
                        registers[a as usize].coeffs(),
                        &registers[node].coeffs()[..k],
                        k,
                    ),
                    Instr::Sin(a) => {
                        kernels::sin_cos_coeff(
                            registers[a as usize].coeffs(),
                            &registers[node].coeffs()[..k],
                            &registers[node + 1].coeffs()[..k],
                            k,
                        )
                        .0
                    }
                    Instr::Cos(a) => {
                        kernels::sin_cos_coeff(
                            registers[a as usize].coeffs(),
                            &registers[node - 1].coeffs()[..k],
                            &registers[node].coeffs()[..k],
                            k,
                        )
                        .1
                    }
                    Instr::Atan { arg, aux } => kernels::atan_coeff(
                        registers[arg as usize].coeffs(),
                        registers[aux as usize].coeffs(),
                        &registers[node].coeffs()[..k],
                        k,
                    ),
                };
                registers[node].set_coeff(k, coeff);
            }
            if k < order {
                for (i, jet) in jets.iter_mut().enumerate() {
                    let coeff = registers[self.outputs[i] as usize].coeff(k);
                    jet.set_coeff(k + 1, coeff.clone() / coeff.lift((k + 1) as f64));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use crate::step::{jet_coeffs, seed_jets};

    use super::*;

    /// x'' = -x written first order, with a few transcendental detours to
    /// cover the instruction set.
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

    struct Transcendental;

    impl VectorField for Transcendental {
        fn dim(&self) -> usize {
            1
        }

        fn evaluate<S: Scalar>(&self, t: &S, x: &[S], dx: &mut [S]) -> Result<(), FieldError> {
            let (sin, cos) = t.sin_cos();
            let softened = (x[0].square() + x[0].lift(1.0)).sqrt();
            dx[0] = (sin * cos + softened.ln().exp().atan()).scale(0.5) / x[0].clone();
            Ok(())
        }
    }

    #[test]
    fn test_tape_matches_generic_kernel_oscillator() {
        let mut generic = seed_jets(&[1.0, 0.0], 12);
        jet_coeffs(&Oscillator, 0.0, &mut generic).expect("should succeed");

        let mut recorded = seed_jets(&[1.0, 0.0], 12);
        let tape = Tape::record(&Oscillator, 0.0, &[1.0, 0.0]).expect("should record");
        tape.jet_coeffs(0.0, &mut recorded);

        for (a, b) in generic.iter().zip(&recorded) {
            for (ca, cb) in a.coeffs().iter().zip(b.coeffs()) {
                assert_float_eq!(ca, cb, abs <= 1e-15);
            }
        }
    }

    #[test]
    fn test_tape_matches_generic_kernel_transcendental() {
        let x0 = [1.25];
        let t0 = 0.4;
        let mut generic = seed_jets(&x0, 10);
        jet_coeffs(&Transcendental, t0, &mut generic).expect("should succeed");

        let mut recorded = seed_jets(&x0, 10);
        let tape = Tape::record(&Transcendental, t0, &x0).expect("should record");
        tape.jet_coeffs(t0, &mut recorded);

        for (ca, cb) in generic[0].coeffs().iter().zip(recorded[0].coeffs()) {
            assert_float_eq!(ca, cb, rel <= 1e-12, abs <= 1e-13);
        }
    }

    #[test]
    fn test_tape_recording_is_scoped() {
        assert!(!is_recording());
        let _ = Tape::record(&Oscillator, 0.0, &[1.0, 0.0]).expect("should record");
        assert!(!is_recording());
    }
}

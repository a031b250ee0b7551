// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Truncated multivariate power series.
//!
//! Polynomials in `K` variables truncated at a fixed total degree `M`, stored
//! densely by ascending total degree. `K` and `M` are small for jet transport
//! (eight variables, degree five for the reference problem), so the dense
//! layout wins over sparse indexing.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::sync::Arc;

use hashbrown::HashMap;

use crate::errors::{SeriesError, MAX_DEGREE, MAX_VARS};
use crate::scalar::Scalar;
use crate::univariate::Series;

/// Shared monomial bookkeeping for a fixed number of variables and total
/// degree bound.
///
/// The table also carries the per-variable scale factors applied by the
/// [`MultiSeries::variable`] constructor. Scaling the seed variables keeps
/// every downstream jet coefficient O(1), which bounds the floating-point
/// error accumulated over long integrations; it is not cosmetic.
#[derive(Clone, Debug, PartialEq)]
pub struct VarTable {
    scales: Vec<f64>,
    max_degree: usize,
    exponents: Vec<Box<[u8]>>,
    degrees: Vec<u8>,
    index: HashMap<Box<[u8]>, u32>,
}

impl VarTable {
    pub fn try_new(scales: &[f64], max_degree: usize) -> Result<Arc<Self>, SeriesError> {
        if scales.is_empty() || scales.len() > MAX_VARS {
            return Err(SeriesError::TooManyVariables(scales.len()));
        }
        if max_degree > MAX_DEGREE {
            return Err(SeriesError::DegreeOverflow(max_degree));
        }
        let nvars = scales.len();
        let mut exponents = Vec::new();
        for degree in 0..=max_degree {
            let mut prefix = Vec::with_capacity(nvars);
            push_exponents(&mut prefix, nvars, degree, &mut exponents);
        }
        let degrees = exponents
            .iter()
            .map(|e| e.iter().sum::<u8>())
            .collect::<Vec<_>>();
        let index = exponents
            .iter()
            .enumerate()
            .map(|(i, e)| (e.clone(), i as u32))
            .collect();
        Ok(Arc::new(Self {
            scales: scales.to_vec(),
            max_degree,
            exponents,
            degrees,
            index,
        }))
    }

    pub fn new(scales: &[f64], max_degree: usize) -> Arc<Self> {
        Self::try_new(scales, max_degree).expect("variable table bounds exceeded")
    }

    pub fn nvars(&self) -> usize {
        self.scales.len()
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    /// Number of monomials with total degree within the bound.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.exponents.len()
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn exponent(&self, idx: usize) -> &[u8] {
        &self.exponents[idx]
    }

    pub fn degree(&self, idx: usize) -> usize {
        self.degrees[idx] as usize
    }

    pub fn index_of(&self, exponents: &[u8]) -> Option<usize> {
        self.index.get(exponents).map(|&i| i as usize)
    }

    pub fn same_shape(&self, other: &Self) -> bool {
        self.scales == other.scales && self.max_degree == other.max_degree
    }
}

fn push_exponents(prefix: &mut Vec<u8>, remaining: usize, degree: usize, out: &mut Vec<Box<[u8]>>) {
    if remaining == 1 {
        prefix.push(degree as u8);
        out.push(prefix.clone().into_boxed_slice());
        prefix.pop();
        return;
    }
    for power in (0..=degree).rev() {
        prefix.push(power as u8);
        push_exponents(prefix, remaining - 1, degree - power, out);
        prefix.pop();
    }
}

/// A polynomial in the variables of a shared [`VarTable`], truncated at its
/// total degree bound.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiSeries {
    table: Arc<VarTable>,
    coeffs: Vec<f64>,
}

impl MultiSeries {
    pub fn constant(table: Arc<VarTable>, value: f64) -> Self {
        let mut coeffs = vec![0.0; table.len()];
        coeffs[0] = value;
        Self { table, coeffs }
    }

    /// The `var`-th scaled variable: `scale[var] * monomial_var`.
    pub fn variable(table: Arc<VarTable>, var: usize) -> Self {
        Self::try_variable(table, var).expect("variable index out of range")
    }

    pub fn try_variable(table: Arc<VarTable>, var: usize) -> Result<Self, SeriesError> {
        if var >= table.nvars() {
            return Err(SeriesError::VariableOutOfRange(var, table.nvars()));
        }
        assert!(table.max_degree() >= 1, "degree bound too small for a variable");
        let mut coeffs = vec![0.0; table.len()];
        // degree-1 monomials sit right after the constant, in variable order
        coeffs[1 + var] = table.scales()[var];
        Ok(Self { table, coeffs })
    }

    pub fn table(&self) -> &Arc<VarTable> {
        &self.table
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn coeff(&self, idx: usize) -> f64 {
        self.coeffs[idx]
    }

    pub fn constant_term(&self) -> f64 {
        self.coeffs[0]
    }

    fn check_shape(&self, rhs: &Self) {
        assert!(
            self.table.same_shape(&rhs.table),
            "multivariate series variable tables mismatch"
        );
    }

    /// Partial derivative with respect to the `var`-th variable.
    pub fn differentiate(&self, var: usize) -> Self {
        self.try_differentiate(var).expect("variable index out of range")
    }

    pub fn try_differentiate(&self, var: usize) -> Result<Self, SeriesError> {
        let table = &self.table;
        if var >= table.nvars() {
            return Err(SeriesError::VariableOutOfRange(var, table.nvars()));
        }
        let mut coeffs = vec![0.0; table.len()];
        let mut exps = Vec::with_capacity(table.nvars());
        for (idx, &c) in self.coeffs.iter().enumerate() {
            if c == 0.0 {
                continue;
            }
            let alpha = table.exponent(idx);
            let power = alpha[var];
            if power == 0 {
                continue;
            }
            exps.clear();
            exps.extend_from_slice(alpha);
            exps[var] -= 1;
            let target = table
                .index_of(&exps)
                .expect("derivative monomial is within the degree bound");
            coeffs[target] += c * power as f64;
        }
        Ok(Self {
            table: table.clone(),
            coeffs,
        })
    }

    /// Evaluation at a point given in scaled-variable coordinates.
    pub fn evaluate(&self, point: &[f64]) -> f64 {
        self.evaluate_in(point)
    }

    /// Evaluation at a point of an arbitrary coefficient ring.
    pub fn evaluate_in<S: Scalar>(&self, point: &[S]) -> S {
        let table = &self.table;
        assert_eq!(point.len(), table.nvars(), "evaluation point arity mismatch");
        let mut acc = point[0].lift(self.coeffs[0]);
        for (idx, &c) in self.coeffs.iter().enumerate().skip(1) {
            if c == 0.0 {
                continue;
            }
            let mut term = point[0].lift(c);
            for (var, &power) in table.exponent(idx).iter().enumerate() {
                if power > 0 {
                    term = term * point[var].powi(power as i32);
                }
            }
            acc += term;
        }
        acc
    }

    /// Substitutes `replacement` for the `var`-th variable.
    pub fn substitute(&self, var: usize, replacement: &Self) -> Self {
        self.check_shape(replacement);
        let table = &self.table;
        assert!(var < table.nvars(), "variable index out of range");
        let mut powers: Vec<MultiSeries> = Vec::with_capacity(table.max_degree() + 1);
        powers.push(Self::constant(table.clone(), 1.0));
        for p in 1..=table.max_degree() {
            powers.push(&powers[p - 1] * replacement);
        }
        let mut out = Self::constant(table.clone(), 0.0);
        let mut exps = Vec::with_capacity(table.nvars());
        for (idx, &c) in self.coeffs.iter().enumerate() {
            if c == 0.0 {
                continue;
            }
            let alpha = table.exponent(idx);
            let power = alpha[var] as usize;
            if power == 0 {
                out.coeffs[idx] += c;
                continue;
            }
            exps.clear();
            exps.extend_from_slice(alpha);
            exps[var] = 0;
            let base = table
                .index_of(&exps)
                .expect("reduced monomial is within the degree bound");
            let mut term = Self::constant(table.clone(), 0.0);
            term.coeffs[base] = c;
            out += term * powers[power].clone();
        }
        out
    }

    /// Composes a univariate expansion around the constant term with the
    /// non-constant part of `self`. The constant slot of the result is the
    /// constant slot of `outer`, untouched by rounding.
    fn apply_univariate(&self, outer: &Series<f64>) -> Self {
        let table = &self.table;
        if table.max_degree() == 0 {
            return Self::constant(table.clone(), *outer.coeff(0));
        }
        let mut fractional = self.clone();
        fractional.coeffs[0] = 0.0;
        let m = table.max_degree();
        let mut acc = Self::constant(table.clone(), *outer.coeff(m));
        for k in (0..m).rev() {
            acc = acc * fractional.clone();
            acc.coeffs[0] += outer.coeff(k);
        }
        acc
    }

    fn around(&self) -> Series<f64> {
        Series::variable(self.coeffs[0], self.table.max_degree().max(1))
    }
}

impl Add for MultiSeries {
    type Output = MultiSeries;

    fn add(self, rhs: Self) -> Self::Output {
        &self + &rhs
    }
}

impl Add<&MultiSeries> for &MultiSeries {
    type Output = MultiSeries;

    fn add(self, rhs: &MultiSeries) -> Self::Output {
        self.check_shape(rhs);
        let coeffs = self
            .coeffs
            .iter()
            .zip(&rhs.coeffs)
            .map(|(a, b)| a + b)
            .collect();
        MultiSeries {
            table: self.table.clone(),
            coeffs,
        }
    }
}

impl Sub for MultiSeries {
    type Output = MultiSeries;

    fn sub(self, rhs: Self) -> Self::Output {
        &self - &rhs
    }
}

impl Sub<&MultiSeries> for &MultiSeries {
    type Output = MultiSeries;

    fn sub(self, rhs: &MultiSeries) -> Self::Output {
        self.check_shape(rhs);
        let coeffs = self
            .coeffs
            .iter()
            .zip(&rhs.coeffs)
            .map(|(a, b)| a - b)
            .collect();
        MultiSeries {
            table: self.table.clone(),
            coeffs,
        }
    }
}

impl Mul for MultiSeries {
    type Output = MultiSeries;

    fn mul(self, rhs: Self) -> Self::Output {
        &self * &rhs
    }
}

impl Mul<&MultiSeries> for &MultiSeries {
    type Output = MultiSeries;

    fn mul(self, rhs: &MultiSeries) -> Self::Output {
        self.check_shape(rhs);
        let table = &self.table;
        let max_degree = table.max_degree();
        let mut coeffs = vec![0.0; table.len()];
        let mut exps = Vec::with_capacity(table.nvars());
        for (ia, &ca) in self.coeffs.iter().enumerate() {
            if ca == 0.0 {
                continue;
            }
            let da = table.degree(ia);
            for (ib, &cb) in rhs.coeffs.iter().enumerate() {
                if cb == 0.0 {
                    continue;
                }
                if da + table.degree(ib) > max_degree {
                    continue;
                }
                exps.clear();
                exps.extend(
                    table
                        .exponent(ia)
                        .iter()
                        .zip(table.exponent(ib))
                        .map(|(x, y)| x + y),
                );
                let target = table
                    .index_of(&exps)
                    .expect("product monomial is within the degree bound");
                coeffs[target] += ca * cb;
            }
        }
        MultiSeries {
            table: table.clone(),
            coeffs,
        }
    }
}

impl Div for MultiSeries {
    type Output = MultiSeries;

    fn div(self, rhs: Self) -> Self::Output {
        &self / &rhs
    }
}

impl Div<&MultiSeries> for &MultiSeries {
    type Output = MultiSeries;

    /// Graded long division. The constant slot is the exact quotient of the
    /// constant slots, which keeps structured runs bit-compatible with plain
    /// `f64` runs.
    fn div(self, rhs: &MultiSeries) -> Self::Output {
        self.check_shape(rhs);
        let table = &self.table;
        let max_degree = table.max_degree();
        let b0 = rhs.coeffs[0];
        let mut quotient = vec![0.0; table.len()];
        let mut remainder = self.coeffs.clone();
        let mut exps = Vec::with_capacity(table.nvars());
        for idx in 0..table.len() {
            let q = remainder[idx] / b0;
            quotient[idx] = q;
            if q == 0.0 {
                continue;
            }
            let dq = table.degree(idx);
            for (jdx, &bj) in rhs.coeffs.iter().enumerate().skip(1) {
                if bj == 0.0 {
                    continue;
                }
                if dq + table.degree(jdx) > max_degree {
                    continue;
                }
                exps.clear();
                exps.extend(
                    table
                        .exponent(idx)
                        .iter()
                        .zip(table.exponent(jdx))
                        .map(|(x, y)| x + y),
                );
                let target = table
                    .index_of(&exps)
                    .expect("product monomial is within the degree bound");
                remainder[target] -= q * bj;
            }
        }
        MultiSeries {
            table: table.clone(),
            coeffs: quotient,
        }
    }
}

impl Neg for MultiSeries {
    type Output = MultiSeries;

    fn neg(mut self) -> Self::Output {
        for c in &mut self.coeffs {
            *c = -*c;
        }
        self
    }
}

impl AddAssign for MultiSeries {
    fn add_assign(&mut self, rhs: Self) {
        self.check_shape(&rhs);
        for (a, b) in self.coeffs.iter_mut().zip(rhs.coeffs) {
            *a += b;
        }
    }
}

impl SubAssign for MultiSeries {
    fn sub_assign(&mut self, rhs: Self) {
        self.check_shape(&rhs);
        for (a, b) in self.coeffs.iter_mut().zip(rhs.coeffs) {
            *a -= b;
        }
    }
}

impl Scalar for MultiSeries {
    fn lift(&self, value: f64) -> Self {
        Self::constant(self.table.clone(), value)
    }

    fn nominal(&self) -> f64 {
        self.coeffs[0]
    }

    fn inf_norm(&self) -> f64 {
        self.coeffs.iter().fold(0.0, |acc, c| acc.max(c.abs()))
    }

    fn is_finite(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_finite())
    }

    fn sqrt(&self) -> Self {
        self.apply_univariate(&Scalar::sqrt(&self.around()))
    }

    fn exp(&self) -> Self {
        self.apply_univariate(&Scalar::exp(&self.around()))
    }

    fn ln(&self) -> Self {
        self.apply_univariate(&Scalar::ln(&self.around()))
    }

    fn sin_cos(&self) -> (Self, Self) {
        let (sin, cos) = Scalar::sin_cos(&self.around());
        (self.apply_univariate(&sin), self.apply_univariate(&cos))
    }

    fn atan(&self) -> Self {
        self.apply_univariate(&Scalar::atan(&self.around()))
    }

    fn scale(&self, factor: f64) -> Self {
        let coeffs = self.coeffs.iter().map(|c| c * factor).collect();
        Self {
            table: self.table.clone(),
            coeffs,
        }
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::VarTable;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct VarTableRepr {
        scales: Vec<f64>,
        max_degree: usize,
    }

    impl Serialize for VarTable {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            VarTableRepr {
                scales: self.scales().to_vec(),
                max_degree: self.max_degree(),
            }
            .serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for VarTable {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let repr = VarTableRepr::deserialize(deserializer)?;
            let table = VarTable::try_new(&repr.scales, repr.max_degree)
                .map_err(|err| D::Error::custom(err.to_string()))?;
            Ok(std::sync::Arc::try_unwrap(table).unwrap_or_else(|arc| (*arc).clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    fn table2() -> Arc<VarTable> {
        VarTable::new(&[1.0, 1.0], 2)
    }

    #[test]
    fn test_var_table_enumeration() {
        let table = table2();
        assert_eq!(table.len(), 6);
        let exps: Vec<&[u8]> = (0..6).map(|i| table.exponent(i)).collect();
        assert_eq!(
            exps,
            vec![
                &[0u8, 0][..],
                &[1, 0],
                &[0, 1],
                &[2, 0],
                &[1, 1],
                &[0, 2]
            ]
        );
        for idx in 0..table.len() {
            assert_eq!(table.index_of(table.exponent(idx)), Some(idx));
        }
    }

    #[test]
    fn test_var_table_bounds() {
        assert_eq!(
            VarTable::try_new(&[1.0; 17], 2).unwrap_err(),
            SeriesError::TooManyVariables(17)
        );
        assert_eq!(
            VarTable::try_new(&[1.0], 9).unwrap_err(),
            SeriesError::DegreeOverflow(9)
        );
    }

    #[test]
    fn test_multiseries_variable_scaling() {
        let table = VarTable::new(&[1e-8, 2.0], 2);
        let x = MultiSeries::variable(table.clone(), 0);
        assert_eq!(x.coeff(1), 1e-8);
        let y = MultiSeries::variable(table, 1);
        assert_eq!(y.coeff(2), 2.0);
    }

    #[test]
    fn test_multiseries_mul_truncation() {
        let table = table2();
        let x = MultiSeries::variable(table.clone(), 0);
        let y = MultiSeries::variable(table.clone(), 1);
        let sum = &x + &y;
        let square = &sum * &sum;
        // (x + y)^2 = x^2 + 2xy + y^2
        assert_eq!(square.coeff(3), 1.0);
        assert_eq!(square.coeff(4), 2.0);
        assert_eq!(square.coeff(5), 1.0);
        // cubing truncates to zero at degree bound 2
        let cube = &square * &sum;
        assert!(cube.coeffs().iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_multiseries_division_constant_exact()  {
        let table = table2();
        let a = MultiSeries::constant(table.clone(), 10.0);
        let b = MultiSeries::constant(table, 3.0);
        let q = &a / &b;
        assert_eq!(q.constant_term(), 10.0 / 3.0);
    }

    #[test]
    fn test_multiseries_div_mul_roundtrip() {
        let table = table2();
        let x = MultiSeries::variable(table.clone(), 0);
        let y = MultiSeries::variable(table.clone(), 1);
        let num = &MultiSeries::constant(table.clone(), 2.0) + &(&x * &y);
        let den = &MultiSeries::constant(table, 1.5) + &x;
        let back = &(&num / &den) * &den;
        for (act, exp) in back.coeffs().iter().zip(num.coeffs()) {
            assert_float_eq!(act, exp, abs <= 1e-14);
        }
    }

    #[test]
    fn test_multiseries_sqrt() {
        let table = table2();
        let x = MultiSeries::variable(table.clone(), 0);
        let f = &MultiSeries::constant(table, 1.0) + &x;
        let root = Scalar::sqrt(&(&f * &f));
        for (act, exp) in root.coeffs().iter().zip(f.coeffs()) {
            assert_float_eq!(act, exp, abs <= 1e-14);
        }
    }

    #[test]
    fn test_multiseries_differentiate() {
        let table = table2();
        let x = MultiSeries::variable(table.clone(), 0);
        let y = MultiSeries::variable(table, 1);
        let f = &(&x * &x) + &(&x * &y);
        let fx = f.differentiate(0);
        // d/dx (x^2 + xy) = 2x + y
        assert_eq!(fx.coeff(1), 2.0);
        assert_eq!(fx.coeff(2), 1.0);
        assert!(fx.coeff(0) == 0.0);
    }

    #[test]
    fn test_multiseries_evaluate() {
        let table = table2();
        let x = MultiSeries::variable(table.clone(), 0);
        let y = MultiSeries::variable(table, 1);
        let f = &(&(&x * &x) + &(&x * &y).scale(3.0)) + &y.lift(7.0);
        assert_float_eq!(f.evaluate(&[2.0, -1.0]), 4.0 - 6.0 + 7.0, rel <= 1e-15);
    }

    #[test]
    fn test_multiseries_substitute() {
        let table = table2();
        let x = MultiSeries::variable(table.clone(), 0);
        let y = MultiSeries::variable(table, 1);
        let f = &x * &x;
        // x := y substitutes into y^2
        let g = f.substitute(0, &y);
        assert_eq!(g.coeff(5), 1.0);
        assert_eq!(g.coeff(3), 0.0);
    }

    #[test]
    fn test_multiseries_exp_ln_roundtrip() {
        let table = VarTable::new(&[1.0, 1.0], 4);
        let x = MultiSeries::variable(table.clone(), 0);
        let f = &MultiSeries::constant(table, 2.0) + &x.scale(0.25);
        let back = Scalar::ln(&Scalar::exp(&f));
        for (act, exp) in back.coeffs().iter().zip(f.coeffs()) {
            assert_float_eq!(act, exp, abs <= 1e-13);
        }
    }

    #[test]
    fn test_multiseries_sin_cos_pythagorean() {
        let table = VarTable::new(&[1.0], 5);
        let x = MultiSeries::variable(table.clone(), 0);
        let f = &MultiSeries::constant(table, 0.3) + &x;
        let (s, c) = Scalar::sin_cos(&f);
        let one = &(&s * &s) + &(&c * &c);
        assert_float_eq!(one.constant_term(), 1.0, rel <= 1e-14);
        for &coeff in &one.coeffs()[1..] {
            assert_float_eq!(coeff, 0.0, abs <= 1e-14);
        }
    }

    #[test]
    #[should_panic(expected = "variable tables mismatch")]
    fn test_multiseries_shape_mismatch() {
        let a = MultiSeries::constant(VarTable::new(&[1.0], 2), 1.0);
        let b = MultiSeries::constant(VarTable::new(&[1.0, 1.0], 2), 1.0);
        let _ = &a + &b;
    }
}

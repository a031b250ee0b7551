// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

use float_eq::float_eq;
use thiserror::Error;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("root finder did not converge after {0} iterations")]
pub struct NotConverged(pub u32);

pub trait FindRootWithDerivative<F: Fn(f64) -> f64, D: Fn(f64) -> f64> {
    type Error;

    fn find_with_derivative(
        &self,
        f: F,
        derivative: D,
        initial_guess: f64,
    ) -> Result<f64, Self::Error>;
}

pub trait FindBracketedRoot<F: Fn(f64) -> f64> {
    type Error: std::fmt::Debug;

    fn find_in_bracket(&self, f: F, bracket: (f64, f64)) -> Result<f64, Self::Error>;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Newton {
    max_iter: u32,
    tolerance: f64,
}

impl Newton {
    pub fn new(max_iter: u32, tolerance: f64) -> Self {
        Self {
            max_iter,
            tolerance,
        }
    }
}

impl Default for Newton {
    fn default() -> Self {
        Self {
            max_iter: 50,
            tolerance: f64::EPSILON.sqrt(),
        }
    }
}

impl<F, D> FindRootWithDerivative<F, D> for Newton
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    type Error = NotConverged;

    fn find_with_derivative(
        &self,
        f: F,
        derivative: D,
        initial_guess: f64,
    ) -> Result<f64, Self::Error> {
        let mut p0 = initial_guess;
        for _ in 0..self.max_iter {
            let p = p0 - f(p0) / derivative(p0);
            if float_eq!(p, p0, abs <= self.tolerance) {
                return Ok(p);
            }
            p0 = p;
        }
        Err(NotConverged(self.max_iter))
    }
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum BracketError {
    #[error(transparent)]
    NotConverged(#[from] NotConverged),
    #[error("root not in bracket")]
    NotInBracket,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Brent {
    max_iter: u32,
    abs_tol: f64,
    rel_tol: f64,
}

impl Brent {
    pub fn new(max_iter: u32, abs_tol: f64) -> Self {
        Self {
            max_iter,
            abs_tol,
            rel_tol: f64::EPSILON.sqrt(),
        }
    }
}

impl Default for Brent {
    fn default() -> Self {
        Self {
            max_iter: 100,
            abs_tol: 1e-12,
            rel_tol: f64::EPSILON.sqrt(),
        }
    }
}

impl<F> FindBracketedRoot<F> for Brent
where
    F: Fn(f64) -> f64,
{
    type Error = BracketError;

    fn find_in_bracket(&self, f: F, bracket: (f64, f64)) -> Result<f64, Self::Error> {
        let mut fblk = 0.0;
        let mut xblk = 0.0;
        let (mut xpre, mut xcur) = bracket;
        let mut spre = 0.0;
        let mut scur = 0.0;

        let mut fpre = f(xpre);
        let mut fcur = f(xcur);

        if fpre * fcur > 0.0 {
            return Err(BracketError::NotInBracket);
        }

        if float_eq!(fpre, 0.0, abs <= self.abs_tol) {
            return Ok(xpre);
        }

        if float_eq!(fcur, 0.0, abs <= self.abs_tol) {
            return Ok(xcur);
        }

        for _ in 0..self.max_iter {
            if fpre * fcur < 0.0 {
                xblk = xpre;
                fblk = fpre;
                spre = xcur - xpre;
                scur = xcur - xpre;
            }

            if fblk.abs() < fcur.abs() {
                xpre = xcur;
                xcur = xblk;
                xblk = xpre;
                fpre = fcur;
                fcur = fblk;
                fblk = fpre;
            }

            let delta = (self.abs_tol + self.rel_tol * xcur.abs()) / 2.0;
            let sbis = (xblk - xcur) / 2.0;

            if float_eq!(fcur, 0.0, abs <= self.abs_tol) || sbis.abs() < delta {
                return Ok(xcur);
            }

            if spre.abs() > delta && fcur.abs() < fpre.abs() {
                let stry = if float_eq!(xpre, xblk, rmax <= self.rel_tol) {
                    // interpolate
                    -fcur * (xcur - xpre) / (fcur - fpre)
                } else {
                    // extrapolate
                    let dpre = (fpre - fcur) / (xpre - xcur);
                    let dblk = (fblk - fcur) / (xblk - xcur);
                    -fcur * (fblk * dblk - fpre * dpre) / (dblk * dpre * (fblk - fpre))
                };

                if 2.0 * stry.abs() < spre.abs().min(3.0 * sbis.abs() - delta) {
                    spre = scur;
                    scur = stry;
                } else {
                    // bisect
                    spre = sbis;
                    scur = sbis;
                }
            } else {
                // bisect
                spre = sbis;
                scur = sbis;
            }

            xpre = xcur;
            fpre = fcur;

            if scur.abs() > delta {
                xcur += scur
            } else {
                xcur += if sbis > 0.0 { delta } else { -delta };
            }

            fcur = f(xcur);
        }

        Err(BracketError::NotConverged(NotConverged(self.max_iter)))
    }
}

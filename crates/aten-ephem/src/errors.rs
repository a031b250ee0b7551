// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("interpolant valid from {start} to {end} days past J2000 but requested {req}")]
    OutOfDomain { req: f64, start: f64, end: f64 },
    #[error("knots must be strictly increasing")]
    NonMonotonicKnots,
    #[error("an interpolant needs at least two knots and one piece")]
    EmptyInterpolant,
    #[error("{pieces} pieces cannot cover the intervals of {knots} knots")]
    MismatchedPieces { knots: usize, pieces: usize },
    #[error("pieces must share a single coordinate count")]
    MismatchedCoordinates,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
}

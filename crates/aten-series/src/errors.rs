// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

/// Maximum number of jet variables supported by [`VarTable`](crate::VarTable).
pub const MAX_VARS: usize = 16;

/// Maximum total degree supported by [`VarTable`](crate::VarTable).
pub const MAX_DEGREE: usize = 8;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("series orders must match but were {0} and {1}")]
    OrderMismatch(usize, usize),
    #[error("division requires an invertible constant term")]
    ZeroDivisor,
    #[error("`{0}` requires a positive constant term but it was {1}")]
    NonPositiveConstantTerm(&'static str, f64),
    #[error("composition requires a zero constant term in the inner series")]
    NonZeroInnerConstant,
    #[error("total degree must be at most {limit} but was {0}", limit = MAX_DEGREE)]
    DegreeOverflow(usize),
    #[error("at most {limit} variables are supported but {0} were requested", limit = MAX_VARS)]
    TooManyVariables(usize),
    #[error("variable index {0} is out of range for {1} variables")]
    VariableOutOfRange(usize, usize),
}

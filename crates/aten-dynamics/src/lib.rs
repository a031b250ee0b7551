// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Force models for small-body propagation.

mod nbody;

pub use nbody::{NBodyModel, OblateBody, RADIATION_PRESSURE, STATE_DIM, YARKOVSKY};

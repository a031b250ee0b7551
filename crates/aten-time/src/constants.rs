// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

pub const SECONDS_PER_DAY: f64 = 86400.0;

pub const DAYS_PER_JULIAN_YEAR: f64 = 365.25;

pub const DAYS_PER_JULIAN_CENTURY: f64 = 36525.0;

/// J2000 as a Julian date.
pub const JD_J2000: f64 = 2451545.0;

/// J2000 as a modified Julian date.
pub const MJD_J2000: f64 = 51544.5;

/// The constant offset between TAI and TT in seconds.
pub const D_TAI_TT: f64 = 32.184;

/// Unix timestamp of 2000-01-01T12:00:00 UTC.
pub const UNIX_J2000: i64 = 946_728_000;

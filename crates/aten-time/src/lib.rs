// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Ephemeris-time epochs for the Aten ecosystem.
//!
//! The integrator works exclusively in TDB expressed as days past J2000;
//! leap seconds and the TT-TDB periodic correction are applied here, at the
//! I/O boundary, and nowhere inside the numerical kernels.

use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};

use chrono::NaiveDateTime;
use thiserror::Error;

pub mod constants;
mod leap_seconds;

use constants::{D_TAI_TT, JD_J2000, MJD_J2000, SECONDS_PER_DAY, UNIX_J2000};
use leap_seconds::leap_seconds_for_mjd;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TimeError {
    #[error("`{0}` is not a valid ISO-8601 date-time: {1}")]
    InvalidDate(String, String),
    #[error("dates before 1972-01-01 UTC are not supported")]
    BeforeLeapSecondEra,
}

/// An instant in TDB, stored as days past J2000.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Epoch(f64);

impl Epoch {
    pub fn from_tdb_days_since_j2000(days: f64) -> Self {
        Self(days)
    }

    pub fn from_tdb_seconds_since_j2000(seconds: f64) -> Self {
        Self(seconds / SECONDS_PER_DAY)
    }

    pub fn from_julian_date(jd: f64) -> Self {
        Self(jd - JD_J2000)
    }

    pub fn days_since_j2000(&self) -> f64 {
        self.0
    }

    pub fn seconds_since_j2000(&self) -> f64 {
        self.0 * SECONDS_PER_DAY
    }

    pub fn julian_date(&self) -> f64 {
        self.0 + JD_J2000
    }

    /// Converts a UTC calendar instant, applying leap seconds, the TAI-TT
    /// offset and the dominant periodic term of the TT-TDB difference.
    pub fn from_utc_datetime(utc: NaiveDateTime) -> Result<Self, TimeError> {
        let unix = utc.and_utc().timestamp() as f64
            + f64::from(utc.and_utc().timestamp_subsec_nanos()) * 1e-9;
        let since_j2000_utc = unix - UNIX_J2000 as f64;
        let mjd_utc = since_j2000_utc / SECONDS_PER_DAY + MJD_J2000;
        let delta_at = leap_seconds_for_mjd(mjd_utc).ok_or(TimeError::BeforeLeapSecondEra)?;
        let tt = since_j2000_utc + delta_at + D_TAI_TT;
        Ok(Self((tt + delta_tdb_tt(tt)) / SECONDS_PER_DAY))
    }

    /// Parses an ISO-8601 date-time interpreted as UTC.
    pub fn from_utc_iso(iso: &str) -> Result<Self, TimeError> {
        let utc = NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(|err| TimeError::InvalidDate(iso.to_owned(), err.to_string()))?;
        Self::from_utc_datetime(utc)
    }
}

/// TDB - TT in seconds for an instant given as TT seconds past J2000
/// (dominant annual term of the Fairhead & Bretagnon series).
fn delta_tdb_tt(tt_seconds: f64) -> f64 {
    let days = tt_seconds / SECONDS_PER_DAY;
    let g = 6.240040768 + 0.01720197 * days;
    0.001657 * (g + 0.01671 * g.sin()).sin()
}

impl Display for Epoch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} TDB(J2000)", self.0)
    }
}

impl Add<f64> for Epoch {
    type Output = Epoch;

    /// Offsets the epoch by a number of days.
    fn add(self, days: f64) -> Epoch {
        Epoch(self.0 + days)
    }
}

impl Sub for Epoch {
    type Output = f64;

    /// The difference between two epochs in days.
    fn sub(self, rhs: Epoch) -> f64 {
        self.0 - rhs.0
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn test_epoch_roundtrip() {
        let epoch = Epoch::from_tdb_days_since_j2000(7655.5);
        assert_eq!(epoch.julian_date(), 2459200.5);
        assert_eq!(Epoch::from_julian_date(2459200.5), epoch);
        assert_float_eq!(
            epoch.seconds_since_j2000(),
            7655.5 * 86400.0,
            rel <= 1e-15
        );
    }

    #[test]
    fn test_epoch_from_utc_j2000() {
        let epoch = Epoch::from_utc_iso("2000-01-01T12:00:00").expect("should be valid");
        // TT - UTC was 64.184 s at J2000; the periodic TDB term is sub-ms
        assert_float_eq!(
            epoch.days_since_j2000(),
            64.184 / 86400.0,
            abs <= 1e-7
        );
    }

    #[test]
    fn test_epoch_from_utc_apophis_reference() {
        let epoch = Epoch::from_utc_iso("2020-12-17T00:00:00").expect("should be valid");
        // JD 2459200.5 UTC, with TT - UTC = 69.184 s since 2017
        assert_float_eq!(
            epoch.days_since_j2000(),
            7655.5 + 69.184 / 86400.0,
            abs <= 1e-7
        );
    }

    #[test]
    fn test_epoch_from_utc_fractional_seconds() {
        let whole = Epoch::from_utc_iso("2020-12-17T00:00:00").expect("should be valid");
        let frac = Epoch::from_utc_iso("2020-12-17T00:00:00.500").expect("should be valid");
        assert_float_eq!(frac - whole, 0.5 / 86400.0, rel <= 1e-9);
    }

    #[test]
    fn test_epoch_before_leap_second_era() {
        assert_eq!(
            Epoch::from_utc_iso("1971-12-31T23:59:59"),
            Err(TimeError::BeforeLeapSecondEra)
        );
    }

    #[test]
    fn test_epoch_invalid_iso() {
        assert!(matches!(
            Epoch::from_utc_iso("yesterday"),
            Err(TimeError::InvalidDate(_, _))
        ));
    }
}

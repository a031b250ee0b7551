// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! UTC-TAI deltas for dates from 1972-01-01 onwards, which are always a whole
//! number of leap seconds.

/// MJDs corresponding to the start of each leap second epoch from 1972-01-01
/// onwards.
const MJD_LEAP_SECOND_EPOCHS: [u64; 28] = [
    41317, 41499, 41683, 42048, 42413, 42778, 43144, 43509, 43874, 44239, 44786, 45151, 45516,
    46247, 47161, 47892, 48257, 48804, 49169, 49534, 50083, 50630, 51179, 53736, 54832, 56109,
    57204, 57754,
];

/// The cumulative number of leap seconds at each epoch.
const LEAP_SECONDS: [f64; 28] = [
    10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0, 20.0, 21.0, 22.0, 23.0, 24.0, 25.0,
    26.0, 27.0, 28.0, 29.0, 30.0, 31.0, 32.0, 33.0, 34.0, 35.0, 36.0, 37.0,
];

/// TAI - UTC for a given modified Julian date, or `None` before the start of
/// the leap second era.
pub fn leap_seconds_for_mjd(mjd: f64) -> Option<f64> {
    let threshold = mjd.floor() as u64;
    MJD_LEAP_SECOND_EPOCHS
        .iter()
        .rposition(|&epoch| epoch <= threshold)
        .map(|position| LEAP_SECONDS[position])
}

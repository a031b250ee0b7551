// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Constants of the massive Solar System bodies carried by the planetary
//! ephemeris: gravitational parameters (DE430), zonal oblateness and IAU pole
//! orientations.

use std::fmt::{Display, Formatter};

use thiserror::Error;

pub use crate::dynamic::{DynBody, UnknownBodyName};

pub mod dynamic;

/// The astronomical unit in kilometres (IAU 2012).
pub const AU_KM: f64 = 1.495978707e8;

const SECONDS_PER_DAY: f64 = 86400.0;

/// The speed of light in au/day.
pub const SPEED_OF_LIGHT: f64 = 299_792.458 / AU_KM * SECONDS_PER_DAY;

/// Converts a gravitational parameter from km^3/s^2 to au^3/day^2.
pub fn gm_to_au_day(gm_km3_s2: f64) -> f64 {
    gm_km3_s2 / (AU_KM * AU_KM * AU_KM) * SECONDS_PER_DAY * SECONDS_PER_DAY
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub struct NaifId(pub i32);

impl Display for NaifId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `Origin` is implemented for all massive bodies.
pub trait Origin {
    fn id(&self) -> NaifId;
    fn name(&self) -> &'static str;
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("undefined property '{prop}' for body '{body}'")]
pub struct UndefinedBodyPropertyError {
    body: String,
    prop: String,
}

impl UndefinedBodyPropertyError {
    fn new(body: &dyn Origin, prop: &str) -> Self {
        Self {
            body: body.name().to_owned(),
            prop: prop.to_owned(),
        }
    }
}

pub trait PointMass: Origin {
    /// Gravitational parameter in km^3/s^2.
    fn gravitational_parameter(&self) -> f64;

    /// Gravitational parameter in au^3/day^2, the unit system of the
    /// integrator.
    fn gravitational_parameter_au_day(&self) -> f64 {
        gm_to_au_day(self.gravitational_parameter())
    }
}

pub trait TryPointMass: Origin {
    fn try_gravitational_parameter(&self) -> Result<f64, UndefinedBodyPropertyError>;
}

impl<T: PointMass> TryPointMass for T {
    fn try_gravitational_parameter(&self) -> Result<f64, UndefinedBodyPropertyError> {
        Ok(self.gravitational_parameter())
    }
}

/// Zonal gravity field of an oblate body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Oblateness {
    /// Second zonal harmonic.
    pub j2: f64,
    /// Equatorial radius in km.
    pub equatorial_radius: f64,
}

impl Oblateness {
    pub fn equatorial_radius_au(&self) -> f64 {
        self.equatorial_radius / AU_KM
    }
}

pub trait TryOblate: Origin {
    fn try_oblateness(&self) -> Result<Oblateness, UndefinedBodyPropertyError>;
}

pub trait Oblate: Origin {
    fn oblateness(&self) -> Oblateness;
}

impl<T: Oblate> TryOblate for T {
    fn try_oblateness(&self) -> Result<Oblateness, UndefinedBodyPropertyError> {
        Ok(self.oblateness())
    }
}

/// IAU pole orientation: right ascension and declination of the body's north
/// pole at J2000 with linear rates, all in degrees and degrees per Julian
/// century.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoleOrientation {
    pub right_ascension: f64,
    pub right_ascension_rate: f64,
    pub declination: f64,
    pub declination_rate: f64,
}

pub trait Pole: Origin {
    fn pole(&self) -> PoleOrientation;
}

pub trait TryPole: Origin {
    fn try_pole(&self) -> Result<PoleOrientation, UndefinedBodyPropertyError>;
}

impl<T: Pole> TryPole for T {
    fn try_pole(&self) -> Result<PoleOrientation, UndefinedBodyPropertyError> {
        Ok(self.pole())
    }
}

macro_rules! body {
    ($body:ident, $id:literal, $name:literal, $gm:literal) => {
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
        pub struct $body;

        impl Origin for $body {
            fn id(&self) -> NaifId {
                NaifId($id)
            }

            fn name(&self) -> &'static str {
                $name
            }
        }

        impl PointMass for $body {
            fn gravitational_parameter(&self) -> f64 {
                $gm
            }
        }
    };
}

body!(Sun, 10, "Sun", 1.327_124_400_419_394e11);
body!(Mercury, 199, "Mercury", 2.203_178_000_000_002e4);
body!(Venus, 299, "Venus", 3.248_585_920_000_001e5);
body!(Earth, 399, "Earth", 3.986_004_354_360_96e5);
body!(Moon, 301, "Moon", 4.902_800_066_163_796e3);
body!(Mars, 4, "Mars", 4.282_837_362_069_909e4);
body!(Jupiter, 5, "Jupiter", 1.267_127_648_000_002e8);
body!(Saturn, 6, "Saturn", 3.794_058_520_000_000e7);
body!(Uranus, 7, "Uranus", 5.794_548_600_000_008e6);
body!(Neptune, 8, "Neptune", 6.836_527_100_580_398e6);
body!(Pluto, 9, "Pluto", 9.770_000_000_000_001e2);

impl Oblate for Earth {
    fn oblateness(&self) -> Oblateness {
        Oblateness {
            j2: 1.082_625_45e-3,
            equatorial_radius: 6378.1363,
        }
    }
}

impl Oblate for Sun {
    fn oblateness(&self) -> Oblateness {
        Oblateness {
            j2: 2.110_608_853_272_684e-7,
            equatorial_radius: 696_000.0,
        }
    }
}

impl Oblate for Moon {
    fn oblateness(&self) -> Oblateness {
        Oblateness {
            j2: 2.032_156_846_495_257e-4,
            equatorial_radius: 1738.0,
        }
    }
}

impl Pole for Earth {
    fn pole(&self) -> PoleOrientation {
        PoleOrientation {
            right_ascension: 0.0,
            right_ascension_rate: -0.641,
            declination: 90.0,
            declination_rate: -0.557,
        }
    }
}

impl Pole for Sun {
    fn pole(&self) -> PoleOrientation {
        PoleOrientation {
            right_ascension: 286.13,
            right_ascension_rate: 0.0,
            declination: 63.87,
            declination_rate: 0.0,
        }
    }
}

impl Pole for Moon {
    // linearised IAU pole, periodic lunar terms dropped
    fn pole(&self) -> PoleOrientation {
        PoleOrientation {
            right_ascension: 269.9949,
            right_ascension_rate: 0.0031,
            declination: 66.5392,
            declination_rate: 0.0130,
        }
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn test_sun_gm_au_day() {
        // Gauss gravitational constant squared
        assert_float_eq!(
            Sun.gravitational_parameter_au_day(),
            2.959_122_082_855_911e-4,
            rel <= 1e-9
        );
    }

    #[test]
    fn test_speed_of_light_au_day() {
        assert_float_eq!(SPEED_OF_LIGHT, 173.144_632_674_240_3, rel <= 1e-12);
    }

    #[test]
    fn test_earth_oblateness() {
        let oblateness = Earth.oblateness();
        assert_float_eq!(oblateness.j2, 1.082_625_45e-3, rel <= 1e-12);
        assert!(oblateness.equatorial_radius_au() < 5e-4);
    }

    #[test]
    fn test_origin_ids() {
        assert_eq!(Sun.id(), NaifId(10));
        assert_eq!(Earth.id(), NaifId(399));
        assert_eq!(Earth.name(), "Earth");
    }
}

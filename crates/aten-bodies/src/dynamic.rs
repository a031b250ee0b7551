// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

use std::str::FromStr;

use thiserror::Error;

use crate::{
    Earth, Jupiter, Mars, Mercury, Moon, NaifId, Neptune, Oblateness, Origin, Pluto,
    PointMass, PoleOrientation, Saturn, Sun, TryOblate, TryPole, UndefinedBodyPropertyError,
    Uranus, Venus,
};

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("no body with name `{0}` is known")]
pub struct UnknownBodyName(String);

/// A massive body resolved at runtime, e.g. from the body list of an
/// ephemeris file.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum DynBody {
    Sun,
    Mercury,
    Venus,
    Earth,
    Moon,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
}

impl FromStr for DynBody {
    type Err = UnknownBodyName;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_lowercase().as_str() {
            "sun" => Ok(DynBody::Sun),
            "mercury" => Ok(DynBody::Mercury),
            "venus" => Ok(DynBody::Venus),
            "earth" => Ok(DynBody::Earth),
            "moon" => Ok(DynBody::Moon),
            "mars" | "mars barycenter" => Ok(DynBody::Mars),
            "jupiter" | "jupiter barycenter" => Ok(DynBody::Jupiter),
            "saturn" | "saturn barycenter" => Ok(DynBody::Saturn),
            "uranus" | "uranus barycenter" => Ok(DynBody::Uranus),
            "neptune" | "neptune barycenter" => Ok(DynBody::Neptune),
            "pluto" | "pluto barycenter" => Ok(DynBody::Pluto),
            _ => Err(UnknownBodyName(name.to_owned())),
        }
    }
}

impl Origin for DynBody {
    fn id(&self) -> NaifId {
        match self {
            DynBody::Sun => Sun.id(),
            DynBody::Mercury => Mercury.id(),
            DynBody::Venus => Venus.id(),
            DynBody::Earth => Earth.id(),
            DynBody::Moon => Moon.id(),
            DynBody::Mars => Mars.id(),
            DynBody::Jupiter => Jupiter.id(),
            DynBody::Saturn => Saturn.id(),
            DynBody::Uranus => Uranus.id(),
            DynBody::Neptune => Neptune.id(),
            DynBody::Pluto => Pluto.id(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            DynBody::Sun => Sun.name(),
            DynBody::Mercury => Mercury.name(),
            DynBody::Venus => Venus.name(),
            DynBody::Earth => Earth.name(),
            DynBody::Moon => Moon.name(),
            DynBody::Mars => Mars.name(),
            DynBody::Jupiter => Jupiter.name(),
            DynBody::Saturn => Saturn.name(),
            DynBody::Uranus => Uranus.name(),
            DynBody::Neptune => Neptune.name(),
            DynBody::Pluto => Pluto.name(),
        }
    }
}

impl PointMass for DynBody {
    fn gravitational_parameter(&self) -> f64 {
        match self {
            DynBody::Sun => Sun.gravitational_parameter(),
            DynBody::Mercury => Mercury.gravitational_parameter(),
            DynBody::Venus => Venus.gravitational_parameter(),
            DynBody::Earth => Earth.gravitational_parameter(),
            DynBody::Moon => Moon.gravitational_parameter(),
            DynBody::Mars => Mars.gravitational_parameter(),
            DynBody::Jupiter => Jupiter.gravitational_parameter(),
            DynBody::Saturn => Saturn.gravitational_parameter(),
            DynBody::Uranus => Uranus.gravitational_parameter(),
            DynBody::Neptune => Neptune.gravitational_parameter(),
            DynBody::Pluto => Pluto.gravitational_parameter(),
        }
    }
}

impl TryOblate for DynBody {
    fn try_oblateness(&self) -> Result<Oblateness, UndefinedBodyPropertyError> {
        match self {
            DynBody::Sun => Sun.try_oblateness(),
            DynBody::Earth => Earth.try_oblateness(),
            DynBody::Moon => Moon.try_oblateness(),
            _ => Err(UndefinedBodyPropertyError::new(self, "oblateness")),
        }
    }
}

impl TryPole for DynBody {
    fn try_pole(&self) -> Result<PoleOrientation, UndefinedBodyPropertyError> {
        match self {
            DynBody::Sun => Sun.try_pole(),
            DynBody::Earth => Earth.try_pole(),
            DynBody::Moon => Moon.try_pole(),
            _ => Err(UndefinedBodyPropertyError::new(self, "pole orientation")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dyn_body_from_str() {
        assert_eq!("Earth".parse::<DynBody>(), Ok(DynBody::Earth));
        assert_eq!("jupiter barycenter".parse::<DynBody>(), Ok(DynBody::Jupiter));
        assert!("Apophis".parse::<DynBody>().is_err());
    }

    #[test]
    fn test_dyn_body_properties() {
        assert_eq!(
            DynBody::Earth.gravitational_parameter(),
            Earth.gravitational_parameter()
        );
        assert!(DynBody::Earth.try_oblateness().is_ok());
        assert!(DynBody::Venus.try_oblateness().is_err());
        assert!(DynBody::Moon.try_pole().is_ok());
    }
}

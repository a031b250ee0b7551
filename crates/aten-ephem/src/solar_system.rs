// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::errors::EphemerisError;
use crate::interpolant::Interpolant;

/// The precomputed time series of one massive body: barycentric position,
/// Newtonian acceleration, and the Newtonian potential other bodies raise at
/// its location. Velocities are derived from the position pieces.
///
/// Units are au, au/day^2 and au^2/day^2 on a time axis of TDB days past
/// J2000.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BodyEphemeris {
    pub name: String,
    /// Gravitational parameter in au^3/day^2.
    pub gm: f64,
    pub position: Interpolant<f64>,
    pub acceleration: Interpolant<f64>,
    pub potential: Interpolant<f64>,
    #[serde(skip)]
    velocity: OnceLock<Interpolant<f64>>,
}

impl BodyEphemeris {
    pub fn new(
        name: impl Into<String>,
        gm: f64,
        position: Interpolant<f64>,
        acceleration: Interpolant<f64>,
        potential: Interpolant<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            gm,
            position,
            acceleration,
            potential,
            velocity: OnceLock::new(),
        }
    }

    pub fn velocity(&self) -> &Interpolant<f64> {
        self.velocity.get_or_init(|| self.position.differentiate())
    }
}

/// The Solar System ephemeris consumed by the N-body model: one
/// [`BodyEphemeris`] per massive body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolarSystemEphemeris {
    pub bodies: Vec<BodyEphemeris>,
}

impl SolarSystemEphemeris {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EphemerisError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EphemerisError> {
        let writer = BufWriter::new(File::create(path)?);
        Ok(serde_json::to_writer(writer, self)?)
    }

    pub fn n_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn body_index(&self, name: &str) -> Option<usize> {
        self.bodies
            .iter()
            .position(|body| body.name.eq_ignore_ascii_case(name))
    }

    /// Gravitational parameters in body order, in au^3/day^2.
    pub fn gms(&self) -> Vec<f64> {
        self.bodies.iter().map(|body| body.gm).collect()
    }

    /// First time covered by every body, in days past J2000.
    pub fn start(&self) -> f64 {
        self.bodies
            .iter()
            .map(|body| body.position.start())
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Last time covered by every body, in days past J2000.
    pub fn end(&self) -> f64 {
        self.bodies
            .iter()
            .map(|body| body.position.end())
            .fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use aten_series::Series;
    use float_eq::assert_float_eq;

    use super::*;

    fn constant_interpolant(coords: &[f64]) -> Interpolant<f64> {
        let piece = coords
            .iter()
            .map(|&c| Series::from_coeffs(vec![c, 0.0]))
            .collect();
        Interpolant::try_new(0.0, vec![-100.0, 100.0], vec![piece]).expect("should be valid")
    }

    fn sun_only() -> SolarSystemEphemeris {
        SolarSystemEphemeris {
            bodies: vec![BodyEphemeris::new(
                "Sun",
                2.959122082855911e-4,
                constant_interpolant(&[0.0, 0.0, 0.0]),
                constant_interpolant(&[0.0, 0.0, 0.0]),
                constant_interpolant(&[0.0]),
            )],
        }
    }

    #[test]
    fn test_solar_system_lookup() {
        let eph = sun_only();
        assert_eq!(eph.n_bodies(), 1);
        assert_eq!(eph.body_index("sun"), Some(0));
        assert_eq!(eph.body_index("Vulcan"), None);
        assert_eq!(eph.gms(), vec![2.959122082855911e-4]);
        assert_eq!(eph.start(), -100.0);
        assert_eq!(eph.end(), 100.0);
    }

    #[test]
    fn test_body_velocity_derived() {
        let piece = vec![Series::from_coeffs(vec![1.0, 2.0, 3.0])];
        let position =
            Interpolant::try_new(0.0, vec![0.0, 1.0], vec![piece]).expect("should be valid");
        let body = BodyEphemeris::new(
            "Earth",
            1.0,
            position,
            constant_interpolant(&[0.0]),
            constant_interpolant(&[0.0]),
        );
        let v = body.velocity().sample(0.5).expect("should be in domain");
        assert_float_eq!(v[0], 2.0 + 6.0 * 0.5, abs <= 1e-14);
    }

    #[test]
    fn test_solar_system_json_roundtrip() {
        let eph = sun_only();
        let path = std::env::temp_dir().join("aten_sseph_roundtrip.json");
        eph.save(&path).expect("should serialise");
        let back = SolarSystemEphemeris::load(&path).expect("should deserialise");
        assert_eq!(back.n_bodies(), 1);
        let p = back.bodies[0]
            .position
            .sample(0.0)
            .expect("should be in domain");
        assert_eq!(p, vec![0.0, 0.0, 0.0]);
        std::fs::remove_file(path).ok();
    }
}

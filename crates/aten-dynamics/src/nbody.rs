// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The relativistic point-mass N-body acceleration of a massless particle,
//! with zonal oblateness and non-gravitational terms.
//!
//! Everything is written over the abstract [`Scalar`] ring so that the same
//! code produces plain accelerations, Taylor jets and jet-transport
//! sensitivities. Units are au, au/day and TDB days past J2000 throughout.

use std::sync::Arc;

use rayon::prelude::*;

use aten_bodies::{Oblate, PoleOrientation, TryPole, SPEED_OF_LIGHT};
use aten_ephem::{EphemerisError, SolarSystemEphemeris};
use aten_series::Scalar;
use aten_taylor::{tape, FieldError, VectorField};
use aten_time::constants::DAYS_PER_JULIAN_CENTURY;

/// Six Cartesian components plus the two non-gravitational parameters
/// carried as constants of motion.
pub const STATE_DIM: usize = 8;

/// Index of the Yarkovsky magnitude in the state vector.
pub const YARKOVSKY: usize = 6;

/// Index of the radiation-pressure coefficient in the state vector.
pub const RADIATION_PRESSURE: usize = 7;

/// Zonal gravity configuration of one oblate ephemeris body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OblateBody {
    pub j2: f64,
    /// Equatorial radius in au.
    pub radius: f64,
    pub pole: PoleOrientation,
}

impl OblateBody {
    /// The configuration of a body with known constants, e.g.
    /// `OblateBody::from_constants(&Earth)`.
    pub fn from_constants<B: Oblate + TryPole>(body: &B) -> Self {
        let oblateness = body.oblateness();
        Self {
            j2: oblateness.j2,
            radius: oblateness.equatorial_radius_au(),
            pole: body
                .try_pole()
                .expect("oblate bodies carry a pole orientation"),
        }
    }
}

/// The right-hand side of the asteroid's equations of motion: Newtonian and
/// Einstein-Infeld-Hoffmann point-mass accelerations of every ephemeris
/// body, zonal oblateness for the flagged bodies, the Yarkovsky term and
/// solar radiation pressure.
///
/// The asteroid is massless, so no self-interaction exists by construction:
/// the ephemeris supplies each body's potential raised by the *other*
/// massive bodies, and the sums below run over ephemeris bodies only.
#[derive(Clone, Debug)]
pub struct NBodyModel {
    ephemeris: Arc<SolarSystemEphemeris>,
    gms: Vec<f64>,
    oblate: Vec<Option<OblateBody>>,
    sun: usize,
    post_newtonian: bool,
    parallel: bool,
}

impl NBodyModel {
    /// Builds the model from an ephemeris. Earth oblateness is enabled when
    /// the ephemeris carries an Earth entry; other bodies are opt-in through
    /// [`NBodyModel::with_oblate_body`].
    pub fn new(ephemeris: Arc<SolarSystemEphemeris>) -> Self {
        assert!(ephemeris.n_bodies() > 0, "ephemeris carries no bodies");
        let gms = ephemeris.gms();
        let mut oblate = vec![None; ephemeris.n_bodies()];
        if let Some(earth) = ephemeris.body_index("earth") {
            oblate[earth] = Some(OblateBody::from_constants(&aten_bodies::Earth));
        }
        let sun = ephemeris.body_index("sun").unwrap_or(0);
        Self {
            ephemeris,
            gms,
            oblate,
            sun,
            post_newtonian: true,
            parallel: false,
        }
    }

    pub fn with_oblate_body(mut self, index: usize, config: OblateBody) -> Self {
        self.oblate[index] = Some(config);
        self
    }

    pub fn without_oblateness(mut self) -> Self {
        self.oblate.iter_mut().for_each(|slot| *slot = None);
        self
    }

    /// Disables the 1/c^2 correction, leaving the pure Newtonian force.
    pub fn with_post_newtonian(mut self, enabled: bool) -> Self {
        self.post_newtonian = enabled;
        self
    }

    /// Splits the body loop across the rayon pool. Partial accelerations are
    /// written to disjoint per-body slots and summed in body order, so the
    /// result is identical to the serial variant.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn ephemeris(&self) -> &Arc<SolarSystemEphemeris> {
        &self.ephemeris
    }

    pub fn sun_index(&self) -> usize {
        self.sun
    }

    fn body_terms<S: Scalar>(
        &self,
        index: usize,
        t: &S,
        pos: &[S; 3],
    ) -> Result<BodyTerms<S>, EphemerisError> {
        let body = &self.ephemeris.bodies[index];
        let p = body.position.evaluate(t)?;
        let vel = body.velocity().evaluate(t)?;
        let acc = body.acceleration.evaluate(t)?;
        let potential = body.potential.evaluate(t)?.swap_remove(0);
        let rel = [
            pos[0].clone() - p[0].clone(),
            pos[1].clone() - p[1].clone(),
            pos[2].clone() - p[2].clone(),
        ];
        let dist = dot3(&rel, &rel).sqrt();
        let recip_dist = dist.recip();
        let gm = t.lift(self.gms[index]);
        let gm_dist = gm.clone() * recip_dist.clone();
        let gm_dist3 = gm_dist.clone() * recip_dist.clone() * recip_dist.clone();
        Ok(BodyTerms {
            rel,
            recip_dist,
            vel: [vel[0].clone(), vel[1].clone(), vel[2].clone()],
            acc: [acc[0].clone(), acc[1].clone(), acc[2].clone()],
            potential,
            gm_dist,
            gm_dist3,
        })
    }

    /// The acceleration raised by one body: Newtonian attraction with the
    /// EIH 1/c^2 bracket, the velocity-dependent cross term and the
    /// retardation-like term on the body's own acceleration.
    fn point_mass_contribution<S: Scalar>(
        &self,
        terms: &BodyTerms<S>,
        vel: &[S; 3],
        v2: &S,
        potential_at_asteroid: &S,
    ) -> [S; 3] {
        let mut factor = terms.gm_dist3.clone();
        if self.post_newtonian {
            let c2_recip = 1.0 / (SPEED_OF_LIGHT * SPEED_OF_LIGHT);
            let vi2 = dot3(&terms.vel, &terms.vel);
            let v_dot_vi = dot3(vel, &terms.vel);
            let radial_rate = dot3(&terms.rel, &terms.vel) * terms.recip_dist.clone();
            let acc_term = dot3(&terms.rel, &terms.acc);
            let bracket = v2.clone() + vi2.scale(2.0) - v_dot_vi.scale(4.0)
                - radial_rate.square().scale(1.5)
                - potential_at_asteroid.scale(4.0)
                - terms.potential.clone()
                - acc_term.scale(0.5);
            factor = factor * (bracket.scale(c2_recip) + v2.lift(1.0));

            let cross = dot3(
                &terms.rel,
                &[
                    vel[0].scale(4.0) - terms.vel[0].scale(3.0),
                    vel[1].scale(4.0) - terms.vel[1].scale(3.0),
                    vel[2].scale(4.0) - terms.vel[2].scale(3.0),
                ],
            ) * terms.gm_dist3.scale(c2_recip);
            let retard = terms.gm_dist.scale(3.5 * c2_recip);
            let mut out = [
                -(terms.rel[0].clone() * factor.clone()),
                -(terms.rel[1].clone() * factor.clone()),
                -(terms.rel[2].clone() * factor.clone()),
            ];
            for axis in 0..3 {
                out[axis] += cross.clone() * (vel[axis].clone() - terms.vel[axis].clone());
                out[axis] += retard.clone() * terms.acc[axis].clone();
            }
            out
        } else {
            [
                -(terms.rel[0].clone() * factor.clone()),
                -(terms.rel[1].clone() * factor.clone()),
                -(terms.rel[2].clone() * factor),
            ]
        }
    }

    /// The J2 acceleration of one oblate body: the separation is rotated
    /// into the body's equatorial frame through the pole orientation at the
    /// (series-valued) current time, the zonal term is evaluated there, and
    /// the result is rotated back.
    fn oblate_contribution<S: Scalar>(
        &self,
        config: &OblateBody,
        t: &S,
        terms: &BodyTerms<S>,
    ) -> [S; 3] {
        let centuries = t.scale(1.0 / DAYS_PER_JULIAN_CENTURY);
        let ra = centuries.scale(config.pole.right_ascension_rate.to_radians())
            + t.lift(config.pole.right_ascension.to_radians());
        let dec = centuries.scale(config.pole.declination_rate.to_radians())
            + t.lift(config.pole.declination.to_radians());
        // ICRF -> body equator: R1(pi/2 - dec) R3(pi/2 + ra); the prime
        // meridian drops out of the zonal terms
        let (sin_phi, cos_phi) = (ra + t.lift(std::f64::consts::FRAC_PI_2)).sin_cos();
        let (sin_psi, cos_psi) = (-dec + t.lift(std::f64::consts::FRAC_PI_2)).sin_cos();

        let x1 = cos_phi.clone() * terms.rel[0].clone() + sin_phi.clone() * terms.rel[1].clone();
        let y1 = cos_phi.clone() * terms.rel[1].clone() - sin_phi.clone() * terms.rel[0].clone();
        let z1 = terms.rel[2].clone();
        let xb = x1.clone();
        let yb = cos_psi.clone() * y1.clone() + sin_psi.clone() * z1.clone();
        let zb = cos_psi.clone() * z1 - sin_psi.clone() * y1;

        let recip_r2 = terms.recip_dist.square();
        let z2_r2 = zb.square() * recip_r2.clone();
        // -(3/2) J2 mu R^2 / r^5
        let common = terms.gm_dist3.clone()
            * recip_r2.scale(-1.5 * config.j2 * config.radius * config.radius);
        let five_z2 = z2_r2.scale(5.0);
        let axb = common.clone() * xb * (five_z2.lift(1.0) - five_z2.clone());
        let ayb = common.clone() * yb * (five_z2.lift(1.0) - five_z2.clone());
        let azb = common * zb * (five_z2.lift(3.0) - five_z2);

        // rotate back: R3(-(pi/2 + ra)) R1(-(pi/2 - dec))
        let y2 = cos_psi.clone() * ayb.clone() - sin_psi.clone() * azb.clone();
        let z2 = sin_psi * ayb + cos_psi * azb;
        [
            cos_phi.clone() * axb.clone() - sin_phi.clone() * y2.clone(),
            sin_phi * axb + cos_phi * y2,
            z2,
        ]
    }
}

impl VectorField for NBodyModel {
    fn dim(&self) -> usize {
        STATE_DIM
    }

    fn evaluate<S: Scalar>(&self, t: &S, x: &[S], dx: &mut [S]) -> Result<(), FieldError> {
        let pos = [x[0].clone(), x[1].clone(), x[2].clone()];
        let vel = [x[3].clone(), x[4].clone(), x[5].clone()];
        let zero = t.lift(0.0);
        let n = self.ephemeris.n_bodies();
        let parallel = self.parallel && !tape::is_recording();

        let terms: Vec<BodyTerms<S>> = if parallel {
            (0..n)
                .into_par_iter()
                .map(|i| self.body_terms(i, t, &pos))
                .collect::<Result<_, _>>()
        } else {
            (0..n).map(|i| self.body_terms(i, t, &pos)).collect()
        }?;

        let mut potential_at_asteroid = zero.clone();
        for body in &terms {
            potential_at_asteroid += body.gm_dist.clone();
        }
        let v2 = dot3(&vel, &vel);

        let per_body: Vec<[S; 3]> = if parallel {
            terms
                .par_iter()
                .enumerate()
                .map(|(i, body)| {
                    let mut contribution =
                        self.point_mass_contribution(body, &vel, &v2, &potential_at_asteroid);
                    if let Some(config) = &self.oblate[i] {
                        let zonal = self.oblate_contribution(config, t, body);
                        for axis in 0..3 {
                            contribution[axis] += zonal[axis].clone();
                        }
                    }
                    contribution
                })
                .collect()
        } else {
            terms
                .iter()
                .enumerate()
                .map(|(i, body)| {
                    let mut contribution =
                        self.point_mass_contribution(body, &vel, &v2, &potential_at_asteroid);
                    if let Some(config) = &self.oblate[i] {
                        let zonal = self.oblate_contribution(config, t, body);
                        for axis in 0..3 {
                            contribution[axis] += zonal[axis].clone();
                        }
                    }
                    contribution
                })
                .collect()
        };

        let mut acc = [zero.clone(), zero.clone(), zero.clone()];
        for contribution in &per_body {
            for axis in 0..3 {
                acc[axis] += contribution[axis].clone();
            }
        }

        // non-gravitational terms along the Sun-asteroid direction
        let sun = &terms[self.sun];
        let rhat = [
            sun.rel[0].clone() * sun.recip_dist.clone(),
            sun.rel[1].clone() * sun.recip_dist.clone(),
            sun.rel[2].clone() * sun.recip_dist.clone(),
        ];
        let srp =
            x[RADIATION_PRESSURE].clone() * t.lift(self.gms[self.sun]) * sun.recip_dist.square();
        for axis in 0..3 {
            acc[axis] += x[YARKOVSKY].clone() * rhat[axis].clone();
            acc[axis] += srp.clone() * rhat[axis].clone();
        }

        dx[0] = vel[0].clone();
        dx[1] = vel[1].clone();
        dx[2] = vel[2].clone();
        dx[3] = acc[0].clone();
        dx[4] = acc[1].clone();
        dx[5] = acc[2].clone();
        dx[YARKOVSKY] = zero.clone();
        dx[RADIATION_PRESSURE] = zero;
        Ok(())
    }
}

struct BodyTerms<S> {
    /// Asteroid position minus body position.
    rel: [S; 3],
    recip_dist: S,
    vel: [S; 3],
    acc: [S; 3],
    /// Newtonian potential at the body, from the ephemeris.
    potential: S,
    /// mu / r.
    gm_dist: S,
    /// mu / r^3.
    gm_dist3: S,
}

fn dot3<S: Scalar>(a: &[S; 3], b: &[S; 3]) -> S {
    a[0].clone() * b[0].clone() + a[1].clone() * b[1].clone() + a[2].clone() * b[2].clone()
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use aten_bodies::{Oblate, PointMass};
    use aten_ephem::{BodyEphemeris, Interpolant};
    use aten_series::Series;

    use super::*;

    fn constant_interpolant(coords: &[f64]) -> Interpolant<f64> {
        let piece = coords
            .iter()
            .map(|&c| Series::from_coeffs(vec![c, 0.0]))
            .collect();
        Interpolant::try_new(0.0, vec![-4000.0, 4000.0], vec![piece]).expect("should be valid")
    }

    fn sun_at_origin() -> Arc<SolarSystemEphemeris> {
        Arc::new(SolarSystemEphemeris {
            bodies: vec![BodyEphemeris::new(
                "Sun",
                aten_bodies::Sun.gravitational_parameter_au_day(),
                constant_interpolant(&[0.0, 0.0, 0.0]),
                constant_interpolant(&[0.0, 0.0, 0.0]),
                constant_interpolant(&[0.0]),
            )],
        })
    }

    fn derivative(model: &NBodyModel, state: &[f64; STATE_DIM]) -> [f64; STATE_DIM] {
        let mut dx = [0.0; STATE_DIM];
        model
            .evaluate(&0.0, state, &mut dx)
            .expect("should evaluate");
        dx
    }

    #[test]
    fn test_newtonian_acceleration_at_unit_distance() {
        let model = NBodyModel::new(sun_at_origin()).with_post_newtonian(false);
        let mu = aten_bodies::Sun.gravitational_parameter_au_day();
        let dx = derivative(&model, &[1.0, 0.0, 0.0, 0.0, 0.01, 0.0, 0.0, 0.0]);
        assert_float_eq!(dx[3], -mu, rel <= 1e-15);
        assert_float_eq!(dx[4], 0.0, abs <= 1e-20);
        assert_eq!(dx[0], 0.0);
        assert_eq!(dx[1], 0.01);
    }

    #[test]
    fn test_post_newtonian_correction_magnitude() {
        let newtonian = NBodyModel::new(sun_at_origin()).with_post_newtonian(false);
        let relativistic = NBodyModel::new(sun_at_origin());
        let mu = aten_bodies::Sun.gravitational_parameter_au_day();
        let state = [1.0, 0.0, 0.0, 0.0, mu.sqrt(), 0.0, 0.0, 0.0];
        let a0 = derivative(&newtonian, &state)[3];
        let a1 = derivative(&relativistic, &state)[3];
        // the 1/c^2 correction is of order v^2/c^2 times the Newtonian term
        let expected = mu / (SPEED_OF_LIGHT * SPEED_OF_LIGHT);
        assert!((a1 - a0).abs() > 0.1 * expected * mu);
        assert!((a1 - a0).abs() < 10.0 * expected * mu);
    }

    #[test]
    fn test_nongravitational_terms_are_radial() {
        let model = NBodyModel::new(sun_at_origin()).with_post_newtonian(false);
        let mu = aten_bodies::Sun.gravitational_parameter_au_day();
        let yarkovsky = 2e-14;
        let beta = 3e-5;
        let dx = derivative(&model, &[1.0, 0.0, 0.0, 0.0, 0.01, 0.0, yarkovsky, beta]);
        assert_float_eq!(dx[3], -mu + yarkovsky + beta * mu, rel <= 1e-12);
        // the parameters are constants of motion
        assert_eq!(dx[YARKOVSKY], 0.0);
        assert_eq!(dx[RADIATION_PRESSURE], 0.0);
    }

    #[test]
    fn test_oblateness_in_the_equatorial_plane() {
        let earth = aten_bodies::Earth;
        let gm = earth.gravitational_parameter_au_day();
        let ephemeris = Arc::new(SolarSystemEphemeris {
            bodies: vec![BodyEphemeris::new(
                "Earth",
                gm,
                constant_interpolant(&[0.0, 0.0, 0.0]),
                constant_interpolant(&[0.0, 0.0, 0.0]),
                constant_interpolant(&[0.0]),
            )],
        });
        let model = NBodyModel::new(ephemeris).with_post_newtonian(false);
        let r = 1e-4;
        let dx = derivative(&model, &[r, 0.0, 0.0, 0.0, 1e-3, 0.0, 0.0, 0.0]);
        let oblateness = earth.oblateness();
        let radius = oblateness.equatorial_radius_au();
        let expected =
            -gm / (r * r) - 1.5 * oblateness.j2 * gm * radius * radius / (r * r * r * r);
        assert_float_eq!(dx[3], expected, rel <= 1e-10);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let serial = NBodyModel::new(sun_at_origin());
        let parallel = NBodyModel::new(sun_at_origin()).with_parallel(true);
        let state: Vec<Series<f64>> = [1.0, 0.2, -0.1, 0.001, 0.017, -0.002, 1e-14, 1e-5]
            .iter()
            .map(|&v| Series::variable(v, 6))
            .collect();
        let t = Series::variable(12.25_f64, 6);
        let mut dx_serial = vec![t.lift(0.0); STATE_DIM];
        let mut dx_parallel = dx_serial.clone();
        serial
            .evaluate(&t, &state, &mut dx_serial)
            .expect("should evaluate");
        parallel
            .evaluate(&t, &state, &mut dx_parallel)
            .expect("should evaluate");
        assert_eq!(dx_serial, dx_parallel);
    }
}

// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Propagates the Apophis orbit through the Solar System with jet transport
//! and writes one dense interpolant per integration direction.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use glam::DVec3;
use log::{error, info, warn};
use serde::Serialize;
use thiserror::Error;

use aten_bodies::AU_KM;
use aten_dynamics::{NBodyModel, STATE_DIM};
use aten_ephem::{EphemerisError, SolarSystemEphemeris};
use aten_series::{MultiSeries, Scalar, VarTable};
use aten_taylor::{
    EventDetector, EventFunction, EventRecord, Outcome, Propagation, PropagationError, Propagator,
    StepMode,
};
use aten_time::constants::{DAYS_PER_JULIAN_YEAR, SECONDS_PER_DAY};
use aten_time::{Epoch, TimeError};

mod args;

use args::Cli;

/// Barycentric ecliptic state at the reference epoch (JPL solution 197),
/// in km and km/s.
const APOPHIS_POSITION_KM: [f64; 3] = [-84_585_620.1, 104_798_166.3, 36_807_992.5];
const APOPHIS_VELOCITY_KM_S: [f64; 3] = [-25.879_80, -15.523_97, -5.585_61];

/// Fitted Yarkovsky magnitude carried as the seventh state component, in
/// au/day^2.
const YARKOVSKY_NOMINAL: f64 = -2.899e-14;

/// Nominal radiation-pressure coefficient of the eighth state component.
const RADIATION_PRESSURE_NOMINAL: f64 = 0.0;

/// Jet-variable scale factors: position and velocity perturbations, the
/// Yarkovsky magnitude and the radiation-pressure coefficient. Chosen so the
/// jet coefficients stay O(1) over the full integration span.
const JET_SCALES: [f64; STATE_DIM] = [1e-8, 1e-8, 1e-8, 1e-8, 1e-8, 1e-8, 1e-13, 1e-14];

/// Earth close approaches are armed within this distance, in au.
const CLOSE_APPROACH_RADIUS: f64 = 0.1;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Time(#[from] TimeError),
    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),
    #[error(transparent)]
    Propagation(#[from] PropagationError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("the ephemeris carries no Earth entry, close approaches cannot be detected")]
    NoEarth,
}

fn main() {
    pretty_env_logger::init();
    if let Err(err) = run() {
        error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let epoch = Epoch::from_utc_iso(&cli.jd0)?;
    info!("initial epoch {} = JD {:.6} TDB", cli.jd0, epoch.julian_date());

    let ephemeris = Arc::new(SolarSystemEphemeris::load(&cli.ss_eph_file)?);
    info!(
        "ephemeris: {} bodies over [{:.1}, {:.1}] days past J2000",
        ephemeris.n_bodies(),
        ephemeris.start(),
        ephemeris.end()
    );

    let model = NBodyModel::new(ephemeris.clone()).with_parallel(cli.parallel);
    let mode = if cli.parse_eqs {
        StepMode::Recorded
    } else {
        StepMode::Generic
    };
    let propagator = Propagator::new(model, cli.order, cli.abstol)
        .with_max_steps(cli.maxsteps)
        .with_mode(mode);

    let seeds = jet_seeds(cli.varorder);
    let t0 = epoch.days_since_j2000();
    std::fs::create_dir_all(&cli.out_dir)?;

    let directions = [
        ("backward", cli.nyears_bwd, "apophis_bwd.json"),
        ("forward", cli.nyears_fwd, "apophis_fwd.json"),
    ];
    for (label, nyears, file) in directions {
        if nyears == 0.0 {
            continue;
        }
        let t_end = t0 + nyears * DAYS_PER_JULIAN_YEAR;
        info!("integrating {label} to {t_end:.3} days past J2000");
        let run = if cli.detect_events {
            let earth = ephemeris.body_index("earth").ok_or(CliError::NoEarth)?;
            let event = CloseApproach {
                ephemeris: ephemeris.clone(),
                earth,
            };
            propagator.propagate_with_events(
                t0,
                t_end,
                &seeds,
                &EventDetector::default(),
                &event,
            )?
        } else {
            propagator.propagate_dense(t0, t_end, &seeds)?
        };
        match run.outcome {
            Outcome::Complete => info!("{label}: {} steps", run.n_steps()),
            Outcome::StepCapReached => warn!(
                "{label}: step cap hit after {} steps at t = {:.3}",
                run.n_steps(),
                run.final_time()
            ),
            Outcome::Cancelled => warn!("{label}: cancelled after {} steps", run.n_steps()),
        }
        write_interpolant(&run, &cli.out_dir.join(file))?;
        if cli.detect_events {
            let path = cli.out_dir.join(format!(
                "{}_events.json",
                file.trim_end_matches(".json")
            ));
            write_events(&run.events, &path)?;
            for event in &run.events {
                info!(
                    "close approach at t = {:.6} days past J2000 (|g| = {:.3e})",
                    event.t,
                    event.value.abs()
                );
            }
        }
    }
    Ok(())
}

/// The reference state lifted into the jet algebra: each component is seeded
/// with its scaled perturbation variable.
fn jet_seeds(varorder: usize) -> Vec<MultiSeries> {
    let position = DVec3::from(APOPHIS_POSITION_KM) / AU_KM;
    let velocity = DVec3::from(APOPHIS_VELOCITY_KM_S) * (SECONDS_PER_DAY / AU_KM);
    let nominal = [
        position.x,
        position.y,
        position.z,
        velocity.x,
        velocity.y,
        velocity.z,
        YARKOVSKY_NOMINAL,
        RADIATION_PRESSURE_NOMINAL,
    ];
    let table = VarTable::new(&JET_SCALES, varorder);
    nominal
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            MultiSeries::constant(table.clone(), value) + MultiSeries::variable(table.clone(), i)
        })
        .collect()
}

/// Radial velocity relative to Earth, armed inside the close-approach
/// sphere; its zeros mark the local minima of the Earth distance.
struct CloseApproach {
    ephemeris: Arc<SolarSystemEphemeris>,
    earth: usize,
}

impl EventFunction for CloseApproach {
    fn active(&self, t: f64, x: &[f64]) -> bool {
        let Ok(earth) = self.ephemeris.bodies[self.earth].position.sample(t) else {
            return false;
        };
        let rel = DVec3::new(x[0] - earth[0], x[1] - earth[1], x[2] - earth[2]);
        rel.length() < CLOSE_APPROACH_RADIUS
    }

    fn value<S: Scalar>(&self, t: &S, x: &[S]) -> S {
        let body = &self.ephemeris.bodies[self.earth];
        let position = body
            .position
            .evaluate(t)
            .expect("ephemeris covers the propagation span");
        let velocity = body
            .velocity()
            .evaluate(t)
            .expect("ephemeris covers the propagation span");
        let mut g = t.lift(0.0);
        for axis in 0..3 {
            g += (x[axis].clone() - position[axis].clone())
                * (x[axis + 3].clone() - velocity[axis].clone());
        }
        g
    }
}

fn write_interpolant(run: &Propagation<MultiSeries>, path: &Path) -> Result<(), CliError> {
    let interpolant = run.to_interpolant()?;
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &interpolant)?;
    info!("wrote {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct EventRow {
    /// Days past J2000 TDB.
    t: f64,
    /// Nominal state at the event.
    state: Vec<f64>,
    /// Event-function residual.
    value: f64,
}

fn write_events(events: &[EventRecord<MultiSeries>], path: &Path) -> Result<(), CliError> {
    let rows: Vec<EventRow> = events
        .iter()
        .map(|event| EventRow {
            t: event.t,
            state: event
                .state
                .iter()
                .map(MultiSeries::constant_term)
                .collect(),
            value: event.value,
        })
        .collect();
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &rows)?;
    info!("wrote {} events to {}", rows.len(), path.display());
    Ok(())
}

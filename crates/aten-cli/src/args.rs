// SPDX-FileCopyrightText: 2025 Aten contributors
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "aten",
    about = "Taylor-method propagation of the Apophis orbit with jet transport",
    version
)]
pub struct Cli {
    /// Initial epoch as an ISO-8601 UTC date-time
    #[arg(long = "jd0", default_value = "2020-12-17T00:00:00")]
    pub jd0: String,

    /// Total degree of the jet-transport algebra
    #[arg(long, default_value_t = 5)]
    pub varorder: usize,

    /// Step cap per integration direction
    #[arg(long, default_value_t = 10_000)]
    pub maxsteps: usize,

    /// Years to integrate backward (negative)
    #[arg(
        long = "nyears_bwd",
        default_value_t = -18.0,
        allow_hyphen_values = true
    )]
    pub nyears_bwd: f64,

    /// Years to integrate forward
    #[arg(long = "nyears_fwd", default_value_t = 9.0)]
    pub nyears_fwd: f64,

    /// Taylor expansion order of the integrator
    #[arg(long, default_value_t = 25)]
    pub order: usize,

    /// Absolute truncation tolerance
    #[arg(long, default_value_t = 1e-20)]
    pub abstol: f64,

    /// Use the recorded (fused) right-hand side instead of re-evaluating it
    /// per order
    #[arg(long = "parse_eqs", default_value_t = true, action = ArgAction::Set)]
    pub parse_eqs: bool,

    /// Solar-system ephemeris path
    #[arg(long = "ss_eph_file", default_value = "./sseph343ast016_p31y_et.json")]
    pub ss_eph_file: PathBuf,

    /// Output directory for the dense interpolants and event logs
    #[arg(long = "out_dir", default_value = ".")]
    pub out_dir: PathBuf,

    /// Detect Earth close approaches and write an event log
    #[arg(long = "events", default_value_t = false)]
    pub detect_events: bool,

    /// Partition the body loop of the force model across worker threads
    #[arg(long = "parallel", default_value_t = false)]
    pub parallel: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["aten"]);
        assert_eq!(cli.jd0, "2020-12-17T00:00:00");
        assert_eq!(cli.varorder, 5);
        assert_eq!(cli.maxsteps, 10_000);
        assert_eq!(cli.nyears_bwd, -18.0);
        assert_eq!(cli.nyears_fwd, 9.0);
        assert_eq!(cli.order, 25);
        assert_eq!(cli.abstol, 1e-20);
        assert!(cli.parse_eqs);
        assert!(!cli.detect_events);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "aten",
            "--jd0",
            "2029-04-13T00:00:00",
            "--nyears_bwd",
            "-2.5",
            "--parse_eqs",
            "false",
            "--events",
        ]);
        assert_eq!(cli.jd0, "2029-04-13T00:00:00");
        assert_eq!(cli.nyears_bwd, -2.5);
        assert!(!cli.parse_eqs);
        assert!(cli.detect_events);
    }
}

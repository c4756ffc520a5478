//! Launch configuration: CLI parsing and the validation that keeps invalid configuration
//! from ever reaching the [`crate::simulator::Simulator`].

use clap::{ArgAction, Parser, ValueEnum};

use crate::error::{Error, Result};

/// Which [`crate::transport::Transport`] backs this run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// Runs the whole ring of P logical processes as P OS threads in this one binary.
    Thread,
    /// Runs as a single MPI process; P and rank come from the MPI environment.
    #[cfg(feature = "mpi-transport")]
    Mpi,
}

/// Recognized launch configuration (see the external interfaces table).
#[derive(Parser, Debug, Clone)]
#[command(name = "bh-nbody-ring", about = "Distributed Barnes-Hut n-body simulation")]
pub struct Args {
    /// Total bodies across all processes; must be a multiple of the process count.
    #[arg(long, default_value_t = 4000)]
    pub n: usize,

    /// Simulation radius (half side of the root quadrant).
    #[arg(long, default_value_t = 2.8e6)]
    pub r: f64,

    /// Integration time step.
    #[arg(long, default_value_t = 0.1)]
    pub dt: f64,

    /// Barnes-Hut acceptance ratio theta, in (0, 1].
    #[arg(long, default_value_t = 0.5)]
    pub theta: f64,

    /// RNG seed base; each process offsets this by its rank.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Enable the all-gather + render phase (`--render false` to disable).
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub render: bool,

    /// Optional step limit; runs unbounded if absent.
    #[arg(long)]
    pub steps: Option<usize>,

    /// Which transport to use.
    #[arg(long, value_enum, default_value_t = TransportKind::Thread)]
    pub transport: TransportKind,

    /// Process-group size when `transport` is `thread`. Ignored under `mpi`, where the
    /// process count comes from the MPI launcher.
    #[arg(long, default_value_t = 4)]
    pub processes: usize,

    /// Directory PNG frames are written to when rendering is on.
    #[arg(long, default_value = "frames")]
    pub output_dir: String,
}

/// Validated configuration, derived from [`Args`]. `p` is resolved from the chosen
/// transport (the MPI world size, or `args.processes` under the thread transport) before
/// validation runs, since `n % p == 0` can't be checked without it.
#[derive(Debug, Clone)]
pub struct Config {
    pub n: usize,
    pub p: usize,
    pub r: f64,
    pub dt: f64,
    pub theta: f64,
    pub seed: u64,
    pub render: bool,
    pub steps: Option<usize>,
    pub output_dir: String,
}

impl Config {
    pub fn from_args(args: &Args, p: usize) -> Result<Self> {
        let config = Config {
            n: args.n,
            p,
            r: args.r,
            dt: args.dt,
            theta: args.theta,
            seed: args.seed,
            render: args.render,
            steps: args.steps,
            output_dir: args.output_dir.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn portion(&self) -> usize {
        self.n / self.p
    }

    fn validate(&self) -> Result<()> {
        if self.p == 0 {
            return Err(Error::Configuration("process count must be positive".into()));
        }
        if self.n % self.p != 0 {
            return Err(Error::Configuration(format!(
                "n ({}) must be a multiple of the process count ({})",
                self.n, self.p
            )));
        }
        if self.r <= 0.0 || !self.r.is_finite() {
            return Err(Error::Configuration(format!("r must be positive and finite, got {}", self.r)));
        }
        if self.dt <= 0.0 || !self.dt.is_finite() {
            return Err(Error::Configuration(format!("dt must be positive and finite, got {}", self.dt)));
        }
        if !(self.theta > 0.0 && self.theta <= 1.0) {
            return Err(Error::Configuration(format!("theta must be in (0, 1], got {}", self.theta)));
        }
        Ok(())
    }
}

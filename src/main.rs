//! Lumped - Lumped-Parameter Network Simulator
//!
//! Solves a hydraulic/electric network described in a netlist file and
//! prints the time series of its unknowns.
//!
//! # Usage
//!
//! ```bash
//! lumped network.net --scheme BDF2 --dt 0.01 --maxtime 5 > solution.txt
//! ```
//!
//! The exit code is the solve status: 0 solved, 1 under-constrained,
//! 2 over-constrained or singular.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lumped_core::{
    error::{LumpedError, Result},
    netlist, Scheme, Solver, SolverConfig,
};

/// Lumped-parameter network simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the netlist file
    #[arg(value_name = "NETLIST_FILE")]
    netlist_file: PathBuf,

    /// Time step, overrides the netlist's .dt
    #[arg(long)]
    dt: Option<f64>,

    /// End time, overrides the netlist's .maxtime
    #[arg(long)]
    maxtime: Option<f64>,

    /// Time integration scheme (BDF or BDF2), overrides the netlist's .scheme
    #[arg(long)]
    scheme: Option<Scheme>,

    /// Write the solution to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Export only the listened pressures and flows
    #[arg(long)]
    listened: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// Netlist settings first, then command-line flags on top.
    fn config(&self, netlist: &netlist::Netlist) -> SolverConfig {
        let mut config = netlist.config(SolverConfig::new());
        if let Some(dt) = self.dt {
            config = config.with_dt(dt);
        }
        if let Some(maxtime) = self.maxtime {
            config = config.with_maxtime(maxtime);
        }
        if let Some(scheme) = self.scheme {
            config = config.with_scheme(scheme);
        }
        config
    }
}

fn run(args: &Args) -> Result<u8> {
    let netlist = netlist::parse_file(&args.netlist_file)?;
    let solver = Solver::new(args.config(&netlist));
    let report = solver.solve(&netlist.schematic)?;

    let solution = match report.solution() {
        Some(solution) => solution,
        None => {
            eprintln!("{}", report.message());
            return Ok(report.status());
        }
    };

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(|source| LumpedError::OutputError { source })?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    if args.listened {
        solution.write_listened(&mut out)?;
    } else {
        solution.write_full(&mut out)?;
    }
    out.flush()
        .map_err(|source| LumpedError::OutputError { source })?;

    Ok(report.status())
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_writer(io::stderr)
        .init();

    match run(&args) {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(3)
        }
    }
}

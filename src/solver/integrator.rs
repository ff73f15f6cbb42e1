//! Time integration with backward differentiation formulas.
//!
//! | Scheme | LHS | RHS |
//! |--------|-----|-----|
//! | steady state | `M0` | `S(0)` |
//! | BDF | `M0 + M1/dt` | `S(t) + M1·x_n/dt` |
//! | BDF2 | `M0 + 3·M1/(2dt)` | `S(t) + M1·(4x_n - x_{n-1})/(2dt)` |
//!
//! The LHS only changes when a diode switches, so its factors are kept
//! between steps and refreshed on demand.

use std::fmt;
use std::str::FromStr;

use super::assembly::AssembledSystem;
use super::dense::{DenseMatrix, LuFactors};
use super::diode::update_all;
use super::MAX_STEPS;
use crate::error::{LumpedError, Result};

/// Relative guard absorbing representation error in `maxtime / dt`.
pub const STEP_COUNT_GUARD: f64 = 1e-9;

/// Time integration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    /// First-order backward Euler
    #[default]
    Bdf,
    /// Second-order backward differentiation
    Bdf2,
}

impl Scheme {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bdf => "BDF",
            Self::Bdf2 => "BDF2",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scheme {
    type Err = LumpedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BDF" | "BDF1" => Ok(Self::Bdf),
            "BDF2" => Ok(Self::Bdf2),
            _ => Err(LumpedError::invalid_param(format!(
                "unknown time integration scheme '{}' (expected BDF or BDF2)",
                s
            ))),
        }
    }
}

/// Number of steps for a run, `floor(maxtime/dt)` with a small guard.
pub fn step_count(dt: f64, maxtime: f64) -> usize {
    (maxtime / dt * (1.0 + STEP_COUNT_GUARD)).floor() as usize
}

/// States at every step, including the steady state at `t = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub states: Vec<Vec<f64>>,
}

/// Solves `(M0 + c·M1)·x = rhs` for a fixed `c`, switching diodes until
/// the solution agrees with their states.
pub struct Stepper<'a> {
    system: &'a mut AssembledSystem,
    /// Coefficient of `M1` in the LHS
    coefficient: f64,
    max_iterations: usize,
    factors: Option<LuFactors>,
}

impl<'a> Stepper<'a> {
    pub fn new(system: &'a mut AssembledSystem, coefficient: f64, max_iterations: usize) -> Self {
        Self {
            system,
            coefficient,
            max_iterations,
            factors: None,
        }
    }

    pub fn system(&self) -> &AssembledSystem {
        &*self.system
    }

    fn lhs(&self) -> DenseMatrix {
        self.system.m0.combine(1.0, &self.system.m1, self.coefficient)
    }

    fn factor(&mut self, time: f64) -> Result<&LuFactors> {
        if self.factors.is_none() {
            self.factors = Some(self.lhs().factor(time)?);
        }
        self.factors
            .as_ref()
            .ok_or_else(|| LumpedError::internal("LHS factors missing after factorization"))
    }

    /// Solve with the current diode rows.
    fn solve_once(&mut self, rhs: &[f64], time: f64) -> Result<Vec<f64>> {
        Ok(self.factor(time)?.solve(rhs))
    }

    /// Solve for `rhs` and settle the diode states.
    pub fn solve(&mut self, rhs: &[f64], time: f64) -> Result<Vec<f64>> {
        let mut x = match self.solve_once(rhs, time) {
            Ok(x) => x,
            Err(LumpedError::SingularMatrix { .. }) if !self.system.diodes.is_empty() => {
                self.relax(rhs, time)?
            }
            Err(e) => return Err(e),
        };

        let mut iterations = 0;
        loop {
            let toggled = update_all(&mut self.system.diodes, &x);
            if toggled == 0 {
                return Ok(x);
            }
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(LumpedError::SimulationFault {
                    iterations: self.max_iterations,
                    time,
                });
            }
            tracing::debug!(time, toggled, iterations, "diode states changed");

            self.system.write_diode_rows();
            self.factors = None;
            x = match self.solve_once(rhs, time) {
                Ok(x) => x,
                Err(LumpedError::SingularMatrix { .. }) => self.relax(rhs, time)?,
                Err(e) => return Err(e),
            };
        }
    }

    /// Replace every diode by a small resistor, read the conducting set off
    /// that solution, then solve again with ideal rows.
    fn relax(&mut self, rhs: &[f64], time: f64) -> Result<Vec<f64>> {
        tracing::warn!(time, "singular system while switching diodes, relaxing");
        for diode in &self.system.diodes {
            diode.write_relaxed_row(&mut self.system.m0);
        }
        self.factors = None;
        let relaxed = self.solve_once(rhs, time)?;

        for diode in &mut self.system.diodes {
            diode.open = diode.forward_flow(&relaxed) > 0.0;
        }
        self.system.write_diode_rows();
        self.factors = None;
        self.solve_once(rhs, time)
    }
}

/// Steady state followed by `floor(maxtime/dt)` steps.
pub fn integrate(
    system: &mut AssembledSystem,
    scheme: Scheme,
    dt: f64,
    maxtime: f64,
    max_diode_iterations: usize,
) -> Result<Trajectory> {
    let nsteps = step_count(dt, maxtime);
    let capacity = nsteps
        .checked_add(1)
        .filter(|&n| n <= MAX_STEPS + 1)
        .ok_or_else(|| {
            LumpedError::invalid_param(format!(
                "maxtime {} with dt {} exceeds the limit of {} steps",
                maxtime, dt, MAX_STEPS
            ))
        })?;
    let mut times = Vec::with_capacity(capacity);
    let mut states = Vec::with_capacity(capacity);

    let x0 = {
        let mut steady = Stepper::new(system, 0.0, max_diode_iterations);
        let rhs = steady.system().source_vector(0.0);
        steady.solve(&rhs, 0.0)?
    };
    tracing::debug!(nsteps, "steady state solved");
    times.push(0.0);
    states.push(x0);

    let coefficient = match scheme {
        Scheme::Bdf => 1.0 / dt,
        Scheme::Bdf2 => 3.0 / (2.0 * dt),
    };
    let mut stepper = Stepper::new(system, coefficient, max_diode_iterations);

    for n in 0..nsteps {
        let t = (n + 1) as f64 * dt;
        let x_n = &states[n];
        let x_prev = if n == 0 { x_n } else { &states[n - 1] };

        let history: Vec<f64> = match scheme {
            Scheme::Bdf => x_n.iter().map(|v| v / dt).collect(),
            Scheme::Bdf2 => x_n
                .iter()
                .zip(x_prev)
                .map(|(a, b)| (4.0 * a - b) / (2.0 * dt))
                .collect(),
        };
        let system = stepper.system();
        let rhs: Vec<f64> = system
            .source_vector(t)
            .iter()
            .zip(system.m1.mul_vec(&history))
            .map(|(s, h)| s + h)
            .collect();

        let x = stepper.solve(&rhs, t)?;
        times.push(t);
        states.push(x);
    }

    Ok(Trajectory { times, states })
}

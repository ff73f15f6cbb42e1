//! Equation assembly and transient solving.
//!
//! A reduced network becomes the differential-algebraic system
//!
//! ```text
//! M1 · dx/dt + M0 · x = Source(t)
//! ```
//!
//! where `x` holds node pressures followed by path flows. The system is
//! initialized with the steady state `M0 · x0 = Source(0)` and then advanced
//! with BDF or BDF2. Ideal diodes switch between a conducting row and a
//! blocking row as the solution evolves.

mod assembly;
mod dense;
mod diode;
mod integrator;
mod simulator;

pub use assembly::{assemble, AssembledSystem, RowKind, Unknown};
pub use dense::{DenseMatrix, LuFactors, PIVOT_TOLERANCE};
pub use diode::{DiodeRow, DIODE_TOLERANCE, RELAXATION_RESISTANCE};
pub use integrator::{integrate, step_count, Scheme, Stepper, Trajectory, STEP_COUNT_GUARD};
pub use simulator::{SolveReport, Solver, SolverConfig};

/// Default time step.
pub const DEFAULT_DT: f64 = 0.01;

/// Default end time.
pub const DEFAULT_MAXTIME: f64 = 10.0;

/// Largest number of time steps a single run may take.
pub const MAX_STEPS: usize = 1_000_000;

/// Maximum diode switching rounds per solve.
pub const MAX_DIODE_ITERATIONS: usize = 50;

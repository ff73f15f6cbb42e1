//! # Lumped Core
//!
//! A lumped-parameter network simulator built on the hydraulic/electric
//! analogy: pressure plays the role of voltage and flow the role of current.
//!
//! This library provides:
//! - A schematic model where elements are connected by coincident endpoints
//! - Reduction of the drawn network to nodes and non-branching paths
//! - A structural check that equations and unknowns balance
//! - Assembly of the DAE `M1 · dx/dt + M0 · x = Source(t)` and BDF/BDF2 stepping
//! - Ideal diodes switched between conducting and blocking rows
//! - An infix calculator for time-dependent sources
//!
//! ## Architecture
//!
//! - [`circuit`] - Schematic, graph reduction, path decomposition, structural check
//! - [`expr`] - Source expression calculator
//! - [`solver`] - Matrix assembly, diode switching and time integration
//! - [`output`] - Solution time series and text export
//! - [`netlist`] - Text format for describing schematics
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! lumped network.net --dt 0.01 --maxtime 5 -o solution.txt
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use lumped_core::{ElementKind, Schematic, Solver, SolverConfig};
//!
//! let mut schematic = Schematic::new();
//! schematic.add_element(ElementKind::PressureSource, "P1", (0.0, 0.0), (0.0, -1.0), 10.0);
//! schematic.add_element(ElementKind::Resistor, "R1", (0.0, 0.0), (1.0, 0.0), 25.0);
//! schematic.add_element(ElementKind::Capacitor, "C1", (1.0, 0.0), (2.0, 0.0), 2.0);
//! schematic.add_element(ElementKind::Ground, "G1", (2.0, 0.0), (2.0, 1.0), 0.0);
//!
//! let solver = Solver::new(SolverConfig::new().with_dt(0.1).with_maxtime(5.0));
//! let report = solver.solve(&schematic)?;
//! if let Some(solution) = report.solution() {
//!     print!("{}", solution.export_full()?);
//! }
//! # Ok::<(), lumped_core::LumpedError>(())
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmSolver } from 'lumped_core';
//!
//! const solver = new WasmSolver(netlist);
//! const status = solver.solve();
//! const text = solver.export_full();
//! ```

pub mod circuit;
pub mod error;
pub mod expr;
pub mod netlist;
pub mod output;
pub mod solver;

// Re-export main types for convenience
pub use circuit::{ElementKind, Schematic};
pub use error::{LumpedError, Result};
pub use expr::{Calculator, SourceEvaluator};
pub use output::Solution;
pub use solver::{Scheme, SolveReport, Solver, SolverConfig};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmSolver;

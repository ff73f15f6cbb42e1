//! WASM bindings for Lumped Core.
//!
//! This module provides JavaScript-friendly bindings so that a browser editor
//! can hand a netlist to the solver and read back the exported series.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmSolver } from 'lumped_core';
//!
//! await init();
//!
//! const netlist = `
//!   psource P1 0 0 0 -1 10
//!   resistor R1 0 0 1 0 25
//!   capacitor C1 1 0 2 0 2
//!   ground G1 2 0 2 1
//!   .listen_p 1 0 vc
//! `;
//!
//! const solver = new WasmSolver(netlist);
//! solver.dt = 0.1;
//! solver.maxtime = 5;
//! if (solver.solve() === 0) {
//!   console.log(solver.export_listened());
//! }
//! ```

use wasm_bindgen::prelude::*;

use crate::error::LumpedError;
use crate::netlist::{self, Netlist};
use crate::output::Solution;
use crate::solver::{Scheme, Solver, SolverConfig};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(e: LumpedError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-compatible network solver.
///
/// Holds a parsed netlist, the solver settings and the last solution.
#[wasm_bindgen]
pub struct WasmSolver {
    netlist: Netlist,
    config: SolverConfig,
    solution: Option<Solution>,
    message: String,
}

#[wasm_bindgen]
impl WasmSolver {
    /// Create a solver from a netlist string.
    ///
    /// Settings given by `.dt`, `.maxtime` and `.scheme` directives are
    /// applied on top of the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(netlist_text: &str) -> Result<WasmSolver, JsValue> {
        let netlist = netlist::parse(netlist_text).map_err(to_js)?;
        let config = netlist.config(SolverConfig::new());
        Ok(WasmSolver {
            netlist,
            config,
            solution: None,
            message: String::new(),
        })
    }

    #[wasm_bindgen(getter)]
    pub fn dt(&self) -> f64 {
        self.config.dt
    }

    #[wasm_bindgen(setter)]
    pub fn set_dt(&mut self, dt: f64) {
        self.config.dt = dt;
    }

    #[wasm_bindgen(getter)]
    pub fn maxtime(&self) -> f64 {
        self.config.maxtime
    }

    #[wasm_bindgen(setter)]
    pub fn set_maxtime(&mut self, maxtime: f64) {
        self.config.maxtime = maxtime;
    }

    /// Select the scheme by name, `"BDF"` or `"BDF2"`.
    #[wasm_bindgen]
    pub fn set_scheme(&mut self, name: &str) -> Result<(), JsValue> {
        self.config.scheme = name.parse::<Scheme>().map_err(to_js)?;
        Ok(())
    }

    /// Run the simulation and return its status code.
    ///
    /// 0 solved, 1 under-constrained, 2 over-constrained or singular.
    /// Hard failures (unsupported topology, bad expression) are thrown.
    #[wasm_bindgen]
    pub fn solve(&mut self) -> Result<u8, JsValue> {
        let report = Solver::new(self.config.clone())
            .solve(&self.netlist.schematic)
            .map_err(to_js)?;
        let status = report.status();
        self.message = report.message();
        self.solution = report.into_solution();
        Ok(status)
    }

    /// Explanation of the last solve's status.
    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }

    /// Every unknown of the last solution, in export format.
    #[wasm_bindgen]
    pub fn export_full(&self) -> Result<String, JsValue> {
        self.last_solution()?.export_full().map_err(to_js)
    }

    /// Listened unknowns of the last solution, in export format.
    #[wasm_bindgen]
    pub fn export_listened(&self) -> Result<String, JsValue> {
        self.last_solution()?.export_listened().map_err(to_js)
    }

    /// Time series of one unknown by name, or `undefined`.
    #[wasm_bindgen]
    pub fn series(&self, name: &str) -> Option<Vec<f64>> {
        self.solution
            .as_ref()
            .and_then(|s| s.series(name))
            .map(<[f64]>::to_vec)
    }

    /// Time of each solution column.
    #[wasm_bindgen]
    pub fn times(&self) -> Vec<f64> {
        self.solution
            .as_ref()
            .map(|s| s.times.clone())
            .unwrap_or_default()
    }
}

impl WasmSolver {
    fn last_solution(&self) -> Result<&Solution, JsValue> {
        self.solution.as_ref().ok_or_else(|| {
            to_js(LumpedError::WasmError {
                message: "no solution available, call solve() first".to_string(),
            })
        })
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

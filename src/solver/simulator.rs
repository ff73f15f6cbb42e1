//! Main solver interface.

use crate::circuit::{
    check_no_solution, count_equations, max_non_branching_paths, CircuitGraph, Schematic,
    StructuralStatus,
};
use crate::error::{LumpedError, Result};
use crate::expr::{Calculator, SourceEvaluator};
use crate::output::Solution;

use super::assembly::assemble;
use super::integrator::{integrate, step_count, Scheme};
use super::{DEFAULT_DT, DEFAULT_MAXTIME, MAX_DIODE_ITERATIONS, MAX_STEPS};

/// Configuration for the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Time step.
    pub dt: f64,
    /// End time; the run takes `floor(maxtime/dt)` steps.
    pub maxtime: f64,
    /// Time integration scheme.
    pub scheme: Scheme,
    /// Maximum diode switching rounds per solve.
    pub max_diode_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            maxtime: DEFAULT_MAXTIME,
            scheme: Scheme::default(),
            max_diode_iterations: MAX_DIODE_ITERATIONS,
        }
    }
}

impl SolverConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time step.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set the end time.
    pub fn with_maxtime(mut self, maxtime: f64) -> Self {
        self.maxtime = maxtime;
        self
    }

    /// Set the time integration scheme.
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set the diode switching cap.
    ///
    /// A run whose diodes are still switching after this many rounds in a
    /// single step fails with [`LumpedError::SimulationFault`].
    pub fn with_max_diode_iterations(mut self, max_diode_iterations: usize) -> Self {
        self.max_diode_iterations = max_diode_iterations;
        self
    }

    /// Check the parameters before a run.
    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(LumpedError::invalid_param(format!(
                "time step must be positive, got {}",
                self.dt
            )));
        }
        if !(self.maxtime.is_finite() && self.maxtime >= 0.0) {
            return Err(LumpedError::invalid_param(format!(
                "end time must be non-negative, got {}",
                self.maxtime
            )));
        }
        let steps = self.maxtime / self.dt;
        if !(steps.is_finite() && steps <= MAX_STEPS as f64) {
            return Err(LumpedError::invalid_param(format!(
                "maxtime / dt = {} exceeds the limit of {} steps",
                steps, MAX_STEPS
            )));
        }
        if self.max_diode_iterations == 0 {
            return Err(LumpedError::invalid_param(
                "diode iteration cap must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Outcome of a solve.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveReport {
    Solved(Solution),
    /// Fewer equations than unknowns: add a source
    UnderConstrained { equations: usize, unknowns: usize },
    /// More equations than unknowns: remove a source
    OverConstrained { equations: usize, unknowns: usize },
    /// Counts balance but the system has no unique solution
    Singular { time: f64 },
}

impl SolveReport {
    /// 0 solved, 1 under-constrained, 2 over-constrained or singular.
    pub fn status(&self) -> u8 {
        match self {
            Self::Solved(_) => 0,
            Self::UnderConstrained { .. } => 1,
            Self::OverConstrained { .. } | Self::Singular { .. } => 2,
        }
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Self::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn into_solution(self) -> Option<Solution> {
        match self {
            Self::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    /// User-facing explanation of a failed solve.
    pub fn message(&self) -> String {
        match self {
            Self::Solved(_) => "solved".to_string(),
            Self::UnderConstrained { .. } => StructuralStatus::UnderConstrained.to_string(),
            Self::OverConstrained { .. } => StructuralStatus::OverConstrained.to_string(),
            Self::Singular { time } => format!(
                "the system is singular at t = {}, check for conflicting sources",
                time
            ),
        }
    }
}

/// Reduces, assembles and integrates schematics.
///
/// Nothing is cached between calls: every [`Solver::solve`] rebuilds the
/// graph, the paths and the matrices from the schematic it is given.
pub struct Solver {
    config: SolverConfig,
    evaluator: Box<dyn SourceEvaluator>,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl Solver {
    /// Create a solver using the built-in [`Calculator`].
    pub fn new(config: SolverConfig) -> Self {
        Self::with_evaluator(config, Calculator)
    }

    /// Create a solver with a custom source evaluator.
    pub fn with_evaluator(config: SolverConfig, evaluator: impl SourceEvaluator + 'static) -> Self {
        Self {
            config,
            evaluator: Box::new(evaluator),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SolverConfig {
        &mut self.config
    }

    /// Run the full pipeline on a schematic snapshot.
    pub fn solve(&self, schematic: &Schematic) -> Result<SolveReport> {
        let config = &self.config;
        config.validate()?;
        if schematic.is_empty() {
            return Err(LumpedError::EmptyNetwork);
        }

        let _span = tracing::info_span!(
            "solve",
            elements = schematic.elements.len(),
            scheme = %config.scheme,
            dt = config.dt,
            maxtime = config.maxtime
        )
        .entered();

        let graph = CircuitGraph::from_schematic(schematic)?;
        let paths = max_non_branching_paths(&graph)?;

        match check_no_solution(&graph, &paths) {
            StructuralStatus::Balanced => {}
            status => {
                let count = count_equations(&graph, &paths);
                let (equations, unknowns) = (count.equations, count.unknowns);
                return Ok(match status {
                    StructuralStatus::UnderConstrained => {
                        SolveReport::UnderConstrained { equations, unknowns }
                    }
                    _ => SolveReport::OverConstrained { equations, unknowns },
                });
            }
        }

        let mut system = assemble(schematic, &graph, &paths, self.evaluator.as_ref())?;
        let trajectory = match integrate(
            &mut system,
            config.scheme,
            config.dt,
            config.maxtime,
            config.max_diode_iterations,
        ) {
            Ok(trajectory) => trajectory,
            Err(LumpedError::SingularMatrix { time }) => {
                tracing::warn!(time, "singular system");
                return Ok(SolveReport::Singular { time });
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            unknowns = system.size(),
            steps = step_count(config.dt, config.maxtime),
            "simulation finished"
        );
        Ok(SolveReport::Solved(Solution::from_trajectory(
            &system, trajectory,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::ElementKind::*;
    use approx::assert_relative_eq;

    fn divider() -> Schematic {
        let mut s = Schematic::new();
        s.add_element(PressureSource, "P", (0.0, 0.0), (0.0, -1.0), 10.0);
        s.add_element(Resistor, "R1", (0.0, 0.0), (1.0, 0.0), 25.0);
        s.add_element(Resistor, "R2", (1.0, 0.0), (2.0, 0.0), 10.0);
        s.add_element(Ground, "G", (2.0, 0.0), (2.0, 1.0), 0.0);
        s
    }

    #[test]
    fn test_config_defaults_and_builder() {
        let config = SolverConfig::new();
        assert_eq!(config.dt, 0.01);
        assert_eq!(config.maxtime, 10.0);
        assert_eq!(config.scheme, Scheme::Bdf);

        let config = config
            .with_dt(0.1)
            .with_maxtime(2.0)
            .with_scheme(Scheme::Bdf2)
            .with_max_diode_iterations(7);
        assert_eq!(config.dt, 0.1);
        assert_eq!(config.maxtime, 2.0);
        assert_eq!(config.scheme, Scheme::Bdf2);
        assert_eq!(config.max_diode_iterations, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(SolverConfig::new().with_dt(0.0).validate().is_err());
        assert!(SolverConfig::new().with_dt(f64::NAN).validate().is_err());
        assert!(SolverConfig::new().with_maxtime(-1.0).validate().is_err());
        assert!(SolverConfig::new()
            .with_max_diode_iterations(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_config_rejects_too_many_steps() {
        assert!(SolverConfig::new()
            .with_dt(1e-300)
            .with_maxtime(1.0)
            .validate()
            .is_err());
        assert!(SolverConfig::new()
            .with_dt(1e-9)
            .with_maxtime(10.0)
            .validate()
            .is_err());
        assert!(SolverConfig::new()
            .with_dt(1e-5)
            .with_maxtime(10.0)
            .validate()
            .is_ok());

        let solver = Solver::new(SolverConfig::new().with_dt(1e-300).with_maxtime(1.0));
        assert!(matches!(
            solver.solve(&divider()),
            Err(LumpedError::InvalidSimulationParam { .. })
        ));
    }

    #[test]
    fn test_divider_solves() {
        let solver = Solver::new(SolverConfig::new().with_dt(0.1).with_maxtime(1.0));
        let report = solver.solve(&divider()).unwrap();
        assert_eq!(report.status(), 0);

        let solution = report.solution().unwrap();
        assert_eq!(solution.num_steps(), 11);
        let q = solution.flow(0).unwrap();
        for &v in q {
            assert_relative_eq!(v, 10.0 / 35.0, epsilon = 1e-12);
        }
        assert_relative_eq!(
            solution.final_value("P1").unwrap(),
            100.0 / 35.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_empty_schematic_is_an_error() {
        assert!(matches!(
            Solver::default().solve(&Schematic::new()),
            Err(LumpedError::EmptyNetwork)
        ));
    }

    #[test]
    fn test_missing_source_is_under_constrained() {
        let mut s = Schematic::new();
        s.add_element(Resistor, "R", (0.0, 0.0), (1.0, 0.0), 1.0);
        let report = Solver::default().solve(&s).unwrap();
        assert_eq!(report.status(), 1);
        assert!(report.message().contains("add a source"));
    }

    #[test]
    fn test_custom_evaluator() {
        struct Doubler;
        impl SourceEvaluator for Doubler {
            fn evaluate(
                &self,
                value: &crate::circuit::SourceValue<'_>,
            ) -> Result<crate::expr::SourceFn> {
                let v = match *value {
                    crate::circuit::SourceValue::Constant(v) => v,
                    crate::circuit::SourceValue::Expression(_) => 0.0,
                };
                Ok(Box::new(move |_| 2.0 * v))
            }
        }

        let solver = Solver::with_evaluator(SolverConfig::new().with_maxtime(0.0), Doubler);
        let report = solver.solve(&divider()).unwrap();
        let q = report.solution().unwrap().flow(0).unwrap()[0];
        assert_relative_eq!(q, 20.0 / 35.0, epsilon = 1e-12);
    }
}

//! Integration tests for lumped_core: netlist in, solution out.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use lumped_core::{
    netlist, ElementKind, LumpedError, Scheme, Schematic, SolveReport, Solver, SolverConfig,
};

fn solve(text: &str) -> SolveReport {
    let netlist = netlist::parse(text).expect("netlist should parse");
    let solver = Solver::new(netlist.config(SolverConfig::new()));
    solver.solve(&netlist.schematic).expect("solve should not fail")
}

const DIVIDER: &str = "
.dt 0.5
.maxtime 1
psource P1 0 0 0 -1 10
resistor R1 0 0 1 0 25
resistor R2 1 0 2 0 10
ground G1 2 0 2 1
.listen_p 1 0 mid
.listen_q R1 q
";

fn rc(scheme: &str) -> String {
    format!(
        "
.dt 0.1
.maxtime 5
.scheme {}
psource P1 0 0 0 -1 \"10*(t>0)\"
resistor R1 0 0 1 0 25
capacitor C1 1 0 2 0 2
ground G1 2 0 2 1
.listen_p 1 0 vc
",
        scheme
    )
}

#[test]
fn test_divider() {
    let report = solve(DIVIDER);
    assert_eq!(report.status(), 0);

    let solution = report.solution().unwrap();
    assert_eq!(solution.num_steps(), 3);
    for &q in solution.series("q").unwrap() {
        assert_relative_eq!(q, 10.0 / 35.0, epsilon = 1e-12);
    }
    for &p in solution.series("mid").unwrap() {
        assert_relative_eq!(p, 10.0 / 35.0 * 10.0, epsilon = 1e-12);
    }
}

#[test]
fn test_divider_listened_export() {
    let report = solve(DIVIDER);
    let text = report.solution().unwrap().export_listened().unwrap();
    assert_eq!(
        text,
        "# mid q\n\
         2.8571428571 2.8571428571 2.8571428571\n\
         0.28571428571 0.28571428571 0.28571428571\n"
    );
}

#[test]
fn test_full_export_has_one_line_per_unknown() {
    let report = solve(DIVIDER);
    let solution = report.solution().unwrap();
    let text = solution.export_full().unwrap();
    let mut lines = text.lines();

    let header: Vec<&str> = lines.next().unwrap().split_whitespace().collect();
    assert_eq!(header[0], "#");
    assert_eq!(header.len() - 1, solution.num_unknowns());
    assert!(header.contains(&"mid"));
    assert!(header.contains(&"q"));

    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), solution.num_unknowns());
    for row in rows {
        assert_eq!(row.split_whitespace().count(), 3);
    }
}

#[test]
fn test_rc_charges_monotonically_without_overshoot() {
    let report = solve(&rc("BDF"));
    assert_eq!(report.status(), 0);

    let vc = report.solution().unwrap().series("vc").unwrap();
    assert_eq!(vc.len(), 51);
    assert_abs_diff_eq!(vc[0], 0.0, epsilon = 1e-12);
    for pair in vc.windows(2) {
        assert!(pair[1] > pair[0], "{} then {}", pair[0], pair[1]);
        assert!(pair[1] < 10.0);
    }
}

#[test]
fn test_bdf2_tracks_exponential() {
    let exact = 10.0 * (1.0 - (-5.0_f64 / 50.0).exp());
    let report = solve(&rc("BDF2"));
    let vc = report.solution().unwrap().final_value("vc").unwrap();
    assert_relative_eq!(vc, exact, epsilon = 1e-2);
}

#[test]
fn test_forward_diode_conducts() {
    let report = solve(
        ".dt 0.1\n.maxtime 0.5\n\
         psource P1 0 0 0 -1 5\n\
         diode D1 0 0 1 0\n\
         resistor R1 1 0 2 0 10\n\
         ground G1 2 0 2 1\n\
         .listen_q D1 qd\n",
    );
    let solution = report.solution().unwrap();
    assert_relative_eq!(solution.final_value("qd").unwrap(), 0.5, epsilon = 1e-6);
    assert!(solution.diode("D1").unwrap().open);
}

#[test]
fn test_reverse_diode_blocks() {
    let report = solve(
        ".dt 0.1\n.maxtime 0.5\n\
         psource P1 0 0 0 -1 5\n\
         diode D1 1 0 0 0\n\
         resistor R1 1 0 2 0 10\n\
         ground G1 2 0 2 1\n\
         .listen_q D1 qd\n",
    );
    let solution = report.solution().unwrap();
    for &q in solution.series("qd").unwrap() {
        assert_abs_diff_eq!(q, 0.0, epsilon = 1e-12);
    }
    assert!(!solution.diode("D1").unwrap().open);
}

#[test]
fn test_antiparallel_diodes_settle() {
    let report = solve(
        ".dt 0.1\n.maxtime 0.5\n\
         psource P1 0 0 0 -1 5\n\
         diode D1 0 0 1 0\n\
         diode D2 1 0 0 0\n\
         resistor R1 1 0 2 0 10\n\
         ground G1 2 0 2 1\n\
         .listen_q R1 q\n",
    );
    assert_eq!(report.status(), 0);
    let solution = report.solution().unwrap();
    assert!(solution.diode("D1").unwrap().open);
    assert!(!solution.diode("D2").unwrap().open);
    assert_relative_eq!(solution.final_value("q").unwrap(), 0.5, epsilon = 1e-9);
}

#[test]
fn test_large_coordinates_are_not_merged() {
    let report = solve(
        ".maxtime 0\n\
         psource P1 1e10 0 1e10 -1 10\n\
         resistor R1 1e10 0 2e10 0 10\n\
         ground G1 2e10 0 2e10 1\n\
         .listen_q R1 q\n",
    );
    assert_eq!(report.status(), 0, "{}", report.message());
    let q = report.solution().unwrap().final_value("q").unwrap();
    assert_relative_eq!(q, 1.0, epsilon = 1e-12);
}

#[test]
fn test_too_many_steps_is_rejected() {
    let netlist = netlist::parse(&rc("BDF")).unwrap();
    let solver = Solver::new(netlist.config(SolverConfig::new()).with_dt(1e-300));
    assert!(matches!(
        solver.solve(&netlist.schematic),
        Err(LumpedError::InvalidSimulationParam { .. })
    ));
}

#[test]
fn test_repeated_solves_are_identical() {
    let netlist = netlist::parse(&rc("BDF2")).unwrap();
    let solver = Solver::new(netlist.config(SolverConfig::new()));
    let first = solver.solve(&netlist.schematic).unwrap();
    let second = solver.solve(&netlist.schematic).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_conflicting_sources_report_status_2() {
    let report = solve(
        "psource P1 0 0 0 -1 1\n\
         psource P2 0 0 1 -1 2\n\
         resistor R1 0 0 1 0 1\n\
         ground G1 1 0 1 1\n",
    );
    assert_eq!(report.status(), 2);
    assert!(report.solution().is_none());
}

#[test]
fn test_sourceless_network_reports_status_1() {
    let report = solve("resistor R1 0 0 1 0 1\ncapacitor C1 1 0 2 0 1\n");
    assert_eq!(report.status(), 1);
}

#[test]
fn test_wire_only_loop_is_an_error() {
    let netlist = netlist::parse(&format!(
        "{}wire Wa 10 0 11 0\nwire Wb 11 0 11 1\nwire Wc 11 1 10 0\n",
        DIVIDER
    ))
    .unwrap();
    assert!(matches!(
        Solver::default().solve(&netlist.schematic),
        Err(LumpedError::GraphReduction { .. })
    ));
}

#[test]
fn test_pure_cycle_is_unsupported() {
    let mut s = Schematic::new();
    s.add_element(ElementKind::Resistor, "R1", (0.0, 0.0), (1.0, 0.0), 1.0);
    s.add_element(ElementKind::Resistor, "R2", (1.0, 0.0), (1.0, 1.0), 1.0);
    s.add_element(ElementKind::Capacitor, "C1", (1.0, 1.0), (0.0, 0.0), 1.0);
    assert!(matches!(
        Solver::default().solve(&s),
        Err(LumpedError::UnsupportedTopology { .. })
    ));
}

#[test]
fn test_bad_source_expression_aborts() {
    let netlist = netlist::parse(
        "psource P1 0 0 0 -1 \"sin(\"\n\
         resistor R1 0 0 1 0 1\n\
         ground G1 1 0 1 1\n",
    )
    .unwrap();
    let err = Solver::default().solve(&netlist.schematic).unwrap_err();
    assert!(err.is_expression_error(), "got {:?}", err);
}

#[test]
fn test_config_flags_override_netlist() {
    let netlist = netlist::parse(&rc("BDF")).unwrap();
    let config = netlist.config(SolverConfig::new()).with_scheme(Scheme::Bdf2);
    assert_eq!(config.scheme, Scheme::Bdf2);
    assert_eq!(config.dt, 0.1);
}

//! Simulation results and their text exports.
//!
//! Both exports share one layout: a header line `# name1 name2 ...`, then one
//! line per unknown holding its value at every step, whitespace separated,
//! with 11 significant digits.

use std::io::Write;

use crate::error::{LumpedError, Result};
use crate::solver::{AssembledSystem, Trajectory};

/// Significant digits of exported values.
pub const EXPORT_DIGITS: usize = 11;

/// Final state of one diode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiodeState {
    pub name: String,
    pub open: bool,
}

/// Values of every unknown at every step.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Unknown names, pressures first
    pub names: Vec<String>,
    /// Whether each unknown was requested by a listener
    pub listened: Vec<bool>,
    pub num_pressures: usize,
    /// Time of each column, starting at 0
    pub times: Vec<f64>,
    /// `values[unknown][step]`
    pub values: Vec<Vec<f64>>,
    /// Diode states after the last step
    pub diodes: Vec<DiodeState>,
}

impl Solution {
    /// Transpose a trajectory into per-unknown series.
    pub fn from_trajectory(system: &AssembledSystem, trajectory: Trajectory) -> Self {
        let size = system.size();
        let mut values = vec![Vec::with_capacity(trajectory.states.len()); size];
        for state in &trajectory.states {
            for (series, &v) in values.iter_mut().zip(state) {
                series.push(v);
            }
        }

        Self {
            names: system.unknowns.iter().map(|u| u.name.clone()).collect(),
            listened: system.unknowns.iter().map(|u| u.listened).collect(),
            num_pressures: system.num_pressures,
            times: trajectory.times,
            values,
            diodes: system
                .diodes
                .iter()
                .map(|d| DiodeState {
                    name: d.name.clone(),
                    open: d.open,
                })
                .collect(),
        }
    }

    pub fn num_unknowns(&self) -> usize {
        self.names.len()
    }

    pub fn num_steps(&self) -> usize {
        self.times.len()
    }

    /// Series of the unknown called `name`.
    pub fn series(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i].as_slice())
    }

    /// Value of `name` at the last step.
    pub fn final_value(&self, name: &str) -> Option<f64> {
        self.series(name).and_then(|s| s.last().copied())
    }

    /// Flow series of path `j`.
    pub fn flow(&self, j: usize) -> Option<&[f64]> {
        self.values.get(self.num_pressures + j).map(Vec::as_slice)
    }

    pub fn diode(&self, name: &str) -> Option<&DiodeState> {
        self.diodes.iter().find(|d| d.name == name)
    }

    /// Write every unknown.
    pub fn write_full<W: Write>(&self, out: &mut W) -> Result<()> {
        self.write_rows(out, |_| true)
    }

    /// Write only the listened unknowns.
    pub fn write_listened<W: Write>(&self, out: &mut W) -> Result<()> {
        self.write_rows(out, |i| self.listened[i])
    }

    pub fn export_full(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_full(&mut buf)?;
        String::from_utf8(buf).map_err(|e| LumpedError::internal(e.to_string()))
    }

    pub fn export_listened(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_listened(&mut buf)?;
        String::from_utf8(buf).map_err(|e| LumpedError::internal(e.to_string()))
    }

    fn write_rows<W: Write>(&self, out: &mut W, keep: impl Fn(usize) -> bool) -> Result<()> {
        let selected: Vec<usize> = (0..self.num_unknowns()).filter(|&i| keep(i)).collect();
        let io = |source| LumpedError::OutputError { source };

        let header: Vec<&str> = selected.iter().map(|&i| self.names[i].as_str()).collect();
        writeln!(out, "# {}", header.join(" ")).map_err(io)?;
        for &i in &selected {
            let line: Vec<String> = self.values[i]
                .iter()
                .map(|&v| format_general(v, EXPORT_DIGITS))
                .collect();
            writeln!(out, "{}", line.join(" ")).map_err(io)?;
        }
        Ok(())
    }
}

/// Shortest of fixed and scientific notation with `digits` significant
/// digits and trailing zeros removed, as C's `%.<digits>g`.
pub fn format_general(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let digits = digits.max(1);
    // Round first, so 9.99..e-1 promoted to 1e0 picks the right notation
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

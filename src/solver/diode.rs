//! Ideal diode switching.
//!
//! An ideal diode is a valve. While open it conducts with no pressure drop
//! (`P0 - P1 = 0`); while closed it blocks (`Q = 0`). Both forms are a single
//! row of `M0`, so a state change only rewrites that row.
//!
//! After every solve each diode is checked against the fresh solution:
//!
//! | State | Transition when |
//! |-------|-----------------|
//! | open | forward flow `< -DIODE_TOLERANCE` → closed |
//! | closed | forward pressure drop `> DIODE_TOLERANCE` → open |

use super::dense::DenseMatrix;
use crate::circuit::ElementId;

/// Hysteresis band around zero for diode switching.
pub const DIODE_TOLERANCE: f64 = 1e-12;

/// Resistance of the temporary rows installed when switching gets stuck.
pub const RELAXATION_RESISTANCE: f64 = 1e-6;

/// One diode row of the assembled system.
#[derive(Debug, Clone, PartialEq)]
pub struct DiodeRow {
    pub element: ElementId,
    pub name: String,
    /// Row of `M0` owned by this diode
    pub row: usize,
    /// Upstream pressure unknown in traversal order, `None` at a reference
    pub p0: Option<usize>,
    /// Downstream pressure unknown in traversal order
    pub p1: Option<usize>,
    /// Flow unknown of the enclosing path
    pub q: usize,
    /// +1 when the path traversal follows the conducting direction
    pub forward_sign: f64,
    /// Conducting
    pub open: bool,
}

fn pressure(x: &[f64], index: Option<usize>) -> f64 {
    index.map_or(0.0, |i| x[i])
}

impl DiodeRow {
    /// Flow in the conducting direction.
    pub fn forward_flow(&self, x: &[f64]) -> f64 {
        self.forward_sign * x[self.q]
    }

    /// Pressure drop across the diode in the conducting direction.
    pub fn forward_drop(&self, x: &[f64]) -> f64 {
        self.forward_sign * (pressure(x, self.p0) - pressure(x, self.p1))
    }

    /// Apply the switching rule; returns true if the state changed.
    pub fn update(&mut self, x: &[f64]) -> bool {
        let next = if self.open {
            self.forward_flow(x) >= -DIODE_TOLERANCE
        } else {
            self.forward_drop(x) > DIODE_TOLERANCE
        };
        let toggled = next != self.open;
        self.open = next;
        toggled
    }

    /// Write the row matching the current state into `m0`.
    pub fn write_row(&self, m0: &mut DenseMatrix) {
        m0.clear_row(self.row);
        if self.open {
            m0.add_opt(self.row, self.p0, 1.0);
            m0.add_opt(self.row, self.p1, -1.0);
        } else {
            m0.set(self.row, self.q, 1.0);
        }
    }

    /// Write a small resistor row in place of the ideal one.
    pub fn write_relaxed_row(&self, m0: &mut DenseMatrix) {
        m0.clear_row(self.row);
        m0.add_opt(self.row, self.p0, 1.0);
        m0.add_opt(self.row, self.p1, -1.0);
        m0.set(self.row, self.q, -RELAXATION_RESISTANCE);
    }
}

/// Update every diode against `x`; returns how many switched.
pub fn update_all(diodes: &mut [DiodeRow], x: &[f64]) -> usize {
    diodes.iter_mut().map(|d| usize::from(d.update(x))).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diode(forward_sign: f64) -> DiodeRow {
        DiodeRow {
            element: ElementId(0),
            name: "D1".to_string(),
            row: 1,
            p0: Some(0),
            p1: None,
            q: 1,
            forward_sign,
            open: true,
        }
    }

    #[test]
    fn test_open_diode_closes_on_reverse_flow() {
        let mut d = diode(1.0);
        assert!(!d.update(&[0.0, 0.5]));
        assert!(d.open);
        assert!(d.update(&[0.0, -0.5]));
        assert!(!d.open);
    }

    #[test]
    fn test_closed_diode_opens_on_forward_drop() {
        let mut d = diode(-1.0);
        d.open = false;
        // Traversal runs against the conducting direction
        assert!(!d.update(&[2.0, 0.0]));
        assert!(d.update(&[-2.0, 0.0]));
        assert!(d.open);
    }

    #[test]
    fn test_tolerance_band_keeps_state() {
        let mut d = diode(1.0);
        assert!(!d.update(&[0.0, -1e-13]));
        d.open = false;
        assert!(!d.update(&[1e-13, 0.0]));
    }

    #[test]
    fn test_rows_follow_state() {
        let mut m0 = DenseMatrix::zeros(2);
        let mut d = diode(1.0);
        d.write_row(&mut m0);
        assert_eq!(m0.row(1), &[1.0, 0.0]);

        d.open = false;
        d.write_row(&mut m0);
        assert_eq!(m0.row(1), &[0.0, 1.0]);

        d.write_relaxed_row(&mut m0);
        assert_eq!(m0.row(1), &[1.0, -RELAXATION_RESISTANCE]);
    }

    #[test]
    fn test_update_all_counts_toggles() {
        let mut diodes = vec![diode(1.0), diode(-1.0)];
        // Forward flow for the first, reverse for the second
        assert_eq!(update_all(&mut diodes, &[0.0, 1.0]), 1);
        assert!(diodes[0].open);
        assert!(!diodes[1].open);
    }
}

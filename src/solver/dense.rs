//! Dense row-major matrices and LU factorization.

use crate::error::{LumpedError, Result};

/// Pivots smaller than this fraction of the largest entry count as zero.
pub const PIVOT_TOLERANCE: f64 = 1e-12;

/// Square dense matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    size: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            data: vec![0.0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.size + col]
    }

    /// Set matrix element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.size + col] = value;
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.size + col] += value;
    }

    /// Add to (row, col) when the column exists; a missing column is a
    /// reference potential and contributes nothing.
    pub fn add_opt(&mut self, row: usize, col: Option<usize>, value: f64) {
        if let Some(col) = col {
            self.add(row, col, value);
        }
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.size..(row + 1) * self.size]
    }

    /// Zero a whole row.
    pub fn clear_row(&mut self, row: usize) {
        self.data[row * self.size..(row + 1) * self.size].fill(0.0);
    }

    /// `a·self + b·other`.
    pub fn combine(&self, a: f64, other: &DenseMatrix, b: f64) -> DenseMatrix {
        debug_assert_eq!(self.size, other.size);
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(x, y)| a * x + b * y)
            .collect();
        DenseMatrix {
            size: self.size,
            data,
        }
    }

    /// Matrix-vector product.
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        (0..self.size)
            .map(|i| self.row(i).iter().zip(x).map(|(a, b)| a * b).sum())
            .collect()
    }

    /// Largest absolute entry.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
    }

    /// Factor with partial pivoting. `time` only labels the error.
    pub fn factor(&self, time: f64) -> Result<LuFactors> {
        LuFactors::new(self, time)
    }
}

/// LU decomposition `PA = LU` with unit lower diagonal, packed in one matrix.
#[derive(Debug, Clone)]
pub struct LuFactors {
    size: usize,
    lu: Vec<f64>,
    pivots: Vec<usize>,
}

impl LuFactors {
    /// Perform LU decomposition with partial pivoting.
    pub fn new(matrix: &DenseMatrix, time: f64) -> Result<Self> {
        let n = matrix.size;
        let mut lu = matrix.data.clone();
        let mut pivots: Vec<usize> = (0..n).collect();
        let threshold = PIVOT_TOLERANCE * matrix.max_abs();

        for k in 0..n {
            // Find pivot
            let mut max_val = lu[k * n + k].abs();
            let mut max_row = k;
            for i in (k + 1)..n {
                let val = lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val <= threshold || max_val == 0.0 {
                return Err(LumpedError::SingularMatrix { time });
            }

            if max_row != k {
                pivots.swap(k, max_row);
                for j in 0..n {
                    lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = lu[k * n + k];
            for i in (k + 1)..n {
                let factor = lu[i * n + k] / pivot;
                lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    lu[i * n + j] -= factor * lu[k * n + j];
                }
            }
        }

        Ok(Self {
            size: n,
            lu,
            pivots,
        })
    }

    /// Solve `Ax = b` using the stored factors.
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let n = self.size;
        let lu = &self.lu;

        // Apply pivot permutation
        let mut x: Vec<f64> = self.pivots.iter().map(|&p| b[p]).collect();

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                x[i] -= lu[i * n + j] * x[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                x[i] -= lu[i * n + j] * x[j];
            }
            x[i] /= lu[i * n + i];
        }

        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn matrix(rows: &[&[f64]]) -> DenseMatrix {
        let mut m = DenseMatrix::zeros(rows.len());
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                m.set(i, j, v);
            }
        }
        m
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let a = matrix(&[&[0.0, 2.0, 1.0], &[1.0, 1.0, 0.0], &[2.0, 0.0, 3.0]]);
        let x_true = [1.0, -2.0, 0.5];
        let b = a.mul_vec(&x_true);
        let x = a.factor(0.0).unwrap().solve(&b);
        for (got, want) in x.iter().zip(x_true) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_singular_matrix_reports_time() {
        let a = matrix(&[&[1.0, 2.0], &[2.0, 4.0]]);
        match a.factor(0.3) {
            Err(LumpedError::SingularMatrix { time }) => assert_eq!(time, 0.3),
            other => panic!("expected singular matrix, got {:?}", other),
        }
        assert!(DenseMatrix::zeros(2).factor(0.0).is_err());
    }

    #[test]
    fn test_pivot_threshold_is_relative() {
        // Well conditioned despite tiny entries
        let a = matrix(&[&[1e-14, 0.0], &[0.0, 1e-14]]);
        let x = a.factor(0.0).unwrap().solve(&[1e-14, 2e-14]);
        assert_relative_eq!(x[0], 1.0);
        assert_relative_eq!(x[1], 2.0);
    }

    #[test]
    fn test_combine_and_clear_row() {
        let a = matrix(&[&[1.0, 2.0], &[3.0, 4.0]]);
        let b = matrix(&[&[1.0, 0.0], &[0.0, 1.0]]);
        let mut c = a.combine(1.0, &b, 2.0);
        assert_eq!(c.row(0), &[3.0, 2.0]);
        assert_eq!(c.row(1), &[3.0, 6.0]);
        c.clear_row(0);
        assert_eq!(c.row(0), &[0.0, 0.0]);
        assert_eq!(c.max_abs(), 6.0);
    }
}

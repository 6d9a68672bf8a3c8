/*
 * Corater
 * Copyright (C) 2026 The corater developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

//! QR decomposition by modified Gram-Schmidt, used to solve the per-row
//! ridge-regression systems of ALS. Small and dense: the matrices here are
//! `num_features` wide.

use crate::error::{CfError, Result};

/// Diagonal entries below this are treated as a rank deficiency; the
/// associated variable is skipped during back substitution.
const EPSILON: f64 = 1.0e-12;

/// A = QR with Q orthonormal (m x n, m >= n) and R upper triangular (n x n).
///
/// A zero-norm column marks the decomposition as not full rank but is not an
/// error; `solve` still produces a least-squares solution with the dependent
/// variable pinned to zero.
pub struct QrDecomposition {
    q: Vec<Vec<f64>>,
    r: Vec<Vec<f64>>,
    n: usize,
    full_rank: bool,
}

impl QrDecomposition {
    pub fn new(a: &[Vec<f64>]) -> Self {
        let m = a.len();
        let n = if m == 0 { 0 } else { a[0].len() };
        let mut q: Vec<Vec<f64>> = a.to_vec();
        let mut r = vec![vec![0.0; n]; n];
        let mut full_rank = true;

        for k in 0..n {
            let norm = column_norm(&q, k);
            r[k][k] = norm;
            if norm < EPSILON {
                // Dependent column; null it out so later projections see a
                // clean zero vector.
                full_rank = false;
                for row in q.iter_mut().take(m) {
                    row[k] = 0.0;
                }
                continue;
            }
            for row in q.iter_mut().take(m) {
                row[k] /= norm;
            }
            for j in (k + 1)..n {
                let mut dot = 0.0;
                for row in q.iter().take(m) {
                    dot += row[k] * row[j];
                }
                r[k][j] = dot;
                for row in q.iter_mut().take(m) {
                    let projected = dot * row[k];
                    row[j] -= projected;
                }
            }
        }

        QrDecomposition { q, r, n, full_rank }
    }

    pub fn is_full_rank(&self) -> bool {
        self.full_rank
    }

    /// Least-squares solution of `A x = b`: back substitution of
    /// `R x = Qᵗ b`, implicitly skipping rank-deficient variables through the
    /// epsilon guard. Non-finite results abort the solve.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>> {
        let m = self.q.len();
        let mut y = vec![0.0; self.n];
        for (k, y_k) in y.iter_mut().enumerate() {
            for i in 0..m {
                *y_k += self.q[i][k] * b[i];
            }
        }

        let mut x = vec![0.0; self.n];
        for k in (0..self.n).rev() {
            if self.r[k][k].abs() < EPSILON {
                x[k] = 0.0;
                continue;
            }
            let mut residual = y[k];
            for j in (k + 1)..self.n {
                residual -= self.r[k][j] * x[j];
            }
            x[k] = residual / self.r[k][k];
        }

        if x.iter().any(|value| !value.is_finite()) {
            return Err(CfError::NumericDivergence(
                "non-finite value in least-squares solution".into(),
            ));
        }
        Ok(x)
    }
}

fn column_norm(q: &[Vec<f64>], column: usize) -> f64 {
    q.iter().map(|row| row[column] * row[column]).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {

    use super::*;

    fn matrix(rows: &[&[f64]]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| row.to_vec()).collect()
    }

    fn multiply(a: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
        a.iter().map(|row| row.iter().zip(x).map(|(c, v)| c * v).sum()).collect()
    }

    #[test]
    fn solves_a_square_system_exactly() {
        let a = matrix(&[&[2.0, 1.0], &[1.0, 3.0]]);
        let qr = QrDecomposition::new(&a);
        assert!(qr.is_full_rank());

        let x = qr.solve(&[5.0, 10.0]).unwrap();
        let b = multiply(&a, &x);
        assert!((b[0] - 5.0).abs() < 1e-9);
        assert!((b[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn solves_an_overdetermined_system_in_least_squares() {
        // Three points on a perfect line y = 2 + 3t, columns [1, t].
        let a = matrix(&[&[1.0, 0.0], &[1.0, 1.0], &[1.0, 2.0]]);
        let qr = QrDecomposition::new(&a);
        let x = qr.solve(&[2.0, 5.0, 8.0]).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-9);
        assert!((x[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn least_squares_minimizes_residual_for_inconsistent_data() {
        // y values off the line; the normal-equation solution is known.
        let a = matrix(&[&[1.0, 0.0], &[1.0, 1.0], &[1.0, 2.0]]);
        let qr = QrDecomposition::new(&a);
        let x = qr.solve(&[1.0, 1.0, 2.0]).unwrap();
        // Closed form: intercept 5/6, slope 1/2.
        assert!((x[0] - 5.0 / 6.0).abs() < 1e-9);
        assert!((x[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rank_deficiency_does_not_panic() {
        // Second column is twice the first.
        let a = matrix(&[&[1.0, 2.0], &[2.0, 4.0], &[3.0, 6.0]]);
        let qr = QrDecomposition::new(&a);
        assert!(!qr.is_full_rank());

        let x = qr.solve(&[1.0, 2.0, 3.0]).unwrap();
        // The dependent variable is pinned to zero, the rest still fits.
        assert!((x[1] - 0.0).abs() < 1e-12);
        let b = multiply(&a, &x);
        assert!((b[0] - 1.0).abs() < 1e-9);
        assert!((b[2] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn q_columns_are_orthonormal() {
        let a = matrix(&[&[1.0, 1.0], &[1.0, 2.0], &[1.0, 3.0]]);
        let qr = QrDecomposition::new(&a);

        let mut dot = 0.0;
        let mut norm0 = 0.0;
        let mut norm1 = 0.0;
        for row in &qr.q {
            dot += row[0] * row[1];
            norm0 += row[0] * row[0];
            norm1 += row[1] * row[1];
        }
        assert!(dot.abs() < 1e-9);
        assert!((norm0 - 1.0).abs() < 1e-9);
        assert!((norm1 - 1.0).abs() < 1e-9);
    }
}

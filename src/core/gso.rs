//! Gram-Schmidt orthogonalization of a basis
//!
//! Stores the orthogonal vectors `B*`, the lower-triangular coefficient
//! matrix `U` (`mu`, unit diagonal) and the squared norms `B_norm`, so that
//! `b_i = b*_i + sum_{j<i} mu[i][j] * b*_j`.

use crate::core::matrix::Matrix;
use crate::precision::Real;

/// Gram-Schmidt data of a basis
#[derive(Debug, Clone)]
pub struct GramSchmidt<R: Real> {
    /// Orthogonal vectors, one per basis row
    pub b_star: Vec<Vec<R>>,
    /// Coefficients `mu[i][j]`, zero above the diagonal, one on it
    pub mu: Vec<Vec<R>>,
    /// `||b*_i||^2`
    pub norm_squared: Vec<R>,
}

pub(crate) fn dot<R: Real>(a: &[R], b: &[R]) -> R {
    a.iter()
        .zip(b.iter())
        .fold(R::zero(), |acc, (x, y)| acc + x.clone() * y.clone())
}

pub(crate) fn to_real_row<R: Real>(basis: &Matrix, i: usize) -> Vec<R> {
    basis.row(i).iter().map(R::from_bigint).collect()
}

/// Identity-initialised coefficient matrix
pub(crate) fn unit_lower<R: Real>(n: usize) -> Vec<Vec<R>> {
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| if i == j { R::one() } else { R::zero() })
                .collect()
        })
        .collect()
}

impl<R: Real> GramSchmidt<R> {
    /// Orthogonalize every row of `basis`.
    ///
    /// Never fails. A vector whose orthogonal part has squared norm at most
    /// `R::epsilon()` contributes zero coefficients to later rows.
    pub fn compute(basis: &Matrix) -> Self {
        let n = basis.rows();
        let eps = R::epsilon();
        let mut b_star: Vec<Vec<R>> = Vec::with_capacity(n);
        let mut mu = unit_lower::<R>(n);
        let mut norm_squared: Vec<R> = Vec::with_capacity(n);

        for i in 0..n {
            let mut v = to_real_row::<R>(basis, i);
            for j in 0..i {
                let coeff = if norm_squared[j] <= eps {
                    R::zero()
                } else {
                    dot(&v, &b_star[j]) / norm_squared[j].clone()
                };
                for (x, y) in v.iter_mut().zip(b_star[j].iter()) {
                    *x = x.clone() - coeff.clone() * y.clone();
                }
                mu[i][j] = coeff;
            }
            norm_squared.push(dot(&v, &v));
            b_star.push(v);
        }

        GramSchmidt { b_star, mu, norm_squared }
    }

    /// Number of basis vectors
    pub fn dimension(&self) -> usize {
        self.norm_squared.len()
    }

    /// Split into coefficients and squared norms
    pub fn into_parts(self) -> (Vec<Vec<R>>, Vec<R>) {
        (self.mu, self.norm_squared)
    }

    /// Largest absolute deviation of `b*_i + sum mu[i][j] b*_j` from `b_i`
    pub fn max_reconstruction_error(&self, basis: &Matrix) -> f64 {
        let mut worst = 0.0f64;
        for i in 0..self.dimension() {
            let target = to_real_row::<R>(basis, i);
            for (c, t) in target.iter().enumerate() {
                let mut acc = self.b_star[i][c].clone();
                for j in 0..i {
                    acc = acc + self.mu[i][j].clone() * self.b_star[j][c].clone();
                }
                let err = (acc - t.clone()).abs().to_f64();
                if err > worst {
                    worst = err;
                }
            }
        }
        worst
    }

    /// `|mu[i][j]| <= 1/2 + tolerance` for all `j < i`
    pub fn is_size_reduced(&self, tolerance: f64) -> bool {
        let limit = R::from_f64(0.5 + tolerance);
        (0..self.dimension()).all(|i| (0..i).all(|j| self.mu[i][j].abs() <= limit))
    }

    /// Lovász condition for every adjacent pair, with a relative tolerance
    pub fn satisfies_lovasz(&self, delta: f64, tolerance: f64) -> bool {
        let delta = R::from_f64(delta);
        let slack = R::from_f64(1.0 - tolerance);
        (1..self.dimension()).all(|k| {
            let m = self.mu[k][k - 1].clone();
            let lhs = self.norm_squared[k].clone();
            let rhs = (delta.clone() - m.clone() * m) * self.norm_squared[k - 1].clone();
            lhs >= rhs * slack.clone()
        })
    }

    /// Root Hermite factor `(||b_0|| / vol^(1/n))^(1/n)` in `f64`
    pub fn root_hermite_factor(&self) -> Option<f64> {
        let n = self.dimension();
        if n == 0 {
            return None;
        }
        let logs: Vec<f64> = self.norm_squared.iter().map(|b| b.to_f64().ln()).collect();
        if logs.iter().any(|l| !l.is_finite()) {
            return None;
        }
        let log_vol = 0.5 * logs.iter().sum::<f64>();
        let log_first = 0.5 * logs[0];
        Some(((log_first - log_vol / n as f64) / n as f64).exp())
    }
}

//! Schnorr-Euchner enumeration (ENUM) and an SVP front end built on it
//!
//! [`enumerate`] searches a window `[k_begin, k_end]` of the basis for a
//! nonzero lattice vector whose projection orthogonal to `b_0..b_{k_begin-1}`
//! is short, given only the Gram-Schmidt coefficients and squared norms.

use crate::core::error::{LatticeError, Result};
use crate::core::gso::GramSchmidt;
use crate::core::matrix::Matrix;
use crate::core::types::{AlgorithmParams, CancelToken};
use crate::precision::Real;
use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Cancellation is polled on node 1 and every 2^14 nodes after it
const CANCEL_POLL_MASK: u64 = (1 << 14) - 1;

/// Search bound for [`enumerate`]
#[derive(Debug, Clone)]
pub enum EnumBound<R: Real> {
    /// Best-so-far search: every nonzero hit shrinks the radius to its own
    /// squared norm, so the final answer is a shortest vector in the window
    Radius(R),
    /// One squared bound per depth; `bounds[d]` applies once `d + 1`
    /// coefficients are fixed from the top. Returns the first nonzero hit.
    Pruned(Vec<R>),
}

impl<R: Real> EnumBound<R> {
    fn at_depth(&self, depth: usize) -> &R {
        match self {
            EnumBound::Radius(r) => r,
            EnumBound::Pruned(bounds) => &bounds[depth],
        }
    }

    /// Linear pruning: `radius * (i + 1) / dim` for `i = 0..dim`
    pub fn linear(radius: R, dim: usize) -> Self {
        let dim_r = R::from_i64(dim as i64);
        EnumBound::Pruned(
            (0..dim)
                .map(|i| radius.clone() * R::from_i64(i as i64 + 1) / dim_r.clone())
                .collect(),
        )
    }
}

/// A vector found by [`enumerate`]
#[derive(Debug, Clone)]
pub struct EnumResult<R: Real> {
    /// Coefficients with respect to `b_{k_begin}, ..., b_{k_end}`
    pub coefficients: Vec<i64>,
    /// Squared norm of the projected vector
    pub norm_squared: R,
    /// Search-tree nodes visited
    pub nodes: u64,
}

/// Enumerate the projected sublattice spanned by rows `k_begin..=k_end`.
///
/// `mu` and `norms` must describe the same `n`-row basis. Returns `None` when
/// no nonzero vector satisfies the bound.
pub fn enumerate<R: Real>(
    mu: &[Vec<R>],
    norms: &[R],
    bound: &EnumBound<R>,
    k_begin: usize,
    k_end: usize,
    cancel: Option<&CancelToken>,
) -> Result<Option<EnumResult<R>>> {
    let n_rows = norms.len();
    if mu.len() != n_rows || mu.iter().any(|row| row.len() < n_rows) {
        return Err(LatticeError::invalid_dimensions(
            (n_rows, n_rows),
            (mu.len(), mu.first().map_or(0, |r| r.len())),
        ));
    }
    if k_begin > k_end || k_end >= n_rows {
        return Err(LatticeError::invalid_index(format!(
            "enumeration window [{}, {}] invalid for {} rows",
            k_begin, k_end, n_rows
        )));
    }
    let n = k_end - k_begin + 1;
    if let EnumBound::Pruned(bounds) = bound {
        if bounds.len() != n {
            return Err(LatticeError::invalid_dimensions((n, 1), (bounds.len(), 1)));
        }
    }
    let first_hit = matches!(bound, EnumBound::Pruned(_));

    let mut radius = match bound {
        EnumBound::Radius(r) => Some(r.clone()),
        EnumBound::Pruned(_) => None,
    };

    // Local level t corresponds to basis row k_begin + t.
    // sigma[i][t] = -(partial centre of level t) from levels i..n, and
    // sigma[i][t] is stale for i <= highest_dirty[t]
    let mut sigma = vec![vec![R::zero(); n]; n + 1];
    let mut rho = vec![R::zero(); n + 1];
    let mut highest_dirty: Vec<usize> = (0..=n).collect();
    let mut v = vec![0i64; n];
    let mut c = vec![R::zero(); n];
    let mut w = vec![0i64; n];
    let mut last_nonzero = 0usize;
    let mut best: Option<EnumResult<R>> = None;
    let mut nodes: u64 = 0;

    let mut t = n - 1;
    loop {
        nodes += 1;
        if nodes & CANCEL_POLL_MASK == 1 {
            if let Some(token) = cancel {
                token.check()?;
            }
        }

        let diff = R::from_i64(v[t]) - c[t].clone();
        rho[t] = rho[t + 1].clone() + diff.clone() * diff * norms[k_begin + t].clone();

        let limit = match &radius {
            Some(r) => r,
            None => bound.at_depth(n - 1 - t),
        };

        if rho[t] <= *limit {
            if t == 0 {
                if v.iter().any(|&x| x != 0) {
                    log::trace!("ENUM hit: rho={:?} after {} nodes", rho[0], nodes);
                    let hit = EnumResult {
                        coefficients: v.clone(),
                        norm_squared: rho[0].clone(),
                        nodes,
                    };
                    if first_hit {
                        return Ok(Some(hit));
                    }
                    radius = Some(rho[0].clone());
                    best = Some(hit);
                }
                next_candidate(&mut v, &mut w, &c, t, &mut last_nonzero);
                continue;
            }

            t -= 1;
            highest_dirty[t] = highest_dirty[t].max(highest_dirty[t + 1]);
            for i in (t + 1..=highest_dirty[t]).rev() {
                sigma[i][t] = sigma[i + 1][t].clone()
                    + R::from_i64(v[i]) * mu[k_begin + i][k_begin + t].clone();
            }
            // passed down to row t, so row t + 1 is clean again
            highest_dirty[t + 1] = t + 1;
            c[t] = -sigma[t + 1][t].clone();
            v[t] = c[t].round_to_i64().ok_or_else(|| {
                LatticeError::numerical_instability(format!(
                    "enumeration centre at level {} is not representable",
                    k_begin + t
                ))
            })?;
            w[t] = 1;
        } else {
            t += 1;
            if t == n {
                break;
            }
            highest_dirty[t - 1] = highest_dirty[t - 1].max(t);
            next_candidate(&mut v, &mut w, &c, t, &mut last_nonzero);
        }
    }

    Ok(best.map(|mut b| {
        b.nodes = nodes;
        b
    }))
}

/// Step level `t` to its next candidate: zig-zag around the centre, or only
/// upwards while every level above is zero (sign symmetry).
fn next_candidate<R: Real>(
    v: &mut [i64],
    w: &mut [i64],
    c: &[R],
    t: usize,
    last_nonzero: &mut usize,
) {
    if t >= *last_nonzero {
        *last_nonzero = t;
        v[t] += 1;
        w[t] = 1;
    } else {
        if R::from_i64(v[t]) > c[t] {
            v[t] -= w[t];
        } else {
            v[t] += w[t];
        }
        w[t] += 1;
    }
}

/// Parameters for the SVP solver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SVPSolverParams {
    /// Use the linear pruning schedule instead of an exact search
    #[serde(default)]
    pub linear_pruning: bool,
    #[serde(default)]
    pub algorithm_params: AlgorithmParams,
}

/// Shortest vector found by [`SVPSolver::solve`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SVPResult {
    /// Coefficients with respect to the input basis rows
    pub coefficients: Vec<i64>,
    /// The lattice vector itself
    pub vector: Vec<BigInt>,
    /// Exact squared norm of `vector`
    pub norm_squared: BigInt,
    /// Enumeration nodes visited
    pub nodes: u64,
}

/// SVP solver: enumeration over the whole basis
#[derive(Debug, Clone, Default)]
pub struct SVPSolver {
    params: SVPSolverParams,
}

impl SVPSolver {
    pub fn new() -> Self {
        Self::with_params(SVPSolverParams::default())
    }

    pub fn with_params(params: SVPSolverParams) -> Self {
        SVPSolver { params }
    }

    /// Shortest nonzero vector of the lattice spanned by `basis`.
    ///
    /// The basis should be LLL-reduced first; enumeration cost grows quickly
    /// with the length of `b_0`.
    pub fn solve(&self, basis: &Matrix) -> Result<SVPResult> {
        self.solve_with::<f64>(basis)
    }

    pub fn solve_with<R: Real>(&self, basis: &Matrix) -> Result<SVPResult> {
        let n = basis.rows();
        if n == 0 {
            return Err(LatticeError::invalid_parameters("SVP needs a non-empty basis"));
        }
        let gs = GramSchmidt::<R>::compute(basis);
        if gs.norm_squared.iter().any(|b| *b <= R::epsilon()) {
            return Err(LatticeError::invalid_parameters(
                "SVP needs linearly independent rows",
            ));
        }

        // slightly above ||b_0||^2 so that b_0 itself is always admissible
        let radius = R::from_bigint(&basis.row_norm_squared(0)) * R::from_f64(1.0 + 1e-9);
        let bound = if self.params.linear_pruning {
            EnumBound::linear(radius, n)
        } else {
            EnumBound::Radius(radius)
        };

        let hit = enumerate(
            &gs.mu,
            &gs.norm_squared,
            &bound,
            0,
            n - 1,
            self.params.algorithm_params.cancel.as_ref(),
        )?;

        let (coefficients, nodes) = match hit {
            Some(hit) => (hit.coefficients, hit.nodes),
            None => {
                // pruning can miss everything; b_0 is always a valid answer
                let mut unit = vec![0i64; n];
                unit[0] = 1;
                (unit, 0)
            }
        };

        let vector = combine(basis, 0, &coefficients);
        let norm_squared: BigInt = vector.iter().map(|x| x * x).sum();
        if self.params.algorithm_params.verbose {
            log::info!("SVP: n={} ||v||^2={} nodes={}", n, norm_squared, nodes);
        }
        Ok(SVPResult {
            coefficients,
            vector,
            norm_squared,
            nodes,
        })
    }
}

/// `sum_i coefficients[i] * b_{offset + i}`
pub fn combine(basis: &Matrix, offset: usize, coefficients: &[i64]) -> Vec<BigInt> {
    let mut out = vec![BigInt::zero(); basis.cols()];
    for (i, &coeff) in coefficients.iter().enumerate() {
        if coeff == 0 {
            continue;
        }
        let coeff = BigInt::from(coeff);
        for (acc, x) in out.iter_mut().zip(basis.row(offset + i)) {
            *acc += &coeff * x;
        }
    }
    out
}

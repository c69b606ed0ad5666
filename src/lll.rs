//! LLL (Lenstra-Lenstra-Lovász) lattice reduction and its deep-insertion variant

use crate::core::error::{LatticeError, Result};
use crate::core::gso::GramSchmidt;
use crate::core::matrix::Matrix;
use crate::core::types::{validate_delta, AlgorithmParams, ReductionStats};
use crate::gso_update::{deep_insertion, refresh_row, swap_adjacent};
use crate::precision::Real;
use crate::size_reduction::size_reduce_row;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

/// Parameters for LLL reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLLParams {
    /// Reduction parameter (0.25 < delta < 1), typically 0.99
    pub delta: f64,
    /// Algorithm parameters
    #[serde(default)]
    pub algorithm_params: AlgorithmParams,
}

impl Default for LLLParams {
    fn default() -> Self {
        LLLParams {
            delta: 0.99,
            algorithm_params: AlgorithmParams::default(),
        }
    }
}

impl LLLParams {
    /// Create new LLL parameters with a custom delta
    pub fn new(delta: f64) -> Self {
        LLLParams {
            delta,
            ..Default::default()
        }
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        validate_delta(self.delta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LLLVariant {
    /// Adjacent swaps only
    Standard,
    /// Insert `b_k` at the earliest position that shortens the prefix
    Deep,
}

/// LLL reducer implementation
#[derive(Debug, Clone, Default)]
pub struct LLLReducer {
    params: LLLParams,
}

impl LLLReducer {
    /// Create new LLL reducer with default parameters
    pub fn new() -> Self {
        Self::with_params(LLLParams::default())
    }

    /// Create new LLL reducer with custom parameters
    pub fn with_params(params: LLLParams) -> Self {
        LLLReducer { params }
    }

    pub fn params(&self) -> &LLLParams {
        &self.params
    }

    /// Reduce `basis` in place using `f64` Gram-Schmidt data
    pub fn reduce(&self, basis: &mut Matrix) -> Result<ReductionStats> {
        self.reduce_with::<f64>(basis)
    }

    /// Reduce `basis` in place with the given floating-point backend
    pub fn reduce_with<R: Real>(&self, basis: &mut Matrix) -> Result<ReductionStats> {
        self.params.validate()?;

        let n = basis.rows();
        let mut stats = ReductionStats::default();
        if n < 2 {
            return Ok(stats);
        }

        let delta = R::from_f64(self.params.delta);
        let (mut mu, mut norms) = GramSchmidt::<R>::compute(basis).into_parts();
        let verbose = self.params.algorithm_params.verbose;

        let mut k = 1;
        while k < n {
            self.params.algorithm_params.check_cancelled()?;
            stats.iterations += 1;

            stats.size_reductions += size_reduce_row(basis, &mut mu, &mut norms, k)?;

            let m = mu[k][k - 1].clone();
            let bound = (delta.clone() - m.clone() * m) * norms[k - 1].clone();
            if norms[k] >= bound {
                k += 1;
            } else {
                basis.swap_rows(k - 1, k)?;
                swap_adjacent(&mut mu, &mut norms, k)?;
                if k == 1 {
                    refresh_row(basis, &mut mu, &mut norms, 0)?;
                }
                stats.swaps += 1;
                k = (k - 1).max(1);
            }

            if verbose && stats.iterations % 1000 == 0 {
                log::info!(
                    "LLL iteration {}: k={}, swaps={}",
                    stats.iterations,
                    k,
                    stats.swaps
                );
            }
        }

        log::debug!(
            "LLL[{}] n={} delta={}: {} iterations, {} swaps, {} size reductions",
            R::name(),
            n,
            self.params.delta,
            stats.iterations,
            stats.swaps,
            stats.size_reductions
        );
        Ok(stats)
    }
}

/// DeepLLL reducer.
///
/// Instead of comparing `b_k` only with its predecessor, scans `i = 0..k` for
/// the first position at which the projection of `b_k` is shorter than
/// `delta * B_i`, and moves `b_k` there.
#[derive(Debug, Clone, Default)]
pub struct DeepLLLReducer {
    params: LLLParams,
}

impl DeepLLLReducer {
    pub fn new() -> Self {
        Self::with_params(LLLParams::default())
    }

    pub fn with_params(params: LLLParams) -> Self {
        DeepLLLReducer { params }
    }

    pub fn reduce(&self, basis: &mut Matrix) -> Result<ReductionStats> {
        self.reduce_with::<f64>(basis)
    }

    pub fn reduce_with<R: Real>(&self, basis: &mut Matrix) -> Result<ReductionStats> {
        self.params.validate()?;

        let n = basis.rows();
        let mut stats = ReductionStats::default();
        if n < 2 {
            return Ok(stats);
        }

        let delta = R::from_f64(self.params.delta);
        let (mut mu, mut norms) = GramSchmidt::<R>::compute(basis).into_parts();

        let mut k = 1;
        while k < n {
            self.params.algorithm_params.check_cancelled()?;
            stats.iterations += 1;

            stats.size_reductions += size_reduce_row(basis, &mut mu, &mut norms, k)?;

            // c tracks ||pi_i(b_k)||^2 as i advances
            let mut c = R::from_bigint(&basis.row_norm_squared(k));
            let mut insert_at = None;
            for i in 0..k {
                if c >= delta.clone() * norms[i].clone() {
                    let m = mu[k][i].clone();
                    c = c - m.clone() * m * norms[i].clone();
                } else {
                    insert_at = Some(i);
                    break;
                }
            }

            match insert_at {
                Some(i) => {
                    log::trace!("DeepLLL: inserting b_{} at {}", k, i);
                    basis.rotate_down(i, k)?;
                    deep_insertion(&mut mu, &mut norms, i, k)?;
                    refresh_row(basis, &mut mu, &mut norms, i)?;
                    stats.swaps += 1;
                    k = i.max(1);
                }
                None => k += 1,
            }

            if self.params.algorithm_params.verbose && stats.iterations % 1000 == 0 {
                log::info!(
                    "DeepLLL iteration {}: k={}, insertions={}",
                    stats.iterations,
                    k,
                    stats.swaps
                );
            }
        }

        log::debug!(
            "DeepLLL[{}] n={} delta={}: {} iterations, {} insertions",
            R::name(),
            n,
            self.params.delta,
            stats.iterations,
            stats.swaps
        );
        Ok(stats)
    }
}

/// Run the chosen LLL variant
pub fn reduce_variant<R: Real>(
    variant: LLLVariant,
    params: &LLLParams,
    basis: &mut Matrix,
) -> Result<ReductionStats> {
    match variant {
        LLLVariant::Standard => LLLReducer::with_params(params.clone()).reduce_with::<R>(basis),
        LLLVariant::Deep => DeepLLLReducer::with_params(params.clone()).reduce_with::<R>(basis),
    }
}

/// Nearest integer to `num / den` (`den > 0`), ties away from zero
fn round_div(num: &BigInt, den: &BigInt) -> BigInt {
    let two = BigInt::from(2);
    let q = (num.abs() * &two + den).div_floor(&(den * &two));
    if num.is_negative() {
        -q
    } else {
        q
    }
}

/// Lagrange (Gauss) reduction of a two-row basis, in exact arithmetic.
///
/// Afterwards `||b_0|| <= ||b_1||` and `|<b_0, b_1>| <= ||b_0||^2 / 2`.
pub fn lagrange_reduce(basis: &mut Matrix) -> Result<()> {
    if basis.rows() != 2 {
        return Err(LatticeError::invalid_dimensions(
            (2, basis.cols()),
            (basis.rows(), basis.cols()),
        ));
    }

    if basis.row_norm_squared(0) > basis.row_norm_squared(1) {
        basis.swap_rows(0, 1)?;
    }
    loop {
        let n0 = basis.row_norm_squared(0);
        if n0.is_zero() {
            return Ok(());
        }
        let q = round_div(&basis.dot_rows(0, 1), &n0);
        basis.sub_multiple(1, 0, &q)?;
        if basis.row_norm_squared(1) >= n0 {
            return Ok(());
        }
        basis.swap_rows(0, 1)?;
    }
}

/// LLL-reduce `basis` in place
pub fn reduce_lll(basis: &mut Matrix, delta: f64) -> Result<ReductionStats> {
    LLLReducer::with_params(LLLParams::new(delta)).reduce(basis)
}

/// DeepLLL-reduce `basis` in place
pub fn reduce_deep_lll(basis: &mut Matrix, delta: f64) -> Result<ReductionStats> {
    DeepLLLReducer::with_params(LLLParams::new(delta)).reduce(basis)
}

//! BKZ (Block Korkine-Zolotarev) lattice reduction and DeepBKZ
//!
//! Both walk a window `[k, min(k + beta - 1, n - 1)]` cyclically over the
//! basis. Enumeration looks for a projected vector shorter than `0.99 * B_k`;
//! a hit is spliced in before `b_k` and the resulting dependent generating
//! set is cleaned up by MLLL. A block with no improvement counts towards the
//! stopping rule and triggers an LLL (BKZ) or DeepLLL (DeepBKZ) pass.

use crate::core::error::{LatticeError, Result};
use crate::core::gso::{dot, GramSchmidt};
use crate::core::matrix::Matrix;
use crate::core::types::{validate_delta, AlgorithmParams, ReductionStats};
use crate::lll::{reduce_variant, LLLParams, LLLVariant};
use crate::mlll::MLLLReducer;
use crate::precision::Real;
use crate::svp::{combine, enumerate, EnumBound};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Enumeration radius as a fraction of `B_k`
const RADIUS_FACTOR: f64 = 0.99;

/// Delta used for the coarse LLL pass before DeepBKZ
const DEEP_PREPROCESS_DELTA: f64 = 0.75;

/// Parameters for BKZ reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BKZParams {
    /// Block size, `2 <= beta <= n`
    pub beta: usize,
    /// Lovász parameter for the LLL/MLLL passes
    pub delta: f64,
    /// Algorithm parameters
    #[serde(default)]
    pub algorithm_params: AlgorithmParams,
}

impl Default for BKZParams {
    fn default() -> Self {
        BKZParams {
            beta: 20,
            delta: 0.99,
            algorithm_params: AlgorithmParams::default(),
        }
    }
}

impl BKZParams {
    /// Create new BKZ parameters with given block size
    pub fn new(beta: usize) -> Self {
        BKZParams {
            beta,
            ..Default::default()
        }
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Validate BKZ parameters against an `n`-row basis
    pub fn validate(&self, n: usize) -> Result<()> {
        validate_delta(self.delta)?;
        if self.beta < 2 || self.beta > n {
            return Err(LatticeError::invalid_parameters(format!(
                "Block size must lie in [2, {}], got {}",
                n, self.beta
            )));
        }
        if self.beta > 40 {
            log::warn!("Large block size {} makes enumeration expensive", self.beta);
        }
        Ok(())
    }

    fn lll_params(&self) -> LLLParams {
        LLLParams {
            delta: self.delta,
            algorithm_params: self.algorithm_params.clone(),
        }
    }
}

/// Counters reported by BKZ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BKZStats {
    /// Blocks processed
    pub blocks: usize,
    /// Full passes of `k` over `0..n-1`
    pub tours: usize,
    /// Blocks where a shorter vector was inserted
    pub improvements: usize,
    /// Enumeration nodes over all blocks that produced a hit
    pub nodes: u64,
    /// Accumulated LLL/DeepLLL work
    pub lll: ReductionStats,
}

/// BKZ reducer implementation
#[derive(Debug, Clone)]
pub struct BKZReducer {
    params: BKZParams,
    variant: LLLVariant,
}

impl Default for BKZReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl BKZReducer {
    /// Create new BKZ reducer with default parameters
    pub fn new() -> Self {
        Self::with_params(BKZParams::default())
    }

    /// Plain BKZ: exact enumeration, LLL between blocks
    pub fn with_params(params: BKZParams) -> Self {
        BKZReducer {
            params,
            variant: LLLVariant::Standard,
        }
    }

    /// DeepBKZ: linearly pruned enumeration, DeepLLL between blocks
    pub fn deep(params: BKZParams) -> Self {
        BKZReducer {
            params,
            variant: LLLVariant::Deep,
        }
    }

    pub fn params(&self) -> &BKZParams {
        &self.params
    }

    pub fn variant(&self) -> LLLVariant {
        self.variant
    }

    /// Reduce `basis` in place using `f64` Gram-Schmidt data
    pub fn reduce(&self, basis: &mut Matrix) -> Result<BKZStats> {
        self.reduce_with::<f64>(basis)
    }

    /// Reduce `basis` in place with the given floating-point backend
    pub fn reduce_with<R: Real>(&self, basis: &mut Matrix) -> Result<BKZStats> {
        let n = basis.rows();
        self.params.validate(n)?;

        let lll_params = self.params.lll_params();
        let algo = &self.params.algorithm_params;
        let mut stats = BKZStats::default();

        match self.variant {
            LLLVariant::Standard => {
                let s = reduce_variant::<R>(LLLVariant::Standard, &lll_params, basis)?;
                stats.lll.absorb(&s);
            }
            LLLVariant::Deep => {
                let coarse = LLLParams {
                    delta: DEEP_PREPROCESS_DELTA,
                    algorithm_params: algo.clone(),
                };
                let s = reduce_variant::<R>(LLLVariant::Standard, &coarse, basis)?;
                stats.lll.absorb(&s);
                let s = reduce_variant::<R>(LLLVariant::Deep, &lll_params, basis)?;
                stats.lll.absorb(&s);
            }
        }

        let mut gs = GramSchmidt::<R>::compute(basis);
        let mut stall = 0usize;
        let mut k = 0usize;

        while stall < n - 1 {
            algo.check_cancelled()?;
            stats.blocks += 1;

            let l = (k + self.params.beta - 1).min(n - 1);
            let radius = gs.norm_squared[k].clone() * R::from_f64(RADIUS_FACTOR);
            let bound = match self.variant {
                LLLVariant::Standard => EnumBound::Radius(radius),
                LLLVariant::Deep => EnumBound::linear(radius, l - k + 1),
            };

            let hit = enumerate(&gs.mu, &gs.norm_squared, &bound, k, l, algo.cancel.as_ref())?;
            let inserted = match hit {
                Some(hit) => {
                    stats.nodes += hit.nodes;
                    self.insert_if_shorter(basis, &gs, k, l, &hit.coefficients, &lll_params)?
                }
                None => false,
            };

            if inserted {
                stall = 0;
                stats.improvements += 1;
            } else {
                stall += 1;
                let s = reduce_variant::<R>(self.variant, &lll_params, basis)?;
                stats.lll.absorb(&s);
            }
            gs = GramSchmidt::compute(basis);

            k = (k + 1) % (n - 1);
            if k == 0 {
                stats.tours += 1;
                if algo.verbose {
                    log::info!(
                        "BKZ-{} tour {}: ||b_0||^2 = {}, improvements = {}",
                        self.params.beta,
                        stats.tours,
                        basis.row_norm_squared(0),
                        stats.improvements
                    );
                }
            }
        }

        log::debug!(
            "{}[{}] n={} beta={}: {} blocks, {} improvements, {} nodes",
            match self.variant {
                LLLVariant::Standard => "BKZ",
                LLLVariant::Deep => "DeepBKZ",
            },
            R::name(),
            n,
            self.params.beta,
            stats.blocks,
            stats.improvements,
            stats.nodes
        );
        Ok(stats)
    }

    /// Splice `v = sum coeffs[i] * b_{k+i}` in before `b_k` if its projection
    /// beats `B_k`, and let MLLL remove the resulting dependency.
    ///
    /// The basis is only written once MLLL has produced a clean result.
    fn insert_if_shorter<R: Real>(
        &self,
        basis: &mut Matrix,
        gs: &GramSchmidt<R>,
        k: usize,
        l: usize,
        coefficients: &[i64],
        lll_params: &LLLParams,
    ) -> Result<bool> {
        let v = combine(basis, k, coefficients);
        let projected = projected_norm(&v, gs, k);
        let b_k = gs.norm_squared[k].clone();
        if b_k.clone() - projected <= R::epsilon() * b_k {
            return Ok(false);
        }

        let h = l + 1;
        let mut extended = basis.clone();
        extended.truncate_rows(h);
        extended.insert_row(k, v)?;

        let outcome = MLLLReducer::with_params(lll_params.clone()).reduce_with::<R>(&mut extended)?;
        if outcome.rank != h || !extended.is_zero_row(h) {
            return Err(LatticeError::numerical_instability(format!(
                "MLLL returned rank {} for {} generators of a rank-{} block",
                outcome.rank,
                h + 1,
                h
            )));
        }

        for (i, row) in extended.iter_rows().take(h).enumerate() {
            basis.set_row(i, row.to_vec())?;
        }
        log::trace!("BKZ: inserted vector at {} (window end {})", k, l);
        Ok(true)
    }
}

/// `||v||^2` minus its components along `b*_0..b*_{k-1}`, clamped at zero
fn projected_norm<R: Real>(v: &[BigInt], gs: &GramSchmidt<R>, k: usize) -> R {
    let eps = R::epsilon();
    let v_real: Vec<R> = v.iter().map(R::from_bigint).collect();
    let mut norm = dot(&v_real, &v_real);
    for i in 0..k {
        if gs.norm_squared[i] <= eps {
            continue;
        }
        let coeff = dot(&v_real, &gs.b_star[i]) / gs.norm_squared[i].clone();
        norm = norm - coeff.clone() * coeff * gs.norm_squared[i].clone();
    }
    if norm < eps {
        R::zero()
    } else {
        norm
    }
}

/// BKZ-reduce `basis` in place
pub fn reduce_bkz(basis: &mut Matrix, beta: usize, delta: f64) -> Result<BKZStats> {
    BKZReducer::with_params(BKZParams::new(beta).with_delta(delta)).reduce(basis)
}

/// DeepBKZ-reduce `basis` in place
pub fn reduce_deep_bkz(basis: &mut Matrix, beta: usize, delta: f64) -> Result<BKZStats> {
    BKZReducer::deep(BKZParams::new(beta).with_delta(delta)).reduce(basis)
}

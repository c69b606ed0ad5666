//! Randomized progressive BKZ
//!
//! Runs DeepBKZ with a growing block size. Inside each block-size phase the
//! basis is reduced repeatedly; when a run fails to shorten `b_0` the basis
//! is shuffled by random unimodular row operations and reduced again, up to
//! `max_retries` consecutive failures. The best basis seen so far lives in a
//! caller-owned [`ProgressiveSession`] so an interrupted run can be resumed.

use crate::bkz::{BKZParams, BKZReducer};
use crate::core::error::{LatticeError, Result};
use crate::core::matrix::Matrix;
use crate::core::types::{validate_delta, AlgorithmParams};
use crate::precision::Real;
use crate::utils::file_io::{load_bracket_basis, save_snapshot};
use crate::utils::matrix_utils::randomize_basis;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// Smallest block size used for the preprocessing pass
const PREPROCESS_MIN_BETA: usize = 20;

/// A block reduction engine the driver can delegate to.
///
/// The driver passes a scratch copy of the basis and only adopts it when
/// `reduce` returns `true`. Implementations must keep the shape of the basis
/// and only apply unimodular row operations.
pub trait BlockReducer {
    fn name(&self) -> &str;

    fn reduce(&self, basis: &mut Matrix, beta: usize, delta: f64) -> bool;
}

/// [`BlockReducer`] backed by this crate's BKZ
#[derive(Debug, Clone, Default)]
pub struct NativeBkz {
    /// Use DeepBKZ instead of plain BKZ
    pub deep: bool,
    /// Keep Gram-Schmidt data in 256-bit MPFR floats; ignored without the
    /// `high-precision` feature
    pub high_precision: bool,
    pub algorithm_params: AlgorithmParams,
}

impl NativeBkz {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deep() -> Self {
        NativeBkz {
            deep: true,
            ..Default::default()
        }
    }
}

impl BlockReducer for NativeBkz {
    fn name(&self) -> &str {
        if self.deep {
            "native-deep-bkz"
        } else {
            "native-bkz"
        }
    }

    fn reduce(&self, basis: &mut Matrix, beta: usize, delta: f64) -> bool {
        let params = BKZParams {
            beta: beta.min(basis.rows()),
            delta,
            algorithm_params: self.algorithm_params.clone(),
        };
        let reducer = if self.deep {
            BKZReducer::deep(params)
        } else {
            BKZReducer::with_params(params)
        };
        let result = match self.high_precision {
            #[cfg(feature = "high-precision")]
            true => reducer.reduce_with::<crate::precision::BigFloat<256>>(basis),
            _ => reducer.reduce(basis),
        };
        match result {
            Ok(_) => true,
            Err(e) => {
                log::warn!("{} failed: {}", self.name(), e);
                false
            }
        }
    }
}

/// Parameters for progressive reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressiveParams {
    /// First block size
    pub start_beta: usize,
    /// Last block size, at most the lattice dimension
    pub max_beta: usize,
    pub delta: f64,
    /// Stop once `||b_0||` drops to this length
    pub target_norm: Option<f64>,
    /// Consecutive non-improving runs tolerated per phase
    pub max_retries: usize,
    /// Random row operations per basis row on each retry
    pub randomize_ops_per_dim: usize,
    /// Seed for the randomization; `None` draws from the OS
    pub seed: Option<u64>,
    /// Write `{prefix}_beta_{beta|best}.txt` snapshots when set
    pub snapshot_prefix: Option<String>,
    /// Run one block reduction through the preprocessing backend first
    pub preprocess: bool,
    #[serde(skip)]
    pub algorithm_params: AlgorithmParams,
}

impl Default for ProgressiveParams {
    fn default() -> Self {
        ProgressiveParams {
            start_beta: 10,
            max_beta: 20,
            delta: 0.99,
            target_norm: None,
            max_retries: 5,
            randomize_ops_per_dim: 2,
            seed: None,
            snapshot_prefix: None,
            preprocess: true,
            algorithm_params: AlgorithmParams::default(),
        }
    }
}

impl ProgressiveParams {
    pub fn new(start_beta: usize, max_beta: usize) -> Self {
        ProgressiveParams {
            start_beta,
            max_beta,
            ..Default::default()
        }
    }

    /// Validate against an `n`-row basis
    pub fn validate(&self, n: usize) -> Result<()> {
        validate_delta(self.delta)?;
        if self.start_beta < 2 || self.start_beta > self.max_beta || self.max_beta > n {
            return Err(LatticeError::invalid_parameters(format!(
                "Need 2 <= start_beta <= max_beta <= {}, got {}..{}",
                n, self.start_beta, self.max_beta
            )));
        }
        if self.max_retries == 0 {
            return Err(LatticeError::invalid_parameters("max_retries must be at least 1"));
        }
        if let Some(target) = self.target_norm {
            if !target.is_finite() || target < 0.0 {
                return Err(LatticeError::invalid_parameters(format!(
                    "Invalid target norm {}",
                    target
                )));
            }
        }
        Ok(())
    }

    /// Block sizes visited: `+1` below 25, `+3` from 25, `+5` from 30,
    /// always ending at `max_beta`
    pub fn schedule(&self) -> Vec<usize> {
        let mut schedule = Vec::new();
        let mut beta = self.start_beta;
        loop {
            schedule.push(beta);
            if beta >= self.max_beta {
                break;
            }
            let next = if beta >= 30 {
                beta + 5
            } else if beta >= 25 {
                beta + 3
            } else {
                beta + 1
            };
            beta = next.min(self.max_beta);
        }
        schedule
    }
}

/// Best basis found across phases (and across resumed runs)
#[derive(Debug, Clone, Default)]
pub struct ProgressiveSession {
    best: Option<(Matrix, BigInt)>,
}

impl ProgressiveSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best_basis(&self) -> Option<&Matrix> {
        self.best.as_ref().map(|(b, _)| b)
    }

    pub fn best_norm_squared(&self) -> Option<&BigInt> {
        self.best.as_ref().map(|(_, n)| n)
    }

    /// Record `basis` if its first row is strictly shorter than the best so
    /// far. Returns whether it was recorded.
    pub fn offer(&mut self, basis: &Matrix) -> bool {
        let norm = basis.row_norm_squared(0);
        let better = match &self.best {
            Some((_, best)) => norm < *best,
            None => true,
        };
        if better {
            self.best = Some((basis.clone(), norm));
        }
        better
    }

    pub fn clear(&mut self) {
        self.best = None;
    }
}

/// Summary of one block-size phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub beta: usize,
    /// DeepBKZ runs in this phase
    pub runs: usize,
    /// Runs that produced a new best record
    pub improvements: usize,
    /// Best `||b_0||^2` at the end of the phase
    pub best_norm_squared: BigInt,
}

/// Outcome of [`progressive_reduce`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressiveReport {
    pub phases: Vec<PhaseReport>,
    pub best_norm_squared: BigInt,
    pub target_reached: bool,
}

fn norm_of(norm_squared: &BigInt) -> f64 {
    norm_squared.to_f64().unwrap_or(f64::INFINITY).sqrt()
}

fn snapshot(params: &ProgressiveParams, basis: &Matrix, beta: Option<usize>, best: &BigInt) {
    if let Some(prefix) = &params.snapshot_prefix {
        if let Err(e) = save_snapshot(basis, prefix, beta, best) {
            log::warn!("Could not save snapshot for prefix {}: {}", prefix, e);
        }
    }
}

/// Randomized progressive DeepBKZ on `basis` in place.
///
/// On return `basis` holds the best basis recorded in `session`. A session
/// must only be reused for the same lattice.
pub fn progressive_reduce(
    basis: &mut Matrix,
    params: &ProgressiveParams,
    session: &mut ProgressiveSession,
    preprocessor: Option<&dyn BlockReducer>,
) -> Result<ProgressiveReport> {
    progressive_reduce_with::<f64>(basis, params, session, preprocessor)
}

/// [`progressive_reduce`] with DeepBKZ phases running on `R`
pub fn progressive_reduce_with<R: Real>(
    basis: &mut Matrix,
    params: &ProgressiveParams,
    session: &mut ProgressiveSession,
    preprocessor: Option<&dyn BlockReducer>,
) -> Result<ProgressiveReport> {
    let n = basis.rows();
    params.validate(n)?;
    let algo = &params.algorithm_params;

    if params.preprocess {
        if let Some(backend) = preprocessor {
            let beta = n.min(params.start_beta.max(PREPROCESS_MIN_BETA));
            let mut scratch = basis.clone();
            if backend.reduce(&mut scratch, beta, params.delta) {
                if scratch.dimension() != basis.dimension() {
                    return Err(LatticeError::backend(format!(
                        "{} changed the basis shape from {:?} to {:?}",
                        backend.name(),
                        basis.dimension(),
                        scratch.dimension()
                    )));
                }
                *basis = scratch;
                log::info!(
                    "[{}] preprocess (beta={}) done, ||b_0|| = {:.4}",
                    backend.name(),
                    beta,
                    norm_of(&basis.row_norm_squared(0))
                );
            } else {
                log::warn!(
                    "[{}] preprocess failed, continuing without it",
                    backend.name()
                );
            }
        }
    }

    session.offer(basis);
    if let Some(best) = session.best_basis() {
        basis.clone_from(best);
    }

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let ops = params.randomize_ops_per_dim * n;
    let reached = |norm_squared: &BigInt| {
        params
            .target_norm
            .is_some_and(|target| norm_of(norm_squared) <= target)
    };

    let mut phases = Vec::new();
    let mut target_reached = reached(&basis.row_norm_squared(0));

    for beta in params.schedule() {
        if target_reached {
            break;
        }
        log::info!("[Phase beta = {}] ||b_0|| = {:.4}", beta, norm_of(&basis.row_norm_squared(0)));

        let reducer = BKZReducer::deep(BKZParams {
            beta,
            delta: params.delta,
            algorithm_params: algo.clone(),
        });
        let mut phase_best = basis.row_norm_squared(0);
        let mut report = PhaseReport {
            beta,
            runs: 0,
            improvements: 0,
            best_norm_squared: phase_best.clone(),
        };
        let mut retries = 0;

        while retries < params.max_retries {
            algo.check_cancelled()?;
            let start = Instant::now();
            reducer.reduce_with::<R>(basis)?;
            report.runs += 1;

            let current = basis.row_norm_squared(0);
            log::info!(
                "  run {:>2} | norm {:.4} | {:.2?}",
                report.runs,
                norm_of(&current),
                start.elapsed()
            );

            if current < phase_best {
                phase_best = current.clone();
                report.improvements += 1;
                retries = 0;
                if session.offer(basis) {
                    log::info!("New best record: {:.4}", norm_of(&current));
                    snapshot(params, basis, None, &current);
                }
                if reached(&current) {
                    log::info!("Target norm reached: {:.4}", norm_of(&current));
                    target_reached = true;
                    break;
                }
            } else {
                retries += 1;
                if retries < params.max_retries {
                    randomize_basis(basis, ops, &mut rng)?;
                }
            }
        }

        if let Some((best, norm)) = &session.best {
            basis.clone_from(best);
            report.best_norm_squared = norm.clone();
            snapshot(params, basis, Some(beta), norm);
        }
        phases.push(report);
    }

    let best_norm_squared = basis.row_norm_squared(0);
    log::debug!(
        "Progressive BKZ finished after {} phases, ||b_0||^2 = {}",
        phases.len(),
        best_norm_squared
    );
    Ok(ProgressiveReport {
        phases,
        best_norm_squared,
        target_reached,
    })
}

/// Load an `n x n` bracketed basis and run [`progressive_reduce`] on it,
/// preprocessing with [`NativeBkz`].
pub fn progressive_reduce_file<P: AsRef<Path>>(
    path: P,
    n: usize,
    params: &ProgressiveParams,
    session: &mut ProgressiveSession,
) -> Result<(Matrix, ProgressiveReport)> {
    let mut basis = load_bracket_basis(path, n, n)?;
    let backend = NativeBkz {
        algorithm_params: params.algorithm_params.clone(),
        ..Default::default()
    };
    let report = progressive_reduce(&mut basis, params, session, Some(&backend))?;
    Ok((basis, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hnf::same_lattice;
    use crate::utils::matrix_utils::generate_knapsack_lattice;

    struct Failing;

    impl BlockReducer for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn reduce(&self, basis: &mut Matrix, _beta: usize, _delta: f64) -> bool {
            basis.truncate_rows(0);
            false
        }
    }

    struct Shrinking;

    impl BlockReducer for Shrinking {
        fn name(&self) -> &str {
            "shrinking"
        }

        fn reduce(&self, basis: &mut Matrix, _beta: usize, _delta: f64) -> bool {
            basis.truncate_rows(1);
            true
        }
    }

    fn params(start: usize, max: usize) -> ProgressiveParams {
        ProgressiveParams {
            seed: Some(11),
            max_retries: 2,
            ..ProgressiveParams::new(start, max)
        }
    }

    #[test]
    fn test_schedule() {
        assert_eq!(ProgressiveParams::new(2, 5).schedule(), vec![2, 3, 4, 5]);
        assert_eq!(
            ProgressiveParams::new(24, 40).schedule(),
            vec![24, 25, 28, 31, 36, 40]
        );
        assert_eq!(ProgressiveParams::new(7, 7).schedule(), vec![7]);
    }

    #[test]
    fn test_validation() {
        assert!(ProgressiveParams::new(2, 5).validate(5).is_ok());
        assert!(ProgressiveParams::new(1, 5).validate(5).is_err());
        assert!(ProgressiveParams::new(4, 3).validate(5).is_err());
        assert!(ProgressiveParams::new(2, 6).validate(5).is_err());
        let mut p = ProgressiveParams::new(2, 3);
        p.max_retries = 0;
        assert!(p.validate(5).is_err());
        p.max_retries = 1;
        p.target_norm = Some(-1.0);
        assert!(p.validate(5).is_err());
    }

    #[test]
    fn test_params_from_json() {
        let p: ProgressiveParams =
            serde_json::from_str(r#"{"start_beta": 3, "max_beta": 6, "seed": 5}"#).unwrap();
        assert_eq!(p.start_beta, 3);
        assert_eq!(p.max_beta, 6);
        assert_eq!(p.seed, Some(5));
        assert_eq!(p.max_retries, 5);
        assert!(p.preprocess);
    }

    #[test]
    fn test_session_offer() {
        let mut session = ProgressiveSession::new();
        let long = Matrix::from_i64(vec![vec![3, 4], vec![0, 1]]).unwrap();
        let short = Matrix::from_i64(vec![vec![0, 1], vec![3, 4]]).unwrap();
        assert!(session.offer(&long));
        assert!(session.offer(&short));
        assert!(!session.offer(&long));
        assert!(!session.offer(&short));
        assert_eq!(session.best_norm_squared(), Some(&BigInt::from(1)));
        assert_eq!(session.best_basis(), Some(&short));
        session.clear();
        assert!(session.best_basis().is_none());
    }

    #[test]
    fn test_progressive_reduce_preserves_lattice() {
        let mut b = generate_knapsack_lattice(8, 10_000, 99_999, Some(21)).unwrap();
        let original = b.clone();
        let mut session = ProgressiveSession::new();
        let report = progressive_reduce(&mut b, &params(2, 4), &mut session, Some(&NativeBkz::new()))
            .unwrap();

        assert_eq!(
            report.phases.iter().map(|p| p.beta).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
        assert!(same_lattice(&original, &b));
        assert_eq!(report.best_norm_squared, b.row_norm_squared(0));
        assert_eq!(session.best_norm_squared(), Some(&report.best_norm_squared));
        assert!(report.best_norm_squared <= original.row_norm_squared(0));
        for phase in &report.phases {
            assert!(phase.runs >= 2);
            assert!(phase.best_norm_squared >= report.best_norm_squared);
        }
    }

    #[test]
    fn test_high_precision_backend_flag() {
        let original = generate_knapsack_lattice(8, 10_000, 99_999, Some(4)).unwrap();
        let mut fast = original.clone();
        let mut precise = original.clone();
        let backend = NativeBkz {
            high_precision: true,
            ..NativeBkz::deep()
        };
        assert!(NativeBkz::deep().reduce(&mut fast, 4, 0.99));
        assert!(backend.reduce(&mut precise, 4, 0.99));
        assert!(same_lattice(&original, &precise));
        assert!(precise.row_norm_squared(0) < original.row_norm_squared(0));
        // without MPFR the flag falls back to f64
        #[cfg(not(feature = "high-precision"))]
        assert_eq!(precise, fast);
    }

    #[cfg(feature = "high-precision")]
    #[test]
    fn test_progressive_reduce_with_mpfr() {
        let mut b = generate_knapsack_lattice(8, 10_000, 99_999, Some(21)).unwrap();
        let original = b.clone();
        let mut session = ProgressiveSession::new();
        let report = progressive_reduce_with::<crate::precision::BigFloat<256>>(
            &mut b,
            &params(2, 4),
            &mut session,
            None,
        )
        .unwrap();
        assert!(same_lattice(&original, &b));
        assert_eq!(report.best_norm_squared, b.row_norm_squared(0));
        assert!(report.best_norm_squared <= original.row_norm_squared(0));
    }

    #[test]
    fn test_target_norm_stops_early() {
        let mut b = generate_knapsack_lattice(6, 1_000, 9_999, Some(4)).unwrap();
        let mut p = params(2, 6);
        p.target_norm = Some(1.0e9);
        let mut session = ProgressiveSession::new();
        let report = progressive_reduce(&mut b, &p, &mut session, None).unwrap();
        assert!(report.target_reached);
        assert!(report.phases.is_empty());
    }

    #[test]
    fn test_failing_backend_is_ignored() {
        let mut b = generate_knapsack_lattice(5, 100, 999, Some(9)).unwrap();
        let original = b.clone();
        let mut session = ProgressiveSession::new();
        progressive_reduce(&mut b, &params(2, 3), &mut session, Some(&Failing)).unwrap();
        assert!(same_lattice(&original, &b));
    }

    #[test]
    fn test_backend_changing_shape_is_rejected() {
        let mut b = generate_knapsack_lattice(5, 100, 999, Some(9)).unwrap();
        let original = b.clone();
        let mut session = ProgressiveSession::new();
        let result = progressive_reduce(&mut b, &params(2, 3), &mut session, Some(&Shrinking));
        assert!(matches!(result, Err(LatticeError::Backend(_))));
        assert_eq!(b, original);
    }

    #[test]
    fn test_snapshots_written() {
        let mut b = generate_knapsack_lattice(5, 1_000, 9_999, Some(2)).unwrap();
        let mut p = params(2, 2);
        p.preprocess = false;
        p.snapshot_prefix = Some("test_progressive_snapshot".to_string());
        let mut session = ProgressiveSession::new();
        progressive_reduce(&mut b, &p, &mut session, None).unwrap();

        let path = crate::utils::file_io::snapshot_path("test_progressive_snapshot", Some(2));
        let saved = load_bracket_basis(&path, 5, 6).unwrap();
        assert_eq!(saved, b);
        std::fs::remove_file(path).unwrap();
        let _ = std::fs::remove_file(crate::utils::file_io::snapshot_path(
            "test_progressive_snapshot",
            None,
        ));
    }

    #[test]
    fn test_progressive_reduce_file() {
        let path = "test_progressive_input.txt";
        std::fs::write(path, "[[1 0 0 48271]\n[0 1 0 16807]\n[0 0 1 69621]\n[0 0 0 99991]]\n").unwrap();
        let mut session = ProgressiveSession::new();
        let (b, report) = progressive_reduce_file(path, 4, &params(2, 3), &mut session).unwrap();
        std::fs::remove_file(path).unwrap();

        let original = Matrix::from_i64(vec![
            vec![1, 0, 0, 48271],
            vec![0, 1, 0, 16807],
            vec![0, 0, 1, 69621],
            vec![0, 0, 0, 99991],
        ])
        .unwrap();
        assert!(same_lattice(&original, &b));
        assert_eq!(report.phases.len(), 2);
    }
}

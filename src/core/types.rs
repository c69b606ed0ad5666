//! Core types shared by the reducers

use crate::core::error::{LatticeError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag.
///
/// Clones share the flag; cancelling any clone stops every reduction that
/// polls it. A cancelled reduction returns [`LatticeError::Cancelled`] and
/// leaves the basis unimodularly equivalent to its input.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation has been requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(LatticeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Algorithm parameters common to all reducers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlgorithmParams {
    /// Enable verbose logging
    pub verbose: bool,
    /// Optional cancellation hook, polled from the inner loops
    #[serde(skip)]
    pub cancel: Option<CancelToken>,
}

impl AlgorithmParams {
    /// Attach a cancel token
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }
}

/// Counters reported by the LLL family
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionStats {
    /// Main-loop iterations
    pub iterations: usize,
    /// Adjacent swaps, or deep insertions for DeepLLL
    pub swaps: usize,
    /// Pairwise size reductions that changed the basis
    pub size_reductions: usize,
}

impl ReductionStats {
    pub(crate) fn absorb(&mut self, other: &ReductionStats) {
        self.iterations += other.iterations;
        self.swaps += other.swaps;
        self.size_reductions += other.size_reductions;
    }
}

/// Validate a Lovász parameter
pub fn validate_delta(delta: f64) -> Result<()> {
    if !(0.25 < delta && delta < 1.0) {
        return Err(LatticeError::invalid_parameters(format!(
            "delta must lie in (0.25, 1), got {}",
            delta
        )));
    }
    Ok(())
}

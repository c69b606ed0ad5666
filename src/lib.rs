//! Lattice basis reduction: LLL, DeepLLL, MLLL, BKZ and DeepBKZ
//!
//! This crate provides lattice reduction algorithms with support for:
//! - LLL (Lenstra-Lenstra-Lovász) and DeepLLL reduction
//! - MLLL for linearly dependent generating sets
//! - Schnorr-Euchner enumeration with optional pruning
//! - BKZ (Block Korkine-Zolotarev) and DeepBKZ reduction
//! - Randomized progressive BKZ with snapshots
//! - High-precision Gram-Schmidt data (optional)
//!
//! Bases hold exact integers ([`Matrix`] over `BigInt`), so every reduction
//! preserves the lattice exactly. Gram-Schmidt data is computed in a
//! [`Real`](precision::Real) backend, `f64` unless chosen otherwise.
//!
//! # Examples
//!
//! Basic LLL reduction:
//! ```rust
//! use lattice_reducer::{reduce_lll, Matrix};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut basis = Matrix::from_i64(vec![
//!     vec![5, -3, -7],
//!     vec![2, -7, -7],
//!     vec![3, -10, 0],
//! ])?;
//!
//! reduce_lll(&mut basis, 0.99)?;
//! println!("||b_0||^2 = {}", basis.row_norm_squared(0));
//! # Ok(())
//! # }
//! ```
//!
//! BKZ reduction with custom block size:
//! ```rust
//! use lattice_reducer::{BKZParams, BKZReducer, Matrix};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut basis = Matrix::from_i64(vec![
//!     vec![1, 0, 0, 48271],
//!     vec![0, 1, 0, 16807],
//!     vec![0, 0, 1, 69621],
//!     vec![0, 0, 0, 99991],
//! ])?;
//! let params = BKZParams::new(3); // block size = 3
//! let stats = BKZReducer::deep(params).reduce(&mut basis)?;
//! println!("{} blocks, ||b_0||^2 = {}", stats.blocks, basis.row_norm_squared(0));
//! # Ok(())
//! # }
//! ```

pub mod bkz;
pub mod core;
pub mod gso_update;
pub mod lll;
pub mod mlll;
pub mod precision;
pub mod progressive;
pub mod size_reduction;
pub mod svp;
pub mod utils;

pub use bkz::*;
pub use core::*;
pub use lll::*;
pub use mlll::*;
pub use progressive::*;
pub use svp::*;

pub use precision::Real;
#[cfg(feature = "high-precision")]
pub use precision::BigFloat;

// Re-export commonly used types
pub use core::error::{LatticeError, Result};
pub use core::matrix::Matrix;

/// Feature flag utilities
pub mod features {
    /// Check if high precision arithmetic is enabled
    pub fn high_precision_enabled() -> bool {
        cfg!(feature = "high-precision")
    }
}

//! Core module wiring: basis matrix, Gram-Schmidt data, errors and shared types.

pub mod error;
pub mod gso;
pub mod hnf;
pub mod matrix;
pub mod types;

// Re-export the most commonly used items so downstream code can simply import
// `crate::core::*` without having to juggle individual submodules.
pub use error::*;
pub use gso::GramSchmidt;
pub use hnf::{hermite_normal_form, same_lattice};
pub use matrix::*;
pub use types::*;

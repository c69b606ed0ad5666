//! Core error types for lattice operations

use thiserror::Error;

/// Error types for lattice reduction operations
#[derive(Debug, Error)]
pub enum LatticeError {
    /// Invalid matrix dimensions
    #[error("Invalid dimensions: expected {expected:?}, found {found:?}")]
    InvalidDimensions {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Row or column index outside the range an operation accepts
    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    /// Invalid parameters (delta, beta, progressive schedule, ...)
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Numerical instability detected
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// A cancel token was triggered while a reduction was running
    #[error("Operation cancelled")]
    Cancelled,

    /// Malformed basis text
    #[error("Parse error: {0}")]
    Parse(String),

    /// External block reducer misbehaved
    #[error("Backend error: {0}")]
    Backend(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for lattice operations
pub type Result<T> = std::result::Result<T, LatticeError>;

impl LatticeError {
    /// Create an invalid dimensions error
    pub fn invalid_dimensions(expected: (usize, usize), found: (usize, usize)) -> Self {
        LatticeError::InvalidDimensions { expected, found }
    }

    /// Create an invalid index error
    pub fn invalid_index(msg: impl Into<String>) -> Self {
        LatticeError::InvalidIndex(msg.into())
    }

    /// Create an invalid parameters error
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        LatticeError::InvalidParameters(msg.into())
    }

    /// Create a numerical instability error
    pub fn numerical_instability(msg: impl Into<String>) -> Self {
        LatticeError::NumericalInstability(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        LatticeError::Parse(msg.into())
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        LatticeError::Backend(msg.into())
    }
}

//! Exact-integer basis matrix
//!
//! Rows are lattice vectors. Every mutating method is a unimodular row
//! operation (or a row move), so the spanned lattice never changes unless a
//! caller explicitly removes or inserts rows.

use crate::core::error::{LatticeError, Result};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

/// Matrix represented as a vector of vectors (row-major)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    data: Vec<Vec<BigInt>>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Create a new matrix from 2D vector
    pub fn new(data: Vec<Vec<BigInt>>) -> Result<Self> {
        if data.is_empty() {
            return Err(LatticeError::invalid_parameters("Matrix cannot be empty"));
        }

        let rows = data.len();
        let cols = data[0].len();

        for (i, row) in data.iter().enumerate() {
            if row.len() != cols {
                return Err(LatticeError::invalid_dimensions(
                    (rows, cols),
                    (i + 1, row.len()),
                ));
            }
        }

        Ok(Matrix { data, rows, cols })
    }

    /// Create from machine integers
    pub fn from_i64(data: Vec<Vec<i64>>) -> Result<Self> {
        Matrix::new(
            data.into_iter()
                .map(|row| row.into_iter().map(BigInt::from).collect())
                .collect(),
        )
    }

    /// Create a matrix with given dimensions, filled with zeros
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            data: vec![vec![BigInt::zero(); cols]; rows],
            rows,
            cols,
        }
    }

    /// Create an identity matrix
    pub fn identity(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(LatticeError::invalid_parameters("Dimension cannot be zero"));
        }

        let mut m = Matrix::zeros(n, n);
        for i in 0..n {
            m.data[i][i] = BigInt::from(1);
        }
        Ok(m)
    }

    /// Get the number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Get the dimension of the matrix
    pub fn dimension(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Get a reference to a specific element
    pub fn get(&self, row: usize, col: usize) -> Option<&BigInt> {
        self.data.get(row)?.get(col)
    }

    /// Set a specific element
    pub fn set(&mut self, row: usize, col: usize, value: BigInt) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(LatticeError::invalid_dimensions(
                (self.rows, self.cols),
                (row + 1, col + 1),
            ));
        }

        self.data[row][col] = value;
        Ok(())
    }

    /// Borrow a row.
    ///
    /// Panics if `row` is out of bounds, like slice indexing.
    pub fn row(&self, row: usize) -> &[BigInt] {
        &self.data[row]
    }

    /// Replace a whole row
    pub fn set_row(&mut self, row: usize, values: Vec<BigInt>) -> Result<()> {
        self.check_row(row)?;
        if values.len() != self.cols {
            return Err(LatticeError::invalid_dimensions(
                (self.rows, self.cols),
                (1, values.len()),
            ));
        }
        self.data[row] = values;
        Ok(())
    }

    /// Iterate over the rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[BigInt]> {
        self.data.iter().map(|r| r.as_slice())
    }

    /// Convert to nested vectors
    pub fn to_vec(&self) -> Vec<Vec<BigInt>> {
        self.data.clone()
    }

    /// Entries as `i64`, if every entry fits
    pub fn to_i64_vec(&self) -> Option<Vec<Vec<i64>>> {
        use num_traits::ToPrimitive;
        self.data
            .iter()
            .map(|row| row.iter().map(|x| x.to_i64()).collect())
            .collect()
    }

    /// Swap two rows
    pub fn swap_rows(&mut self, i: usize, j: usize) -> Result<()> {
        if i >= self.rows || j >= self.rows {
            return Err(LatticeError::invalid_index(format!(
                "Row indices {} and {} out of bounds for {} rows",
                i, j, self.rows
            )));
        }
        self.data.swap(i, j);
        Ok(())
    }

    /// `row_i -= q * row_j`
    pub fn sub_multiple(&mut self, i: usize, j: usize, q: &BigInt) -> Result<()> {
        self.check_distinct(i, j)?;
        if q.is_zero() {
            return Ok(());
        }
        let src = self.data[j].clone();
        for (a, b) in self.data[i].iter_mut().zip(src.iter()) {
            *a -= q * b;
        }
        Ok(())
    }

    /// `row_i += row_j`
    pub fn add_row(&mut self, i: usize, j: usize) -> Result<()> {
        self.check_distinct(i, j)?;
        let src = self.data[j].clone();
        for (a, b) in self.data[i].iter_mut().zip(src.iter()) {
            *a += b;
        }
        Ok(())
    }

    /// `row_i -= row_j`
    pub fn sub_row(&mut self, i: usize, j: usize) -> Result<()> {
        self.check_distinct(i, j)?;
        let src = self.data[j].clone();
        for (a, b) in self.data[i].iter_mut().zip(src.iter()) {
            *a -= b;
        }
        Ok(())
    }

    /// Move row `k` to position `i` (`i <= k`), shifting rows `i..k` down by one
    pub fn rotate_down(&mut self, i: usize, k: usize) -> Result<()> {
        if i > k || k >= self.rows {
            return Err(LatticeError::invalid_index(format!(
                "cannot move row {} to {} in a {}-row matrix",
                k, i, self.rows
            )));
        }
        self.data[i..=k].rotate_right(1);
        Ok(())
    }

    /// Insert a row at the specified position
    pub fn insert_row(&mut self, index: usize, row: Vec<BigInt>) -> Result<()> {
        if row.len() != self.cols {
            return Err(LatticeError::invalid_dimensions(
                (self.rows, self.cols),
                (1, row.len()),
            ));
        }
        if index > self.rows {
            return Err(LatticeError::invalid_index(format!(
                "row index {} out of bounds for {} rows",
                index, self.rows
            )));
        }
        self.data.insert(index, row);
        self.rows += 1;
        Ok(())
    }

    /// Keep only the first `rows` rows
    pub fn truncate_rows(&mut self, rows: usize) {
        self.data.truncate(rows);
        self.rows = self.data.len();
    }

    /// Whether a row is the zero vector
    pub fn is_zero_row(&self, row: usize) -> bool {
        self.data[row].iter().all(|x| x.is_zero())
    }

    /// Exact inner product of two rows
    pub fn dot_rows(&self, i: usize, j: usize) -> BigInt {
        self.data[i]
            .iter()
            .zip(self.data[j].iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Exact squared Euclidean norm of a row
    pub fn row_norm_squared(&self, row: usize) -> BigInt {
        self.data[row].iter().map(|x| x * x).sum()
    }

    /// Largest absolute entry
    pub fn max_abs_entry(&self) -> BigInt {
        self.data
            .iter()
            .flatten()
            .map(|x| x.abs())
            .max()
            .unwrap_or_else(BigInt::zero)
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.rows {
            return Err(LatticeError::invalid_index(format!(
                "row index {} out of bounds for {} rows",
                row, self.rows
            )));
        }
        Ok(())
    }

    fn check_distinct(&self, i: usize, j: usize) -> Result<()> {
        self.check_row(i)?;
        self.check_row(j)?;
        if i == j {
            return Err(LatticeError::invalid_index(format!(
                "row operation needs two distinct rows, got {} twice",
                i
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Matrix {}x{}:", self.rows, self.cols)?;
        for row in &self.data {
            writeln!(
                f,
                "[{}]",
                row.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(", ")
            )?;
        }
        Ok(())
    }
}

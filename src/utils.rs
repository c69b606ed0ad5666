//! Utility functions: basis files, snapshots and random test lattices

use crate::core::error::{LatticeError, Result};
use crate::core::matrix::Matrix;
use num_bigint::BigInt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Reading and writing bracketed basis files
pub mod file_io {
    use super::*;
    use num_traits::{ToPrimitive, Zero};
    use std::path::{Path, PathBuf};

    /// Parse a basis written as bracketed rows, e.g. `[[1 0 5]\n[0 1 7]]`.
    ///
    /// Only lines containing `[` are rows. Brackets act as whitespace, values
    /// are placed positionally into a `rows x cols` matrix, surplus rows and
    /// values are ignored and missing entries stay zero.
    pub fn parse_bracket_basis(text: &str, rows: usize, cols: usize) -> Result<Matrix> {
        if rows == 0 || cols == 0 {
            return Err(LatticeError::invalid_parameters(format!(
                "Basis shape must be positive, got {}x{}",
                rows, cols
            )));
        }

        let mut data = vec![vec![BigInt::zero(); cols]; rows];
        let lines = text.lines().enumerate().filter(|(_, line)| line.contains('['));
        for (row, (line_no, line)) in lines.take(rows).enumerate() {
            let cleaned = line.replace(['[', ']'], " ");
            for (col, token) in cleaned.split_whitespace().take(cols).enumerate() {
                data[row][col] = token.parse::<BigInt>().map_err(|_| {
                    LatticeError::parse(format!(
                        "line {}: '{}' is not an integer",
                        line_no + 1,
                        token
                    ))
                })?;
            }
        }

        Matrix::new(data)
    }

    /// Load a bracketed basis file
    pub fn load_bracket_basis<P: AsRef<Path>>(path: P, rows: usize, cols: usize) -> Result<Matrix> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let basis = parse_bracket_basis(&text, rows, cols)?;
        log::debug!(
            "Loaded {}x{} basis from {}",
            rows,
            cols,
            path.as_ref().display()
        );
        Ok(basis)
    }

    /// One `[a b c]` line per row
    pub fn format_basis_brackets(basis: &Matrix) -> String {
        let mut out = String::new();
        for row in basis.iter_rows() {
            let entries: Vec<String> = row.iter().map(|x| x.to_string()).collect();
            out.push('[');
            out.push_str(&entries.join(" "));
            out.push_str("]\n");
        }
        out
    }

    /// JSON array of rows, each entry a decimal string so large integers
    /// survive any JSON reader
    pub fn format_basis_json(basis: &Matrix) -> serde_json::Result<String> {
        let rows: Vec<Vec<String>> = basis
            .iter_rows()
            .map(|row| row.iter().map(|x| x.to_string()).collect())
            .collect();
        serde_json::to_string_pretty(&rows)
    }

    /// Snapshot label: a block size, or `None` for the best-of-run record
    pub fn snapshot_label(beta: Option<usize>) -> String {
        match beta {
            Some(beta) => beta.to_string(),
            None => "best".to_string(),
        }
    }

    /// `{prefix}_beta_{beta|best}.txt`
    pub fn snapshot_path(prefix: &str, beta: Option<usize>) -> PathBuf {
        PathBuf::from(format!("{}_beta_{}.txt", prefix, snapshot_label(beta)))
    }

    /// Render a progress snapshot: a short header followed by the basis rows.
    ///
    /// The output can be read back with [`parse_bracket_basis`].
    pub fn format_snapshot(basis: &Matrix, beta: Option<usize>, best_norm_squared: &BigInt) -> String {
        let norm_squared = basis.row_norm_squared(0);
        let norm = norm_squared.to_f64().unwrap_or(f64::INFINITY).sqrt();
        let best = best_norm_squared.to_f64().unwrap_or(f64::INFINITY).sqrt();

        let mut out = String::new();
        out.push_str("--- Progressive BKZ State Save ---\n");
        out.push_str(&format!("Dimension: {}\n", basis.rows()));
        out.push_str(&format!("Last Completed Beta: {}\n", snapshot_label(beta)));
        out.push_str(&format!("Shortest Norm Squared (||b1||^2): {}\n", norm_squared));
        out.push_str(&format!("Shortest Vector Norm (||b1||): {:.4}\n", norm));
        out.push_str(&format!("Best Norm Found in This Run: {:.4}\n", best));
        out.push_str(&format!(
            "--- Basis Matrix B ({} x {}) ---\n",
            basis.rows(),
            basis.cols()
        ));
        out.push_str(&format_basis_brackets(basis));
        out
    }

    /// Write a snapshot next to `prefix` and return its path
    pub fn save_snapshot(
        basis: &Matrix,
        prefix: &str,
        beta: Option<usize>,
        best_norm_squared: &BigInt,
    ) -> Result<PathBuf> {
        let path = snapshot_path(prefix, beta);
        std::fs::write(&path, format_snapshot(basis, beta, best_norm_squared))?;
        log::debug!("Saved snapshot {}", path.display());
        Ok(path)
    }
}

/// Random lattices and basis randomization
pub mod matrix_utils {
    use super::*;

    fn seeded(seed: Option<u64>) -> StdRng {
        match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => {
                let mut entropy = rand::rng();
                StdRng::from_rng(&mut entropy)
            }
        }
    }

    /// Random `n x m` basis with entries in `[-100, 100]`.
    ///
    /// The rows are not guaranteed to be independent.
    pub fn generate_random_lattice(n: usize, m: usize, seed: Option<u64>) -> Result<Matrix> {
        if n == 0 || m == 0 {
            return Err(LatticeError::invalid_parameters("Dimensions must be positive"));
        }
        let mut rng = seeded(seed);
        let data = (0..n)
            .map(|_| (0..m).map(|_| BigInt::from(rng.random_range(-100i64..=100))).collect())
            .collect();
        Matrix::new(data)
    }

    /// Knapsack-type basis: `n` rows `e_i | a_i` with weights `a_i` drawn
    /// from `[lo, hi]`, giving an `n x (n + 1)` basis of full rank.
    pub fn generate_knapsack_lattice(n: usize, lo: i64, hi: i64, seed: Option<u64>) -> Result<Matrix> {
        if n < 2 {
            return Err(LatticeError::invalid_parameters("Knapsack lattice needs n >= 2"));
        }
        if lo <= 0 || lo > hi {
            return Err(LatticeError::invalid_parameters(format!(
                "Invalid weight range [{}, {}]",
                lo, hi
            )));
        }
        let mut rng = seeded(seed);
        let mut data = vec![vec![0i64; n + 1]; n];
        for (i, row) in data.iter_mut().enumerate() {
            row[i] = 1;
            row[n] = rng.random_range(lo..=hi);
        }
        Matrix::from_i64(data)
    }

    /// Apply `ops` random `row_i += row_j` / `row_i -= row_j` steps (`i != j`).
    ///
    /// Draws that pick the same row twice are skipped, so fewer than `ops`
    /// operations may be applied. Returns the number applied.
    pub fn randomize_basis<G: Rng>(basis: &mut Matrix, ops: usize, rng: &mut G) -> Result<usize> {
        let n = basis.rows();
        if n < 2 {
            return Ok(0);
        }
        let mut applied = 0;
        for _ in 0..ops {
            let i = rng.random_range(0..n);
            let j = rng.random_range(0..n);
            if i == j {
                continue;
            }
            if rng.random_bool(0.5) {
                basis.add_row(i, j)?;
            } else {
                basis.sub_row(i, j)?;
            }
            applied += 1;
        }
        log::trace!("Randomized basis with {} row operations", applied);
        Ok(applied)
    }
}

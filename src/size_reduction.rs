//! Size reduction
//!
//! Pairwise reduction keeps `|mu[i][j]| <= 1/2` by subtracting the nearest
//! integer multiple of `b_j` from `b_i` and patching row `i` of `mu` in place.

use crate::core::error::{LatticeError, Result};
use crate::core::gso::GramSchmidt;
use crate::core::matrix::Matrix;
use crate::gso_update::refresh_row;
use crate::precision::Real;

/// Size-reduce `b_i` against `b_j` (`j < i`).
///
/// Returns `true` when the basis changed. Indices are validated before
/// anything is touched.
pub fn size_reduce_pair<R: Real>(
    basis: &mut Matrix,
    mu: &mut [Vec<R>],
    i: usize,
    j: usize,
) -> Result<bool> {
    let n = basis.rows();
    if j >= i || i >= n {
        return Err(LatticeError::invalid_index(format!(
            "size reduction needs j < i < {}, got i = {}, j = {}",
            n, i, j
        )));
    }
    if mu.len() < n || mu[i].len() <= j {
        return Err(LatticeError::invalid_dimensions(
            (n, n),
            (mu.len(), mu.get(i).map_or(0, |r| r.len())),
        ));
    }

    if mu[i][j].abs() <= R::from_f64(0.5) {
        return Ok(false);
    }

    let q_real = mu[i][j].round();
    let q = q_real.round_to_bigint().ok_or_else(|| {
        LatticeError::numerical_instability(format!("mu[{}][{}] is not finite", i, j))
    })?;

    basis.sub_multiple(i, j, &q)?;

    let (head, tail) = mu.split_at_mut(i);
    let row_j = &head[j];
    let row_i = &mut tail[0];
    for l in 0..=j {
        row_i[l] = row_i[l].clone() - q_real.clone() * row_j[l].clone();
    }
    Ok(true)
}

/// Size-reduce `b_k` against all earlier rows until it is stable.
///
/// Each pass refreshes row `k` of `mu` and `B_k` from the exact basis and
/// then reduces against `j = k-1, ..., 0`. Stops after a pass that changes
/// nothing, or one that fails to shorten `b_k`. On return row `k` of the GSO
/// matches the basis. Returns the number of pairwise reductions.
pub fn size_reduce_row<R: Real>(
    basis: &mut Matrix,
    mu: &mut [Vec<R>],
    norms: &mut [R],
    k: usize,
) -> Result<usize> {
    let mut count = 0;
    let mut length = basis.row_norm_squared(k);
    loop {
        refresh_row(basis, mu, norms, k)?;
        let before = count;
        for j in (0..k).rev() {
            if size_reduce_pair(basis, mu, k, j)? {
                count += 1;
            }
        }
        if count == before {
            return Ok(count);
        }

        let shorter = basis.row_norm_squared(k);
        if shorter >= length {
            refresh_row(basis, mu, norms, k)?;
            return Ok(count);
        }
        length = shorter;
    }
}

/// Size-reduce the whole basis and return its fresh Gram-Schmidt data.
///
/// Rows are processed top to bottom, each against `j = i-1, ..., 0`. With
/// fewer than two rows this is plain orthogonalization.
pub fn size_reduce<R: Real>(basis: &mut Matrix) -> Result<GramSchmidt<R>> {
    let n = basis.rows();
    if n < 2 {
        return Ok(GramSchmidt::compute(basis));
    }

    let (mut mu, _) = GramSchmidt::<R>::compute(basis).into_parts();
    let mut changed = 0usize;
    for i in 1..n {
        for j in (0..i).rev() {
            if size_reduce_pair(basis, &mut mu, i, j)? {
                changed += 1;
            }
        }
    }
    log::trace!("size_reduce: {} pairwise reductions on {} rows", changed, n);

    Ok(GramSchmidt::compute(basis))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(data: Vec<Vec<i64>>) -> Matrix {
        Matrix::from_i64(data).unwrap()
    }

    #[test]
    fn test_pair_reduction() {
        let mut b = m(vec![vec![1, 0], vec![7, 1]]);
        let (mut mu, _) = GramSchmidt::<f64>::compute(&b).into_parts();
        assert!(size_reduce_pair(&mut b, &mut mu, 1, 0).unwrap());
        assert_eq!(b.to_i64_vec().unwrap(), vec![vec![1, 0], vec![0, 1]]);
        assert_eq!(mu[1][0], 0.0);
        assert_eq!(mu[1][1], 1.0);
    }

    #[test]
    fn test_pair_noop_at_half() {
        // mu = 1/2 exactly is already reduced
        let mut b = m(vec![vec![2, 0], vec![1, 1]]);
        let (mut mu, _) = GramSchmidt::<f64>::compute(&b).into_parts();
        assert!(!size_reduce_pair(&mut b, &mut mu, 1, 0).unwrap());
        assert_eq!(b.to_i64_vec().unwrap(), vec![vec![2, 0], vec![1, 1]]);
    }

    #[test]
    fn test_pair_index_errors_leave_basis_untouched() {
        let mut b = m(vec![vec![1, 0], vec![7, 1]]);
        let before = b.clone();
        let (mut mu, _) = GramSchmidt::<f64>::compute(&b).into_parts();
        assert!(matches!(
            size_reduce_pair(&mut b, &mut mu, 0, 1),
            Err(LatticeError::InvalidIndex(_))
        ));
        assert!(matches!(
            size_reduce_pair(&mut b, &mut mu, 2, 0),
            Err(LatticeError::InvalidIndex(_))
        ));
        assert!(size_reduce_pair(&mut b, &mut mu[..1], 1, 0).is_err());
        assert_eq!(b, before);
    }

    #[test]
    fn test_row_reduction_recovers_from_stale_mu() {
        let mut b = m(vec![
            vec![1, 0, 0, 0],
            vec![0, 1, 0, 0],
            vec![918_273_645, 564_738_291, 1, 0],
        ]);
        let (mut mu, mut norms) = GramSchmidt::<f64>::compute(&b).into_parts();
        // values left over from a different row
        mu[2][0] = 3.0;
        mu[2][1] = -7.0;
        let count = size_reduce_row(&mut b, &mut mu, &mut norms, 2).unwrap();
        assert_eq!(count, 2);
        assert_eq!(b.row(2), m(vec![vec![0, 0, 1, 0]]).row(0));
        assert_eq!(mu[2][0], 0.0);
        assert_eq!(mu[2][1], 0.0);
        assert_eq!(norms[2], 1.0);

        assert_eq!(size_reduce_row(&mut b, &mut mu, &mut norms, 2).unwrap(), 0);
    }

    #[test]
    fn test_full_size_reduction() {
        let mut b = m(vec![vec![1, 0, 0], vec![5, 1, 0], vec![-8, 13, 1]]);
        let gs = size_reduce::<f64>(&mut b).unwrap();
        assert!(gs.is_size_reduced(1e-9));
        assert!(gs.max_reconstruction_error(&b) < 1e-9);
        assert_eq!(
            b.to_i64_vec().unwrap(),
            vec![vec![1, 0, 0], vec![0, 1, 0], vec![0, 0, 1]]
        );
    }

    #[test]
    fn test_single_row_is_plain_gso() {
        let mut b = m(vec![vec![3, 4]]);
        let gs = size_reduce::<f64>(&mut b).unwrap();
        assert_eq!(gs.norm_squared, vec![25.0]);
        assert_eq!(b.to_i64_vec().unwrap(), vec![vec![3, 4]]);
    }
}

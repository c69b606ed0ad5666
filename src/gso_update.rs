//! Incremental Gram-Schmidt updates
//!
//! Both updates touch only `mu` and `B_norm`; the caller applies the matching
//! row move to the basis. `B*` is not maintained here. [`refresh_row`]
//! rebuilds one row from the exact integer basis and is what the reducers
//! use to stop the incremental values from drifting.

use crate::core::error::{LatticeError, Result};
use crate::core::matrix::Matrix;
use crate::precision::Real;

/// `num / den`, or zero when the denominator is within epsilon of zero
fn ratio<R: Real>(num: R, den: &R) -> R {
    if den.abs() <= R::epsilon() {
        R::zero()
    } else {
        num / den.clone()
    }
}

fn check_shape<R: Real>(mu: &[Vec<R>], norms: &[R]) -> Result<usize> {
    let n = norms.len();
    if mu.len() != n || mu.iter().any(|row| row.len() < n) {
        return Err(LatticeError::invalid_dimensions(
            (n, n),
            (mu.len(), mu.first().map_or(0, |r| r.len())),
        ));
    }
    Ok(n)
}

/// Recompute `mu[k][0..k]` and `B_k` from exact inner products of the basis
/// rows.
///
/// Rows `0..k` of `mu` and `norms` must already be accurate. `B_k` is stored
/// as zero when it is within `R::epsilon() * ||b_k||^2` of zero, so a row
/// that depends on the rows above it gets an exact zero norm.
pub fn refresh_row<R: Real>(
    basis: &Matrix,
    mu: &mut [Vec<R>],
    norms: &mut [R],
    k: usize,
) -> Result<()> {
    let n = check_shape(mu, norms)?;
    if k >= n || k >= basis.rows() {
        return Err(LatticeError::invalid_index(format!(
            "cannot refresh row {} of a {}-row GSO",
            k, n
        )));
    }

    // r[j] = <b_k, b*_j> = mu[k][j] * B_j
    let mut r: Vec<R> = Vec::with_capacity(k);
    for j in 0..k {
        let mut s = R::from_bigint(&basis.dot_rows(k, j));
        for (i, r_i) in r.iter().enumerate() {
            s = s - mu[j][i].clone() * r_i.clone();
        }
        mu[k][j] = ratio(s.clone(), &norms[j]);
        r.push(s);
    }
    mu[k][k] = R::one();

    let length = R::from_bigint(&basis.row_norm_squared(k));
    let mut b_k = length.clone();
    for (j, r_j) in r.iter().enumerate() {
        b_k = b_k - mu[k][j].clone() * r_j.clone();
    }
    norms[k] = if b_k <= R::epsilon() * length {
        R::zero()
    } else {
        b_k
    };
    Ok(())
}

/// Update after swapping rows `k-1` and `k` (`1 <= k < n`).
pub fn swap_adjacent<R: Real>(mu: &mut [Vec<R>], norms: &mut [R], k: usize) -> Result<()> {
    let n = check_shape(mu, norms)?;
    if k == 0 || k >= n {
        return Err(LatticeError::invalid_index(format!(
            "adjacent swap needs 1 <= k < {}, got {}",
            n, k
        )));
    }

    let nu = mu[k][k - 1].clone();
    let b_prev = norms[k - 1].clone();
    let d = norms[k].clone() + nu.clone() * nu.clone() * b_prev.clone();

    mu[k][k - 1] = ratio(nu.clone() * b_prev.clone(), &d);
    norms[k] = ratio(norms[k].clone() * b_prev, &d);
    norms[k - 1] = d;

    {
        let (head, tail) = mu.split_at_mut(k);
        head[k - 1][..k - 1].swap_with_slice(&mut tail[0][..k - 1]);
    }

    let new_mu = mu[k][k - 1].clone();
    for row in mu.iter_mut().skip(k + 1) {
        let t = row[k].clone();
        row[k] = row[k - 1].clone() - nu.clone() * t.clone();
        row[k - 1] = t + new_mu.clone() * row[k].clone();
    }
    Ok(())
}

/// Update after moving row `k` to position `i` (`0 <= i < k < n`), rows
/// `i..k` shifting down by one.
pub fn deep_insertion<R: Real>(
    mu: &mut [Vec<R>],
    norms: &mut [R],
    i: usize,
    k: usize,
) -> Result<()> {
    let n = check_shape(mu, norms)?;
    if i >= k || k >= n {
        return Err(LatticeError::invalid_index(format!(
            "deep insertion needs i < k < {}, got i = {}, k = {}",
            n, i, k
        )));
    }

    // P_j = mu[k][j] * B_j, D_j = ||projection of b_k orthogonal to b_0..b_{j-1}||^2
    let mut p = vec![R::zero(); n];
    let mut d = vec![R::zero(); n];
    p[k] = norms[k].clone();
    d[k] = norms[k].clone();
    for j in (i..k).rev() {
        p[j] = mu[k][j].clone() * norms[j].clone();
        d[j] = d[j + 1].clone() + mu[k][j].clone() * p[j].clone();
    }

    let mut s = vec![R::zero(); n];
    for j in (i + 1..=k).rev() {
        let t = ratio(mu[k][j - 1].clone(), &d[j]);
        for l in (k + 1..n).rev() {
            s[l] = s[l].clone() + mu[l][j].clone() * p[j].clone();
            mu[l][j] = mu[l][j - 1].clone() - t.clone() * s[l].clone();
        }
        for l in (j + 1..=k).rev() {
            s[l] = s[l].clone() + mu[l - 1][j].clone() * p[j].clone();
            mu[l][j] = mu[l - 1][j - 1].clone() - t.clone() * s[l].clone();
        }
    }

    for l in k + 1..n {
        mu[l][i] = ratio(s[l].clone() + mu[l][i].clone() * p[i].clone(), &d[i]);
    }
    for l in (i + 1..=k).rev() {
        mu[l][i] = ratio(s[l].clone() + mu[l - 1][i].clone() * p[i].clone(), &d[i]);
    }

    // Columns left of the insertion point only move with their rows
    for j in 0..i {
        let moved = mu[k][j].clone();
        for l in (i + 1..=k).rev() {
            mu[l][j] = mu[l - 1][j].clone();
        }
        mu[i][j] = moved;
    }

    for j in (i + 1..=k).rev() {
        norms[j] = ratio(d[j].clone() * norms[j - 1].clone(), &d[j - 1]);
    }
    norms[i] = d[i].clone();
    Ok(())
}

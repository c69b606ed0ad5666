//! MLLL: LLL for generating sets that may be linearly dependent
//!
//! The input rows may have any rank. Vectors that size-reduce to zero are
//! moved behind a shrinking window, so on return the first `rank` rows form
//! an LLL-reduced basis of the lattice and every later row is zero.

use crate::core::error::Result;
use crate::core::matrix::Matrix;
use crate::core::types::ReductionStats;
use crate::gso_update::refresh_row;
use crate::lll::LLLParams;
use crate::precision::Real;
use crate::size_reduction::{size_reduce_pair, size_reduce_row};
use serde::{Deserialize, Serialize};

/// Result of an MLLL run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MLLLOutcome {
    /// Number of nonzero rows left at the top of the matrix
    pub rank: usize,
    pub stats: ReductionStats,
}

/// GSO coefficients and squared norms over the active rows
struct State<R: Real> {
    mu: Vec<Vec<R>>,
    norms: Vec<R>,
}

impl<R: Real> State<R> {
    fn new(h: usize) -> Self {
        State {
            mu: vec![vec![R::zero(); h]; h],
            norms: vec![R::zero(); h],
        }
    }

    fn refresh(&mut self, basis: &Matrix, k: usize) -> Result<()> {
        refresh_row(basis, &mut self.mu, &mut self.norms, k)
    }

    /// GSO after swapping rows `k-1` and `k`, rows up to `l` being active.
    ///
    /// `nu` is `mu[k][k-1]` and `b_proj` is `B_k + nu^2 B_{k-1}`, both taken
    /// before the swap.
    fn swap(&mut self, k: usize, l: usize, nu: R, b_proj: R) {
        let eps = R::epsilon();
        {
            let (head, tail) = self.mu.split_at_mut(k);
            head[k - 1][..k - 1].swap_with_slice(&mut tail[0][..k - 1]);
        }

        if b_proj > eps {
            if self.norms[k] <= eps {
                // b_k depended on b_0..b_{k-1}; its projection is nu * b*_{k-1}
                self.norms[k - 1] = b_proj;
                self.norms[k] = R::zero();
                self.mu[k][k - 1] = R::one() / nu.clone();
                for i in k + 1..=l {
                    self.mu[i][k - 1] = self.mu[i][k - 1].clone() / nu.clone();
                }
            } else {
                let t = self.norms[k - 1].clone() / b_proj.clone();
                let new_mu = nu.clone() * t.clone();
                self.mu[k][k - 1] = new_mu.clone();
                self.norms[k - 1] = b_proj;
                self.norms[k] = self.norms[k].clone() * t;

                for i in k + 1..=l {
                    let tmp = self.mu[i][k].clone();
                    self.mu[i][k] = self.mu[i][k - 1].clone() - nu.clone() * tmp.clone();
                    self.mu[i][k - 1] = tmp + new_mu.clone() * self.mu[i][k].clone();
                }
            }
        } else {
            // Both projections vanish: the pair only trades places
            self.norms.swap(k - 1, k);
            self.mu[k][k - 1] = R::zero();
            for i in k + 1..=l {
                self.mu[i].swap(k - 1, k);
            }
        }
    }
}

/// MLLL reducer
#[derive(Debug, Clone, Default)]
pub struct MLLLReducer {
    params: LLLParams,
}

impl MLLLReducer {
    pub fn new() -> Self {
        Self::with_params(LLLParams::default())
    }

    pub fn with_params(params: LLLParams) -> Self {
        MLLLReducer { params }
    }

    pub fn reduce(&self, basis: &mut Matrix) -> Result<MLLLOutcome> {
        self.reduce_with::<f64>(basis)
    }

    /// Reduce a generating set in place.
    ///
    /// Row `k` of the GSO is rebuilt from the exact rows before every test, so
    /// a dependent row keeps shrinking until it is exactly zero instead of
    /// leaving rounding residue behind.
    pub fn reduce_with<R: Real>(&self, basis: &mut Matrix) -> Result<MLLLOutcome> {
        self.params.validate()?;

        let h = basis.rows();
        let mut stats = ReductionStats::default();
        let delta = R::from_f64(self.params.delta);
        let eps = R::epsilon();
        let mut state = State::<R>::new(h);

        // rows at or past `end` are known to be zero
        let mut end = h;
        let mut g = 0;
        while g < end {
            self.params.algorithm_params.check_cancelled()?;

            if basis.is_zero_row(g) {
                end -= 1;
                if g < end {
                    basis.swap_rows(g, end)?;
                }
                continue;
            }

            if g == 0 {
                state.refresh(basis, 0)?;
                g = 1;
                continue;
            }

            let l = g;
            let mut k = g;
            let mut restart = false;
            while k <= l {
                self.params.algorithm_params.check_cancelled()?;
                stats.iterations += 1;

                state.refresh(basis, k)?;
                if size_reduce_pair(basis, &mut state.mu, k, k - 1)? {
                    stats.size_reductions += 1;
                }
                let nu = state.mu[k][k - 1].clone();
                let b_proj =
                    state.norms[k].clone() + nu.clone() * nu.clone() * state.norms[k - 1].clone();

                if b_proj >= delta.clone() * state.norms[k - 1].clone() - eps.clone() {
                    stats.size_reductions +=
                        size_reduce_row(basis, &mut state.mu, &mut state.norms, k)?;
                    k += 1;
                } else if basis.is_zero_row(k) {
                    log::trace!("MLLL: row {} reduced to zero, window shrinks to {}", k, end - 1);
                    end -= 1;
                    if k < end {
                        basis.swap_rows(k, end)?;
                    }
                    g = k;
                    restart = true;
                    break;
                } else {
                    basis.swap_rows(k - 1, k)?;
                    state.swap(k, l, nu, b_proj);
                    if k == 1 {
                        state.refresh(basis, 0)?;
                    }
                    stats.swaps += 1;
                    k = (k - 1).max(1);
                }
            }

            if !restart {
                g += 1;
            }
        }

        log::debug!(
            "MLLL[{}] {} generators -> rank {}: {} iterations, {} swaps",
            R::name(),
            h,
            end,
            stats.iterations,
            stats.swaps
        );
        Ok(MLLLOutcome { rank: end, stats })
    }
}

/// MLLL-reduce a generating set in place, returning its rank
pub fn reduce_mlll(basis: &mut Matrix, delta: f64) -> Result<usize> {
    Ok(MLLLReducer::with_params(LLLParams::new(delta)).reduce(basis)?.rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gso::GramSchmidt;
    use crate::core::hnf::same_lattice;

    fn m(data: Vec<Vec<i64>>) -> Matrix {
        Matrix::from_i64(data).unwrap()
    }

    fn leading(basis: &Matrix, rank: usize) -> Matrix {
        let mut top = basis.clone();
        top.truncate_rows(rank);
        top
    }

    #[test]
    fn test_independent_input_behaves_like_lll() {
        let mut b = m(vec![vec![5, -3, -7], vec![2, -7, -7], vec![3, -10, 0]]);
        let original = b.clone();
        let rank = reduce_mlll(&mut b, 0.75).unwrap();
        assert_eq!(rank, 3);
        assert!(same_lattice(&original, &b));
        let gs = GramSchmidt::<f64>::compute(&b);
        assert!(gs.is_size_reduced(1e-6));
        assert!(gs.satisfies_lovasz(0.75, 1e-9));
    }

    #[test]
    fn test_dependent_generators() {
        let mut b = m(vec![
            vec![1, 2, 3],
            vec![2, 4, 6],
            vec![0, 1, 1],
            vec![1, 3, 4],
            vec![3, 7, 10],
        ]);
        let original = b.clone();
        let rank = reduce_mlll(&mut b, 0.99).unwrap();
        assert_eq!(rank, 2);
        for r in rank..b.rows() {
            assert!(b.is_zero_row(r), "row {} not zero: {}", r, b);
        }
        let top = leading(&b, rank);
        assert!(same_lattice(&original, &top));
        let gs = GramSchmidt::<f64>::compute(&top);
        assert!(gs.is_size_reduced(1e-6));
        assert!(gs.satisfies_lovasz(0.99, 1e-9));
    }

    #[test]
    fn test_leading_zero_row() {
        let mut b = m(vec![vec![0, 0], vec![3, 1], vec![1, 2]]);
        let original = b.clone();
        let rank = reduce_mlll(&mut b, 0.75).unwrap();
        assert_eq!(rank, 2);
        assert!(b.is_zero_row(2));
        assert!(same_lattice(&original, &leading(&b, 2)));
    }

    #[test]
    fn test_extra_generator_over_full_rank_lattice() {
        // a fourth vector that is an integer combination of the first three
        let mut b = m(vec![
            vec![7, 0, 1],
            vec![1, 9, 2],
            vec![3, 1, 11],
            vec![11, 10, 14],
        ]);
        let original = b.clone();
        let outcome = MLLLReducer::with_params(LLLParams::new(0.75)).reduce(&mut b).unwrap();
        assert_eq!(outcome.rank, 3);
        assert!(b.is_zero_row(3));
        assert!(same_lattice(&original, &leading(&b, 3)));
    }

    #[test]
    fn test_many_dependent_generators() {
        use crate::core::hnf::hermite_normal_form;
        use crate::utils::matrix_utils::generate_random_lattice;
        for (h, cols, seed) in [(14, 6, 0), (14, 6, 1), (12, 4, 2), (16, 7, 3), (9, 5, 4)] {
            let original = generate_random_lattice(h, cols, Some(seed)).unwrap();
            let rank = hermite_normal_form(&original).len();
            let mut b = original.clone();
            assert_eq!(reduce_mlll(&mut b, 0.99).unwrap(), rank, "{}x{} seed {}", h, cols, seed);
            for r in rank..h {
                assert!(b.is_zero_row(r));
            }
            let top = leading(&b, rank);
            assert!(same_lattice(&original, &top));
            let gs = GramSchmidt::<f64>::compute(&top);
            assert!(gs.is_size_reduced(1e-6));
            assert!(gs.satisfies_lovasz(0.99, 1e-9));
            assert!(top.max_abs_entry() <= original.max_abs_entry());
        }
    }

    #[test]
    fn test_all_zero_input() {
        let mut b = Matrix::zeros(3, 2);
        assert_eq!(reduce_mlll(&mut b, 0.75).unwrap(), 0);
    }
}

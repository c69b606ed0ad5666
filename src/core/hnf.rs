//! Row-style Hermite normal form
//!
//! Two integer matrices generate the same lattice iff their HNFs (without
//! zero rows) coincide, which is how reducers are checked for unimodularity.

use crate::core::matrix::Matrix;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};

fn sub_scaled(target: &mut [BigInt], src: &[BigInt], q: &BigInt) {
    for (a, b) in target.iter_mut().zip(src.iter()) {
        *a -= q * b;
    }
}

/// Nonzero rows of the Hermite normal form of the row lattice of `basis`
pub fn hermite_normal_form(basis: &Matrix) -> Vec<Vec<BigInt>> {
    let mut rows = basis.to_vec();
    let n = rows.len();
    let mut pivot_row = 0;

    for col in 0..basis.cols() {
        if pivot_row >= n {
            break;
        }

        // Euclid on this column among the remaining rows
        loop {
            let smallest = (pivot_row..n)
                .filter(|&r| !rows[r][col].is_zero())
                .min_by_key(|&r| rows[r][col].abs());
            let Some(best) = smallest else { break };
            rows.swap(pivot_row, best);

            let pivot = rows[pivot_row].clone();
            let mut cleared = true;
            for row in rows.iter_mut().skip(pivot_row + 1) {
                if row[col].is_zero() {
                    continue;
                }
                let q = row[col].div_floor(&pivot[col]);
                sub_scaled(row, &pivot, &q);
                if !row[col].is_zero() {
                    cleared = false;
                }
            }
            if cleared {
                break;
            }
        }

        if rows[pivot_row][col].is_zero() {
            continue;
        }
        if rows[pivot_row][col].is_negative() {
            for x in rows[pivot_row].iter_mut() {
                *x = -x.clone();
            }
        }
        let pivot = rows[pivot_row].clone();
        for row in rows.iter_mut().take(pivot_row) {
            let q = row[col].div_floor(&pivot[col]);
            sub_scaled(row, &pivot, &q);
        }
        pivot_row += 1;
    }

    rows.truncate(pivot_row);
    rows
}

/// Whether two bases generate the same lattice
pub fn same_lattice(a: &Matrix, b: &Matrix) -> bool {
    a.cols() == b.cols() && hermite_normal_form(a) == hermite_normal_form(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(data: Vec<Vec<i64>>) -> Matrix {
        Matrix::from_i64(data).unwrap()
    }

    fn ints(data: Vec<Vec<i64>>) -> Vec<Vec<BigInt>> {
        m(data).to_vec()
    }

    #[test]
    fn test_hnf_small() {
        let h = hermite_normal_form(&m(vec![vec![2, 3], vec![4, 5]]));
        assert_eq!(h, ints(vec![vec![2, 0], vec![0, 1]]));
    }

    #[test]
    fn test_hnf_drops_dependent_rows() {
        let h = hermite_normal_form(&m(vec![vec![1, 2], vec![2, 4], vec![3, 6]]));
        assert_eq!(h, ints(vec![vec![1, 2]]));
    }

    #[test]
    fn test_same_lattice_under_unimodular_ops() {
        let a = m(vec![vec![5, -3, -7], vec![2, -7, -7], vec![3, -10, 0]]);
        let mut b = a.clone();
        b.sub_multiple(0, 2, &BigInt::from(4)).unwrap();
        b.swap_rows(0, 1).unwrap();
        b.add_row(2, 1).unwrap();
        assert!(same_lattice(&a, &b));

        let mut c = a.clone();
        c.set(0, 0, BigInt::from(6)).unwrap();
        assert!(!same_lattice(&a, &c));
    }
}

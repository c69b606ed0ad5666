//! Integration tests for lattice reduction algorithms

use lattice_reducer::utils::matrix_utils::{
    generate_knapsack_lattice, generate_random_lattice, randomize_basis,
};
use lattice_reducer::*;
use num_bigint::BigInt;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Full-rank square basis: random lower-triangular matrix scrambled by
/// unimodular row operations
fn full_rank_basis(max_n: usize) -> impl Strategy<Value = Matrix> {
    (2usize..=max_n).prop_flat_map(|n| {
        (
            prop::collection::vec(1i64..=20, n),
            prop::collection::vec(-1000i64..=1000, n * n),
            any::<u64>(),
        )
            .prop_map(move |(diag, entries, seed)| {
                let rows = (0..n)
                    .map(|i| {
                        (0..n)
                            .map(|j| match j.cmp(&i) {
                                std::cmp::Ordering::Equal => diag[i],
                                std::cmp::Ordering::Less => entries[i * n + j],
                                std::cmp::Ordering::Greater => 0,
                            })
                            .collect()
                    })
                    .collect();
                let mut basis = Matrix::from_i64(rows).unwrap();
                let mut rng = StdRng::seed_from_u64(seed);
                randomize_basis(&mut basis, 3 * n, &mut rng).unwrap();
                basis
            })
    })
}

/// Generating sets of any rank, often with several dependent rows
fn generating_set() -> impl Strategy<Value = Matrix> {
    let bound = prop_oneof![Just(9i64), Just(500i64)];
    (2usize..=12, 2usize..=5, bound).prop_flat_map(|(h, m, e)| {
        prop::collection::vec(prop::collection::vec(-e..=e, m), h)
            .prop_map(|rows| Matrix::from_i64(rows).unwrap())
    })
}

fn assert_lll_reduced(basis: &Matrix, delta: f64) {
    let gs = GramSchmidt::<f64>::compute(basis);
    assert!(gs.is_size_reduced(1e-6), "not size-reduced:\n{}", basis);
    assert!(gs.satisfies_lovasz(delta, 1e-9), "Lovász fails:\n{}", basis);
    assert!(gs.max_reconstruction_error(basis) < 1e-6);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn lll_preserves_lattice_and_reduces(basis in full_rank_basis(6), delta in 0.5f64..0.999) {
        let mut reduced = basis.clone();
        reduce_lll(&mut reduced, delta).unwrap();
        prop_assert!(same_lattice(&basis, &reduced));
        assert_lll_reduced(&reduced, delta);

        let again = reduce_lll(&mut reduced.clone(), delta).unwrap();
        prop_assert_eq!(again.swaps, 0);
    }

    #[test]
    fn deep_lll_preserves_lattice_and_reduces(basis in full_rank_basis(6)) {
        let mut reduced = basis.clone();
        reduce_deep_lll(&mut reduced, 0.99).unwrap();
        prop_assert!(same_lattice(&basis, &reduced));
        assert_lll_reduced(&reduced, 0.99);

        let shortest = SVPSolver::new().solve(&reduced).unwrap();
        prop_assert!(shortest.norm_squared <= reduced.row_norm_squared(0));
    }

    #[test]
    fn mlll_finds_rank_and_lattice(generators in generating_set()) {
        let rank = hermite_normal_form(&generators).len();
        let mut reduced = generators.clone();
        let found = reduce_mlll(&mut reduced, 0.99).unwrap();
        prop_assert_eq!(found, rank);
        for r in rank..reduced.rows() {
            prop_assert!(reduced.is_zero_row(r));
        }
        if rank > 0 {
            let mut top = reduced.clone();
            top.truncate_rows(rank);
            prop_assert!(same_lattice(&generators, &top));
            assert_lll_reduced(&top, 0.99);
        }
    }
}

// enumeration and block reduction are the slow ones
proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn enumeration_below_first_vector(basis in full_rank_basis(6)) {
        let mut reduced = basis.clone();
        reduce_lll(&mut reduced, 0.75).unwrap();
        let gs = GramSchmidt::<f64>::compute(&reduced);
        let first = reduced.row_norm_squared(0);
        let first_f = num_traits::ToPrimitive::to_f64(&first).unwrap();

        // norms are integers, so anything at or below `first - 1` is inside
        let bound = EnumBound::Radius(first_f - 0.5);
        let n = reduced.rows();
        let hit = enumerate(&gs.mu, &gs.norm_squared, &bound, 0, n - 1, None).unwrap();
        let shortest = SVPSolver::new().solve(&reduced).unwrap();
        prop_assert_eq!(hit.is_none(), shortest.norm_squared == first);
        if let Some(hit) = hit {
            let v = combine(&reduced, 0, &hit.coefficients);
            let norm: BigInt = v.iter().map(|x| x * x).sum();
            prop_assert_eq!(norm, shortest.norm_squared);
        }
    }

    #[test]
    fn bkz_never_lengthens_first_vector(basis in full_rank_basis(5), deep in any::<bool>()) {
        let n = basis.rows();
        let beta = (2 + n / 2).min(n);

        let mut lll = basis.clone();
        reduce_lll(&mut lll, 0.99).unwrap();

        let mut reduced = basis.clone();
        if deep {
            reduce_deep_bkz(&mut reduced, beta, 0.99).unwrap();
        } else {
            reduce_bkz(&mut reduced, beta, 0.99).unwrap();
            prop_assert!(reduced.row_norm_squared(0) <= lll.row_norm_squared(0));
        }
        prop_assert!(same_lattice(&basis, &reduced));
        assert_lll_reduced(&reduced, 0.99);

        let first = reduced.row_norm_squared(0);
        if deep {
            reduce_deep_bkz(&mut reduced, beta, 0.99).unwrap();
        } else {
            reduce_bkz(&mut reduced, beta, 0.99).unwrap();
        }
        prop_assert!(reduced.row_norm_squared(0) <= first);
    }
}

#[test]
fn test_lll_three_dimensional_example() {
    let mut b = Matrix::from_i64(vec![vec![5, -3, -7], vec![2, -7, -7], vec![3, -10, 0]]).unwrap();
    let original = b.clone();
    reduce_lll(&mut b, 0.99).unwrap();
    assert!(same_lattice(&original, &b));
    assert_eq!(b.row_norm_squared(0), BigInt::from(25));
    assert_lll_reduced(&b, 0.99);
}

#[test]
fn test_large_first_column_collapses() {
    let mut b = Matrix::from_i64(vec![
        vec![1, 0, 0, 0],
        vec![12_345_677, 1, 0, 0],
        vec![9_876_543, 0, 1, 0],
        vec![31_415_926, 0, 0, 1],
    ])
    .unwrap();
    reduce_lll(&mut b, 0.99).unwrap();
    assert!(b.row_norm_squared(0) <= BigInt::from(4));
    assert!(b.max_abs_entry() <= BigInt::from(2));
}

#[test]
fn test_knapsack_progression() {
    let original = generate_knapsack_lattice(10, 100_000, 999_999, Some(2024)).unwrap();

    let mut lll = original.clone();
    reduce_lll(&mut lll, 0.99).unwrap();
    let mut deep = original.clone();
    reduce_deep_lll(&mut deep, 0.99).unwrap();
    let mut bkz = original.clone();
    let stats = reduce_bkz(&mut bkz, 6, 0.99).unwrap();

    for b in [&lll, &deep, &bkz] {
        assert!(same_lattice(&original, b));
        assert!(b.row_norm_squared(0) < original.row_norm_squared(0));
    }
    assert!(bkz.row_norm_squared(0) <= lll.row_norm_squared(0));
    assert!(stats.blocks >= 9);
}

#[test]
fn test_mlll_on_wide_generating_sets() {
    for seed in 0..4 {
        let original = generate_random_lattice(14, 6, Some(seed)).unwrap();
        let rank = hermite_normal_form(&original).len();
        let mut b = original.clone();
        assert_eq!(reduce_mlll(&mut b, 0.99).unwrap(), rank);
        let mut top = b.clone();
        top.truncate_rows(rank);
        assert!(same_lattice(&original, &top));
        assert_lll_reduced(&top, 0.99);
        assert!((rank..b.rows()).all(|r| b.is_zero_row(r)));
    }
}

#[test]
fn test_cancelled_bkz_leaves_valid_basis() {
    let original = generate_knapsack_lattice(8, 1_000, 9_999, Some(5)).unwrap();
    let mut b = original.clone();
    let token = CancelToken::new();
    token.cancel();
    let mut params = BKZParams::new(4);
    params.algorithm_params = AlgorithmParams::default().with_cancel(token);
    let result = BKZReducer::with_params(params).reduce(&mut b);
    assert!(matches!(result, Err(LatticeError::Cancelled)));
    assert!(same_lattice(&original, &b));
}

#[test]
fn test_invalid_parameters_leave_basis_untouched() {
    let original = generate_knapsack_lattice(4, 10, 99, Some(1)).unwrap();
    let mut b = original.clone();
    assert!(reduce_lll(&mut b, 0.25).is_err());
    assert!(reduce_lll(&mut b, 1.0).is_err());
    assert!(reduce_deep_lll(&mut b, 1.5).is_err());
    assert!(reduce_mlll(&mut b, 0.2).is_err());
    assert!(reduce_bkz(&mut b, 5, 0.99).is_err());
    assert!(reduce_deep_bkz(&mut b, 1, 0.99).is_err());
    assert_eq!(b, original);
}

#[cfg(feature = "high-precision")]
#[test]
fn test_high_precision_backend_agrees() {
    let original = generate_knapsack_lattice(8, 1_000_000, 9_999_999, Some(77)).unwrap();
    let mut fast = original.clone();
    LLLReducer::new().reduce(&mut fast).unwrap();
    let mut exact = original.clone();
    LLLReducer::new().reduce_with::<BigFloat<256>>(&mut exact).unwrap();

    assert!(same_lattice(&original, &exact));
    assert_lll_reduced(&exact, 0.99);
    assert_lll_reduced(&fast, 0.99);
}

//! Property-based tests for the distance kernel and top-k selection.

use proptest::prelude::*;
use vecdb_core::{distance, top_k, FlatConfig, FlatIndex, Neighbor};

prop_compose! {
    fn arb_vector(dim: usize)(vec in prop::collection::vec(-10.0f32..10.0, dim)) -> Vec<f32> {
        vec
    }
}

prop_compose! {
    fn arb_stream()(dists in prop::collection::vec(0.0f32..100.0, 0..200)) -> Vec<Neighbor> {
        dists.into_iter().enumerate().map(|(i, d)| Neighbor::new(i as u64, d)).collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn distance_non_negative_and_symmetric(a in arb_vector(33), b in arb_vector(33)) {
        let ab = distance(&a, &b).unwrap();
        let ba = distance(&b, &a).unwrap();
        prop_assert!(ab >= 0.0);
        prop_assert!((ab - ba).abs() <= 1e-3 * ab.max(1.0));
    }

    #[test]
    fn distance_to_self_is_zero(a in arb_vector(19)) {
        prop_assert_eq!(distance(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn top_k_equals_sort_and_truncate(stream in arb_stream(), k in 1usize..50) {
        let mut expected = stream.clone();
        expected.sort();
        expected.truncate(k);
        prop_assert_eq!(top_k(stream, k), expected);
    }

    #[test]
    fn flat_rows_are_sorted_and_bounded(
        data in prop::collection::vec(arb_vector(6), 1..60),
        query in arb_vector(6),
        k in 1usize..20,
    ) {
        let mut flat = FlatIndex::new(FlatConfig::new(6)).unwrap();
        flat.add(&data).unwrap();
        let rows = flat.search(&[query], k).unwrap();
        let row = &rows[0];
        prop_assert_eq!(row.len(), k.min(data.len()));
        prop_assert!(row.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(row.iter().all(|n| (n.id as usize) < data.len()));
    }
}

//! Cross-strategy behaviour: exactness of the flat scan, IVF degenerating to
//! it, recall monotonicity in `nprobe` / `ef`, and identifier bookkeeping.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use vecdb_core::{
    distance, AnyIndex, FlatConfig, FlatIndex, HnswConfig, HnswIndex, IndexError, IndexKind, IvfConfig, IvfIndex,
    IvfState, Neighbor, SearchParams, SearchRow, SharedIndex, VectorIndex,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| (0..dim).map(|_| rng.gen::<f32>()).collect()).collect()
}

/// Sort-everything reference, independent of the heap-based selection.
fn brute_force(data: &[Vec<f32>], query: &[f32], k: usize) -> Vec<Neighbor> {
    let mut all: Vec<Neighbor> = data
        .iter()
        .enumerate()
        .map(|(i, v)| Neighbor::new(i as u64, distance(query, v).unwrap()))
        .collect();
    all.sort();
    all.truncate(k);
    all
}

fn ground_truth(data: &[Vec<f32>], queries: &[Vec<f32>], k: usize) -> Vec<SearchRow> {
    let mut flat = FlatIndex::new(FlatConfig::new(data[0].len())).unwrap();
    flat.add(data).unwrap();
    flat.search(queries, k).unwrap()
}

fn recall(truth: &[SearchRow], found: &[SearchRow]) -> f64 {
    let mut hits = 0usize;
    let mut total = 0usize;
    for (t, f) in truth.iter().zip(found) {
        let found_ids: HashSet<u64> = f.iter().map(|n| n.id).collect();
        hits += t.iter().filter(|n| found_ids.contains(&n.id)).count();
        total += t.len();
    }
    hits as f64 / total.max(1) as f64
}

#[test]
fn flat_search_is_exact() {
    init_logging();
    let data = random_vectors(600, 16, 1);
    let queries = random_vectors(12, 16, 2);

    let mut flat = FlatIndex::new(FlatConfig::new(16)).unwrap();
    flat.add(&data).unwrap();
    let rows = flat.search(&queries, 10).unwrap();

    for (q, row) in queries.iter().zip(&rows) {
        assert_eq!(*row, brute_force(&data, q, 10));
    }
}

#[test]
fn ivf_with_single_list_matches_flat() {
    init_logging();
    let data = random_vectors(500, 8, 3);
    let queries = random_vectors(20, 8, 4);

    let mut ivf = IvfIndex::new(IvfConfig::new(8).with_nlist(1).with_nprobe(1).with_seed(9)).unwrap();
    ivf.train(&data).unwrap();
    ivf.add(&data).unwrap();

    assert_eq!(ivf.search(&queries, 7).unwrap(), ground_truth(&data, &queries, 7));
}

#[test]
fn ivf_recall_never_drops_as_nprobe_grows() {
    init_logging();
    let data = random_vectors(2_000, 16, 5);
    let queries = random_vectors(40, 16, 6);
    let truth = ground_truth(&data, &queries, 10);

    let mut ivf = IvfIndex::new(IvfConfig::new(16).with_nlist(16).with_seed(10)).unwrap();
    ivf.train(&data).unwrap();
    ivf.add(&data).unwrap();

    let mut previous = 0.0;
    for nprobe in [1, 2, 4, 8, 16] {
        let found = ivf.search_with(&queries, 10, &SearchParams::with_nprobe(nprobe)).unwrap();
        let r = recall(&truth, &found);
        assert!(r >= previous, "recall dropped from {} to {} at nprobe={}", previous, r, nprobe);
        previous = r;
    }
    assert_eq!(previous, 1.0);
}

#[test]
fn hnsw_recall_never_drops_as_ef_grows() {
    init_logging();
    let data = random_vectors(2_000, 16, 7);
    let queries = random_vectors(40, 16, 8);
    let truth = ground_truth(&data, &queries, 10);

    let mut hnsw = HnswIndex::new(HnswConfig::new(16).with_m(16).with_ef_construction(100).with_seed(11)).unwrap();
    hnsw.add(&data).unwrap();

    let mut previous = 0.0;
    for ef in [10, 50, 200] {
        let found = hnsw.search_with_ef(&queries, 10, ef).unwrap();
        let r = recall(&truth, &found);
        assert!(r >= previous, "recall dropped from {} to {} at ef={}", previous, r, ef);
        previous = r;
    }
    assert!(previous >= 0.95, "recall at ef=200 only {}", previous);
}

#[test]
fn ids_are_sequential_across_add_calls() {
    init_logging();
    let data = random_vectors(90, 4, 12);
    for kind in [IndexKind::Flat, IndexKind::Ivf, IndexKind::Hnsw] {
        let mut index: AnyIndex = match kind {
            IndexKind::Ivf => IvfIndex::new(IvfConfig::new(4).with_nlist(3).with_seed(1)).unwrap().into(),
            other => AnyIndex::with_defaults(other, 4).unwrap(),
        };
        index.train(&data).unwrap();
        index.add(&data[..10]).unwrap();
        index.add(&data[10..55]).unwrap();
        index.add(&data[55..]).unwrap();
        assert_eq!(index.count(), 90, "{}", kind);

        // Every stored vector finds itself under its insertion position.
        let rows = index.search_with(&data, 1, &SearchParams { nprobe: Some(3), ef: Some(90) }).unwrap();
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row[0].id, i as u64, "{} lost vector {}", kind, i);
        }
    }
}

#[test]
fn repeated_searches_are_identical() {
    init_logging();
    let data = random_vectors(400, 8, 13);
    let queries = random_vectors(10, 8, 14);

    let mut hnsw = HnswIndex::new(HnswConfig::new(8).with_seed(2)).unwrap();
    hnsw.add(&data).unwrap();
    let mut ivf = IvfIndex::new(IvfConfig::new(8).with_nlist(10).with_nprobe(3).with_seed(2)).unwrap();
    ivf.train(&data).unwrap();
    ivf.add(&data).unwrap();

    assert_eq!(hnsw.search(&queries, 5).unwrap(), hnsw.search(&queries, 5).unwrap());
    assert_eq!(ivf.search(&queries, 5).unwrap(), ivf.search(&queries, 5).unwrap());
}

#[test]
fn flat_scenario_ten_thousand_vectors() {
    init_logging();
    let data = random_vectors(10_000, 128, 15);
    let mut flat = FlatIndex::new(FlatConfig::new(128)).unwrap();
    flat.add(&data).unwrap();
    assert_eq!(flat.count(), 10_000);

    let query = random_vectors(1, 128, 16);
    let rows = flat.search(&query, 5).unwrap();
    let row = &rows[0];
    assert_eq!(row.len(), 5);
    assert!(row.iter().all(|n| n.id < 10_000 && n.distance >= 0.0));
    assert!(row.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn ivf_scenario_lists_cover_every_vector() {
    init_logging();
    let data = random_vectors(20_000, 32, 17);
    let mut ivf = IvfIndex::new(IvfConfig::new(32).with_nlist(100).with_seed(3)).unwrap();
    ivf.train(&data).unwrap();
    assert_eq!(ivf.state(), IvfState::Trained);
    ivf.add(&data).unwrap();

    assert_eq!(ivf.state(), IvfState::Populated);
    assert_eq!(ivf.count(), 20_000);
    assert_eq!(ivf.list_sizes().len(), 100);
    assert_eq!(ivf.list_sizes().iter().sum::<usize>(), 20_000);
}

#[test]
fn hnsw_scenario_incremental_inserts_keep_graph_sane() {
    init_logging();
    let data = random_vectors(400, 16, 18);
    let mut hnsw = HnswIndex::new(HnswConfig::new(16).with_m(16).with_ef_construction(200).with_seed(4)).unwrap();

    for (i, v) in data.iter().enumerate() {
        hnsw.add(std::slice::from_ref(v)).unwrap();
        let ep = hnsw.entry_point().expect("entry point after insert");
        assert!(ep <= i as u64);
        assert_eq!(hnsw.node_layer(ep), Some(hnsw.max_layer()));
    }

    for id in 0..hnsw.count() as u64 {
        for layer in 0..=hnsw.node_layer(id).unwrap() {
            let links = hnsw.neighbors(id, layer);
            assert!(!links.contains(&id));
            let unique: HashSet<u64> = links.iter().copied().collect();
            assert_eq!(unique.len(), links.len());
        }
    }
}

#[test]
fn error_scenarios() {
    init_logging();
    let mut ivf = IvfIndex::new(IvfConfig::new(4).with_nlist(2)).unwrap();
    assert_eq!(ivf.add(&random_vectors(5, 4, 1)).unwrap_err(), IndexError::NotTrained);

    let mut flat = FlatIndex::new(FlatConfig::new(4)).unwrap();
    flat.add(&random_vectors(5, 4, 1)).unwrap();
    assert_eq!(flat.search(&random_vectors(1, 4, 2), 0).unwrap_err(), IndexError::InvalidK(0));

    let mut hnsw = HnswIndex::new(HnswConfig::new(4)).unwrap();
    hnsw.add(&random_vectors(5, 4, 1)).unwrap();
    assert_eq!(hnsw.search(&random_vectors(1, 4, 2), 0).unwrap_err(), IndexError::InvalidK(0));
    assert!(matches!(
        hnsw.search(&random_vectors(1, 5, 2), 1),
        Err(IndexError::DimensionMismatch { expected: 4, actual: 5 })
    ));
}

#[test]
fn shared_index_serves_parallel_readers() {
    init_logging();
    let data = random_vectors(1_000, 8, 19);
    let queries = random_vectors(16, 8, 20);

    let mut hnsw = HnswIndex::new(HnswConfig::new(8).with_seed(5)).unwrap();
    hnsw.add(&data).unwrap();
    let expected = hnsw.search(&queries, 5).unwrap();

    let shared = SharedIndex::new(hnsw);
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| shared.search(&queries, 5).unwrap())).collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    });
}

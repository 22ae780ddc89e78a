use super::distance::{self, DistanceKernel, Neighbor};
use super::store::VectorStore;
use super::{check_search_args, SearchRow, VectorIndex};
use crate::config::{FlatConfig, SearchParams, PARALLEL_SCAN_THRESHOLD};
use crate::error::Result;
use crate::parallel;
use log::{info, warn};

/// Exact k-NN by exhaustive scan. O(count * dim) per query.
///
/// The reference the approximate strategies are measured against.
pub struct FlatIndex {
    store: VectorStore,
    kernel: DistanceKernel,
}

impl FlatIndex {
    pub fn new(config: FlatConfig) -> Result<Self> {
        config.validate()?;
        info!("Initializing Flat Index (Dim: {})", config.dim);
        Ok(Self { store: VectorStore::new(config.dim), kernel: DistanceKernel::new() })
    }

    pub fn dim(&self) -> usize {
        self.store.dim()
    }

    pub fn count(&self) -> usize {
        self.store.len()
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Appends every vector. No training required.
    pub fn add<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<()> {
        self.store.extend(vectors)?;
        Ok(())
    }

    /// Drops every stored vector. Identifiers restart at zero.
    pub fn reset(&mut self) {
        self.store.clear();
    }

    pub fn search<V: AsRef<[f32]> + Sync>(&self, queries: &[V], k: usize) -> Result<Vec<SearchRow>> {
        check_search_args(self.dim(), queries, k)?;
        if self.store.is_empty() {
            warn!("Flat search against an empty index");
        }
        let k = k.min(self.count().max(1));
        if queries.len() == 1 {
            return Ok(vec![self.search_one(queries[0].as_ref(), k)]);
        }
        Ok(parallel::map(queries, |q| self.search_one(q.as_ref(), k)))
    }

    /// Exact top-k for one query. Large stores are scanned in parallel
    /// chunks whose partial top-k lists are merged; ties resolve the same
    /// way either path.
    fn search_one(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let n = self.store.len();
        if n <= PARALLEL_SCAN_THRESHOLD {
            return distance::top_k(self.kernel.scan(query, &self.store), k);
        }
        let partials = parallel::map_ranges(n, PARALLEL_SCAN_THRESHOLD / 4, |range| {
            let store = &self.store;
            distance::top_k(
                range.map(|i| {
                    let id = i as u64;
                    Neighbor::new(id, self.kernel.eval(query, store.get(id)))
                }),
                k,
            )
        });
        distance::top_k(partials.into_iter().flatten(), k)
    }
}

impl VectorIndex for FlatIndex {
    fn dim(&self) -> usize {
        FlatIndex::dim(self)
    }

    fn count(&self) -> usize {
        FlatIndex::count(self)
    }

    /// No training step; accepted and ignored.
    fn train(&mut self, _vectors: &[Vec<f32>]) -> Result<()> {
        Ok(())
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        FlatIndex::add(self, vectors)
    }

    fn search_with(&self, queries: &[Vec<f32>], k: usize, _params: &SearchParams) -> Result<Vec<SearchRow>> {
        FlatIndex::search(self, queries, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;

    fn index(dim: usize) -> FlatIndex {
        FlatIndex::new(FlatConfig::new(dim)).unwrap()
    }

    #[test]
    fn test_flat_exact_nearest() {
        let mut idx = index(3);
        idx.add(&[[1.0f32, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]).unwrap();
        let rows = idx.search(&[[0.1f32, 0.9, 0.1]], 2).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].id, 1);
        assert_eq!(rows[0].len(), 2);
        assert!(rows[0][0].distance <= rows[0][1].distance);
    }

    #[test]
    fn test_k_larger_than_count_returns_everything() {
        let mut idx = index(1);
        idx.add(&[[5.0f32], [1.0]]).unwrap();
        let rows = idx.search(&[[0.0f32]], 10).unwrap();
        let ids: Vec<u64> = rows[0].iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 0]);
    }

    #[test]
    fn test_empty_index_returns_empty_rows() {
        let idx = index(2);
        let rows = idx.search(&[[0.0f32, 0.0], [1.0, 1.0]], 3).unwrap();
        assert_eq!(rows, vec![Vec::new(), Vec::new()]);
    }

    #[test]
    fn test_failed_add_does_not_mutate() {
        let mut idx = index(2);
        idx.add(&[vec![0.0f32, 0.0]]).unwrap();
        let err = idx.add(&[vec![1.0f32, 1.0], vec![1.0, 1.0, 1.0]]).unwrap_err();
        assert_eq!(err, IndexError::DimensionMismatch { expected: 2, actual: 3 });
        assert_eq!(idx.count(), 1);
    }

    #[test]
    fn test_rejects_bad_queries() {
        let mut idx = index(2);
        idx.add(&[[0.0f32, 0.0]]).unwrap();
        assert_eq!(idx.search(&[[0.0f32, 0.0]], 0).unwrap_err(), IndexError::InvalidK(0));
        assert!(matches!(idx.search(&[[0.0f32]], 1), Err(IndexError::DimensionMismatch { .. })));
        assert_eq!(
            idx.search(&[[0.0f32, 0.0, 5.0]], 1).unwrap_err(),
            IndexError::DimensionMismatch { expected: 2, actual: 3 }
        );
    }

    #[test]
    fn test_huge_k_is_clamped_to_count() {
        let mut idx = index(2);
        idx.add(&[[0.0f32, 0.0], [1.0, 1.0]]).unwrap();
        for k in [1usize << 40, usize::MAX] {
            let rows = idx.search(&[[0.0f32, 0.0]], k).unwrap();
            let ids: Vec<u64> = rows[0].iter().map(|n| n.id).collect();
            assert_eq!(ids, vec![0, 1]);
        }
        assert!(index(2).search(&[[0.0f32, 0.0]], usize::MAX).unwrap()[0].is_empty());
    }

    #[test]
    fn test_duplicates_tie_break_by_id() {
        let mut idx = index(2);
        idx.add(&[[1.0f32, 1.0], [1.0, 1.0], [1.0, 1.0]]).unwrap();
        let rows = idx.search(&[[1.0f32, 1.0]], 2).unwrap();
        let ids: Vec<u64> = rows[0].iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_parallel_scan_matches_sequential() {
        let dim = 4;
        let n = PARALLEL_SCAN_THRESHOLD + 1_000;
        let mut idx = index(dim);
        let data: Vec<Vec<f32>> =
            (0..n).map(|i| (0..dim).map(|j| ((i * 31 + j * 7) % 97) as f32).collect()).collect();
        idx.add(&data).unwrap();

        let query = vec![13.0f32, 40.0, 2.0, 77.0];
        let parallel_rows = idx.search_one(&query, 10);
        let sequential = distance::top_k(idx.kernel.scan(&query, &idx.store), 10);
        assert_eq!(parallel_rows, sequential);
    }

    #[test]
    fn test_reset_clears_store() {
        let mut idx = index(1);
        idx.add(&[[1.0f32], [2.0]]).unwrap();
        idx.reset();
        assert_eq!(idx.count(), 0);
        idx.add(&[[3.0f32]]).unwrap();
        assert_eq!(idx.search(&[[3.0f32]], 1).unwrap()[0][0].id, 0);
    }
}

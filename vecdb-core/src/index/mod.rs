pub mod any;
pub mod distance;
pub mod flat;
pub mod hnsw;
pub mod ivf;
pub mod kmeans;
pub mod simd;
pub mod store;
pub mod visited;

use crate::config::SearchParams;
use crate::error::{IndexError, Result};
use distance::Neighbor;

/// Sequential vector identifier: the zero-based insertion position.
pub type VectorId = u64;

/// One row of search output, nearest first.
pub type SearchRow = Vec<Neighbor>;

/// The capability every index strategy exposes: `train`, `add`, `search`, `count`.
///
/// Mutations take `&mut self`; searches take `&self` and may run concurrently.
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;

    /// Number of vectors stored. Never decreases through this trait.
    fn count(&self) -> usize;

    fn is_trained(&self) -> bool {
        true
    }

    fn train(&mut self, vectors: &[Vec<f32>]) -> Result<()>;

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()>;

    fn search_with(&self, queries: &[Vec<f32>], k: usize, params: &SearchParams) -> Result<Vec<SearchRow>>;

    fn search(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<SearchRow>> {
        self.search_with(queries, k, &SearchParams::default())
    }
}

/// Splits a result row into parallel `(distances, identifiers)` sequences.
pub fn split_row(row: &[Neighbor]) -> (Vec<f32>, Vec<VectorId>) {
    row.iter().map(|n| (n.distance, n.id)).unzip()
}

/// Shared precondition check for every `search`: positive `k` and
/// correctly-shaped queries.
pub(crate) fn check_search_args<V: AsRef<[f32]>>(dim: usize, queries: &[V], k: usize) -> Result<()> {
    if k == 0 {
        return Err(IndexError::InvalidK(k));
    }
    for q in queries {
        let q = q.as_ref();
        if q.len() != dim {
            return Err(IndexError::DimensionMismatch { expected: dim, actual: q.len() });
        }
    }
    Ok(())
}

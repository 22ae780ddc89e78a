use super::simd::{self, SimdFunc};
use super::store::VectorStore;
use super::VectorId;
use crate::error::{IndexError, Result};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Upper bound on heap slots reserved up front; larger `k` grows on demand.
pub(crate) const HEAP_PREALLOC: usize = 1024;

/// One search hit: a stored identifier and its squared Euclidean distance to the query.
///
/// Ordered by ascending distance, ties broken by ascending identifier, so a
/// sorted `Vec<Neighbor>` is already a well-formed result row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: VectorId,
    pub distance: f32,
}

impl Neighbor {
    pub fn new(id: VectorId, distance: f32) -> Self {
        Self { id, distance }
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance).then_with(|| self.id.cmp(&other.id))
    }
}

/// Squared-L2 kernel bound to the best implementation for the running CPU.
///
/// Each index resolves its kernel once at construction. Alternative metrics
/// would be additional `SimdFunc`s selected here.
#[derive(Clone, Copy)]
pub struct DistanceKernel {
    func: SimdFunc,
}

impl DistanceKernel {
    pub fn new() -> Self {
        Self { func: simd::get_l2_kernel() }
    }

    /// Unchecked pairwise distance. Callers guarantee equal lengths.
    #[inline(always)]
    pub fn eval(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        let n = a.len().min(b.len());
        // SAFETY: both slices are valid for `n` reads.
        unsafe { (self.func)(a.as_ptr(), b.as_ptr(), n) }
    }

    /// Checked pairwise distance.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(IndexError::DimensionMismatch { expected: a.len(), actual: b.len() });
        }
        Ok(self.eval(a, b))
    }

    /// Lazily computes the distance from `query` to every vector in `store`.
    pub fn scan<'a>(&'a self, query: &'a [f32], store: &'a VectorStore) -> impl Iterator<Item = Neighbor> + 'a {
        store.iter().map(move |(id, v)| Neighbor::new(id, self.eval(query, v)))
    }

    /// Distances from `query` to the stored vectors named by `ids`.
    pub fn scan_ids<'a>(
        &'a self,
        query: &'a [f32],
        store: &'a VectorStore,
        ids: &'a [VectorId],
    ) -> impl Iterator<Item = Neighbor> + 'a {
        ids.iter().map(move |&id| Neighbor::new(id, self.eval(query, store.get(id))))
    }
}

impl Default for DistanceKernel {
    fn default() -> Self {
        Self::new()
    }
}

/// Squared Euclidean distance between two vectors of equal length.
pub fn distance(a: &[f32], b: &[f32]) -> Result<f32> {
    DistanceKernel::new().distance(a, b)
}

/// Selects the `k` smallest entries of `stream`, nearest first.
///
/// Keeps a bounded max-heap of size `k`, so memory stays O(k) for any stream
/// length and the cost is O(n log k). Returns everything, sorted, when the
/// stream yields fewer than `k` entries.
pub fn top_k<I>(stream: I, k: usize) -> Vec<Neighbor>
where
    I: IntoIterator<Item = Neighbor>,
{
    if k == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k.min(HEAP_PREALLOC) + 1);
    for candidate in stream {
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(worst) = heap.peek() {
            if candidate < *worst {
                heap.pop();
                heap.push(candidate);
            }
        }
    }
    heap.into_sorted_vec()
}

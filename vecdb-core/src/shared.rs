use crate::config::SearchParams;
use crate::error::Result;
use crate::index::{SearchRow, VectorIndex};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Single-writer / multiple-reader wrapper for serving an index across threads.
///
/// `train` and `add` hold the write lock for their whole duration, so
/// readers never observe a half-linked node or a partially filled list.
/// Searches share the read lock and run concurrently.
pub struct SharedIndex<I> {
    inner: RwLock<I>,
}

impl<I: VectorIndex> SharedIndex<I> {
    pub fn new(index: I) -> Self {
        Self { inner: RwLock::new(index) }
    }

    fn read(&self) -> RwLockReadGuard<'_, I> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, I> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn train(&self, vectors: &[Vec<f32>]) -> Result<()> {
        self.write().train(vectors)
    }

    pub fn add(&self, vectors: &[Vec<f32>]) -> Result<()> {
        self.write().add(vectors)
    }

    pub fn search(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<SearchRow>> {
        self.read().search(queries, k)
    }

    pub fn search_with(&self, queries: &[Vec<f32>], k: usize, params: &SearchParams) -> Result<Vec<SearchRow>> {
        self.read().search_with(queries, k, params)
    }

    pub fn count(&self) -> usize {
        self.read().count()
    }

    pub fn dim(&self) -> usize {
        self.read().dim()
    }

    /// Runs `f` against the index under the read lock.
    pub fn with_read<R>(&self, f: impl FnOnce(&I) -> R) -> R {
        f(&self.read())
    }

    pub fn into_inner(self) -> I {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

use super::VectorId;
use crate::error::{IndexError, Result};

/// Append-only, contiguous backing storage for fixed-dimension vectors.
///
/// All components live in one flat arena (`count * dim` floats), so vector
/// `id` occupies `arena[id * dim..(id + 1) * dim]`. Identifiers are the
/// zero-based insertion position and are never reused.
#[derive(Debug, Clone)]
pub struct VectorStore {
    dim: usize,
    arena: Vec<f32>,
}

impl VectorStore {
    pub fn new(dim: usize) -> Self {
        Self { dim, arena: Vec::new() }
    }

    pub fn with_capacity(dim: usize, capacity: usize) -> Self {
        Self { dim, arena: Vec::with_capacity(dim * capacity) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.arena.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Checks one vector's length against `dim`.
    pub fn check(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(IndexError::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        Ok(())
    }

    /// Checks every vector of a batch. Called before any mutation so a bad
    /// batch never partially lands.
    pub fn check_batch<V: AsRef<[f32]>>(&self, vectors: &[V]) -> Result<()> {
        vectors.iter().try_for_each(|v| self.check(v.as_ref()))
    }

    /// Appends a vector and returns its identifier.
    pub fn push(&mut self, vector: &[f32]) -> Result<VectorId> {
        self.check(vector)?;
        let id = self.len() as VectorId;
        self.arena.extend_from_slice(vector);
        Ok(id)
    }

    /// Appends a batch, all-or-nothing. Returns the identifiers assigned.
    pub fn extend<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<std::ops::Range<VectorId>> {
        self.check_batch(vectors)?;
        let start = self.len() as VectorId;
        self.arena.reserve(vectors.len() * self.dim);
        for v in vectors {
            self.arena.extend_from_slice(v.as_ref());
        }
        Ok(start..self.len() as VectorId)
    }

    /// Vector by identifier.
    ///
    /// # Panics
    /// Panics if `id` was never assigned.
    #[inline]
    pub fn get(&self, id: VectorId) -> &[f32] {
        let start = id as usize * self.dim;
        &self.arena[start..start + self.dim]
    }

    pub fn try_get(&self, id: VectorId) -> Option<&[f32]> {
        let start = (id as usize).checked_mul(self.dim)?;
        self.arena.get(start..start + self.dim)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VectorId, &[f32])> + '_ {
        self.arena.chunks_exact(self.dim.max(1)).enumerate().map(|(i, v)| (i as VectorId, v))
    }

    /// The raw arena, `len() * dim()` floats in insertion order.
    pub fn as_slice(&self) -> &[f32] {
        &self.arena
    }

    pub fn clear(&mut self) {
        self.arena.clear();
    }
}

use super::flat::FlatIndex;
use super::hnsw::HnswIndex;
use super::ivf::IvfIndex;
use super::{SearchRow, VectorIndex};
use crate::config::{FlatConfig, HnswConfig, IvfConfig, SearchParams};
use crate::error::{IndexError, Result};
use std::fmt;
use std::str::FromStr;

/// The three interchangeable strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Flat,
    Ivf,
    Hnsw,
}

impl FromStr for IndexKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "ivf" => Ok(Self::Ivf),
            "hnsw" => Ok(Self::Hnsw),
            other => Err(IndexError::InvalidParameter(format!("unknown index kind: {}", other))),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Flat => "flat",
            Self::Ivf => "ivf",
            Self::Hnsw => "hnsw",
        };
        f.write_str(name)
    }
}

/// One index of any strategy behind the shared `VectorIndex` capability.
pub enum AnyIndex {
    Flat(FlatIndex),
    Ivf(IvfIndex),
    Hnsw(HnswIndex),
}

impl AnyIndex {
    /// Builds a strategy with its default options for `dim`.
    pub fn with_defaults(kind: IndexKind, dim: usize) -> Result<Self> {
        Ok(match kind {
            IndexKind::Flat => Self::Flat(FlatIndex::new(FlatConfig::new(dim))?),
            IndexKind::Ivf => Self::Ivf(IvfIndex::new(IvfConfig::new(dim))?),
            IndexKind::Hnsw => Self::Hnsw(HnswIndex::new(HnswConfig::new(dim))?),
        })
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            Self::Flat(_) => IndexKind::Flat,
            Self::Ivf(_) => IndexKind::Ivf,
            Self::Hnsw(_) => IndexKind::Hnsw,
        }
    }

    fn inner(&self) -> &dyn VectorIndex {
        match self {
            Self::Flat(i) => i,
            Self::Ivf(i) => i,
            Self::Hnsw(i) => i,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn VectorIndex {
        match self {
            Self::Flat(i) => i,
            Self::Ivf(i) => i,
            Self::Hnsw(i) => i,
        }
    }
}

impl From<FlatIndex> for AnyIndex {
    fn from(index: FlatIndex) -> Self {
        Self::Flat(index)
    }
}

impl From<IvfIndex> for AnyIndex {
    fn from(index: IvfIndex) -> Self {
        Self::Ivf(index)
    }
}

impl From<HnswIndex> for AnyIndex {
    fn from(index: HnswIndex) -> Self {
        Self::Hnsw(index)
    }
}

impl VectorIndex for AnyIndex {
    fn dim(&self) -> usize {
        self.inner().dim()
    }

    fn count(&self) -> usize {
        self.inner().count()
    }

    fn is_trained(&self) -> bool {
        self.inner().is_trained()
    }

    fn train(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        self.inner_mut().train(vectors)
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        self.inner_mut().add(vectors)
    }

    fn search_with(&self, queries: &[Vec<f32>], k: usize, params: &SearchParams) -> Result<Vec<SearchRow>> {
        self.inner().search_with(queries, k, params)
    }
}

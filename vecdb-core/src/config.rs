//! Tuning defaults and per-strategy construction options.
//!
//! Compile-time defaults are plain constants. Runtime options are small
//! structs built with `new(dim)` and refined with `with_*` setters; every
//! index calls `validate()` before allocating anything.

use crate::error::{IndexError, Result};

/// Default number of coarse clusters for IVF.
pub const DEFAULT_NLIST: usize = 100;

/// Default number of inverted lists scanned per IVF query.
pub const DEFAULT_NPROBE: usize = 1;

/// Default number of k-means relocation rounds during IVF training.
pub const DEFAULT_KMEANS_ITERATIONS: usize = 10;

/// Default maximum neighbors per HNSW node on layers >= 1 (layer 0 allows twice this).
pub const DEFAULT_M: usize = 16;

/// Default candidate-list size used while inserting into HNSW.
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default candidate-list size used by HNSW search.
pub const DEFAULT_EF_SEARCH: usize = 50;

/// Hard cap on the number of HNSW layers. Sampled levels above it are clamped.
pub const MAX_LAYERS: usize = 16;

/// Flat scans over more stored vectors than this are split across threads.
pub const PARALLEL_SCAN_THRESHOLD: usize = 16_384;

fn require_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(IndexError::InvalidParameter(format!("{} must be positive", name)));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatConfig {
    pub dim: usize,
}

impl FlatConfig {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("dim", self.dim)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IvfConfig {
    pub dim: usize,
    pub nlist: usize,
    pub nprobe: usize,
    pub kmeans_iterations: usize,
    pub seed: Option<u64>,
}

impl IvfConfig {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            nlist: DEFAULT_NLIST,
            nprobe: DEFAULT_NPROBE,
            kmeans_iterations: DEFAULT_KMEANS_ITERATIONS,
            seed: None,
        }
    }

    pub fn with_nlist(mut self, nlist: usize) -> Self {
        self.nlist = nlist;
        self
    }

    pub fn with_nprobe(mut self, nprobe: usize) -> Self {
        self.nprobe = nprobe;
        self
    }

    pub fn with_kmeans_iterations(mut self, iterations: usize) -> Self {
        self.kmeans_iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("dim", self.dim)?;
        require_positive("nlist", self.nlist)?;
        require_positive("nprobe", self.nprobe)?;
        require_positive("kmeans_iterations", self.kmeans_iterations)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HnswConfig {
    pub dim: usize,
    /// Max neighbors on layers >= 1. Layer 0 holds up to `2 * m`.
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub seed: Option<u64>,
}

impl HnswConfig {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            m: DEFAULT_M,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
            seed: None,
        }
    }

    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    pub fn with_ef_construction(mut self, ef_construction: usize) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("dim", self.dim)?;
        // mL = 1/ln(M) is undefined for M < 2.
        if self.m < 2 {
            return Err(IndexError::InvalidParameter(format!("M must be at least 2, got {}", self.m)));
        }
        require_positive("ef_construction", self.ef_construction)?;
        require_positive("ef_search", self.ef_search)
    }
}

/// Per-call overrides for search-time tunables. `None` uses the index default.
///
/// Strategies ignore the fields that do not apply to them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub nprobe: Option<usize>,
    pub ef: Option<usize>,
}

impl SearchParams {
    pub fn with_nprobe(nprobe: usize) -> Self {
        Self { nprobe: Some(nprobe), ef: None }
    }

    pub fn with_ef(ef: usize) -> Self {
        Self { nprobe: None, ef: Some(ef) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let ivf = IvfConfig::new(64);
        assert_eq!(ivf.nlist, DEFAULT_NLIST);
        assert_eq!(ivf.nprobe, 1);

        let hnsw = HnswConfig::new(64);
        assert_eq!(hnsw.m, 16);
        assert_eq!(hnsw.ef_construction, 200);
        assert!(hnsw.validate().is_ok());
    }

    #[test]
    fn test_rejects_degenerate_values() {
        assert!(FlatConfig::new(0).validate().is_err());
        assert!(IvfConfig::new(8).with_nlist(0).validate().is_err());
        assert!(IvfConfig::new(8).with_nprobe(0).validate().is_err());
        assert!(HnswConfig::new(8).with_m(1).validate().is_err());
        assert!(HnswConfig::new(8).with_ef_search(0).validate().is_err());
    }
}

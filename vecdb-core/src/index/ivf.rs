use super::distance::{self, DistanceKernel, Neighbor};
use super::kmeans::{nearest_centroid, KMeansTrainer};
use super::store::VectorStore;
use super::{check_search_args, SearchRow, VectorId, VectorIndex};
use crate::config::{IvfConfig, SearchParams};
use crate::error::{IndexError, Result};
use crate::parallel;
use log::info;

/// Lifecycle of an IVF index: `Untrained -> Trained -> Populated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IvfState {
    Untrained,
    Trained,
    Populated,
}

/// Centroids plus one inverted list of identifiers per centroid.
struct CoarseQuantizer {
    centroids: VectorStore,
    lists: Vec<Vec<VectorId>>,
}

impl CoarseQuantizer {
    fn new(centroids: VectorStore) -> Self {
        let lists = vec![Vec::new(); centroids.len()];
        Self { centroids, lists }
    }
}

/// Lifecycle phases. The quantizer only exists once training has produced
/// exactly `nlist` centroids.
enum Phase {
    Untrained,
    Trained(CoarseQuantizer),
    Populated(CoarseQuantizer),
}

/// Inverted-file index: k-means coarse clustering plus per-cluster id lists.
///
/// Queries scan only the `nprobe` lists whose centroids are nearest, trading
/// recall for speed. `nprobe == nlist` degenerates to an exact scan.
pub struct IvfIndex {
    config: IvfConfig,
    store: VectorStore,
    phase: Phase,
    kernel: DistanceKernel,
}

impl IvfIndex {
    pub fn new(config: IvfConfig) -> Result<Self> {
        config.validate()?;
        info!("Initializing IVF Index (Dim: {}, nlist: {})", config.dim, config.nlist);
        Ok(Self {
            store: VectorStore::new(config.dim),
            config,
            phase: Phase::Untrained,
            kernel: DistanceKernel::new(),
        })
    }

    pub fn dim(&self) -> usize {
        self.config.dim
    }

    pub fn count(&self) -> usize {
        self.store.len()
    }

    pub fn nlist(&self) -> usize {
        self.config.nlist
    }

    pub fn nprobe(&self) -> usize {
        self.config.nprobe
    }

    /// Changes the index-level default for `nprobe`.
    pub fn set_nprobe(&mut self, nprobe: usize) -> Result<()> {
        if nprobe == 0 {
            return Err(IndexError::InvalidParameter("nprobe must be positive".to_string()));
        }
        self.config.nprobe = nprobe;
        Ok(())
    }

    pub fn state(&self) -> IvfState {
        match self.phase {
            Phase::Untrained => IvfState::Untrained,
            Phase::Trained(_) => IvfState::Trained,
            Phase::Populated(_) => IvfState::Populated,
        }
    }

    pub fn is_trained(&self) -> bool {
        !matches!(self.phase, Phase::Untrained)
    }

    fn quantizer(&self) -> Option<&CoarseQuantizer> {
        match &self.phase {
            Phase::Untrained => None,
            Phase::Trained(q) | Phase::Populated(q) => Some(q),
        }
    }

    pub fn centroids(&self) -> Option<&VectorStore> {
        self.quantizer().map(|q| &q.centroids)
    }

    /// Length of every inverted list, in centroid order. Empty until trained.
    pub fn list_sizes(&self) -> Vec<usize> {
        self.quantizer().map(|q| q.lists.iter().map(Vec::len).collect()).unwrap_or_default()
    }

    /// Identifiers assigned to centroid `list`.
    pub fn list(&self, list: usize) -> Option<&[VectorId]> {
        self.quantizer().and_then(|q| q.lists.get(list)).map(Vec::as_slice)
    }

    /// Runs k-means and moves `Untrained -> Trained`.
    pub fn train<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<()> {
        if self.is_trained() {
            return Err(IndexError::AlreadyTrained);
        }
        self.store.check_batch(vectors)?;
        let centroids = KMeansTrainer::new(self.config.dim, self.config.nlist, self.config.kmeans_iterations)
            .with_seed_opt(self.config.seed)
            .train(vectors)?;
        self.phase = Phase::Trained(CoarseQuantizer::new(centroids));
        info!("IVF trained on {} vectors", vectors.len());
        Ok(())
    }

    /// Assigns each vector to its nearest centroid's list and appends it to
    /// the store. Moves `Trained -> Populated`.
    pub fn add<V: AsRef<[f32]> + Sync>(&mut self, vectors: &[V]) -> Result<()> {
        let quantizer = self.quantizer().ok_or(IndexError::NotTrained)?;
        self.store.check_batch(vectors)?;
        if vectors.is_empty() {
            return Ok(());
        }

        let kernel = self.kernel;
        let assignments: Vec<usize> =
            parallel::map(vectors, |v| nearest_centroid(&kernel, &quantizer.centroids, v.as_ref()).id as usize);

        let ids = self.store.extend(vectors)?;
        let mut quantizer = match std::mem::replace(&mut self.phase, Phase::Untrained) {
            Phase::Trained(q) | Phase::Populated(q) => q,
            Phase::Untrained => return Err(IndexError::NotTrained),
        };
        for (id, list) in ids.zip(assignments) {
            quantizer.lists[list].push(id);
        }
        self.phase = Phase::Populated(quantizer);
        Ok(())
    }

    pub fn search<V: AsRef<[f32]> + Sync>(&self, queries: &[V], k: usize) -> Result<Vec<SearchRow>> {
        self.search_with_nprobe(queries, k, self.config.nprobe)
    }

    pub fn search_with_nprobe<V: AsRef<[f32]> + Sync>(
        &self,
        queries: &[V],
        k: usize,
        nprobe: usize,
    ) -> Result<Vec<SearchRow>> {
        check_search_args(self.dim(), queries, k)?;
        if nprobe == 0 {
            return Err(IndexError::InvalidParameter("nprobe must be positive".to_string()));
        }
        let quantizer = self.quantizer().ok_or(IndexError::NotTrained)?;
        let nprobe = nprobe.min(self.config.nlist);
        let k = k.min(self.count().max(1));

        if queries.len() == 1 {
            return Ok(vec![self.search_one(quantizer, queries[0].as_ref(), k, nprobe)]);
        }
        Ok(parallel::map(queries, |q| self.search_one(quantizer, q.as_ref(), k, nprobe)))
    }

    fn search_one(&self, quantizer: &CoarseQuantizer, query: &[f32], k: usize, nprobe: usize) -> Vec<Neighbor> {
        let probes = distance::top_k(self.kernel.scan(query, &quantizer.centroids), nprobe);
        let candidates = probes
            .iter()
            .flat_map(|p| self.kernel.scan_ids(query, &self.store, &quantizer.lists[p.id as usize]));
        distance::top_k(candidates, k)
    }
}

impl VectorIndex for IvfIndex {
    fn dim(&self) -> usize {
        IvfIndex::dim(self)
    }

    fn count(&self) -> usize {
        IvfIndex::count(self)
    }

    fn is_trained(&self) -> bool {
        IvfIndex::is_trained(self)
    }

    fn train(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        IvfIndex::train(self, vectors)
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        IvfIndex::add(self, vectors)
    }

    fn search_with(&self, queries: &[Vec<f32>], k: usize, params: &SearchParams) -> Result<Vec<SearchRow>> {
        self.search_with_nprobe(queries, k, params.nprobe.unwrap_or(self.config.nprobe))
    }
}

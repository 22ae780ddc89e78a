use super::distance::{DistanceKernel, Neighbor, HEAP_PREALLOC};
use super::store::VectorStore;
use super::visited::VisitedSet;
use super::{check_search_args, SearchRow, VectorId, VectorIndex};
use crate::config::{HnswConfig, SearchParams, MAX_LAYERS};
use crate::error::{IndexError, Result};
use crate::parallel;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Mutex, PoisonError};

/// Unused slot in the link arena.
const EMPTY: u32 = u32::MAX;

/// Node ids are stored as u32 in the link arena; `EMPTY` is reserved.
const MAX_NODES: usize = u32::MAX as usize;

/// Hierarchical navigable small-world graph over a `VectorStore`.
///
/// Layer 0 holds every node with up to `2 * M` links; each higher layer holds
/// a geometrically shrinking subset with up to `M` links. No training step.
pub struct HnswIndex {
    config: HnswConfig,
    m0: usize,
    level_mult: f64,

    store: VectorStore,

    // The "Flat Link Arena": node n's layer-l links start at
    // `link_base[n] + link_offset(l)`, padded with EMPTY.
    links: Vec<u32>,
    link_base: Vec<usize>,
    levels: Vec<u8>,

    entry_point: Option<u32>,
    max_layer: usize,

    rng: StdRng,
    kernel: DistanceKernel,

    // Reused by inserts (exclusive) and handed out to concurrent searches.
    build_visited: VisitedSet,
    visited_pool: Mutex<Vec<VisitedSet>>,
}

impl HnswIndex {
    pub fn new(config: HnswConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing Multi-Layer HNSW Index (Dim: {}, M: {}, efConstruction: {})",
            config.dim, config.m, config.ef_construction
        );
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            m0: config.m * 2,
            level_mult: 1.0 / (config.m as f64).ln(),
            store: VectorStore::new(config.dim),
            links: Vec::new(),
            link_base: Vec::new(),
            levels: Vec::new(),
            entry_point: None,
            max_layer: 0,
            rng,
            kernel: DistanceKernel::new(),
            build_visited: VisitedSet::default(),
            visited_pool: Mutex::new(Vec::new()),
            config,
        })
    }

    pub fn dim(&self) -> usize {
        self.config.dim
    }

    pub fn count(&self) -> usize {
        self.store.len()
    }

    pub fn ef_search(&self) -> usize {
        self.config.ef_search
    }

    /// Changes the index-level default for `ef`.
    pub fn set_ef(&mut self, ef: usize) -> Result<()> {
        if ef == 0 {
            return Err(IndexError::InvalidParameter("ef must be positive".to_string()));
        }
        self.config.ef_search = ef;
        Ok(())
    }

    pub fn entry_point(&self) -> Option<VectorId> {
        self.entry_point.map(VectorId::from)
    }

    /// Highest populated layer. Zero for an empty graph.
    pub fn max_layer(&self) -> usize {
        self.max_layer
    }

    /// Top layer of node `id`.
    pub fn node_layer(&self, id: VectorId) -> Option<usize> {
        self.levels.get(id as usize).map(|&l| l as usize)
    }

    /// Links of node `id` on `layer`. Empty if the node does not reach that layer.
    pub fn neighbors(&self, id: VectorId, layer: usize) -> Vec<VectorId> {
        match self.node_layer(id) {
            Some(top) if layer <= top => self.links_of(id as u32, layer).iter().map(|&n| n as VectorId).collect(),
            _ => Vec::new(),
        }
    }

    #[inline(always)]
    fn layer_cap(&self, level: usize) -> usize {
        if level == 0 {
            self.m0
        } else {
            self.config.m
        }
    }

    #[inline(always)]
    fn link_offset(&self, node: u32, level: usize) -> usize {
        let base = self.link_base[node as usize];
        if level == 0 {
            base
        } else {
            base + self.m0 + (level - 1) * self.config.m
        }
    }

    fn links_of(&self, node: u32, level: usize) -> &[u32] {
        let offset = self.link_offset(node, level);
        let slots = &self.links[offset..offset + self.layer_cap(level)];
        let len = slots.iter().position(|&n| n == EMPTY).unwrap_or(slots.len());
        &slots[..len]
    }

    fn set_links(&mut self, node: u32, level: usize, neighbors: &[u32]) {
        let offset = self.link_offset(node, level);
        let cap = self.layer_cap(level);
        let slots = &mut self.links[offset..offset + cap];
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = neighbors.get(i).copied().unwrap_or(EMPTY);
        }
    }

    #[inline]
    fn dist_to(&self, query: &[f32], node: u32) -> f32 {
        self.kernel.eval(query, self.store.get(node as VectorId))
    }

    /// `floor(-ln(u) * mL)` with `u` uniform in (0, 1], clamped below `MAX_LAYERS`.
    fn random_level(&mut self) -> usize {
        let u: f64 = 1.0 - self.rng.gen::<f64>();
        let level = (-u.ln() * self.level_mult).floor() as usize;
        level.min(MAX_LAYERS - 1)
    }

    /// Best-first search on one layer from `entry`, keeping the `ef` closest
    /// nodes seen. Returns them nearest first.
    fn search_layer(
        &self,
        query: &[f32],
        entry: Neighbor,
        ef: usize,
        level: usize,
        visited: &mut VisitedSet,
    ) -> Vec<Neighbor> {
        let mut candidates = BinaryHeap::new();
        let mut results: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(ef.min(HEAP_PREALLOC) + 1);
        visited.insert(entry.id as u32);
        candidates.push(Reverse(entry));
        results.push(entry);

        while let Some(Reverse(closest)) = candidates.pop() {
            if results.len() >= ef {
                if let Some(worst) = results.peek() {
                    if closest > *worst {
                        break;
                    }
                }
            }
            for &nid in self.links_of(closest.id as u32, level) {
                if !visited.insert(nid) {
                    continue;
                }
                let c = Neighbor::new(nid as VectorId, self.dist_to(query, nid));
                let admit = results.len() < ef || results.peek().map_or(true, |worst| c < *worst);
                if admit {
                    candidates.push(Reverse(c));
                    results.push(c);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }
        results.into_sorted_vec()
    }

    /// Greedy descent from the entry point through every layer above `floor`.
    fn descend(&self, query: &[f32], floor: usize, visited: &mut VisitedSet) -> Option<Neighbor> {
        let ep = self.entry_point?;
        let mut current = Neighbor::new(ep as VectorId, self.dist_to(query, ep));
        for level in (floor + 1..=self.max_layer).rev() {
            visited.reset(self.count());
            if let Some(&best) = self.search_layer(query, current, 1, level, visited).first() {
                current = best;
            }
        }
        Some(current)
    }

    /// Diversity heuristic: walk candidates nearest first and keep one only
    /// if it is no closer to an already-kept neighbor than to the base node.
    /// `candidates` must be sorted ascending by distance to the base.
    fn select_neighbors(&self, candidates: &[Neighbor], cap: usize) -> Vec<Neighbor> {
        let mut selected: Vec<Neighbor> = Vec::with_capacity(cap);
        for &c in candidates {
            if selected.len() >= cap {
                break;
            }
            let c_vec = self.store.get(c.id);
            let diverse = selected
                .iter()
                .all(|s| self.kernel.eval(c_vec, self.store.get(s.id)) >= c.distance);
            if diverse {
                selected.push(c);
            }
        }
        selected
    }

    /// Adds `new` to `node`'s links on `level`, re-running the heuristic
    /// over the combined list when the node is already at its degree cap.
    fn connect(&mut self, node: u32, new: u32, level: usize) {
        let cap = self.layer_cap(level);
        let existing = self.links_of(node, level);
        if existing.contains(&new) || node == new {
            return;
        }
        if existing.len() < cap {
            let slot = self.link_offset(node, level) + existing.len();
            self.links[slot] = new;
            return;
        }

        let base = self.store.get(node as VectorId);
        let mut pool: Vec<Neighbor> = existing
            .iter()
            .chain(std::iter::once(&new))
            .map(|&n| Neighbor::new(n as VectorId, self.kernel.eval(base, self.store.get(n as VectorId))))
            .collect();
        pool.sort_unstable();
        let kept: Vec<u32> = self.select_neighbors(&pool, cap).iter().map(|n| n.id as u32).collect();
        self.set_links(node, level, &kept);
    }

    fn insert(&mut self, vector: &[f32]) -> Result<VectorId> {
        let id = self.store.push(vector)?;
        let node = id as u32;
        let level = self.random_level();

        self.link_base.push(self.links.len());
        self.links.extend(std::iter::repeat(EMPTY).take(self.m0 + level * self.config.m));
        self.levels.push(level as u8);

        if self.entry_point.is_none() {
            self.entry_point = Some(node);
            self.max_layer = level;
            return Ok(id);
        }

        let mut visited = std::mem::take(&mut self.build_visited);
        let mut current = match self.descend(vector, level, &mut visited) {
            Some(c) => c,
            None => return Ok(id),
        };

        for l in (0..=level.min(self.max_layer)).rev() {
            visited.reset(self.count());
            let candidates = self.search_layer(vector, current, self.config.ef_construction, l, &mut visited);
            let selected = self.select_neighbors(&candidates, self.layer_cap(l));
            let ids: Vec<u32> = selected.iter().map(|n| n.id as u32).collect();
            self.set_links(node, l, &ids);
            for &neighbor in &ids {
                self.connect(neighbor, node, l);
            }
            if let Some(&closest) = candidates.first() {
                current = closest;
            }
        }
        self.build_visited = visited;

        if level > self.max_layer {
            debug!("HNSW entry point moved to node {} (layer {} -> {})", node, self.max_layer, level);
            self.entry_point = Some(node);
            self.max_layer = level;
        }
        Ok(id)
    }

    /// Inserts every vector in order. The whole batch is validated first.
    pub fn add<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<()> {
        self.store.check_batch(vectors)?;
        if self.count() + vectors.len() > MAX_NODES {
            return Err(IndexError::CapacityExceeded { limit: MAX_NODES });
        }
        for v in vectors {
            self.insert(v.as_ref())?;
        }
        if !vectors.is_empty() {
            debug!("HNSW added {} vectors (total {}, max layer {})", vectors.len(), self.count(), self.max_layer);
        }
        Ok(())
    }

    pub fn search<V: AsRef<[f32]> + Sync>(&self, queries: &[V], k: usize) -> Result<Vec<SearchRow>> {
        self.search_with_ef(queries, k, self.config.ef_search)
    }

    /// Searches with candidate-list size `max(ef, k)`.
    pub fn search_with_ef<V: AsRef<[f32]> + Sync>(&self, queries: &[V], k: usize, ef: usize) -> Result<Vec<SearchRow>> {
        check_search_args(self.dim(), queries, k)?;
        if ef == 0 {
            return Err(IndexError::InvalidParameter("ef must be positive".to_string()));
        }
        // Rows never exceed count(), so neither does the candidate list.
        let cap = self.count().max(1);
        let k = k.min(cap);
        let ef = ef.max(k).min(cap);
        if queries.len() == 1 {
            return Ok(vec![self.search_one(queries[0].as_ref(), k, ef)]);
        }
        Ok(parallel::map(queries, |q| self.search_one(q.as_ref(), k, ef)))
    }

    fn search_one(&self, query: &[f32], k: usize, ef: usize) -> Vec<Neighbor> {
        let mut visited = self.checkout_visited();
        let row = match self.descend(query, 0, &mut visited) {
            Some(entry) => {
                visited.reset(self.count());
                let mut found = self.search_layer(query, entry, ef, 0, &mut visited);
                found.truncate(k);
                found
            }
            None => Vec::new(),
        };
        self.checkin_visited(visited);
        row
    }

    fn checkout_visited(&self) -> VisitedSet {
        self.visited_pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default()
    }

    fn checkin_visited(&self, visited: VisitedSet) {
        self.visited_pool.lock().unwrap_or_else(PoisonError::into_inner).push(visited);
    }
}

impl VectorIndex for HnswIndex {
    fn dim(&self) -> usize {
        HnswIndex::dim(self)
    }

    fn count(&self) -> usize {
        HnswIndex::count(self)
    }

    /// No training step; accepted and ignored.
    fn train(&mut self, _vectors: &[Vec<f32>]) -> Result<()> {
        Ok(())
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        HnswIndex::add(self, vectors)
    }

    fn search_with(&self, queries: &[Vec<f32>], k: usize, params: &SearchParams) -> Result<Vec<SearchRow>> {
        self.search_with_ef(queries, k, params.ef.unwrap_or(self.config.ef_search))
    }
}

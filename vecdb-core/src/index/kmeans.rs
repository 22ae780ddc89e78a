use super::distance::{DistanceKernel, Neighbor};
use super::store::VectorStore;
use crate::error::{IndexError, Result};
use crate::parallel;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Training vectors handed to one assignment worker at a time.
const ASSIGN_CHUNK: usize = 256;

/// Lloyd-style k-means with random initialization and a fixed iteration budget.
///
/// Clusters that end a round empty are reseeded to the training vector that
/// is currently farthest from its own centroid, so no cluster stays dead
/// across rounds.
pub struct KMeansTrainer {
    dim: usize,
    nlist: usize,
    iterations: usize,
    seed: Option<u64>,
    kernel: DistanceKernel,
}

impl KMeansTrainer {
    pub fn new(dim: usize, nlist: usize, iterations: usize) -> Self {
        Self { dim, nlist, iterations, seed: None, kernel: DistanceKernel::new() }
    }

    /// Deterministic initialization: repeated `train` calls on the same
    /// inputs produce identical centroids.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_seed_opt(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Clusters `vectors` into exactly `nlist` centroids.
    pub fn train<V: AsRef<[f32]>>(&self, vectors: &[V]) -> Result<VectorStore> {
        if self.nlist == 0 || self.iterations == 0 {
            return Err(IndexError::InvalidParameter(
                "nlist and iterations must be positive".to_string(),
            ));
        }
        if vectors.len() < self.nlist {
            return Err(IndexError::InsufficientTrainingData {
                required: self.nlist,
                provided: vectors.len(),
            });
        }

        let mut data = VectorStore::with_capacity(self.dim, vectors.len());
        data.extend(vectors)?;
        let n = data.len();

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // Uniform sampling without replacement.
        let mut centroids = VectorStore::with_capacity(self.dim, self.nlist);
        for idx in rand::seq::index::sample(&mut rng, n, self.nlist).iter() {
            centroids.push(data.get(idx as u64))?;
        }

        for iter in 0..self.iterations {
            let assignments = self.assign_all(&data, &centroids);
            let inertia: f64 = assignments.iter().map(|a| a.distance as f64).sum();

            let mut sums = vec![0.0f64; self.nlist * self.dim];
            let mut counts = vec![0usize; self.nlist];
            for (i, a) in assignments.iter().enumerate() {
                let c = a.id as usize;
                counts[c] += 1;
                let row = &mut sums[c * self.dim..(c + 1) * self.dim];
                for (s, &x) in row.iter_mut().zip(data.get(i as u64)) {
                    *s += x as f64;
                }
            }

            let mut next = VectorStore::with_capacity(self.dim, self.nlist);
            let mut reseed_order = if counts.contains(&0) {
                Self::farthest_first(&assignments)
            } else {
                Vec::new()
            }
            .into_iter();
            let mut reseeded = 0usize;
            for c in 0..self.nlist {
                if counts[c] > 0 {
                    let inv = 1.0 / counts[c] as f64;
                    let mean: Vec<f32> =
                        sums[c * self.dim..(c + 1) * self.dim].iter().map(|&s| (s * inv) as f32).collect();
                    next.push(&mean)?;
                } else {
                    // n >= nlist guarantees enough distinct points for every empty cluster.
                    let point = reseed_order.next().unwrap_or(0);
                    next.push(data.get(point as u64))?;
                    reseeded += 1;
                }
            }
            if reseeded > 0 {
                debug!("k-means round {}: reseeded {} empty clusters", iter, reseeded);
            }
            debug!("k-means round {}: inertia {:.4}", iter, inertia);
            centroids = next;
        }

        info!(
            "k-means trained {} centroids over {} vectors (dim {}, {} rounds)",
            self.nlist, n, self.dim, self.iterations
        );
        Ok(centroids)
    }

    /// Nearest centroid for every training vector. `Neighbor::id` holds the
    /// centroid index.
    fn assign_all(&self, data: &VectorStore, centroids: &VectorStore) -> Vec<Neighbor> {
        parallel::map_ranges(data.len(), ASSIGN_CHUNK, |range| {
            range
                .map(|i| nearest_centroid(&self.kernel, centroids, data.get(i as u64)))
                .collect::<Vec<_>>()
        })
        .into_iter()
        .flatten()
        .collect()
    }

    /// Training point indices ordered by descending distance to their centroid.
    fn farthest_first(assignments: &[Neighbor]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..assignments.len()).collect();
        order.sort_by(|&a, &b| {
            assignments[b].distance.total_cmp(&assignments[a].distance).then_with(|| a.cmp(&b))
        });
        order
    }
}

/// Closest centroid to `vector`; ties go to the lower centroid index.
pub fn nearest_centroid(kernel: &DistanceKernel, centroids: &VectorStore, vector: &[f32]) -> Neighbor {
    let mut best = Neighbor::new(0, f32::INFINITY);
    for (id, c) in centroids.iter() {
        let d = kernel.eval(vector, c);
        if d < best.distance {
            best = Neighbor::new(id, d);
        }
    }
    best
}

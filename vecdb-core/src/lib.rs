//! Vector similarity search core.
//!
//! Three interchangeable k-NN strategies over fixed-dimension `f32` vectors
//! under squared Euclidean distance:
//!
//! - [`FlatIndex`]: exact exhaustive scan.
//! - [`IvfIndex`]: k-means coarse clustering with inverted lists, probed per query.
//! - [`HnswIndex`]: multi-layer proximity graph, no training step.
//!
//! All of them implement [`VectorIndex`] (`train`, `add`, `search`, `count`),
//! and [`AnyIndex`] selects one at runtime.

pub mod config;
pub mod error;
pub mod index;
pub mod parallel;
pub mod shared;

pub use config::{FlatConfig, HnswConfig, IvfConfig, SearchParams};
pub use error::{IndexError, Result};
pub use index::any::{AnyIndex, IndexKind};
pub use index::distance::{distance, top_k, Neighbor};
pub use index::flat::FlatIndex;
pub use index::hnsw::HnswIndex;
pub use index::ivf::{IvfIndex, IvfState};
pub use index::kmeans::KMeansTrainer;
pub use index::store::VectorStore;
pub use index::{split_row, SearchRow, VectorId, VectorIndex};
pub use shared::SharedIndex;

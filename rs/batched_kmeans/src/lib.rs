pub mod accumulator;
pub mod assignment;
pub mod batched_kmeans;
pub mod config;
pub mod error;
pub mod norms;
/// Synthetic data generators for tests, benches and the `run_kmeans` script.
pub mod test_utils;

pub use crate::batched_kmeans::{batched_kmeans, BatchedKMeans, IterationStats, KMeansResult};
pub use crate::config::BatchedKMeansConfig;
pub use crate::error::KMeansError;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::KMeansError;

/// Config for a batched k-means run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BatchedKMeansConfig {
    /// Number of centroids to compute.
    /// Default: 8
    pub num_clusters: usize,

    /// Number of Lloyd iterations. There is no convergence check, every iteration runs.
    /// Default: 10
    pub num_iterations: usize,

    /// Maximum number of rows scored against the centroids at once. Only bounds peak memory,
    /// results do not depend on it beyond floating-point summation order.
    /// Default: 1000
    pub batch_size: usize,

    /// Seed for the random centroid initialization. Without a seed every run starts from a
    /// different initialization.
    /// Default: None
    pub seed: Option<u64>,

    /// Score batches on the rayon thread pool and reduce the partial sums afterwards.
    /// Default: false
    pub parallel: bool,
}

impl Default for BatchedKMeansConfig {
    fn default() -> Self {
        Self {
            num_clusters: 8,
            num_iterations: 10,
            batch_size: 1000,
            seed: None,
            parallel: false,
        }
    }
}

impl BatchedKMeansConfig {
    pub fn new(num_clusters: usize, num_iterations: usize) -> Self {
        Self {
            num_clusters,
            num_iterations,
            ..Default::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_clusters == 0 {
            return Err(KMeansError::invalid_argument(
                "Number of clusters must be positive",
            ));
        }
        if self.batch_size == 0 {
            return Err(KMeansError::invalid_argument("Batch size must be positive"));
        }
        Ok(())
    }

    /// Parse a YAML document. Missing fields take their default value.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: BatchedKMeansConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }
}

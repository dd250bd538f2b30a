use anyhow::Result;
use log::{debug, info};
use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::accumulator::ClusterAccumulator;
use crate::assignment::assign_batch;
use crate::config::BatchedKMeansConfig;
use crate::error::KMeansError;
use crate::norms::{half_squared_norms, row_squared_norms};

/// Standard deviation of the random initial centroid coordinates.
pub const INIT_STD_DEV: f64 = 0.1;

/// Upper bound on the number of partial accumulators built by a parallel pass.
const MAX_PARALLEL_GROUPS: usize = 64;

/// What a single iteration observed, before its centroid update.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationStats {
    pub iteration: usize,
    // 0.5 * total squared distance of every row to its nearest centroid
    pub loss: f64,
    pub counts: Vec<usize>,
}

impl IterationStats {
    pub fn num_empty_clusters(&self) -> usize {
        self.counts.iter().filter(|&&c| c == 0).count()
    }
}

#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub centroids: Array2<f64>, // num_clusters x dimension
    pub history: Vec<IterationStats>,
}

impl KMeansResult {
    pub fn final_loss(&self) -> Option<f64> {
        self.history.last().map(|stats| stats.loss)
    }
}

/// Lloyd's k-means that scores rows against the centroids in bounded-size batches, so the
/// full n x k distance matrix never has to exist.
pub struct BatchedKMeans {
    config: BatchedKMeansConfig,
}

impl BatchedKMeans {
    pub fn new(config: BatchedKMeansConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BatchedKMeansConfig {
        &self.config
    }

    /// The centroids a run on `dimension`-wide data starts from: every entry is drawn from
    /// N(0, INIT_STD_DEV^2). With a seed this is the exact matrix `run` uses.
    pub fn initial_centroids(&self, dimension: usize) -> Array2<f64> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let centroids: Array2<f64> = Array2::random_using(
            (self.config.num_clusters, dimension),
            StandardNormal,
            &mut rng,
        );
        centroids * INIT_STD_DEV
    }

    /// Run from random initial centroids.
    pub fn run(&self, data: ArrayView2<f64>) -> Result<KMeansResult> {
        self.validate_data(data)?;
        let centroids = self.initial_centroids(data.ncols());
        self.run_iterations(data, centroids)
    }

    /// Resume from caller-provided centroids, which must be num_clusters x dimension.
    pub fn run_from(
        &self,
        data: ArrayView2<f64>,
        initial_centroids: Array2<f64>,
    ) -> Result<KMeansResult> {
        self.validate_data(data)?;
        if initial_centroids.nrows() != self.config.num_clusters {
            return Err(KMeansError::invalid_argument(format!(
                "Got {} initial centroids, expected {}",
                initial_centroids.nrows(),
                self.config.num_clusters
            )));
        }
        if initial_centroids.ncols() != data.ncols() {
            return Err(KMeansError::invalid_argument(format!(
                "Dimension of initial centroids {} is not equal to dimension of data {}",
                initial_centroids.ncols(),
                data.ncols()
            )));
        }
        self.run_iterations(data, initial_centroids)
    }

    /// One assignment pass over `data`: per-cluster sums, counts and the loss of `centroids`.
    /// `x2` holds the squared norm of every row of `data`.
    pub fn accumulate(
        &self,
        data: ArrayView2<f64>,
        x2: ArrayView1<f64>,
        centroids: ArrayView2<f64>,
    ) -> Result<ClusterAccumulator> {
        if centroids.nrows() == 0 {
            return Err(KMeansError::invalid_argument("No centroids to assign rows to"));
        }
        if centroids.ncols() != data.ncols() {
            return Err(KMeansError::invalid_argument(format!(
                "Dimension of data {} is not equal to dimension of centroids {}",
                data.ncols(),
                centroids.ncols()
            )));
        }
        if x2.len() != data.nrows() {
            return Err(KMeansError::invalid_argument(format!(
                "Got {} squared norms for {} rows",
                x2.len(),
                data.nrows()
            )));
        }

        let num_clusters = centroids.nrows();
        let dimension = data.ncols();
        let batch_size = self.config.batch_size;
        let c2 = half_squared_norms(centroids);

        let accumulate_rows = |acc: &mut ClusterAccumulator, start: usize, end: usize| {
            let batch = data.slice(s![start..end, ..]);
            let assignment = assign_batch(centroids, c2.view(), batch, x2.slice(s![start..end]));
            acc.add_batch(batch, &assignment);
        };

        let num_rows = data.nrows();
        let batch_starts = (0..num_rows).step_by(batch_size).collect::<Vec<usize>>();
        if !self.config.parallel {
            let mut acc = ClusterAccumulator::new(num_clusters, dimension);
            for &start in batch_starts.iter() {
                accumulate_rows(&mut acc, start, (start + batch_size).min(num_rows));
            }
            return Ok(acc);
        }

        // Group boundaries depend only on the number of batches, so the partial sums and the
        // order they are merged in are the same on every run.
        let batches_per_group = batch_starts.len().div_ceil(MAX_PARALLEL_GROUPS).max(1);
        let partials = batch_starts
            .par_chunks(batches_per_group)
            .map(|group| {
                let mut acc = ClusterAccumulator::new(num_clusters, dimension);
                for &start in group {
                    accumulate_rows(&mut acc, start, (start + batch_size).min(num_rows));
                }
                acc
            })
            .collect::<Vec<ClusterAccumulator>>();

        let mut acc = ClusterAccumulator::new(num_clusters, dimension);
        for partial in partials.iter() {
            acc.merge(partial);
        }
        Ok(acc)
    }

    fn validate_data(&self, data: ArrayView2<f64>) -> Result<()> {
        if data.nrows() == 0 {
            return Err(KMeansError::invalid_argument("Data has no rows"));
        }
        if data.ncols() == 0 {
            return Err(KMeansError::invalid_argument("Data has no features"));
        }
        Ok(())
    }

    fn run_iterations(
        &self,
        data: ArrayView2<f64>,
        mut centroids: Array2<f64>,
    ) -> Result<KMeansResult> {
        let num_iterations = self.config.num_iterations;
        info!(
            "Running batched k-means: {} rows, {} features, {} clusters, batch size {}, {} iterations",
            data.nrows(),
            data.ncols(),
            self.config.num_clusters,
            self.config.batch_size,
            num_iterations
        );

        let x2 = row_squared_norms(data);
        let mut history = Vec::with_capacity(num_iterations);
        for iteration in 0..num_iterations {
            let acc = self.accumulate(data, x2.view(), centroids.view())?;
            debug_assert_eq!(acc.num_rows(), data.nrows());

            let num_empty = update_centroids(&acc, &mut centroids);
            debug!(
                "Iteration {}/{} - Loss: {:.4} | Empty clusters: {}",
                iteration + 1,
                num_iterations,
                acc.loss,
                num_empty
            );
            history.push(IterationStats {
                iteration,
                loss: acc.loss,
                counts: acc.counts.to_vec(),
            });
        }

        let result = KMeansResult { centroids, history };
        if let Some(loss) = result.final_loss() {
            info!("Batched k-means done. Final loss: {:.4}", loss);
        }
        Ok(result)
    }
}

/// Move every centroid to the mean of the rows assigned to it. Clusters that got no rows are
/// reset to the zero vector. Returns the number of such clusters.
pub(crate) fn update_centroids(acc: &ClusterAccumulator, centroids: &mut Array2<f64>) -> usize {
    let mut num_empty = 0;
    for ((mut centroid, sum), &count) in centroids
        .axis_iter_mut(Axis(0))
        .zip(acc.summation.axis_iter(Axis(0)))
        .zip(acc.counts.iter())
    {
        if count > 0 {
            centroid.assign(&sum);
            centroid /= count as f64;
        } else {
            centroid.fill(0.0);
            num_empty += 1;
        }
    }
    num_empty
}

/// Run `iterations` rounds of batched k-means with the default batch size and an unseeded
/// initialization.
pub fn batched_kmeans(
    data: ArrayView2<f64>,
    num_clusters: usize,
    iterations: usize,
) -> Result<Array2<f64>> {
    let kmeans = BatchedKMeans::new(BatchedKMeansConfig::new(num_clusters, iterations))?;
    Ok(kmeans.run(data)?.centroids)
}

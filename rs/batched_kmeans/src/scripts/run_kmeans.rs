use anyhow::Result;
use batched_kmeans::test_utils::generate_random_matrix;
use batched_kmeans::{BatchedKMeans, BatchedKMeansConfig};
use log::info;

fn main() -> Result<()> {
    env_logger::init();

    // 5x5 RGB patches
    let dimension = 75;
    let num_datapoints = 400000;
    let dataset = generate_random_matrix(num_datapoints, dimension, 0);

    let config = BatchedKMeansConfig::new(1600, 5)
        .with_seed(0)
        .with_parallel(true);
    let kmeans = BatchedKMeans::new(config)?;
    let result = kmeans.run(dataset.view())?;

    let num_empty = result
        .history
        .last()
        .map(|stats| stats.num_empty_clusters())
        .unwrap_or(0);
    info!(
        "Computed {} centroids, {} empty in the last iteration",
        result.centroids.nrows(),
        num_empty
    );
    Ok(())
}

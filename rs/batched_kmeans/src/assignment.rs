use anyhow::Result;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::error::KMeansError;
use crate::norms::{half_squared_norms, row_squared_norms};

/// Nearest-centroid labels for one batch of rows.
#[derive(Debug, Clone)]
pub struct BatchAssignment {
    pub labels: Vec<usize>,
    // Winning score of every row
    pub scores: Array1<f64>,
    // sum over rows of 0.5 * ||x||^2 - score
    pub loss: f64,
}

/// Label every row of `batch` with the centroid that maximizes
/// `score[j, r] = <centroid_j, x_r> - c2[j]`, where `c2[j] = 0.5 * ||centroid_j||^2`.
///
/// Since `score[j, r] = 0.5 * ||x_r||^2 - 0.5 * ||x_r - centroid_j||^2`, the winner is the nearest
/// centroid in squared Euclidean distance, and `0.5 * x2[r] - score` is half the squared distance
/// to it. Ties go to the lowest centroid index.
///
/// `batch_x2` holds the squared norms of the rows in `batch`.
pub(crate) fn assign_batch(
    centroids: ArrayView2<f64>,
    c2: ArrayView1<f64>,
    batch: ArrayView2<f64>,
    batch_x2: ArrayView1<f64>,
) -> BatchAssignment {
    debug_assert_eq!(centroids.nrows(), c2.len());
    debug_assert_eq!(batch.nrows(), batch_x2.len());

    // num_clusters x batch rows
    let mut scores = centroids.dot(&batch.t());
    scores -= &c2.insert_axis(Axis(1));

    let mut labels = Vec::with_capacity(batch.nrows());
    let mut best_scores = Array1::zeros(batch.nrows());
    for (r, column) in scores.axis_iter(Axis(1)).enumerate() {
        let mut label = 0;
        let mut best = column[0];
        for (j, &score) in column.iter().enumerate().skip(1) {
            if score > best {
                best = score;
                label = j;
            }
        }
        labels.push(label);
        best_scores[r] = best;
    }

    let loss: f64 = batch_x2
        .iter()
        .zip(best_scores.iter())
        .map(|(&x2, &val)| 0.5 * x2 - val)
        .sum();

    BatchAssignment {
        labels,
        scores: best_scores,
        loss,
    }
}

/// Labels of arbitrary rows against a fixed set of centroids.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub labels: Array1<usize>,
    pub loss: f64,
}

/// Assign every row of `data` to its nearest centroid, scoring at most `batch_size` rows at a time.
pub fn predict(
    centroids: ArrayView2<f64>,
    data: ArrayView2<f64>,
    batch_size: usize,
) -> Result<Prediction> {
    if centroids.nrows() == 0 {
        return Err(KMeansError::invalid_argument("No centroids to predict with"));
    }
    if batch_size == 0 {
        return Err(KMeansError::invalid_argument("Batch size must be positive"));
    }
    if centroids.ncols() != data.ncols() {
        return Err(KMeansError::invalid_argument(format!(
            "Dimension of data {} is not equal to dimension of centroids {}",
            data.ncols(),
            centroids.ncols()
        )));
    }

    let c2 = half_squared_norms(centroids);
    let x2 = row_squared_norms(data);
    let mut labels = Vec::with_capacity(data.nrows());
    let mut loss = 0.0;
    for (batch, batch_x2) in data
        .axis_chunks_iter(Axis(0), batch_size)
        .zip(x2.axis_chunks_iter(Axis(0), batch_size))
    {
        let assignment = assign_batch(centroids, c2.view(), batch, batch_x2);
        labels.extend(assignment.labels);
        loss += assignment.loss;
    }

    Ok(Prediction {
        labels: Array1::from_vec(labels),
        loss,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    use super::*;

    fn assign(centroids: &Array2<f64>, batch: &Array2<f64>) -> BatchAssignment {
        let c2 = half_squared_norms(centroids.view());
        let x2 = row_squared_norms(batch.view());
        assign_batch(centroids.view(), c2.view(), batch.view(), x2.view())
    }

    #[test]
    fn test_assign_batch_nearest_centroid() {
        let centroids = array![[0.0, 0.0], [10.0, 10.0], [-5.0, 5.0]];
        let batch = array![[1.0, 1.0], [9.0, 11.0], [-4.0, 6.0], [0.0, -1.0]];
        let assignment = assign(&centroids, &batch);

        assert_eq!(assignment.labels, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_assign_batch_loss_is_half_squared_distance() {
        let centroids = array![[0.0, 0.0], [4.0, 0.0]];
        let batch = array![[1.0, 0.0], [4.0, 3.0]];
        let assignment = assign(&centroids, &batch);

        assert_eq!(assignment.labels, vec![0, 1]);
        // 0.5 * (1 + 9)
        assert_abs_diff_eq!(assignment.loss, 5.0, epsilon = 1e-12);
        // score = 0.5 * ||x||^2 - 0.5 * ||x - c||^2
        assert_abs_diff_eq!(assignment.scores[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(assignment.scores[1], 12.5 - 4.5, epsilon = 1e-12);
    }

    #[test]
    fn test_assign_batch_tie_goes_to_lowest_index() {
        // (0, 5) is equidistant from both centroids and both score exactly 0.0 - 0.5.
        let centroids = array![[1.0, 0.0], [-1.0, 0.0]];
        let batch = array![[0.0, 5.0]];
        let assignment = assign(&centroids, &batch);
        assert_eq!(assignment.labels, vec![0]);

        // Identical centroids always tie.
        let centroids = array![[2.0, 2.0], [2.0, 2.0], [2.0, 2.0]];
        let batch = array![[1.0, 3.0], [7.0, -1.0]];
        let assignment = assign(&centroids, &batch);
        assert_eq!(assignment.labels, vec![0, 0]);
    }

    #[test]
    fn test_assign_batch_zero_centroid_can_win() {
        let centroids = array![[5.0, 5.0], [0.0, 0.0]];
        let batch = array![[0.1, -0.1]];
        let assignment = assign(&centroids, &batch);
        assert_eq!(assignment.labels, vec![1]);
    }

    #[test]
    fn test_predict_independent_of_batch_size() {
        let centroids = array![[0.0, 0.0], [10.0, 0.0]];
        let data = array![[1.0, 0.0], [9.0, 0.0], [2.0, 1.0], [11.0, 1.0], [6.0, 0.0]];

        let whole = predict(centroids.view(), data.view(), 1000).expect("predict should succeed");
        let single = predict(centroids.view(), data.view(), 1).expect("predict should succeed");
        let two = predict(centroids.view(), data.view(), 2).expect("predict should succeed");

        assert_eq!(whole.labels, array![0, 1, 0, 1, 1]);
        assert_eq!(whole.labels, single.labels);
        assert_eq!(whole.labels, two.labels);
        assert_abs_diff_eq!(whole.loss, single.loss, epsilon = 1e-9);
        assert_abs_diff_eq!(whole.loss, two.loss, epsilon = 1e-9);
        // 0.5 * (1 + 1 + 5 + 2 + 16)
        assert_abs_diff_eq!(whole.loss, 12.5, epsilon = 1e-9);
    }

    #[test]
    fn test_predict_dimension_mismatch() {
        let centroids = array![[0.0, 0.0, 0.0]];
        let data = array![[1.0, 0.0]];
        let err = predict(centroids.view(), data.view(), 10).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KMeansError>(),
            Some(KMeansError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_predict_rejects_zero_batch_size() {
        let centroids = array![[0.0, 0.0]];
        let data = array![[1.0, 0.0]];
        assert!(predict(centroids.view(), data.view(), 0).is_err());
    }
}

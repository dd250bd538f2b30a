use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::assignment::BatchAssignment;

/// Per-iteration running totals: the sum of the rows assigned to each cluster, how many rows
/// each cluster received and the loss of the current centroid set.
#[derive(Debug, Clone)]
pub struct ClusterAccumulator {
    pub summation: Array2<f64>, // num_clusters x dimension
    pub counts: Array1<usize>,
    pub loss: f64,
}

impl ClusterAccumulator {
    pub fn new(num_clusters: usize, dimension: usize) -> Self {
        Self {
            summation: Array2::zeros((num_clusters, dimension)),
            counts: Array1::zeros(num_clusters),
            loss: 0.0,
        }
    }

    pub fn num_clusters(&self) -> usize {
        self.counts.len()
    }

    /// Total number of rows accumulated so far.
    pub fn num_rows(&self) -> usize {
        self.counts.sum()
    }

    /// Scatter-add every row of the batch into the sum of its assigned cluster.
    pub(crate) fn add_batch(&mut self, batch: ArrayView2<f64>, assignment: &BatchAssignment) {
        debug_assert_eq!(
            batch.nrows(),
            assignment.labels.len(),
            "Every row in the batch needs a label"
        );

        for (row, &label) in batch.axis_iter(Axis(0)).zip(assignment.labels.iter()) {
            let mut sum = self.summation.row_mut(label);
            sum += &row;
            self.counts[label] += 1;
        }
        self.loss += assignment.loss;
    }

    /// Fold the partial totals of another accumulator into this one.
    pub(crate) fn merge(&mut self, other: &ClusterAccumulator) {
        debug_assert_eq!(self.summation.dim(), other.summation.dim());

        self.summation += &other.summation;
        self.counts += &other.counts;
        self.loss += other.loss;
    }
}

use ndarray::{Array1, ArrayView2, Axis};

/// Squared L2 norm of every row: `out[i] = sum_f m[i, f]^2`.
pub fn row_squared_norms(matrix: ArrayView2<f64>) -> Array1<f64> {
    matrix.map_axis(Axis(1), |row| row.dot(&row))
}

/// Half of the squared norm of every centroid. This is the `c2` term subtracted from the
/// dot products during assignment.
pub fn half_squared_norms(centroids: ArrayView2<f64>) -> Array1<f64> {
    row_squared_norms(centroids) * 0.5
}

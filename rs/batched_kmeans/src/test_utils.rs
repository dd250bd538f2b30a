use ndarray::{Array2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

// Generate a rows x cols matrix with entries uniform in [-1, 1), reproducible from `seed`
pub fn generate_random_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::random_using((rows, cols), Uniform::new(-1.0, 1.0), &mut rng)
}

// Stack `times` copies of `points` on top of each other
pub fn repeat_rows(points: &Array2<f64>, times: usize) -> Array2<f64> {
    let indices = (0..times)
        .flat_map(|_| 0..points.nrows())
        .collect::<Vec<usize>>();
    points.select(Axis(0), &indices)
}

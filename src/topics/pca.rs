//! Principal component projection
//!
//! Used to initialise the manifold layout and to place topics on the
//! two-dimensional distance map. Components are found by power iteration with
//! deflation on the covariance matrix.

use ndarray::{Array1, Array2, Axis};

const MAX_ITER: usize = 200;
const TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct Pca {
    mean: Array1<f64>,
    /// One principal axis per row
    components: Array2<f64>,
    explained_variance: Vec<f64>,
}

impl Pca {
    pub fn fit(data: &[Vec<f32>], n_components: usize) -> Self {
        let x = to_array(data);
        let (n, dim) = x.dim();
        let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(dim));
        let centered = &x - &mean;

        let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
        let mut covariance = centered.t().dot(&centered) / denom;

        let k = n_components.min(dim);
        let mut components = Array2::zeros((k, dim));
        let mut explained_variance = Vec::with_capacity(k);
        for c in 0..k {
            let (eigenvalue, eigenvector) = power_iteration(&covariance, c);
            components.row_mut(c).assign(&eigenvector);
            explained_variance.push(eigenvalue.max(0.0));

            let outer = outer(&eigenvector);
            covariance = covariance - eigenvalue * outer;
        }

        Self {
            mean,
            components,
            explained_variance,
        }
    }

    pub fn transform(&self, data: &[Vec<f32>]) -> Vec<Vec<f32>> {
        if data.is_empty() {
            return Vec::new();
        }
        let centered = to_array(data) - &self.mean;
        let projected = centered.dot(&self.components.t());
        projected
            .outer_iter()
            .map(|row| row.iter().map(|&v| v as f32).collect())
            .collect()
    }

    pub fn fit_transform(data: &[Vec<f32>], n_components: usize) -> Vec<Vec<f32>> {
        Self::fit(data, n_components).transform(data)
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }
}

fn to_array(data: &[Vec<f32>]) -> Array2<f64> {
    let dim = data.first().map(Vec::len).unwrap_or(0);
    Array2::from_shape_fn((data.len(), dim), |(i, j)| data[i][j] as f64)
}

fn outer(v: &Array1<f64>) -> Array2<f64> {
    let n = v.len();
    Array2::from_shape_fn((n, n), |(i, j)| v[i] * v[j])
}

/// Largest eigenpair of a symmetric matrix. The start vector is varied per
/// component so that it is not orthogonal to the next axis after deflation.
fn power_iteration(matrix: &Array2<f64>, component: usize) -> (f64, Array1<f64>) {
    let n = matrix.nrows();
    let mut v = Array1::from_shape_fn(n, |i| 1.0 + ((i + component) % 7) as f64 * 0.1);
    let norm = v.dot(&v).sqrt();
    v /= norm;
    let mut eigenvalue = 0.0;

    for _ in 0..MAX_ITER {
        let mut next = matrix.dot(&v);
        let new_eigenvalue = v.dot(&next);
        let norm = next.dot(&next).sqrt();
        if norm < TOLERANCE {
            return (0.0, v);
        }
        next /= norm;

        let converged = (new_eigenvalue - eigenvalue).abs() < TOLERANCE;
        eigenvalue = new_eigenvalue;
        v = next;
        if converged {
            break;
        }
    }

    // fix the sign so repeated fits give the same orientation
    if let Some(idx) = v
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().partial_cmp(&b.1.abs()).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
    {
        if v[idx] < 0.0 {
            v.mapv_inplace(|x| -x);
        }
    }
    (eigenvalue, v)
}

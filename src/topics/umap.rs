//! Manifold projection in the manner of UMAP
//!
//! 1. exact k-nearest-neighbour graph
//! 2. per-point bandwidth calibration (`smooth_knn_dist`)
//! 3. fuzzy union of the directed memberships
//! 4. PCA initialisation
//! 5. stochastic gradient descent with negative sampling

use crate::config::ReducerConfig;
use crate::error::{MediaTopicsError, Result};
use crate::topics::backend::ComputeBackend;
use crate::topics::pca::Pca;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};

const SMOOTH_K_TOLERANCE: f32 = 1e-5;
const MIN_K_DIST_SCALE: f32 = 1e-3;
const BANDWIDTH_ITERATIONS: usize = 64;
const GRADIENT_CLIP: f32 = 4.0;
const INIT_EXTENT: f32 = 10.0;

/// Weighted undirected edge of the fuzzy graph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub head: usize,
    pub tail: usize,
    pub weight: f32,
}

pub struct UmapReducer {
    config: ReducerConfig,
}

impl UmapReducer {
    pub fn new(config: ReducerConfig) -> Self {
        Self { config }
    }

    pub fn fit_transform(&self, data: &[Vec<f32>], backend: &ComputeBackend) -> Result<Vec<Vec<f32>>> {
        let n = data.len();
        let dim = self.config.n_components;
        if n == 0 {
            return Err(MediaTopicsError::Clustering(
                "Cannot reduce an empty set of embeddings".to_string(),
            ));
        }
        if n <= 2 {
            return Ok(pad_columns(Pca::fit_transform(data, dim), dim));
        }

        let k = neighbour_count(self.config.n_neighbors, n);
        info!(
            "Reducing {} embeddings to {} dimensions ({} neighbours, backend {})",
            n,
            dim,
            k,
            backend.name()
        );
        let knn = backend.knn(data, k)?;
        let edges = fuzzy_simplicial_set(&knn);

        let n_epochs = self
            .config
            .n_epochs
            .unwrap_or(if n <= 10_000 { 500 } else { 200 });
        let (a, b) = find_ab_params(self.config.spread, self.config.min_dist);
        debug!("Curve parameters a={:.4}, b={:.4}", a, b);

        let mut rng = StdRng::seed_from_u64(self.config.random_state);
        let mut embedding = initial_layout(data, dim, &mut rng);
        self.optimize(&mut embedding, dim, &edges, n_epochs, a, b, &mut rng);

        Ok(embedding.chunks(dim).map(<[f32]>::to_vec).collect())
    }

    #[allow(clippy::too_many_arguments)]
    fn optimize(
        &self,
        embedding: &mut [f32],
        dim: usize,
        edges: &[Edge],
        n_epochs: usize,
        a: f32,
        b: f32,
        rng: &mut StdRng,
    ) {
        let n = embedding.len() / dim;
        let max_weight = edges.iter().map(|e| e.weight).fold(0.0f32, f32::max);
        if max_weight <= 0.0 || n_epochs == 0 {
            return;
        }

        // edges too weak to be sampled even once are dropped
        let edges: Vec<&Edge> = edges
            .iter()
            .filter(|e| e.weight >= max_weight / n_epochs as f32)
            .collect();
        let epochs_per_sample: Vec<f32> = edges.iter().map(|e| max_weight / e.weight).collect();
        let negative_rate = self.config.negative_sample_rate.max(1) as f32;
        let epochs_per_negative: Vec<f32> = epochs_per_sample.iter().map(|e| e / negative_rate).collect();
        let mut next_sample = epochs_per_sample.clone();
        let mut next_negative = epochs_per_negative.clone();

        let mut current = vec![0.0f32; dim];
        let mut delta = vec![0.0f32; dim];

        for epoch in 0..n_epochs {
            let alpha = self.config.learning_rate * (1.0 - epoch as f32 / n_epochs as f32);
            let epoch_f = epoch as f32;

            for (e, edge) in edges.iter().enumerate() {
                if next_sample[e] > epoch_f {
                    continue;
                }
                let (i, j) = (edge.head, edge.tail);

                current.copy_from_slice(&embedding[i * dim..(i + 1) * dim]);
                let dist_sq = sq_dist(&current, &embedding[j * dim..(j + 1) * dim]);
                let coeff = if dist_sq > 0.0 {
                    -2.0 * a * b * dist_sq.powf(b - 1.0) / (a * dist_sq.powf(b) + 1.0)
                } else {
                    0.0
                };
                for d in 0..dim {
                    let grad = clip(coeff * (current[d] - embedding[j * dim + d]));
                    delta[d] = grad * alpha;
                }
                for d in 0..dim {
                    embedding[i * dim + d] += delta[d];
                    embedding[j * dim + d] -= delta[d];
                    current[d] += delta[d];
                }
                next_sample[e] += epochs_per_sample[e];

                let n_negative = ((epoch_f - next_negative[e]) / epochs_per_negative[e]).max(0.0) as usize;
                for _ in 0..n_negative {
                    let other = rng.gen_range(0..n);
                    if other == i {
                        continue;
                    }
                    let dist_sq = sq_dist(&current, &embedding[other * dim..(other + 1) * dim]);
                    let coeff = if dist_sq > 0.0 {
                        2.0 * b / ((0.001 + dist_sq) * (a * dist_sq.powf(b) + 1.0))
                    } else {
                        0.0
                    };
                    for d in 0..dim {
                        let grad = if coeff > 0.0 {
                            clip(coeff * (current[d] - embedding[other * dim + d]))
                        } else {
                            GRADIENT_CLIP
                        };
                        current[d] += grad * alpha;
                    }
                }
                embedding[i * dim..(i + 1) * dim].copy_from_slice(&current);
                next_negative[e] += n_negative as f32 * epochs_per_negative[e];
            }
        }
    }
}

fn clip(value: f32) -> f32 {
    value.clamp(-GRADIENT_CLIP, GRADIENT_CLIP)
}

fn sq_dist(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Neighbours to search besides the point itself
fn neighbour_count(n_neighbors: usize, n: usize) -> usize {
    n_neighbors.saturating_sub(1).max(1).min(n - 1)
}

fn pad_columns(rows: Vec<Vec<f32>>, dim: usize) -> Vec<Vec<f32>> {
    rows.into_iter()
        .map(|mut row| {
            row.resize(dim, 0.0);
            row
        })
        .collect()
}

/// Distance to the nearest neighbour (`rho`) and bandwidth (`sigma`) per point,
/// chosen so that the memberships of every point sum to `log2(k)`, where the
/// `k` neighbourhood counts the point itself
pub fn smooth_knn_dist(knn: &[Vec<(usize, f32)>]) -> (Vec<f32>, Vec<f32>) {
    let mean_all = {
        let (sum, count) = knn
            .iter()
            .flatten()
            .fold((0.0f32, 0usize), |(s, c), (_, d)| (s + d, c + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    };

    let mut rhos = Vec::with_capacity(knn.len());
    let mut sigmas = Vec::with_capacity(knn.len());
    for neighbours in knn {
        let target = ((neighbours.len() + 1) as f32).log2();
        let rho = neighbours
            .iter()
            .map(|(_, d)| *d)
            .find(|d| *d > 0.0)
            .unwrap_or(0.0);

        let (mut lo, mut hi, mut mid) = (0.0f32, f32::INFINITY, 1.0f32);
        for _ in 0..BANDWIDTH_ITERATIONS {
            let psum: f32 = neighbours
                .iter()
                .map(|(_, d)| {
                    let gap = d - rho;
                    if gap > 0.0 {
                        (-gap / mid).exp()
                    } else {
                        1.0
                    }
                })
                .sum();
            if (psum - target).abs() < SMOOTH_K_TOLERANCE {
                break;
            }
            if psum > target {
                hi = mid;
                mid = (lo + hi) / 2.0;
            } else {
                lo = mid;
                mid = if hi.is_infinite() { mid * 2.0 } else { (lo + hi) / 2.0 };
            }
        }

        let mean_local = if neighbours.is_empty() {
            0.0
        } else {
            neighbours.iter().map(|(_, d)| d).sum::<f32>() / neighbours.len() as f32
        };
        let floor = if rho > 0.0 {
            MIN_K_DIST_SCALE * mean_local
        } else {
            MIN_K_DIST_SCALE * mean_all
        };
        rhos.push(rho);
        sigmas.push(mid.max(floor));
    }
    (rhos, sigmas)
}

/// Symmetric membership graph: `w = a + b - a·b` over both directions
pub fn fuzzy_simplicial_set(knn: &[Vec<(usize, f32)>]) -> Vec<Edge> {
    let (rhos, sigmas) = smooth_knn_dist(knn);
    let mut directed: HashMap<(usize, usize), f32> = HashMap::new();
    for (i, neighbours) in knn.iter().enumerate() {
        for &(j, d) in neighbours {
            let gap = d - rhos[i];
            let weight = if gap <= 0.0 || sigmas[i] == 0.0 {
                1.0
            } else {
                (-gap / sigmas[i]).exp()
            };
            directed.insert((i, j), weight);
        }
    }

    let mut edges: Vec<Edge> = Vec::with_capacity(directed.len() * 2);
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    for (&(i, j), &w) in &directed {
        if !seen.insert((i.min(j), i.max(j))) {
            continue;
        }
        let reverse = directed.get(&(j, i)).copied().unwrap_or(0.0);
        let weight = w + reverse - w * reverse;
        if weight > 0.0 {
            edges.push(Edge { head: i, tail: j, weight });
            edges.push(Edge { head: j, tail: i, weight });
        }
    }
    edges.sort_by(|x, y| (x.head, x.tail).cmp(&(y.head, y.tail)));
    edges
}

/// PCA layout scaled to a fixed extent, with a little noise to break ties
fn initial_layout(data: &[Vec<f32>], dim: usize, rng: &mut StdRng) -> Vec<f32> {
    let projected = pad_columns(Pca::fit_transform(data, dim), dim);
    let max_abs = projected
        .iter()
        .flatten()
        .fold(0.0f32, |m, v| m.max(v.abs()));
    let scale = if max_abs > 0.0 { INIT_EXTENT / max_abs } else { 1.0 };

    projected
        .into_iter()
        .flatten()
        .map(|v| v * scale + rng.gen_range(-1e-4f32..1e-4))
        .collect()
}

/// Fit `1 / (1 + a·x^(2b))` to the target membership curve given by
/// `min_dist` and `spread` (least squares, coarse-to-fine grid search)
pub fn find_ab_params(spread: f32, min_dist: f32) -> (f32, f32) {
    let xs: Vec<f64> = (0..300).map(|i| 3.0 * spread as f64 * i as f64 / 299.0).collect();
    let ys: Vec<f64> = xs
        .iter()
        .map(|&x| {
            if x < min_dist as f64 {
                1.0
            } else {
                (-(x - min_dist as f64) / spread as f64).exp()
            }
        })
        .collect();
    let loss = |a: f64, b: f64| -> f64 {
        xs.iter()
            .zip(&ys)
            .map(|(&x, &y)| {
                let fit = 1.0 / (1.0 + a * x.powf(2.0 * b));
                (fit - y) * (fit - y)
            })
            .sum()
    };

    let (mut best_a, mut best_b) = (1.0f64, 1.0f64);
    let mut best = loss(best_a, best_b);
    let (mut a_lo, mut a_hi, mut b_lo, mut b_hi) = (0.01f64, 10.0f64, 0.1f64, 3.0f64);
    for _ in 0..6 {
        let steps = 40;
        for ia in 0..=steps {
            let a = a_lo + (a_hi - a_lo) * ia as f64 / steps as f64;
            for ib in 0..=steps {
                let b = b_lo + (b_hi - b_lo) * ib as f64 / steps as f64;
                let l = loss(a, b);
                if l < best {
                    best = l;
                    best_a = a;
                    best_b = b;
                }
            }
        }
        let a_span = (a_hi - a_lo) / 8.0;
        let b_span = (b_hi - b_lo) / 8.0;
        a_lo = (best_a - a_span).max(1e-4);
        a_hi = best_a + a_span;
        b_lo = (best_b - b_span).max(1e-4);
        b_hi = best_b + b_span;
    }
    (best_a as f32, best_b as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs(per_blob: usize, dim: usize) -> (Vec<Vec<f32>>, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(7);
        let mut data = Vec::new();
        let mut labels = Vec::new();
        for blob in 0..2 {
            let center = blob as f32 * 20.0;
            for _ in 0..per_blob {
                data.push((0..dim).map(|_| center + rng.gen_range(-1.0..1.0)).collect());
                labels.push(blob);
            }
        }
        (data, labels)
    }

    #[test]
    fn test_ab_params_for_zero_min_dist() {
        let (a, b) = find_ab_params(1.0, 0.0);
        assert!((a - 1.929).abs() < 0.05, "a = {}", a);
        assert!((b - 0.7915).abs() < 0.02, "b = {}", b);

        let (a, b) = find_ab_params(1.0, 0.1);
        assert!((a - 1.577).abs() < 0.05, "a = {}", a);
        assert!((b - 0.895).abs() < 0.02, "b = {}", b);
    }

    #[test]
    fn test_smooth_knn_dist_hits_target() {
        let knn = vec![vec![(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]];
        let (rhos, sigmas) = smooth_knn_dist(&knn);
        assert_eq!(rhos[0], 1.0);

        let psum: f32 = knn[0]
            .iter()
            .map(|(_, d)| (-(d - rhos[0]).max(0.0) / sigmas[0]).exp())
            .sum();
        assert!((psum - 5f32.log2()).abs() < 1e-3);
    }

    #[test]
    fn test_neighbourhood_includes_the_point() {
        assert_eq!(neighbour_count(15, 1000), 14);
        assert_eq!(neighbour_count(15, 6), 5);
        assert_eq!(neighbour_count(1, 50), 1);
        assert_eq!(neighbour_count(2, 50), 1);
    }

    #[test]
    fn test_fuzzy_set_is_symmetric() {
        let knn = vec![
            vec![(1, 1.0), (2, 3.0)],
            vec![(0, 1.0), (2, 1.5)],
            vec![(1, 1.5), (0, 3.0)],
        ];
        let edges = fuzzy_simplicial_set(&knn);
        for edge in &edges {
            let reverse = edges
                .iter()
                .find(|e| e.head == edge.tail && e.tail == edge.head)
                .unwrap();
            assert_eq!(reverse.weight, edge.weight);
            assert!(edge.weight > 0.0 && edge.weight <= 1.0);
        }
    }

    #[test]
    fn test_preserves_separated_neighbourhoods() {
        let (data, labels) = blobs(25, 8);
        let config = ReducerConfig {
            n_components: 2,
            n_neighbors: 10,
            n_epochs: Some(100),
            ..ReducerConfig::default()
        };

        let embedding = UmapReducer::new(config)
            .fit_transform(&data, &ComputeBackend::Cpu)
            .unwrap();
        assert_eq!(embedding.len(), 50);
        assert!(embedding.iter().all(|p| p.len() == 2 && p.iter().all(|v| v.is_finite())));

        let neighbours = ComputeBackend::Cpu.knn(&embedding, 1).unwrap();
        let agreeing = neighbours
            .iter()
            .enumerate()
            .filter(|(i, n)| labels[*i] == labels[n[0].0])
            .count();
        assert!(agreeing >= 48, "only {} of 50 kept their neighbourhood", agreeing);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let (data, _) = blobs(10, 4);
        let config = ReducerConfig {
            n_epochs: Some(30),
            ..ReducerConfig::default()
        };
        let first = UmapReducer::new(config.clone()).fit_transform(&data, &ComputeBackend::Cpu).unwrap();
        let second = UmapReducer::new(config).fit_transform(&data, &ComputeBackend::Cpu).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_tiny_inputs() {
        let reducer = UmapReducer::new(ReducerConfig::default());
        assert!(reducer.fit_transform(&[], &ComputeBackend::Cpu).is_err());

        let single = reducer.fit_transform(&[vec![1.0, 2.0]], &ComputeBackend::Cpu).unwrap();
        assert_eq!(single, vec![vec![0.0; 5]]);
    }
}

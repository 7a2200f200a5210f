//! Density-based hierarchical clustering (HDBSCAN)
//!
//! Core distances come from the `min_samples`-th neighbour, counting the
//! point itself. The minimum
//! spanning tree of the mutual reachability graph is turned into a
//! single-linkage hierarchy, condensed with `min_cluster_size`, and flat
//! clusters are picked by excess of mass or as the leaves of the condensed
//! tree. The root is never selected, so a dataset without structure is all
//! noise.

use crate::config::{ClusterSelection, ClustererConfig};
use crate::error::Result;
use crate::topics::backend::ComputeBackend;
use crate::topics::similarity::euclidean;
use log::{debug, info};

/// Noise label
pub const NOISE: i64 = -1;

const MIN_DISTANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResult {
    pub labels: Vec<i64>,
    pub probabilities: Vec<f32>,
}

impl ClusterResult {
    fn all_noise(n: usize) -> Self {
        Self {
            labels: vec![NOISE; n],
            probabilities: vec![0.0; n],
        }
    }

    pub fn n_clusters(&self) -> usize {
        self.labels
            .iter()
            .filter(|&&l| l >= 0)
            .max()
            .map(|&m| m as usize + 1)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

/// Row of the condensed tree; `child < n` is a point, otherwise a cluster
#[derive(Debug, Clone, Copy)]
struct CondensedRow {
    parent: usize,
    child: usize,
    lambda: f64,
    size: usize,
}

pub struct Hdbscan {
    config: ClustererConfig,
}

impl Hdbscan {
    pub fn new(config: ClustererConfig) -> Self {
        Self { config }
    }

    pub fn fit(&self, data: &[Vec<f32>], backend: &ComputeBackend) -> Result<ClusterResult> {
        let n = data.len();
        let min_cluster_size = self.config.min_cluster_size.max(2);
        if n < min_cluster_size || n < 2 {
            debug!("{} points is below the minimum cluster size, all noise", n);
            return Ok(ClusterResult::all_noise(n));
        }

        let core = core_distances(data, self.config.min_samples, backend)?;

        let mst = mutual_reachability_mst(data, &core);
        let merges = single_linkage(n, mst);
        let condensed = condense_tree(n, &merges, min_cluster_size);
        let result = extract_clusters(n, &condensed, self.config.selection);

        info!(
            "Found {} clusters, {} noise points",
            result.n_clusters(),
            result.labels.iter().filter(|&&l| l == NOISE).count()
        );
        Ok(result)
    }
}

/// Distance to the `min_samples`-th nearest point, the point itself counted
/// as the first
fn core_distances(data: &[Vec<f32>], min_samples: usize, backend: &ComputeBackend) -> Result<Vec<f64>> {
    let k = min_samples.saturating_sub(1).max(1).min(data.len() - 1);
    Ok(backend
        .knn(data, k)?
        .into_iter()
        .map(|neighbours| neighbours.last().map(|&(_, d)| d as f64).unwrap_or(0.0))
        .collect())
}

/// Prim's algorithm over the dense mutual reachability graph
fn mutual_reachability_mst(data: &[Vec<f32>], core: &[f64]) -> Vec<(usize, usize, f64)> {
    let n = data.len();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut best_from = vec![0usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    let mut current = 0;
    in_tree[0] = true;
    for _ in 1..n {
        let mut next = usize::MAX;
        let mut next_dist = f64::INFINITY;
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            let d = euclidean(&data[current], &data[j]) as f64;
            let reach = d.max(core[current]).max(core[j]);
            if reach < best[j] {
                best[j] = reach;
                best_from[j] = current;
            }
            if best[j] < next_dist {
                next_dist = best[j];
                next = j;
            }
        }
        if next == usize::MAX {
            // only reachable with non-finite coordinates
            next = in_tree.iter().position(|t| !t).unwrap_or(0);
        }
        in_tree[next] = true;
        edges.push((best_from[next], next, next_dist));
        current = next;
    }
    edges
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Merge order of the single-linkage hierarchy; merge `i` creates node `n + i`
fn single_linkage(n: usize, mut edges: Vec<(usize, usize, f64)>) -> Vec<Merge> {
    edges.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut parent: Vec<usize> = (0..2 * n - 1).collect();
    let mut size = vec![1usize; 2 * n - 1];
    let mut merges = Vec::with_capacity(n - 1);
    for (a, b, distance) in edges {
        let ra = find(&mut parent, a);
        let rb = find(&mut parent, b);
        let node = n + merges.len();
        size[node] = size[ra] + size[rb];
        parent[ra] = node;
        parent[rb] = node;
        merges.push(Merge {
            left: ra,
            right: rb,
            distance,
            size: size[node],
        });
    }
    merges
}

fn node_size(n: usize, merges: &[Merge], node: usize) -> usize {
    if node < n {
        1
    } else {
        merges[node - n].size
    }
}

fn subtree(n: usize, merges: &[Merge], root: usize) -> Vec<usize> {
    let mut nodes = vec![root];
    let mut i = 0;
    while i < nodes.len() {
        let node = nodes[i];
        if node >= n {
            let m = merges[node - n];
            nodes.push(m.left);
            nodes.push(m.right);
        }
        i += 1;
    }
    nodes
}

fn condense_tree(n: usize, merges: &[Merge], min_cluster_size: usize) -> Vec<CondensedRow> {
    let root = 2 * n - 2;
    let order = subtree(n, merges, root);

    let mut relabel = vec![0usize; 2 * n - 1];
    relabel[root] = n;
    let mut next_label = n + 1;
    let mut ignore = vec![false; 2 * n - 1];
    let mut rows = Vec::new();

    for node in order {
        if ignore[node] || node < n {
            continue;
        }
        let m = merges[node - n];
        let lambda = 1.0 / m.distance.max(MIN_DISTANCE);
        let parent = relabel[node];
        let left_size = node_size(n, merges, m.left);
        let right_size = node_size(n, merges, m.right);

        let fall_out = |child: usize, rows: &mut Vec<CondensedRow>, ignore: &mut [bool]| {
            for sub in subtree(n, merges, child) {
                if sub < n {
                    rows.push(CondensedRow {
                        parent,
                        child: sub,
                        lambda,
                        size: 1,
                    });
                }
                ignore[sub] = true;
            }
        };

        match (left_size >= min_cluster_size, right_size >= min_cluster_size) {
            (true, true) => {
                for (child, size) in [(m.left, left_size), (m.right, right_size)] {
                    relabel[child] = next_label;
                    rows.push(CondensedRow {
                        parent,
                        child: next_label,
                        lambda,
                        size,
                    });
                    next_label += 1;
                }
            }
            (false, false) => {
                fall_out(m.left, &mut rows, &mut ignore);
                fall_out(m.right, &mut rows, &mut ignore);
            }
            (true, false) => {
                relabel[m.left] = parent;
                fall_out(m.right, &mut rows, &mut ignore);
            }
            (false, true) => {
                relabel[m.right] = parent;
                fall_out(m.left, &mut rows, &mut ignore);
            }
        }
    }
    rows
}

fn extract_clusters(n: usize, rows: &[CondensedRow], selection: ClusterSelection) -> ClusterResult {
    let n_nodes = rows.iter().map(|r| r.parent.max(r.child)).max().map(|m| m + 1).unwrap_or(n + 1);
    let n_clusters = n_nodes.max(n + 1) - n;
    let idx = |label: usize| label - n;

    let mut birth = vec![0.0f64; n_clusters];
    let mut death = vec![0.0f64; n_clusters];
    let mut cluster_parent: Vec<Option<usize>> = vec![None; n_clusters];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n_clusters];
    for row in rows {
        death[idx(row.parent)] = death[idx(row.parent)].max(row.lambda);
        if row.child >= n {
            birth[idx(row.child)] = row.lambda;
            cluster_parent[idx(row.child)] = Some(idx(row.parent));
            children[idx(row.parent)].push(idx(row.child));
        }
    }

    let mut stability = vec![0.0f64; n_clusters];
    for row in rows {
        let p = idx(row.parent);
        stability[p] += (row.lambda - birth[p]) * row.size as f64;
    }

    // cluster 0 is the root and never selectable
    let mut selected = vec![false; n_clusters];
    match selection {
        ClusterSelection::Eom => {
            for c in (1..n_clusters).rev() {
                selected[c] = true;
            }
            for c in (1..n_clusters).rev() {
                let subtree_stability: f64 = children[c].iter().map(|&ch| stability[ch]).sum();
                if !children[c].is_empty() && subtree_stability > stability[c] {
                    selected[c] = false;
                    stability[c] = subtree_stability;
                } else {
                    let mut stack = children[c].clone();
                    while let Some(d) = stack.pop() {
                        selected[d] = false;
                        stack.extend(children[d].iter().copied());
                    }
                }
            }
        }
        ClusterSelection::Leaf => {
            for c in 1..n_clusters {
                selected[c] = children[c].is_empty();
            }
        }
    }

    // flat labels in order of cluster id
    let mut flat = vec![NOISE; n_clusters];
    let mut next = 0;
    for c in 0..n_clusters {
        if selected[c] {
            flat[c] = next;
            next += 1;
        }
    }

    let mut owner = vec![None; n_clusters];
    for c in 0..n_clusters {
        let mut cursor = Some(c);
        while let Some(node) = cursor {
            if selected[node] {
                owner[c] = Some(node);
                break;
            }
            cursor = cluster_parent[node];
        }
    }

    let mut result = ClusterResult::all_noise(n);
    for row in rows.iter().filter(|r| r.child < n) {
        if let Some(cluster) = owner[idx(row.parent)] {
            let max_lambda = death[cluster];
            result.labels[row.child] = flat[cluster];
            result.probabilities[row.child] = if max_lambda > 0.0 {
                (row.lambda.min(max_lambda) / max_lambda) as f32
            } else {
                1.0
            };
        }
    }
    result
}

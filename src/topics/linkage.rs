//! Average-linkage agglomerative clustering over a precomputed distance matrix
//!
//! Shared by topic reduction (cut at `n` clusters) and the hierarchy chart.

use serde::Serialize;

/// One merge step; ids below `n_leaves` are leaves, merge `i` creates id `n_leaves + i`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkageStep {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Linkage {
    pub n_leaves: usize,
    pub steps: Vec<LinkageStep>,
}

impl Linkage {
    /// Repeatedly merge the two closest clusters; cluster distances are updated
    /// with the size-weighted average of their members' distances
    pub fn average(distances: &[Vec<f64>]) -> Self {
        let n = distances.len();
        let mut dist: Vec<Vec<f64>> = distances.to_vec();
        let mut active: Vec<bool> = vec![true; n];
        let mut ids: Vec<usize> = (0..n).collect();
        let mut sizes: Vec<usize> = vec![1; n];
        let mut steps = Vec::with_capacity(n.saturating_sub(1));

        for step in 0..n.saturating_sub(1) {
            let mut best = (usize::MAX, usize::MAX, f64::INFINITY);
            for i in 0..n {
                if !active[i] {
                    continue;
                }
                for j in (i + 1)..n {
                    if active[j] && dist[i][j] < best.2 {
                        best = (i, j, dist[i][j]);
                    }
                }
            }
            let (i, j, d) = best;
            if i == usize::MAX {
                break;
            }

            let (left, right) = (ids[i].min(ids[j]), ids[i].max(ids[j]));
            let size = sizes[i] + sizes[j];
            steps.push(LinkageStep {
                left,
                right,
                distance: d,
                size,
            });

            // slot i now holds the merged cluster
            for k in 0..n {
                if active[k] && k != i && k != j {
                    let merged = (sizes[i] as f64 * dist[i][k] + sizes[j] as f64 * dist[j][k]) / size as f64;
                    dist[i][k] = merged;
                    dist[k][i] = merged;
                }
            }
            active[j] = false;
            sizes[i] = size;
            ids[i] = n + step;
        }

        Self { n_leaves: n, steps }
    }

    /// Flat cluster index per leaf after stopping at `n_clusters` clusters.
    /// Clusters are numbered in order of their smallest leaf.
    pub fn cut(&self, n_clusters: usize) -> Vec<usize> {
        let n = self.n_leaves;
        let mut parent: Vec<usize> = (0..n + self.steps.len()).collect();
        let merges = n.saturating_sub(n_clusters.max(1)).min(self.steps.len());
        for (i, step) in self.steps.iter().take(merges).enumerate() {
            parent[step.left] = n + i;
            parent[step.right] = n + i;
        }

        let root = |mut x: usize| {
            while parent[x] != x {
                x = parent[x];
            }
            x
        };
        let mut labels = vec![usize::MAX; n];
        let mut roots: Vec<usize> = Vec::new();
        for leaf in 0..n {
            let r = root(leaf);
            let label = match roots.iter().position(|&seen| seen == r) {
                Some(idx) => idx,
                None => {
                    roots.push(r);
                    roots.len() - 1
                }
            };
            labels[leaf] = label;
        }
        labels
    }

    /// Leaves in dendrogram order (left subtree before right subtree)
    pub fn leaf_order(&self) -> Vec<usize> {
        let n = self.n_leaves;
        if self.steps.is_empty() {
            return (0..n).collect();
        }
        let mut order = Vec::with_capacity(n);
        let mut stack = vec![n + self.steps.len() - 1];
        while let Some(node) = stack.pop() {
            if node < n {
                order.push(node);
            } else {
                let step = self.steps[node - n];
                stack.push(step.right);
                stack.push(step.left);
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_distances(points: &[f64]) -> Vec<Vec<f64>> {
        points
            .iter()
            .map(|a| points.iter().map(|b| (a - b).abs()).collect())
            .collect()
    }

    #[test]
    fn test_average_linkage_merges_closest_first() {
        let linkage = Linkage::average(&line_distances(&[0.0, 1.0, 10.0, 11.5]));

        assert_eq!(linkage.steps.len(), 3);
        assert_eq!(linkage.steps[0], LinkageStep { left: 0, right: 1, distance: 1.0, size: 2 });
        assert_eq!((linkage.steps[1].left, linkage.steps[1].right), (2, 3));
        // average of |0-10|, |0-11.5|, |1-10|, |1-11.5|
        assert!((linkage.steps[2].distance - 10.25).abs() < 1e-12);
        assert_eq!(linkage.steps[2].size, 4);
    }

    #[test]
    fn test_cut() {
        let linkage = Linkage::average(&line_distances(&[0.0, 10.0, 1.0, 11.0, 30.0]));

        assert_eq!(linkage.cut(3), vec![0, 1, 0, 1, 2]);
        assert_eq!(linkage.cut(1), vec![0; 5]);
        assert_eq!(linkage.cut(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(linkage.cut(9), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_leaf_order_groups_siblings() {
        let linkage = Linkage::average(&line_distances(&[0.0, 10.0, 1.0, 11.0]));
        let order = linkage.leaf_order();
        let pos = |leaf| order.iter().position(|&l| l == leaf).unwrap();
        assert_eq!((pos(0) as i64 - pos(2) as i64).abs(), 1);
        assert_eq!((pos(1) as i64 - pos(3) as i64).abs(), 1);
    }
}

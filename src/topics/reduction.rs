//! Merging of similar topics after clustering

use crate::config::{ClusterSelection, ClustererConfig};
use crate::error::{MediaTopicsError, Result};
use crate::topics::backend::ComputeBackend;
use crate::topics::hdbscan::Hdbscan;
use crate::topics::linkage::Linkage;
use crate::topics::similarity::{l2_normalize_sparse, sparse_cosine_matrix, sparse_to_dense};
use crate::topics::vectorizer::SparseRow;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Target number of topics: a fixed count or density-based merging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KCluster {
    #[default]
    Auto,
    Count(usize),
}

impl FromStr for KCluster {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(KCluster::Auto);
        }
        match s.parse::<usize>() {
            Ok(0) => Err("k_cluster must be at least 1".to_string()),
            Ok(n) => Ok(KCluster::Count(n)),
            Err(_) => Err(format!("'{}' is neither 'auto' nor a positive integer", s)),
        }
    }
}

impl fmt::Display for KCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KCluster::Auto => f.write_str("auto"),
            KCluster::Count(n) => write!(f, "{}", n),
        }
    }
}

/// Old topic id -> merged topic id for the non-outlier topics in `rows`.
///
/// Topics that are not merged map to themselves; the outlier topic is never
/// part of the input.
pub fn reduce_topics(
    rows: &BTreeMap<i64, SparseRow>,
    target: KCluster,
    n_features: usize,
    backend: &ComputeBackend,
) -> Result<BTreeMap<i64, i64>> {
    let ids: Vec<i64> = rows.keys().copied().filter(|&id| id >= 0).collect();
    let identity: BTreeMap<i64, i64> = ids.iter().map(|&id| (id, id)).collect();
    let vectors: Vec<SparseRow> = ids.iter().map(|id| rows[id].clone()).collect();

    let groups = match target {
        KCluster::Count(n) if ids.len() > n => {
            info!("Reducing {} topics to {}", ids.len(), n);
            let distances: Vec<Vec<f64>> = sparse_cosine_matrix(&vectors)
                .into_iter()
                .map(|row| row.into_iter().map(|sim| (1.0 - sim).max(0.0)).collect())
                .collect();
            Linkage::average(&distances)
                .cut(n)
                .into_iter()
                .map(|label| label as i64)
                .collect::<Vec<_>>()
        }
        KCluster::Count(_) => return Ok(identity),
        KCluster::Auto => {
            if ids.len() < 2 {
                return Ok(identity);
            }
            let dense: Vec<Vec<f32>> = vectors
                .iter()
                .map(|row| sparse_to_dense(&l2_normalize_sparse(row), n_features))
                .collect();
            let clusterer = Hdbscan::new(ClustererConfig {
                min_cluster_size: 2,
                min_samples: 2,
                selection: ClusterSelection::Eom,
            });
            clusterer.fit(&dense, backend)?.labels
        }
    };

    if groups.len() != ids.len() {
        return Err(MediaTopicsError::Clustering(
            "Topic reduction returned the wrong number of labels".to_string(),
        ));
    }

    // every group merges into its smallest topic id
    let mut representative: BTreeMap<i64, i64> = BTreeMap::new();
    for (&id, &group) in ids.iter().zip(&groups) {
        if group >= 0 {
            representative.entry(group).or_insert(id);
        }
    }
    let mapping: BTreeMap<i64, i64> = ids
        .iter()
        .zip(&groups)
        .map(|(&id, &group)| {
            let target = if group >= 0 { representative[&group] } else { id };
            (id, target)
        })
        .collect();

    let merged = mapping.iter().filter(|(from, to)| from != to).count();
    info!("Merged {} topics", merged);
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> BTreeMap<i64, SparseRow> {
        let mut rows = BTreeMap::new();
        rows.insert(-1, vec![(0, 1.0)]);
        rows.insert(0, vec![(0, 1.0), (1, 0.1)]);
        rows.insert(1, vec![(2, 1.0), (3, 0.2)]);
        rows.insert(2, vec![(0, 0.9), (1, 0.2)]);
        rows.insert(3, vec![(2, 0.8), (3, 0.3)]);
        rows.insert(4, vec![(4, 1.0)]);
        rows
    }

    #[test]
    fn test_parse_k_cluster() {
        assert_eq!("auto".parse::<KCluster>(), Ok(KCluster::Auto));
        assert_eq!("AUTO".parse::<KCluster>(), Ok(KCluster::Auto));
        assert_eq!("12".parse::<KCluster>(), Ok(KCluster::Count(12)));
        assert!("0".parse::<KCluster>().is_err());
        assert!("many".parse::<KCluster>().is_err());
        assert_eq!(KCluster::Count(7).to_string(), "7");
    }

    #[test]
    fn test_reduce_to_count() {
        let mapping = reduce_topics(&rows(), KCluster::Count(3), 5, &ComputeBackend::Cpu).unwrap();

        assert!(!mapping.contains_key(&-1));
        assert_eq!(mapping[&2], 0);
        assert_eq!(mapping[&3], 1);
        assert_eq!(mapping[&4], 4);
        let distinct: std::collections::BTreeSet<i64> = mapping.values().copied().collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_count_above_topic_count_is_identity() {
        let mapping = reduce_topics(&rows(), KCluster::Count(10), 5, &ComputeBackend::Cpu).unwrap();
        assert!(mapping.iter().all(|(from, to)| from == to));
    }

    #[test]
    fn test_auto_never_increases_topics() {
        let mapping = reduce_topics(&rows(), KCluster::Auto, 5, &ComputeBackend::Cpu).unwrap();
        let distinct: std::collections::BTreeSet<i64> = mapping.values().copied().collect();
        assert_eq!(mapping.len(), 5);
        assert!(distinct.len() <= 5);
        assert!(mapping.iter().all(|(from, to)| to <= from));
    }
}

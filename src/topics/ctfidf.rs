//! Class-based TF-IDF over per-topic term counts
//!
//! Each topic is treated as one large document. Term frequencies are
//! l1-normalized per topic and weighted by
//! `idf = ln(avg_words_per_topic / frequency + 1)`, where `frequency` is the
//! term's count summed over all topics.

use crate::error::{MediaTopicsError, Result};
use crate::topics::vectorizer::SparseRow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassTfidf {
    idf: Vec<f64>,
}

impl ClassTfidf {
    pub fn fit(counts: &[SparseRow], n_features: usize) -> Result<Self> {
        if counts.is_empty() {
            return Err(MediaTopicsError::TextProcessing(
                "Cannot weight terms without any topic".to_string(),
            ));
        }

        let mut frequency = vec![0.0; n_features];
        let mut total = 0.0;
        for row in counts {
            for &(idx, count) in row {
                frequency[idx] += count;
                total += count;
            }
        }
        // average number of words per topic, truncated
        let avg_words = (total / counts.len() as f64).trunc();

        let idf = frequency
            .iter()
            .map(|&f| if f > 0.0 { (avg_words / f + 1.0).ln() } else { 0.0 })
            .collect();
        Ok(Self { idf })
    }

    pub fn transform(&self, counts: &[SparseRow]) -> Vec<SparseRow> {
        counts
            .iter()
            .map(|row| {
                let sum: f64 = row.iter().map(|(_, c)| c).sum();
                if sum == 0.0 {
                    return Vec::new();
                }
                row.iter()
                    .map(|&(idx, count)| (idx, count / sum * self.idf.get(idx).copied().unwrap_or(0.0)))
                    .collect()
            })
            .collect()
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }
}

/// Highest-weighted terms of one c-TF-IDF row, best first
pub fn top_terms(row: &SparseRow, feature_names: &[String], n: usize) -> Vec<(String, f64)> {
    let mut weighted: Vec<(usize, f64)> = row.iter().copied().filter(|(_, w)| *w > 0.0).collect();
    weighted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
    weighted
        .into_iter()
        .take(n)
        .filter_map(|(idx, w)| feature_names.get(idx).map(|name| (name.clone(), w)))
        .collect()
}

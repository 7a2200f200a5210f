//! Bag-of-n-grams counting over per-topic documents

use crate::config::VectorizerConfig;
use crate::error::{MediaTopicsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

/// Sparse row: `(column, value)` pairs sorted by column
pub type SparseRow = Vec<(usize, f64)>;

/// Read a newline-delimited stop-word file
pub fn load_stopwords(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MediaTopicsError::Configuration(format!(
            "Failed to read stop words from {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(content
        .lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|line| !line.is_empty())
        .collect())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountVectorizer {
    ngram_range: (usize, usize),
    stop_words: BTreeSet<String>,
    vocabulary: BTreeMap<String, usize>,
}

impl CountVectorizer {
    pub fn new(ngram_range: (usize, usize), stop_words: Vec<String>) -> Self {
        Self {
            ngram_range,
            stop_words: stop_words.into_iter().collect(),
            vocabulary: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &VectorizerConfig, stop_words: Vec<String>) -> Self {
        Self::new((config.ngram_min, config.ngram_max), stop_words)
    }

    /// Lowercased word tokens of at least two characters, stop words removed
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(str::to_lowercase)
            .filter(|token| token.chars().count() >= 2)
            .filter(|token| !self.stop_words.contains(token))
            .collect()
    }

    pub fn analyze(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenize(text);
        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n == 0 || n > tokens.len() {
                continue;
            }
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    /// Learn an alphabetically ordered vocabulary
    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        let terms: BTreeSet<String> = documents.iter().flat_map(|doc| self.analyze(doc)).collect();
        if terms.is_empty() {
            return Err(MediaTopicsError::TextProcessing(
                "Empty vocabulary; documents contain only stop words".to_string(),
            ));
        }
        self.vocabulary = terms.into_iter().enumerate().map(|(i, t)| (t, i)).collect();
        Ok(())
    }

    pub fn transform(&self, documents: &[String]) -> Vec<SparseRow> {
        documents
            .iter()
            .map(|doc| {
                let mut counts: HashMap<usize, f64> = HashMap::new();
                for term in self.analyze(doc) {
                    if let Some(&idx) = self.vocabulary.get(&term) {
                        *counts.entry(idx).or_insert(0.0) += 1.0;
                    }
                }
                let mut row: SparseRow = counts.into_iter().collect();
                row.sort_by_key(|(idx, _)| *idx);
                row
            })
            .collect()
    }

    pub fn fit_transform(&mut self, documents: &[String]) -> Result<Vec<SparseRow>> {
        self.fit(documents)?;
        Ok(self.transform(documents))
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Terms indexed by column
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.vocabulary.len()];
        for (term, &idx) in &self.vocabulary {
            names[idx] = term.clone();
        }
        names
    }
}

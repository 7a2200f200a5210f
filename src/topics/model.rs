//! Topic model: embedding, reduction, clustering and keyword extraction
//!
//! A [`TopicModeler`] holds everything needed to train. [`TopicModeler::fit`]
//! produces a trained [`TopicModel`], which can be persisted with
//! [`TopicModel::save`] and restored with [`TopicModel::load`]. Inference on a
//! trained model never changes its topics.

use crate::config::{ClustererConfig, Config, ReducerConfig, TopicsConfig, VectorizerConfig};
use crate::error::{MediaTopicsError, Result};
use crate::topics::backend::ComputeBackend;
use crate::topics::ctfidf::{top_terms, ClassTfidf};
use crate::topics::embedder::Embedder;
use crate::topics::hdbscan::{Hdbscan, NOISE};
use crate::topics::reduction::{reduce_topics, KCluster};
use crate::topics::similarity::{cosine_similarity, sparse_cosine};
use crate::topics::umap::UmapReducer;
use crate::topics::vectorizer::{CountVectorizer, SparseRow};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicAssignment {
    pub topic: i64,
    pub probability: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub id: i64,
    pub count: usize,
    pub name: String,
    pub keywords: Vec<(String, f64)>,
    pub representative_docs: Vec<String>,
}

impl TopicSummary {
    pub fn words(&self) -> Vec<&str> {
        self.keywords.iter().map(|(w, _)| w.as_str()).collect()
    }
}

/// Settings a model was trained with, persisted next to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    pub embedding_model: String,
    pub k_cluster: KCluster,
    pub vectorizer: VectorizerConfig,
    pub reducer: ReducerConfig,
    pub clusterer: ClustererConfig,
    pub topics: TopicsConfig,
    pub n_documents: usize,
    pub created_at: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelState {
    Trained,
    Persisted(PathBuf),
}

#[derive(Debug, Clone)]
pub struct TopicModel {
    pub(crate) settings: ModelSettings,
    pub(crate) vectorizer: CountVectorizer,
    pub(crate) ctfidf: ClassTfidf,
    pub(crate) topic_rows: BTreeMap<i64, SparseRow>,
    pub(crate) topics: Vec<TopicSummary>,
    pub(crate) topic_embeddings: BTreeMap<i64, Vec<f32>>,
    pub(crate) assignments: Vec<TopicAssignment>,
    pub(crate) state: ModelState,
}

/// Untrained model: configuration, encoder and compute backend
pub struct TopicModeler<'a> {
    embedder: &'a dyn Embedder,
    backend: ComputeBackend,
    vectorizer: VectorizerConfig,
    stop_words: Vec<String>,
    reducer: ReducerConfig,
    clusterer: ClustererConfig,
    topics: TopicsConfig,
}

impl<'a> TopicModeler<'a> {
    pub fn new(
        config: &Config,
        stop_words: Vec<String>,
        embedder: &'a dyn Embedder,
        backend: ComputeBackend,
    ) -> Self {
        Self {
            embedder,
            backend,
            vectorizer: config.vectorizer.clone(),
            stop_words,
            reducer: config.reducer.clone(),
            clusterer: config.clusterer.clone(),
            topics: config.topics.clone(),
        }
    }

    pub fn fit(&self, documents: &[String], k_cluster: KCluster) -> Result<TopicModel> {
        if documents.is_empty() {
            return Err(MediaTopicsError::InvalidInput(
                "Cannot fit a topic model on an empty corpus".to_string(),
            ));
        }
        info!("Fitting topic model on {} documents", documents.len());

        let embeddings = self.embedder.embed(documents)?;
        if embeddings.len() != documents.len() {
            return Err(MediaTopicsError::Embedding(format!(
                "Expected {} embeddings, got {}",
                documents.len(),
                embeddings.len()
            )));
        }

        let reduced = UmapReducer::new(self.reducer.clone()).fit_transform(&embeddings, &self.backend)?;
        let clusters = Hdbscan::new(self.clusterer.clone()).fit(&reduced, &self.backend)?;
        let mut labels = sort_by_frequency(&clusters.labels);

        let mut model = TopicModel {
            settings: ModelSettings {
                embedding_model: self.embedder.model_name().to_string(),
                k_cluster,
                vectorizer: self.vectorizer.clone(),
                reducer: self.reducer.clone(),
                clusterer: self.clusterer.clone(),
                topics: self.topics.clone(),
                n_documents: documents.len(),
                created_at: Utc::now(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            vectorizer: CountVectorizer::from_config(&self.vectorizer, self.stop_words.clone()),
            ctfidf: ClassTfidf::default(),
            topic_rows: BTreeMap::new(),
            topics: Vec::new(),
            topic_embeddings: BTreeMap::new(),
            assignments: Vec::new(),
            state: ModelState::Trained,
        };
        model.extract_topics(documents, &labels, &embeddings)?;

        let mapping = reduce_topics(
            &model.topic_rows,
            k_cluster,
            model.vectorizer.n_features(),
            &self.backend,
        )?;
        if mapping.iter().any(|(from, to)| from != to) {
            let merged: Vec<i64> = labels
                .iter()
                .map(|l| mapping.get(l).copied().unwrap_or(*l))
                .collect();
            labels = sort_by_frequency(&merged);
            model.extract_topics(documents, &labels, &embeddings)?;
        }

        model.assignments = labels
            .iter()
            .zip(&clusters.probabilities)
            .map(|(&topic, &probability)| TopicAssignment { topic, probability })
            .collect();
        info!(
            "Trained {} topics ({} outlier documents)",
            model.n_topics(),
            labels.iter().filter(|&&l| l == NOISE).count()
        );
        Ok(model)
    }
}

/// Renumber clusters by descending size (ties by old id); noise stays `-1`
pub fn sort_by_frequency(labels: &[i64]) -> Vec<i64> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for &label in labels.iter().filter(|&&l| l >= 0) {
        *counts.entry(label).or_insert(0) += 1;
    }
    let mut order: Vec<(i64, usize)> = counts.into_iter().collect();
    order.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let mapping: HashMap<i64, i64> = order
        .iter()
        .enumerate()
        .map(|(new, &(old, _))| (old, new as i64))
        .collect();

    labels
        .iter()
        .map(|l| if *l < 0 { NOISE } else { mapping[l] })
        .collect()
}

impl TopicModel {
    /// Keywords, names, embeddings and representative documents per topic
    fn extract_topics(&mut self, documents: &[String], labels: &[i64], embeddings: &[Vec<f32>]) -> Result<()> {
        let mut members: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in labels.iter().enumerate() {
            members.entry(label).or_default().push(idx);
        }
        let ids: Vec<i64> = members.keys().copied().collect();

        let topic_documents: Vec<String> = members
            .values()
            .map(|idx| {
                idx.iter()
                    .map(|&i| documents[i].as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        let counts = self.vectorizer.fit_transform(&topic_documents)?;
        self.ctfidf = ClassTfidf::fit(&counts, self.vectorizer.n_features())?;
        let weighted = self.ctfidf.transform(&counts);
        let feature_names = self.vectorizer.feature_names();

        self.topic_rows = ids.iter().copied().zip(weighted).collect();
        self.topic_embeddings = members
            .iter()
            .map(|(&id, idx)| (id, mean_embedding(idx, embeddings)))
            .collect();

        let top_n = self.settings.topics.top_n_words;
        self.topics = members
            .iter()
            .map(|(&id, idx)| {
                let row = &self.topic_rows[&id];
                let keywords = top_terms(row, &feature_names, top_n);
                let name = topic_name(id, &keywords);
                let representative_docs = self.representative_docs(row, idx, documents);
                TopicSummary {
                    id,
                    count: idx.len(),
                    name,
                    keywords,
                    representative_docs,
                }
            })
            .collect();
        debug!("Extracted keywords for {} topics", self.topics.len());
        Ok(())
    }

    /// Members most similar to the topic's c-TF-IDF representation
    fn representative_docs(&self, topic_row: &SparseRow, members: &[usize], documents: &[String]) -> Vec<String> {
        let sample: Vec<String> = members
            .iter()
            .take(self.settings.topics.representative_sample)
            .map(|&i| documents[i].clone())
            .collect();
        let rows = self.ctfidf.transform(&self.vectorizer.transform(&sample));

        let mut scored: Vec<(f64, usize)> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (sparse_cosine(row, topic_row), i))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1)));

        let mut picked: Vec<String> = Vec::new();
        for (_, i) in scored {
            if picked.len() >= self.settings.topics.representative_docs {
                break;
            }
            if !picked.contains(&sample[i]) {
                picked.push(sample[i].clone());
            }
        }
        picked
    }

    /// Assign each text to the topic with the most similar embedding
    pub fn infer(&self, texts: &[String], embedder: &dyn Embedder) -> Result<Vec<TopicAssignment>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = embedder.embed(texts)?;

        if let Some(expected) = self.topic_embeddings.values().next().map(Vec::len) {
            if let Some(found) = embeddings.iter().map(Vec::len).find(|&len| len != expected) {
                return Err(MediaTopicsError::Embedding(format!(
                    "{} produced {}-dimensional embeddings, the model expects {}",
                    embedder.model_name(),
                    found,
                    expected
                )));
            }
        }

        let candidates: Vec<(&i64, &Vec<f32>)> = {
            let topics: Vec<_> = self.topic_embeddings.iter().filter(|(&id, _)| id >= 0).collect();
            if topics.is_empty() {
                self.topic_embeddings.iter().collect()
            } else {
                topics
            }
        };

        Ok(embeddings
            .iter()
            .map(|embedding| {
                candidates
                    .iter()
                    .map(|(&id, topic)| TopicAssignment {
                        topic: id,
                        probability: cosine_similarity(embedding, topic),
                    })
                    .fold(None, |best: Option<TopicAssignment>, candidate| match best {
                        Some(b) if b.probability >= candidate.probability => Some(b),
                        _ => Some(candidate),
                    })
                    .unwrap_or(TopicAssignment {
                        topic: NOISE,
                        probability: 0.0,
                    })
            })
            .collect())
    }

    pub fn topic_info(&self) -> &[TopicSummary] {
        &self.topics
    }

    pub fn topic(&self, id: i64) -> Option<&TopicSummary> {
        self.topics.iter().find(|t| t.id == id)
    }

    /// Number of topics, outlier topic excluded
    pub fn n_topics(&self) -> usize {
        self.topics.iter().filter(|t| t.id >= 0).count()
    }

    pub fn assignments(&self) -> &[TopicAssignment] {
        &self.assignments
    }

    pub fn topic_embeddings(&self) -> &BTreeMap<i64, Vec<f32>> {
        &self.topic_embeddings
    }

    pub fn topic_rows(&self) -> &BTreeMap<i64, SparseRow> {
        &self.topic_rows
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }
}

fn mean_embedding(members: &[usize], embeddings: &[Vec<f32>]) -> Vec<f32> {
    let dim = embeddings.first().map(Vec::len).unwrap_or(0);
    let mut mean = vec![0.0f32; dim];
    for &i in members {
        for (m, v) in mean.iter_mut().zip(&embeddings[i]) {
            *m += v;
        }
    }
    if !members.is_empty() {
        let n = members.len() as f32;
        mean.iter_mut().for_each(|m| *m /= n);
    }
    mean
}

/// `<id>_<w1>_<w2>_<w3>_<w4>`
pub fn topic_name(id: i64, keywords: &[(String, f64)]) -> String {
    let words: Vec<&str> = keywords.iter().take(4).map(|(w, _)| w.as_str()).collect();
    format!("{}_{}", id, words.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AxisEmbedder;

    impl Embedder for AxisEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("grain") {
                        vec![1.0, 0.1, 0.0]
                    } else {
                        vec![0.0, 0.1, 1.0]
                    }
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "axis"
        }
    }

    #[test]
    fn test_sort_by_frequency() {
        let labels = vec![2, 0, 2, -1, 1, 2, 0];
        assert_eq!(sort_by_frequency(&labels), vec![0, 1, 0, -1, 2, 0, 1]);
    }

    #[test]
    fn test_topic_name() {
        let keywords: Vec<(String, f64)> = ["grain", "export", "port", "ship", "deal"]
            .iter()
            .map(|w| (w.to_string(), 1.0))
            .collect();
        assert_eq!(topic_name(3, &keywords), "3_grain_export_port_ship");
        assert_eq!(topic_name(-1, &keywords[..1]), "-1_grain");
    }

    fn model_from_labels(documents: &[String], labels: &[i64]) -> TopicModel {
        let config = Config::default();
        let embeddings = AxisEmbedder.embed(documents).unwrap();
        let mut model = TopicModel {
            settings: ModelSettings {
                embedding_model: "axis".to_string(),
                k_cluster: KCluster::Auto,
                vectorizer: config.vectorizer.clone(),
                reducer: config.reducer.clone(),
                clusterer: config.clusterer.clone(),
                topics: config.topics.clone(),
                n_documents: documents.len(),
                created_at: Utc::now(),
                version: "test".to_string(),
            },
            vectorizer: CountVectorizer::new((1, 1), vec!["the".to_string()]),
            ctfidf: ClassTfidf::default(),
            topic_rows: BTreeMap::new(),
            topics: Vec::new(),
            topic_embeddings: BTreeMap::new(),
            assignments: Vec::new(),
            state: ModelState::Trained,
        };
        model.extract_topics(documents, labels, &embeddings).unwrap();
        model
    }

    #[test]
    fn test_extract_topics_keywords_and_representatives() {
        let documents: Vec<String> = [
            "the grain export resumed",
            "grain ships leave the port",
            "grain prices fall",
            "tanks cross the river",
            "tanks and artillery",
            "random noise text",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let model = model_from_labels(&documents, &[0, 0, 0, 1, 1, -1]);

        assert_eq!(model.n_topics(), 2);
        let grain = model.topic(0).unwrap();
        assert_eq!(grain.count, 3);
        assert_eq!(grain.keywords[0].0, "grain");
        assert!(grain.name.starts_with("0_grain"));
        assert_eq!(grain.representative_docs.len(), 3);
        assert_eq!(model.topic(1).unwrap().keywords[0].0, "tanks");
        let centroid = &model.topic_embeddings()[&0];
        assert!((centroid[0] - 1.0).abs() < 1e-6 && (centroid[1] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_infer_picks_most_similar_topic() {
        let documents: Vec<String> = ["grain deal", "grain port", "tank battle", "tank column"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let model = model_from_labels(&documents, &[0, 0, 1, 1]);

        let result = model
            .infer(&["more grain".to_string(), "tank".to_string()], &AxisEmbedder)
            .unwrap();
        assert_eq!(result[0].topic, 0);
        assert_eq!(result[1].topic, 1);
        assert!((result[0].probability - 1.0).abs() < 1e-6);
        assert!(model.infer(&[], &AxisEmbedder).unwrap().is_empty());
    }

    struct PlaneEmbedder;

    impl Embedder for PlaneEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn model_name(&self) -> &str {
            "plane"
        }
    }

    #[test]
    fn test_infer_rejects_embedding_dimension_mismatch() {
        let documents: Vec<String> = ["grain deal", "tank battle"].iter().map(|s| s.to_string()).collect();
        let model = model_from_labels(&documents, &[0, 1]);

        assert!(matches!(
            model.infer(&["grain".to_string()], &PlaneEmbedder),
            Err(MediaTopicsError::Embedding(_))
        ));
    }

    #[test]
    fn test_fit_rejects_empty_corpus() {
        let config = Config::default();
        let modeler = TopicModeler::new(&config, Vec::new(), &AxisEmbedder, ComputeBackend::Cpu);
        assert!(matches!(
            modeler.fit(&[], KCluster::Auto),
            Err(MediaTopicsError::InvalidInput(_))
        ));
    }
}

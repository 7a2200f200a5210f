//! Sentence embeddings using Model2Vec

use crate::config::EmbeddingConfig;
use crate::error::{MediaTopicsError, Result};
use crate::progress::progress_bar;
use log::info;
use model2vec_rs::model::StaticModel;
use std::time::Instant;

/// Dense document encoder used for clustering and inference
pub trait Embedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn model_name(&self) -> &str;
}

pub struct Model2VecEmbedder {
    model: StaticModel,
    model_name: String,
    batch_size: usize,
}

impl Model2VecEmbedder {
    /// Load a static model from a local directory or the Hugging Face hub
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let start_time = Instant::now();
        info!("Loading Model2Vec embedding model {}", config.model);

        let model = StaticModel::from_pretrained(
            &config.model,
            None, // token
            None, // normalize
            None, // subfolder
        )
        .map_err(|e| MediaTopicsError::Embedding(format!("Failed to load model: {}", e)))?;

        info!("Model loaded in {:.2?}", start_time.elapsed());
        Ok(Self {
            model,
            model_name: config.model.clone(),
            batch_size: config.batch_size,
        })
    }
}

impl Embedder for Model2VecEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start_time = Instant::now();
        let mut embeddings = Vec::with_capacity(texts.len());

        let bar = progress_bar(texts.len(), "embedding");
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.model.encode_with_args(batch, Some(512), self.batch_size));
            bar.inc(batch.len() as u64);
        }
        bar.finish_and_clear();

        if embeddings.len() != texts.len() {
            return Err(MediaTopicsError::Embedding(format!(
                "Model returned {} embeddings for {} documents",
                embeddings.len(),
                texts.len()
            )));
        }
        info!(
            "Embedded {} documents in {:.2?}",
            texts.len(),
            start_time.elapsed()
        );
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

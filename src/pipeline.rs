//! The two batch pipelines driven by the binaries

use crate::cleaning::{CleaningReport, TextCleaner};
use crate::config::{Config, EmbeddingConfig};
use crate::error::{MediaTopicsError, Result};
use crate::input::sources::adapter_for;
use crate::output::{write_representative_docs, write_topic_info, write_visualizations, INFERENCE_FILE};
use crate::source::DataSource;
use crate::topics::{
    load_stopwords, model_dir, ComputeBackend, Embedder, KCluster, Model2VecEmbedder, TopicModel,
    TopicModeler,
};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub struct CleaningPipeline {
    config: Config,
}

impl CleaningPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Clean `input` into `output`. The metadata CSV falls back to the configured one.
    pub fn run(
        &self,
        source: DataSource,
        input: &Path,
        output: &Path,
        metadata: Option<&Path>,
    ) -> Result<CleaningReport> {
        ensure_exists(input)?;
        let adapter = adapter_for(source, &self.config.sources);
        let cleaner = TextCleaner::from_config(&self.config.cleaning)?;

        let metadata = metadata
            .map(Path::to_path_buf)
            .or_else(|| self.config.cleaning.news.metadata_csv.clone());
        info!("Cleaning {} data from {}", source, input.display());
        adapter.clean(&cleaner, input, output, metadata.as_deref())
    }
}

/// Parameters of one topic-modeling run
#[derive(Debug, Clone)]
pub struct TopicRequest {
    pub input: PathBuf,
    pub source: DataSource,
    pub output_folder: PathBuf,
    pub k_cluster: KCluster,
    pub do_inference: bool,
    pub accelerated: bool,
}

#[derive(Debug, Clone)]
pub struct TopicRunSummary {
    pub n_documents: usize,
    pub n_topics: usize,
    pub n_outliers: usize,
    /// An existing model directory was loaded instead of training
    pub reused_model: bool,
    pub backend: String,
    pub artifacts: Vec<PathBuf>,
    pub inference_output: Option<PathBuf>,
    pub elapsed: Duration,
}

pub struct TopicPipeline {
    config: Config,
    embedder: Option<Box<dyn Embedder>>,
}

impl TopicPipeline {
    /// The Model2Vec encoder is only loaded once a run needs embeddings
    pub fn new(config: Config) -> Self {
        Self {
            config,
            embedder: None,
        }
    }

    pub fn with_embedder(config: Config, embedder: Box<dyn Embedder>) -> Self {
        Self {
            config,
            embedder: Some(embedder),
        }
    }

    /// The encoder, loading `model_name` if none was injected or loaded yet
    fn embedder(&mut self, model_name: &str) -> Result<&dyn Embedder> {
        if self.embedder.is_none() {
            let config = EmbeddingConfig {
                model: model_name.to_string(),
                ..self.config.embedding.clone()
            };
            self.embedder = Some(Box::new(Model2VecEmbedder::new(&config)?));
        }
        self.embedder
            .as_deref()
            .ok_or_else(|| MediaTopicsError::Embedding("No embedding model available".to_string()))
    }

    /// Inference must embed with the encoder the model was trained with
    fn inference_embedder(&mut self, model: &TopicModel) -> Result<&dyn Embedder> {
        let trained_with = model.settings().embedding_model.as_str();
        if trained_with != self.config.embedding.model {
            warn!(
                "Configured encoder {} differs from {} used to train the model, using the latter",
                self.config.embedding.model, trained_with
            );
        }

        let embedder = self.embedder(trained_with)?;
        if embedder.model_name() != trained_with {
            return Err(MediaTopicsError::Embedding(format!(
                "Model was trained with {} but the encoder is {}",
                trained_with,
                embedder.model_name()
            )));
        }
        Ok(embedder)
    }

    pub fn run(&mut self, request: &TopicRequest) -> Result<TopicRunSummary> {
        let start_time = Instant::now();
        ensure_exists(&request.input)?;

        let adapter = adapter_for(request.source, &self.config.sources);
        if request.do_inference {
            adapter.ensure_inference()?;
        }

        let loaded = adapter.load(&request.input)?;
        info!(
            "Loaded {} {} documents from {}",
            loaded.corpus.len(),
            request.source,
            request.input.display()
        );

        std::fs::create_dir_all(&request.output_folder)?;
        let model_path = model_dir(&request.output_folder);
        let backend = ComputeBackend::select(request.accelerated);
        let mut artifacts = Vec::new();

        let reused_model = model_path.exists();
        let model = if reused_model {
            info!("Found existing model at {}, skipping training", model_path.display());
            TopicModel::load(&model_path)?
        } else {
            let stop_words = load_stopwords(&self.config.vectorizer.stopwords_path)?;
            let config = self.config.clone();
            let embedder = self.embedder(&config.embedding.model)?;
            let modeler = TopicModeler::new(&config, stop_words, embedder, backend.clone());

            let mut model = modeler.fit(&loaded.corpus.texts(), request.k_cluster)?;
            artifacts.extend(write_visualizations(&model, &request.output_folder)?);
            artifacts.push(write_representative_docs(&model, &request.output_folder)?);
            artifacts.push(write_topic_info(&model, &request.output_folder)?);
            // last, so a failed run never leaves a model directory to reuse
            model.persist(&model_path)?;
            model
        };

        let inference_output = if request.do_inference {
            match loaded.inference {
                Some(mut inference) => {
                    let texts = inference.texts();
                    let assignments = model.infer(&texts, self.inference_embedder(&model)?)?;
                    let clusters: Vec<i64> = assignments.iter().map(|a| a.topic).collect();
                    inference.table.add_column("cluster", &clusters)?;

                    let path = request.output_folder.join(INFERENCE_FILE);
                    inference.table.write(&path)?;
                    info!("Wrote cluster assignments for {} rows to {}", texts.len(), path.display());
                    Some(path)
                }
                None => {
                    warn!("No inference table was loaded for {}", request.source);
                    None
                }
            }
        } else {
            None
        };

        Ok(TopicRunSummary {
            n_documents: loaded.corpus.len(),
            n_topics: model.n_topics(),
            n_outliers: model.assignments().iter().filter(|a| a.topic < 0).count(),
            reused_model,
            backend: backend.name(),
            artifacts,
            inference_output,
            elapsed: start_time.elapsed(),
        })
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(MediaTopicsError::InvalidInput(format!(
            "{} does not exist",
            path.display()
        )))
    }
}

//! Saving and loading a trained topic model as a directory of JSON files

use crate::error::{MediaTopicsError, Result};
use crate::topics::ctfidf::ClassTfidf;
use crate::topics::model::{ModelSettings, ModelState, TopicAssignment, TopicModel, TopicSummary};
use crate::topics::vectorizer::{CountVectorizer, SparseRow};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Name of the model directory inside the output folder
pub const MODEL_DIR_NAME: &str = "BERTopicmodel";

const CONFIG_FILE: &str = "config.json";
const TOPICS_FILE: &str = "topics.json";
const VECTORIZER_FILE: &str = "vectorizer.json";
const CTFIDF_FILE: &str = "ctfidf.json";
const EMBEDDINGS_FILE: &str = "topic_embeddings.json";
const ASSIGNMENTS_FILE: &str = "assignments.json";

pub fn model_dir(output_folder: &Path) -> PathBuf {
    output_folder.join(MODEL_DIR_NAME)
}

fn staging_dir(dir: &Path) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| MODEL_DIR_NAME.to_string());
    dir.with_file_name(format!(".{}.partial", name))
}

#[derive(Serialize, Deserialize)]
struct CtfidfFile {
    weights: ClassTfidf,
    topics: BTreeMap<i64, SparseRow>,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, value)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| {
        MediaTopicsError::ModelError(format!("Cannot open {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

impl TopicModel {
    /// Write the model files into `dir`, creating it if needed
    pub fn save(&mut self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        write_json(&dir.join(CONFIG_FILE), &self.settings)?;
        write_json(&dir.join(TOPICS_FILE), &self.topics)?;
        write_json(&dir.join(VECTORIZER_FILE), &self.vectorizer)?;
        write_json(
            &dir.join(CTFIDF_FILE),
            &CtfidfFile {
                weights: self.ctfidf.clone(),
                topics: self.topic_rows.clone(),
            },
        )?;
        write_json(&dir.join(EMBEDDINGS_FILE), &self.topic_embeddings)?;
        write_json(&dir.join(ASSIGNMENTS_FILE), &self.assignments)?;

        info!("Saved topic model to {}", dir.display());
        self.state = ModelState::Persisted(dir.to_path_buf());
        Ok(())
    }

    /// Save into a sibling staging directory and rename it onto `dir`, so
    /// `dir` only ever appears complete
    pub fn persist(&mut self, dir: &Path) -> Result<()> {
        let staging = staging_dir(dir);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        self.save(&staging)?;
        std::fs::rename(&staging, dir)?;

        debug!("Moved {} to {}", staging.display(), dir.display());
        self.state = ModelState::Persisted(dir.to_path_buf());
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(MediaTopicsError::ModelError(format!(
                "No topic model at {}",
                dir.display()
            )));
        }

        let settings: ModelSettings = read_json(&dir.join(CONFIG_FILE))?;
        let topics: Vec<TopicSummary> = read_json(&dir.join(TOPICS_FILE))?;
        let vectorizer: CountVectorizer = read_json(&dir.join(VECTORIZER_FILE))?;
        let ctfidf: CtfidfFile = read_json(&dir.join(CTFIDF_FILE))?;
        let topic_embeddings: BTreeMap<i64, Vec<f32>> = read_json(&dir.join(EMBEDDINGS_FILE))?;
        let assignments: Vec<TopicAssignment> = read_json(&dir.join(ASSIGNMENTS_FILE))?;

        info!(
            "Loaded topic model with {} topics from {}",
            topics.iter().filter(|t| t.id >= 0).count(),
            dir.display()
        );
        Ok(Self {
            settings,
            vectorizer,
            ctfidf: ctfidf.weights,
            topic_rows: ctfidf.topics,
            topics,
            topic_embeddings,
            assignments,
            state: ModelState::Persisted(dir.to_path_buf()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::topics::reduction::KCluster;
    use chrono::Utc;
    use tempfile::TempDir;

    fn small_model() -> TopicModel {
        let config = Config::default();
        let mut vectorizer = CountVectorizer::new((1, 1), Vec::new());
        let counts = vectorizer
            .fit_transform(&["grain port".to_string(), "tanks".to_string()])
            .unwrap();
        let ctfidf = ClassTfidf::fit(&counts, vectorizer.n_features()).unwrap();
        let rows = ctfidf.transform(&counts);

        TopicModel {
            settings: ModelSettings {
                embedding_model: "test".to_string(),
                k_cluster: KCluster::Count(2),
                vectorizer: config.vectorizer.clone(),
                reducer: config.reducer.clone(),
                clusterer: config.clusterer.clone(),
                topics: config.topics.clone(),
                n_documents: 2,
                created_at: Utc::now(),
                version: "test".to_string(),
            },
            vectorizer,
            ctfidf,
            topic_rows: [(0, rows[0].clone()), (1, rows[1].clone())].into_iter().collect(),
            topics: vec![TopicSummary {
                id: 0,
                count: 1,
                name: "0_grain_port".to_string(),
                keywords: vec![("grain".to_string(), 0.5)],
                representative_docs: vec!["grain port".to_string()],
            }],
            topic_embeddings: [(0, vec![1.0, 0.0]), (1, vec![0.0, 1.0])].into_iter().collect(),
            assignments: vec![
                TopicAssignment { topic: 0, probability: 0.9 },
                TopicAssignment { topic: -1, probability: 0.0 },
            ],
            state: ModelState::Trained,
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = model_dir(dir.path());
        let mut model = small_model();

        model.save(&path).unwrap();
        assert_eq!(model.state(), &ModelState::Persisted(path.clone()));
        for file in [CONFIG_FILE, TOPICS_FILE, VECTORIZER_FILE, CTFIDF_FILE, EMBEDDINGS_FILE, ASSIGNMENTS_FILE] {
            assert!(path.join(file).exists(), "{} missing", file);
        }

        let loaded = TopicModel::load(&path).unwrap();
        assert_eq!(loaded.topic_info(), model.topic_info());
        assert_eq!(loaded.assignments(), model.assignments());
        assert_eq!(loaded.topic_embeddings(), model.topic_embeddings());
        assert_eq!(loaded.topic_rows(), model.topic_rows());
        assert_eq!(loaded.settings().k_cluster, KCluster::Count(2));
    }

    #[test]
    fn test_persist_replaces_stale_staging_directory() {
        let dir = TempDir::new().unwrap();
        let path = model_dir(dir.path());
        let staging = staging_dir(&path);
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("leftover.json"), "{}").unwrap();

        let mut model = small_model();
        model.persist(&path).unwrap();

        assert_eq!(model.state(), &ModelState::Persisted(path.clone()));
        assert!(!staging.exists());
        assert!(!path.join("leftover.json").exists());
        assert!(path.join(CONFIG_FILE).exists());
        assert_eq!(TopicModel::load(&path).unwrap().topic_info(), model.topic_info());
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            TopicModel::load(&model_dir(dir.path())),
            Err(MediaTopicsError::ModelError(_))
        ));
    }
}

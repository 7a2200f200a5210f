//! Configuration management for the cleaning and topic-modeling pipelines

use crate::error::{MediaTopicsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub cleaning: CleaningConfig,
    pub vectorizer: VectorizerConfig,
    pub embedding: EmbeddingConfig,
    pub reducer: ReducerConfig,
    pub clusterer: ClustererConfig,
    pub topics: TopicsConfig,
}

/// Column layout of one CSV-backed source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvSourceConfig {
    pub text_column: String,
    pub id_column: Option<String>,
    pub timestamp_column: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub telegram: CsvSourceConfig,
    pub twitter: CsvSourceConfig,
    /// Messages shorter than this many characters are not used for training
    pub telegram_min_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub stoplist_languages: Vec<String>,
    pub min_token_length: usize,
    pub boilerplate: BoilerplateConfig,
    pub news: NewsCleaningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoilerplateConfig {
    pub length_low: usize,
    pub length_high: usize,
    pub stopwords_low: f64,
    pub stopwords_high: f64,
    pub max_link_density: f64,
    pub max_heading_distance: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsCleaningConfig {
    pub min_line_words: usize,
    pub min_article_words: usize,
    pub skip_prefixes: Vec<String>,
    pub deny_phrases: Vec<String>,
    pub relevance_keywords: Vec<String>,
    pub metadata_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    pub stopwords_path: PathBuf,
    pub ngram_min: usize,
    pub ngram_max: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    pub n_components: usize,
    pub n_neighbors: usize,
    pub min_dist: f32,
    pub spread: f32,
    pub learning_rate: f32,
    pub negative_sample_rate: usize,
    pub n_epochs: Option<usize>,
    pub random_state: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterSelection {
    Eom,
    Leaf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClustererConfig {
    pub min_cluster_size: usize,
    pub min_samples: usize,
    pub selection: ClusterSelection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    pub top_n_words: usize,
    pub representative_docs: usize,
    pub representative_sample: usize,
    pub barchart_topics: usize,
    pub barchart_words: usize,
}

impl Default for CsvSourceConfig {
    fn default() -> Self {
        Self {
            text_column: "text".to_string(),
            id_column: None,
            timestamp_column: None,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            telegram: CsvSourceConfig {
                text_column: "messageText".to_string(),
                ..CsvSourceConfig::default()
            },
            twitter: CsvSourceConfig::default(),
            telegram_min_chars: 100,
        }
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            stoplist_languages: ["English", "German", "French", "Italian"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_token_length: 5,
            boilerplate: BoilerplateConfig::default(),
            news: NewsCleaningConfig::default(),
        }
    }
}

impl Default for BoilerplateConfig {
    fn default() -> Self {
        Self {
            length_low: 70,
            length_high: 200,
            stopwords_low: 0.30,
            stopwords_high: 0.32,
            max_link_density: 0.2,
            max_heading_distance: 200,
        }
    }
}

impl Default for NewsCleaningConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            min_line_words: 10,
            min_article_words: 10,
            skip_prefixes: strings(&["Copyright", "Follow", "©"]),
            deny_phrases: strings(&[
                "Abo",
                "subscribe",
                "Abonnement",
                "Abonnieren",
                "Mail",
                "Kundenbefragung",
            ]),
            relevance_keywords: strings(&[
                "ukrainer",
                "ukrainian",
                "flüchtling",
                "flüchten",
                "migrant",
                "migrieren",
                "asyl",
            ]),
            metadata_csv: None,
        }
    }
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            stopwords_path: PathBuf::from("data/stopwords/stopwords.txt"),
            ngram_min: 1,
            ngram_max: 2,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "minishlab/potion-multilingual-128M".to_string(),
            batch_size: 256,
        }
    }
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            n_components: 5,
            n_neighbors: 15,
            min_dist: 0.0,
            spread: 1.0,
            learning_rate: 1.0,
            negative_sample_rate: 5,
            n_epochs: None,
            random_state: 42,
        }
    }
}

impl Default for ClustererConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 5,
            min_samples: 10,
            selection: ClusterSelection::Eom,
        }
    }
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            top_n_words: 10,
            representative_docs: 3,
            representative_sample: 500,
            barchart_topics: 30,
            barchart_words: 5,
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, the user config file, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MediaTopicsError::Configuration(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| MediaTopicsError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vectorizer.ngram_min == 0 || self.vectorizer.ngram_min > self.vectorizer.ngram_max {
            return Err(MediaTopicsError::Configuration(format!(
                "Invalid n-gram range ({}, {})",
                self.vectorizer.ngram_min, self.vectorizer.ngram_max
            )));
        }
        if self.reducer.n_components == 0 {
            return Err(MediaTopicsError::Configuration(
                "reducer.n_components must be positive".to_string(),
            ));
        }
        if self.clusterer.min_cluster_size < 2 {
            return Err(MediaTopicsError::Configuration(
                "clusterer.min_cluster_size must be at least 2".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(MediaTopicsError::Configuration(
                "embedding.batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("media-topics")
            .join("config.toml")
    }
}

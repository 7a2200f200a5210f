//! Command line interfaces of the two binaries

use crate::source::DataSource;
use crate::topics::KCluster;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "textcleaner")]
#[command(about = "Strip URLs, boilerplate and short content from raw media corpora")]
#[command(long_about = "Clean Telegram exports and scraped news articles: removes URLs, navigation \
    and template lines, page boilerplate and documents without real content")]
pub struct CleanCli {
    /// Input CSV file (telegram) or folder of .txt articles (google_news)
    #[arg(short, long, value_parser = existing_path)]
    pub input: PathBuf,

    /// Data source of the input
    #[arg(short = 'd', long = "data_type", value_enum)]
    pub data_type: DataSource,

    /// Output CSV file (telegram) or folder (google_news)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Google News metadata CSV to reconcile with the cleaned articles
    #[arg(long, value_parser = existing_path)]
    pub metadata: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(name = "topicmodel")]
#[command(about = "Fit a topic model on a cleaned corpus and export its topics")]
#[command(long_about = "Embed documents, reduce and cluster the embeddings into topics, and write \
    charts, representative documents and optional per-document cluster assignments")]
pub struct TopicCli {
    /// Input CSV file or folder of .txt files
    #[arg(short, long, value_parser = existing_path)]
    pub input: PathBuf,

    /// Data source of the input
    #[arg(short = 'd', long = "data_type", value_enum)]
    pub data_type: DataSource,

    /// Folder for the model and results; an existing model in it is reused
    #[arg(short, long = "output_folder")]
    pub output_folder: PathBuf,

    /// Number of topics, or "auto" to merge similar topics automatically
    #[arg(short, long = "k_cluster", default_value = "auto")]
    pub k_cluster: KCluster,

    /// Assign every input row to a topic and write df_model.csv
    ///
    /// Long options take two dashes, so the short spelling is `--di`.
    #[arg(long = "do_inference", visible_alias = "di")]
    pub do_inference: bool,

    /// Run neighbour searches on the accelerated tensor backend (`--gpu`)
    #[arg(long = "gpu_info", visible_alias = "gpu")]
    pub gpu_info: bool,

    /// Newline-delimited stop-word file
    #[arg(long, value_parser = existing_path)]
    pub stopwords: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Reject paths that do not exist before any work starts
pub fn existing_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("{} does not exist", value))
    }
}

//! Error handling for the cleaning and topic-modeling pipelines

use crate::source::DataSource;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaTopicsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{operation} is not supported for data source '{data_source}'")]
    Unsupported {
        data_source: DataSource,
        operation: &'static str,
    },

    #[error("Text processing error: {0}")]
    TextProcessing(String),

    #[error("Embedding generation error: {0}")]
    Embedding(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Clustering error: {0}")]
    Clustering(String),

    #[error("Output formatting error: {0}")]
    OutputFormatting(String),
}

pub type Result<T> = std::result::Result<T, MediaTopicsError>;

impl MediaTopicsError {
    pub fn unsupported(data_source: DataSource, operation: &'static str) -> Self {
        MediaTopicsError::Unsupported { data_source, operation }
    }
}

/// Convert anyhow errors (raised by model2vec-rs) to our custom error type
impl From<anyhow::Error> for MediaTopicsError {
    fn from(err: anyhow::Error) -> Self {
        MediaTopicsError::Embedding(err.to_string())
    }
}

/// Convert candle core errors to our custom error type
impl From<candle_core::Error> for MediaTopicsError {
    fn from(err: candle_core::Error) -> Self {
        MediaTopicsError::ModelError(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for MediaTopicsError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        MediaTopicsError::OutputFormatting(err.to_string())
    }
}

impl From<askama::Error> for MediaTopicsError {
    fn from(err: askama::Error) -> Self {
        MediaTopicsError::OutputFormatting(err.to_string())
    }
}

//! Per-source loading, cleaning and inference capabilities
//!
//! Every data source implements [`SourceAdapter`]. Capabilities a source does
//! not have fall through to the default methods, which fail with
//! [`MediaTopicsError::Unsupported`].

use crate::cleaning::cleaner::list_text_files;
use crate::cleaning::{CleaningReport, TextCleaner};
use crate::config::{CsvSourceConfig, SourcesConfig};
use crate::error::{MediaTopicsError, Result};
use crate::input::corpus::{parse_news_file_stem, parse_timestamp, Corpus, Document};
use crate::input::table::CsvTable;
use crate::source::DataSource;
use log::{info, warn};
use std::collections::HashSet;
use std::path::Path;

/// The complete valid input table, kept for writing cluster assignments back out
#[derive(Debug, Clone)]
pub struct InferenceTable {
    pub table: CsvTable,
    pub text_column: usize,
}

impl InferenceTable {
    pub fn texts(&self) -> Vec<String> {
        self.table.column(self.text_column).map(str::to_string).collect()
    }
}

#[derive(Debug, Clone)]
pub struct LoadedCorpus {
    pub corpus: Corpus,
    pub inference: Option<InferenceTable>,
}

pub trait SourceAdapter {
    fn source(&self) -> DataSource;

    fn load(&self, _input: &Path) -> Result<LoadedCorpus> {
        Err(MediaTopicsError::unsupported(self.source(), "loading"))
    }

    fn clean(
        &self,
        _cleaner: &TextCleaner,
        _input: &Path,
        _output: &Path,
        _metadata: Option<&Path>,
    ) -> Result<CleaningReport> {
        Err(MediaTopicsError::unsupported(self.source(), "cleaning"))
    }

    fn supports_inference(&self) -> bool {
        false
    }

    /// Fail fast when inference was requested for a source without it
    fn ensure_inference(&self) -> Result<()> {
        if self.supports_inference() {
            Ok(())
        } else {
            Err(MediaTopicsError::unsupported(self.source(), "inference"))
        }
    }
}

pub fn adapter_for(source: DataSource, config: &SourcesConfig) -> Box<dyn SourceAdapter> {
    match source {
        DataSource::Telegram => Box::new(TelegramAdapter {
            columns: config.telegram.clone(),
            min_chars: config.telegram_min_chars,
        }),
        DataSource::Twitter => Box::new(TwitterAdapter {
            columns: config.twitter.clone(),
        }),
        DataSource::GoogleNews => Box::new(GoogleNewsAdapter),
        DataSource::Gdelt => Box::new(GdeltAdapter),
    }
}

fn document_from_row(table: &CsvTable, row: usize, text_column: usize, columns: &CsvSourceConfig) -> Document {
    let id = columns
        .id_column
        .as_deref()
        .and_then(|name| table.column_index(name).ok())
        .and_then(|idx| table.cell(row, idx))
        .map(str::to_string)
        .unwrap_or_else(|| row.to_string());
    let timestamp = columns
        .timestamp_column
        .as_deref()
        .and_then(|name| table.column_index(name).ok())
        .and_then(|idx| table.cell(row, idx))
        .and_then(parse_timestamp);

    let mut document = Document::new(id, table.cell(row, text_column).unwrap_or_default());
    document.metadata.timestamp = timestamp;
    document
}

pub struct TelegramAdapter {
    columns: CsvSourceConfig,
    min_chars: usize,
}

impl SourceAdapter for TelegramAdapter {
    fn source(&self) -> DataSource {
        DataSource::Telegram
    }

    fn load(&self, input: &Path) -> Result<LoadedCorpus> {
        let mut table = CsvTable::read(input)?;
        let text_column = table.column_index(&self.columns.text_column)?;

        table.filter_map_column(text_column, |text| {
            let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!normalized.is_empty()).then_some(normalized)
        });

        let mut corpus = Corpus::new(DataSource::Telegram);
        for row in 0..table.len() {
            let document = document_from_row(&table, row, text_column, &self.columns);
            if document.text.chars().count() >= self.min_chars {
                corpus.push(document);
            }
        }
        info!(
            "Loaded {} Telegram messages ({} of at least {} characters)",
            table.len(),
            corpus.len(),
            self.min_chars
        );

        Ok(LoadedCorpus {
            corpus,
            inference: Some(InferenceTable { table, text_column }),
        })
    }

    fn clean(
        &self,
        cleaner: &TextCleaner,
        input: &Path,
        output: &Path,
        _metadata: Option<&Path>,
    ) -> Result<CleaningReport> {
        cleaner.clean_csv(input, output, &self.columns.text_column)
    }

    fn supports_inference(&self) -> bool {
        true
    }
}

pub struct TwitterAdapter {
    columns: CsvSourceConfig,
}

impl SourceAdapter for TwitterAdapter {
    fn source(&self) -> DataSource {
        DataSource::Twitter
    }

    fn load(&self, input: &Path) -> Result<LoadedCorpus> {
        let mut table = CsvTable::read(input)?;
        let text_column = table.column_index(&self.columns.text_column)?;

        table.filter_map_column(text_column, |text| {
            let trimmed = text.trim_end();
            (!trimmed.trim_start().is_empty()).then(|| trimmed.to_string())
        });
        let mut seen = HashSet::new();
        table.retain(|row| seen.insert(row[text_column].clone()));
        info!("Analysing {} posts", table.len());

        let mut corpus = Corpus::new(DataSource::Twitter);
        for row in 0..table.len() {
            corpus.push(document_from_row(&table, row, text_column, &self.columns));
        }

        Ok(LoadedCorpus {
            corpus,
            inference: Some(InferenceTable { table, text_column }),
        })
    }

    fn supports_inference(&self) -> bool {
        true
    }
}

pub struct GoogleNewsAdapter;

impl SourceAdapter for GoogleNewsAdapter {
    fn source(&self) -> DataSource {
        DataSource::GoogleNews
    }

    fn load(&self, input: &Path) -> Result<LoadedCorpus> {
        let files = list_text_files(input)?;
        let mut corpus = Corpus::new(DataSource::GoogleNews);

        for path in &files {
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let metadata = parse_news_file_stem(stem);

            for (line_no, line) in content.lines().enumerate() {
                let mut document = Document::new(format!("{}:{}", stem, line_no + 1), line.trim_end());
                document.metadata = metadata.clone();
                corpus.push(document);
            }
        }
        info!("Loaded {} paragraphs from {} news files", corpus.len(), files.len());

        Ok(LoadedCorpus {
            corpus,
            inference: None,
        })
    }

    fn clean(
        &self,
        cleaner: &TextCleaner,
        input: &Path,
        output: &Path,
        metadata: Option<&Path>,
    ) -> Result<CleaningReport> {
        let mut report = cleaner.clean_news_directory(input, output)?;
        if let Some(metadata) = metadata {
            report.metadata_output = Some(cleaner.reconcile_news_metadata(metadata, output)?);
        }
        Ok(report)
    }
}

/// Declared for completeness; no capability is implemented
pub struct GdeltAdapter;

impl SourceAdapter for GdeltAdapter {
    fn source(&self) -> DataSource {
        DataSource::Gdelt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleaningConfig;
    use tempfile::TempDir;

    fn telegram_csv(dir: &TempDir, rows: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join("telegram.csv");
        let mut content = String::from("id,messageText,date\n");
        for (i, text) in rows.iter().enumerate() {
            content.push_str(&format!("{},\"{}\",2023-03-0{} 10:00:00\n", i, text, i % 9 + 1));
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_telegram_min_length_is_inclusive() {
        let dir = TempDir::new().unwrap();
        let exact = "x".repeat(100);
        let short = "y".repeat(99);
        let path = telegram_csv(&dir, &[&exact, &short, ""]);

        let loaded = adapter_for(DataSource::Telegram, &SourcesConfig::default())
            .load(&path)
            .unwrap();

        assert_eq!(loaded.corpus.len(), 1);
        assert_eq!(loaded.corpus.documents()[0].text, exact);
        // the inference table keeps every non-empty row
        assert_eq!(loaded.inference.unwrap().table.len(), 2);
    }

    #[test]
    fn test_telegram_normalizes_whitespace_and_reads_metadata() {
        let dir = TempDir::new().unwrap();
        let text = format!("{}   spaced\n\nout", "word ".repeat(25));
        let path = telegram_csv(&dir, &[&text]);

        let mut config = SourcesConfig::default();
        config.telegram.id_column = Some("id".to_string());
        config.telegram.timestamp_column = Some("date".to_string());
        let loaded = adapter_for(DataSource::Telegram, &config).load(&path).unwrap();

        let doc = &loaded.corpus.documents()[0];
        assert!(doc.text.ends_with("word spaced out"));
        assert_eq!(doc.id, "0");
        assert!(doc.metadata.timestamp.is_some());
    }

    #[test]
    fn test_twitter_deduplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tweets.csv");
        std::fs::write(&path, "text\nsame tweet  \nsame tweet\n\nother tweet\n").unwrap();

        let loaded = adapter_for(DataSource::Twitter, &SourcesConfig::default())
            .load(&path)
            .unwrap();

        assert_eq!(loaded.corpus.texts(), vec!["same tweet", "other tweet"]);
    }

    #[test]
    fn test_google_news_reads_sorted_lines() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b_UA_uk.txt"), "second file\n").unwrap();
        std::fs::write(dir.path().join("a_DE_de.txt"), "first line  \n\nsecond line\n").unwrap();

        let adapter = adapter_for(DataSource::GoogleNews, &SourcesConfig::default());
        let loaded = adapter.load(dir.path()).unwrap();

        assert_eq!(
            loaded.corpus.texts(),
            vec!["first line", "second line", "second file"]
        );
        assert_eq!(loaded.corpus.documents()[2].metadata.country.as_deref(), Some("UA"));
        assert!(loaded.inference.is_none());
        assert!(adapter.ensure_inference().is_err());
    }

    #[test]
    fn test_unsupported_capabilities() {
        let dir = TempDir::new().unwrap();
        let cleaner = TextCleaner::from_config(&CleaningConfig::default()).unwrap();
        let config = SourcesConfig::default();

        let gdelt = adapter_for(DataSource::Gdelt, &config);
        assert!(matches!(
            gdelt.load(dir.path()),
            Err(MediaTopicsError::Unsupported { data_source: DataSource::Gdelt, operation: "loading" })
        ));

        let twitter = adapter_for(DataSource::Twitter, &config);
        assert!(matches!(
            twitter.clean(&cleaner, dir.path(), dir.path(), None),
            Err(MediaTopicsError::Unsupported { operation: "cleaning", .. })
        ));
        assert!(twitter.ensure_inference().is_ok());
    }
}

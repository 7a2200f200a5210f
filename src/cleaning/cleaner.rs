//! Cleaning orchestration for message tables and news article folders

use crate::cleaning::boilerplate::BoilerplateStripper;
use crate::cleaning::filters::{LineFilter, RelevanceFilter, ShortContentFilter};
use crate::cleaning::stoplists::Stoplist;
use crate::cleaning::text_processor::TextProcessor;
use crate::config::CleaningConfig;
use crate::error::{MediaTopicsError, Result};
use crate::input::table::CsvTable;
use crate::progress::progress_bar;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Outcome of one cleaning run
#[derive(Debug, Clone, Default)]
pub struct CleaningReport {
    pub total: usize,
    pub kept: usize,
    pub skipped_unreadable: usize,
    pub output: PathBuf,
    pub metadata_output: Option<PathBuf>,
}

impl CleaningReport {
    pub fn dropped(&self) -> usize {
        self.total - self.kept - self.skipped_unreadable
    }
}

pub struct TextCleaner {
    processor: TextProcessor,
    stripper: BoilerplateStripper,
    short_filter: ShortContentFilter,
    line_filter: LineFilter,
    relevance: RelevanceFilter,
    min_article_words: usize,
}

impl TextCleaner {
    pub fn from_config(config: &CleaningConfig) -> Result<Self> {
        let stoplist = Stoplist::for_languages(&config.stoplist_languages)?;
        debug!(
            "Loaded stoplist with {} words for {}",
            stoplist.len(),
            config.stoplist_languages.join(", ")
        );

        Ok(Self {
            processor: TextProcessor::new(),
            stripper: BoilerplateStripper::new(stoplist, config.boilerplate.clone()),
            short_filter: ShortContentFilter::new(config.min_token_length),
            line_filter: LineFilter::new(&config.news),
            relevance: RelevanceFilter::new(&config.news.relevance_keywords),
            min_article_words: config.news.min_article_words,
        })
    }

    /// Clean a single message; `None` means the message should be dropped
    pub fn clean_message(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let without_urls = self.processor.strip_urls(text);
        let stripped = self.stripper.strip(&without_urls);
        let normalized = self.processor.normalize_whitespace(&stripped);
        self.short_filter.apply(normalized)
    }

    /// Clean one scraped article (one line per paragraph)
    pub fn clean_article(&self, article: &str) -> Option<String> {
        if !self.relevance.is_relevant(article) {
            debug!("Article has none of the relevance keywords");
            return None;
        }

        let joined = self.line_filter.filter_lines(article).join(" ");
        if joined.is_empty() {
            return None;
        }
        let without_urls = self.processor.strip_urls(&joined);
        let stripped = self.stripper.strip(&without_urls);
        let cleaned = self.processor.normalize_whitespace(&stripped);

        if TextProcessor::word_count(&cleaned) >= self.min_article_words {
            Some(cleaned)
        } else {
            None
        }
    }

    /// Clean the text column of a CSV file, writing every column of the surviving rows
    pub fn clean_csv(&self, input: &Path, output: &Path, text_column: &str) -> Result<CleaningReport> {
        let mut table = CsvTable::read(input)?;
        let column = table.column_index(text_column)?;
        let total = table.len();
        info!("Cleaning {} rows from {}", total, input.display());

        let bar = progress_bar(total, "cleaning");
        table.filter_map_column(column, |text| {
            bar.inc(1);
            self.clean_message(text)
        });
        bar.finish_and_clear();

        table.write(output)?;
        info!(
            "Kept {} of {} rows, saved to {}",
            table.len(),
            total,
            output.display()
        );

        Ok(CleaningReport {
            total,
            kept: table.len(),
            skipped_unreadable: 0,
            output: output.to_path_buf(),
            metadata_output: None,
        })
    }

    /// Clean every `.txt` article in `input`, writing survivors under the same name into `output`
    pub fn clean_news_directory(&self, input: &Path, output: &Path) -> Result<CleaningReport> {
        let files = list_text_files(input)?;
        std::fs::create_dir_all(output)?;
        info!("Cleaning {} articles from {}", files.len(), input.display());

        let mut report = CleaningReport {
            total: files.len(),
            output: output.to_path_buf(),
            ..CleaningReport::default()
        };

        let bar = progress_bar(files.len(), "articles");
        for path in &files {
            bar.inc(1);
            let raw = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.skipped_unreadable += 1;
                    continue;
                }
            };
            let article = match String::from_utf8(raw) {
                Ok(text) => text,
                Err(_) => {
                    warn!("Skipping {}: not valid UTF-8", path.display());
                    report.skipped_unreadable += 1;
                    continue;
                }
            };

            if let Some(cleaned) = self.clean_article(&article) {
                let name = path.file_name().ok_or_else(|| {
                    MediaTopicsError::InvalidInput(format!("No file name in {}", path.display()))
                })?;
                std::fs::write(output.join(name), cleaned)?;
                report.kept += 1;
            }
        }
        bar.finish_and_clear();

        info!(
            "Kept {} of {} articles ({} unreadable)",
            report.kept, report.total, report.skipped_unreadable
        );
        Ok(report)
    }

    /// Keep only metadata rows whose article survived cleaning.
    ///
    /// The article file of a row is `<title>_<alpha2_code>_<language_code>.txt`
    /// with `/` in the title replaced by a space. The filtered table is written
    /// next to the metadata file as `<stem>_clean.csv`.
    pub fn reconcile_news_metadata(&self, metadata_csv: &Path, cleaned_dir: &Path) -> Result<PathBuf> {
        let mut table = CsvTable::read(metadata_csv)?;
        let title = table.column_index("title")?;
        let alpha2 = table.column_index("alpha2_code")?;
        let language = table.column_index("language_code")?;

        let existing: HashSet<String> = std::fs::read_dir(cleaned_dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();

        let before = table.len();
        table.retain(|row| {
            let name = format!(
                "{}_{}_{}.txt",
                row[title].replace('/', " "),
                row[alpha2],
                row[language]
            );
            existing.contains(&name)
        });

        let stem = metadata_csv
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("metadata");
        let output = metadata_csv.with_file_name(format!("{}_clean.csv", stem));
        table.write(&output)?;
        info!(
            "Kept {} of {} metadata rows, saved to {}",
            table.len(),
            before,
            output.display()
        );
        Ok(output)
    }
}

/// Regular `.txt` files of a directory in sorted order
pub fn list_text_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(MediaTopicsError::InvalidInput(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("txt")
        })
        .collect();
    files.sort();
    Ok(files)
}

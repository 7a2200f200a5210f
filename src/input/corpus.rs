//! Documents and corpora handed from the loaders to the topic model

use crate::source::DataSource;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub timestamp: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: DocumentMetadata::default(),
        }
    }
}

/// Ordered documents loaded from one input path
#[derive(Debug, Clone)]
pub struct Corpus {
    pub source: DataSource,
    documents: Vec<Document>,
}

impl Corpus {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            documents: Vec::new(),
        }
    }

    /// Documents with empty text never enter the corpus
    pub fn push(&mut self, document: Document) -> bool {
        if document.text.trim().is_empty() {
            return false;
        }
        self.documents.push(document);
        true
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn texts(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Parse the timestamp formats seen in message exports
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Country and language from a news file stem `<title>_<alpha2>_<lang>`
pub fn parse_news_file_stem(stem: &str) -> DocumentMetadata {
    let mut parts = stem.rsplitn(3, '_');
    let language = parts.next();
    let country = parts.next();
    let title = parts.next();

    match (title, country, language) {
        (Some(_), Some(country), Some(language)) if !country.is_empty() && !language.is_empty() => {
            DocumentMetadata {
                timestamp: None,
                language: Some(language.to_string()),
                country: Some(country.to_string()),
            }
        }
        _ => DocumentMetadata::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_corpus_rejects_empty_text() {
        let mut corpus = Corpus::new(DataSource::Telegram);
        assert!(corpus.push(Document::new("1", "hello")));
        assert!(!corpus.push(Document::new("2", "  \n ")));
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.texts(), vec!["hello".to_string()]);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2023-03-01T10:15:00+02:00").unwrap();
        assert_eq!(a.hour(), 8);

        let b = parse_timestamp("2023-03-01 10:15:00+00:00").unwrap();
        assert_eq!(b.minute(), 15);

        let c = parse_timestamp("2023-03-01 10:15:00").unwrap();
        assert_eq!(c.day(), 1);

        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_parse_news_file_stem() {
        let meta = parse_news_file_stem("Refugees arrive_in Berlin_DE_de");
        assert_eq!(meta.country.as_deref(), Some("DE"));
        assert_eq!(meta.language.as_deref(), Some("de"));

        assert_eq!(parse_news_file_stem("plain"), DocumentMetadata::default());
    }
}

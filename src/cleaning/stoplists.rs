//! Built-in stoplists used by the boilerplate classifier

use crate::error::{MediaTopicsError, Result};
use std::collections::HashSet;

const ENGLISH: &str = include_str!("../../resources/stoplists/English.txt");
const GERMAN: &str = include_str!("../../resources/stoplists/German.txt");
const FRENCH: &str = include_str!("../../resources/stoplists/French.txt");
const ITALIAN: &str = include_str!("../../resources/stoplists/Italian.txt");

pub fn available_languages() -> &'static [&'static str] {
    &["English", "German", "French", "Italian"]
}

fn stoplist_source(language: &str) -> Option<&'static str> {
    match language.to_lowercase().as_str() {
        "english" => Some(ENGLISH),
        "german" => Some(GERMAN),
        "french" => Some(FRENCH),
        "italian" => Some(ITALIAN),
        _ => None,
    }
}

/// Union of the stoplists of several languages
#[derive(Debug, Clone, Default)]
pub struct Stoplist {
    words: HashSet<String>,
}

impl Stoplist {
    pub fn for_languages(languages: &[String]) -> Result<Self> {
        let mut words = HashSet::new();
        for language in languages {
            let source = stoplist_source(language).ok_or_else(|| {
                MediaTopicsError::Configuration(format!(
                    "No stoplist for language '{}'. Available: {}",
                    language,
                    available_languages().join(", ")
                ))
            })?;
            words.extend(
                source
                    .lines()
                    .map(str::trim)
                    .filter(|w| !w.is_empty())
                    .map(str::to_lowercase),
            );
        }
        Ok(Self { words })
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Share of whitespace-delimited words that are stopwords
    pub fn density(&self, text: &str) -> f64 {
        let mut total = 0usize;
        let mut stopwords = 0usize;
        for word in text.split_whitespace() {
            total += 1;
            if self.contains(word) {
                stopwords += 1;
            }
        }
        if total == 0 {
            0.0
        } else {
            stopwords as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_of_languages() {
        let english = Stoplist::for_languages(&["English".to_string()]).unwrap();
        let both = Stoplist::for_languages(&["English".to_string(), "german".to_string()]).unwrap();

        assert!(english.contains("The"));
        assert!(!english.contains("und"));
        assert!(both.contains("und"));
        assert!(both.len() > english.len());
    }

    #[test]
    fn test_unknown_language() {
        let result = Stoplist::for_languages(&["Klingon".to_string()]);
        assert!(matches!(result, Err(MediaTopicsError::Configuration(_))));
    }

    #[test]
    fn test_density() {
        let stoplist = Stoplist::for_languages(&["English".to_string()]).unwrap();
        assert_eq!(stoplist.density(""), 0.0);
        assert_eq!(stoplist.density("the cat and the hat"), 0.6);
    }
}
